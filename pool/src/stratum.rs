//! The payloads the core exchanges with the stratum front-end. Message
//! framing, subscription state, and share accounting live outside this
//! crate; these types fix only the shapes the assembler reads and writes.

use serde::{Deserialize, Serialize};
use smelter_chains::hashes::BlockHash;

/// The parameters of a `mining.notify`. `coinb1`/`coinb2` are the legacy
/// coinbase split at the extranonce region: the miner splices
/// `extranonce1 ‖ extranonce2` between them and hashes the result for the
/// merkle fold, so the split must be over the txid-bearing serialization.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NotifyPayload {
    /// Job identifier, unique per work and mutation.
    pub job_id: String,
    /// Previous block hash in stratum word order.
    pub prev_hash: String,
    /// Coinbase bytes before the extranonce region, hex.
    pub coinb1: String,
    /// Coinbase bytes after the extranonce region, hex.
    pub coinb2: String,
    /// The coinbase merkle path, internal-order hex, leaf to root.
    pub merkle_branch: Vec<String>,
    /// Header version, 8 hex digits.
    pub version: String,
    /// Compact target, 8 hex digits.
    pub nbits: String,
    /// Header timestamp, 8 hex digits.
    pub ntime: String,
    /// True when miners must drop work built on earlier jobs.
    pub clean_jobs: bool,
}

/// The core-visible shape of a parsed `mining.submit`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StratumSubmit {
    /// The job the share was mined against.
    pub job_id: String,
    /// The miner-rolled extranonce2 bytes.
    pub extra_nonce: Vec<u8>,
    /// The header timestamp the miner used.
    pub time: u32,
    /// The winning nonce candidate.
    pub nonce: u32,
    /// Version bits the miner rolled, masked by the negotiated mask.
    /// Absent when the session never negotiated version rolling.
    #[serde(default)]
    pub version_bits: Option<u32>,
}

/// Encode a previous-block hash the way stratum notifies carry it: the
/// little-endian serialization, byte-swapped per 32-bit word.
pub fn stratum_prev_hash(hash: &BlockHash) -> String {
    let bytes = AsRef::<[u8; 32]>::as_ref(hash);
    let mut out = String::with_capacity(64);
    for word in bytes.chunks(4) {
        let mut swapped = [0u8; 4];
        swapped.copy_from_slice(word);
        swapped.reverse();
        out.push_str(&hex::encode(swapped));
    }
    out
}
