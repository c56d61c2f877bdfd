//! Pool and worker configuration consumed by the assembler.

use serde::Deserialize;

fn default_extra_nonce() -> u8 {
    4
}

fn default_version_mask() -> u32 {
    // The version-rolling mask negotiated by ASIC-boost miners
    0x1fff_e000
}

/// Per-backend mining configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct MiningConfig {
    /// Maximum number of non-coinbase transactions per block. 0 means no cap.
    #[serde(default)]
    pub tx_num_limit: u32,

    /// Bytes of the extranonce region owned by the session (extranonce1).
    #[serde(default = "default_extra_nonce")]
    pub fixed_extra_nonce_size: u8,

    /// Bytes of the extranonce region rolled by the miner (extranonce2).
    #[serde(default = "default_extra_nonce")]
    pub mutable_extra_nonce_size: u8,

    /// Header bits miners may roll when version-rolling is negotiated.
    #[serde(default = "default_version_mask")]
    pub version_mask: u32,

    /// The pool payout address, in the chain's own encoding.
    pub mining_address: String,

    /// Free-form message embedded in the coinbase scriptSig.
    #[serde(default)]
    pub coinbase_message: String,

    /// Extra bytes placed ahead of the message, e.g. merged-mining tags.
    #[serde(default)]
    pub coinbase_extra: Vec<u8>,
}

impl MiningConfig {
    /// Total size of the reserved extranonce region.
    pub fn extra_nonce_size(&self) -> usize {
        self.fixed_extra_nonce_size as usize + self.mutable_extra_nonce_size as usize
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            tx_num_limit: 0,
            fixed_extra_nonce_size: default_extra_nonce(),
            mutable_extra_nonce_size: default_extra_nonce(),
            version_mask: default_version_mask(),
            mining_address: String::new(),
            coinbase_message: String::new(),
            coinbase_extra: vec![],
        }
    }
}

/// Per-connection worker state the submit path needs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkerConfig {
    /// The worker's login name, for log attribution.
    #[serde(default)]
    pub name: String,

    /// The session's fixed extranonce bytes (extranonce1), assigned at
    /// subscribe time. Length must equal `fixed_extra_nonce_size`.
    #[serde(default)]
    pub extra_nonce_fixed: Vec<u8>,
}
