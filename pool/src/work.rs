//! The live binding between one block template and the mining front-end.
//!
//! A `Work` is built once per template, owned by a single session thread,
//! and replaced wholesale when the node announces a new template. Between
//! those points it serves notify payloads, absorbs submitted shares into the
//! header and coinbase buffers, and reserializes the full block when a share
//! meets the network target.

use std::marker::PhantomData;

use serde_json::Value;

use smelter_chains::{
    enc::payout_script,
    hashes::{BlockHash, Wtxid},
    header::BlockHeader,
    nets::Chain,
    target::difficulty,
    types::ScriptPubkey,
};
use smelter_core::{
    hashes::{hash256, Hash256Digest, MarkedDigest},
    ser::write_compact_int,
};

use crate::{
    coinbase::{build_coinbase, CoinbaseParams, CoinbaseTx},
    config::{MiningConfig, WorkerConfig},
    error::{WorkError, WorkResult},
    merkle,
    select::select_transactions,
    stratum::{stratum_prev_hash, NotifyPayload, StratumSubmit},
    template::BlockTemplate,
};

/// Work lifecycle. Only `Loaded` and `Mutated` may serve notifications;
/// `Submitting` is transient and resolves to `Accepted` or `Rejected`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkState {
    /// No template bound yet.
    New,
    /// Template bound, never refreshed.
    Loaded,
    /// Template bound, `nTime` refreshed at least once.
    Mutated,
    /// A share is being folded in for submission.
    Submitting,
    /// The submitted block was accepted upstream.
    Accepted,
    /// The submitted block was rejected upstream.
    Rejected,
}

/// A template bound to mutable header state for one chain.
#[derive(Clone, Debug)]
pub struct Work<C: Chain> {
    state: WorkState,
    /// The header being mined. `merkle_root` stays null until a submitted
    /// share binds a concrete coinbase.
    pub header: BlockHeader,
    /// Height of the block being assembled.
    pub height: u64,
    /// Satoshis the payout output carries, after fee and fund accounting.
    pub block_reward: i64,
    /// Satoshis redirected to the dev output; 0 when absent.
    pub dev_fee: i64,
    /// The dev output script.
    pub dev_script: ScriptPubkey,
    /// Whether the template carries segwit transactions.
    pub segwit: bool,
    /// The witness commitment script embedded in the coinbase, if any.
    pub witness_commitment: Option<ScriptPubkey>,
    /// Legacy coinbase serialization plus mutation offsets.
    pub legacy: CoinbaseTx,
    /// Witness coinbase serialization plus mutation offsets.
    pub witness: CoinbaseTx,
    /// Sibling hashes authenticating leaf 0, computed once per template.
    pub merkle_path: Vec<Hash256Digest>,
    tx_hex: String,
    tx_count: usize,
    extra_nonce_len: usize,
    version_base: u32,
    version_mask: u32,
    notify: NotifyPayload,
    _chain: PhantomData<C>,
}

impl<C: Chain> Work<C> {
    /// The chain ticker this work serves.
    pub fn ticker(&self) -> &'static str {
        C::TICKER
    }

    /// The current lifecycle state.
    pub fn state(&self) -> WorkState {
        self.state
    }

    /// True when the work may serve notifications.
    pub fn ready(&self) -> bool {
        matches!(self.state, WorkState::Loaded | WorkState::Mutated)
    }

    /// The current notify payload.
    pub fn notify(&self) -> &NotifyPayload {
        &self.notify
    }

    /// Number of non-coinbase transactions in the assembled block.
    pub fn tx_count(&self) -> usize {
        self.tx_count
    }

    /// Validate a `getblocktemplate` payload and bind it.
    pub fn load(config: &MiningConfig, json: &Value) -> WorkResult<Self> {
        let template = BlockTemplate::from_value(json)?;
        let payout = payout_script::<C>(&config.mining_address)?;

        let segwit = template.segwit_enabled();
        let selection = select_transactions(
            &template.transactions,
            config.tx_num_limit as usize,
            template.coinbase_value,
            C::SORT_TXIDS,
        )?;

        let mut block_reward = selection.block_reward;
        let mut dev_fee: i64 = 0;
        let mut dev_script = ScriptPubkey::null();

        if let Some(dev) = &template.coinbase_dev_reward {
            dev_fee = dev.value;
            dev_script = ScriptPubkey::new(hex::decode(&dev.scriptpubkey).map_err(|e| {
                WorkError::MalformedTemplate(format!("field `coinbasedevreward.scriptpubkey`: {e}"))
            })?);
        }
        if let Some(fund) = &template.miner_fund {
            let address = fund.addresses.first().ok_or_else(|| {
                WorkError::MalformedTemplate("field `minerfund.addresses` is empty".into())
            })?;
            dev_fee = fund.minimumvalue;
            block_reward -= dev_fee;
            dev_script = payout_script::<C>(address).map_err(|e| {
                WorkError::MalformedTemplate(format!("field `minerfund.addresses`: {e}"))
            })?;
        }
        if dev_fee < 0 || block_reward < 0 {
            return Err(WorkError::MalformedTemplate(
                "coinbase value does not cover fees and fund outputs".into(),
            ));
        }

        let witness_commitment = if segwit {
            Some(Self::commitment_script(&template, &selection.txs)?)
        } else {
            None
        };

        let pair = build_coinbase(&CoinbaseParams {
            height: template.height,
            block_reward: block_reward as u64,
            payout_script: &payout,
            dev_fee: dev_fee as u64,
            dev_script: &dev_script,
            witness_commitment: witness_commitment.as_ref(),
            coinbase_extra: &config.coinbase_extra,
            coinbase_message: config.coinbase_message.as_bytes(),
            extra_nonce_size: config.extra_nonce_size(),
        })?;

        let mut leaves = vec![Hash256Digest::default()];
        leaves.extend(selection.txs.iter().map(|tx| tx.txid.internal()));
        let merkle_path = merkle::coinbase_path(&leaves);

        if template.previous_block_hash.len() != 64 {
            return Err(WorkError::MalformedTemplate(
                "field `previousblockhash` is not a 32-byte hash".into(),
            ));
        }
        let header = BlockHeader {
            version: template.version,
            prev_block: BlockHash::from_be_hex(&template.previous_block_hash).map_err(|e| {
                WorkError::MalformedTemplate(format!("field `previousblockhash`: {e}"))
            })?,
            merkle_root: Hash256Digest::default(),
            time: template.current_time,
            bits: template.compact_bits()?,
            nonce: 0,
        };

        let tx_hex: String = selection.txs.iter().map(|tx| tx.hex.as_str()).collect();
        let mut work = Self {
            state: WorkState::Loaded,
            header,
            height: template.height,
            block_reward,
            dev_fee,
            dev_script,
            segwit,
            witness_commitment,
            legacy: pair.legacy,
            witness: pair.witness,
            merkle_path,
            tx_hex,
            tx_count: selection.txs.len(),
            extra_nonce_len: config.extra_nonce_size(),
            version_base: template.version,
            version_mask: config.version_mask,
            notify: NotifyPayload::default(),
            _chain: PhantomData,
        };
        work.notify = work.build_notify(true);

        tracing::info!(
            ticker = C::TICKER,
            height = work.height,
            txs = work.tx_count,
            segwit,
            reward = work.block_reward,
            "loaded block template"
        );
        Ok(work)
    }

    /// Refresh `nTime` from the wall clock and regenerate the notify
    /// payload.
    pub fn mutate(&mut self) -> WorkResult<()> {
        self.mutate_at(unix_now())
    }

    /// Refresh `nTime` from a caller-supplied clock value.
    pub fn mutate_at(&mut self, now: u32) -> WorkResult<()> {
        if !self.ready() {
            return Err(WorkError::NotReady("cannot mutate an unloaded work"));
        }
        self.header.time = now;
        self.notify = self.build_notify(false);
        self.state = WorkState::Mutated;
        Ok(())
    }

    /// Fold a submitted share into the work: write the worker extranonce at
    /// the recorded offsets of BOTH coinbase forms, merge the miner-supplied
    /// header fields, and recompute the merkle root from the mutated
    /// coinbase txid and the stored path.
    ///
    /// Submission consumes the serving state; run it on a clone when the
    /// same template must keep serving notifications.
    pub fn prepare_for_submit(
        &mut self,
        worker: &WorkerConfig,
        msg: &StratumSubmit,
    ) -> WorkResult<()> {
        if !self.ready() {
            return Err(WorkError::NotReady("cannot submit against an unloaded work"));
        }

        let mut extranonce = worker.extra_nonce_fixed.clone();
        extranonce.extend_from_slice(&msg.extra_nonce);
        if extranonce.len() != self.extra_nonce_len {
            return Err(WorkError::ExtraNonceSize {
                got: extranonce.len(),
                want: self.extra_nonce_len,
            });
        }

        let offset = self.legacy.extra_nonce_offset as usize;
        self.legacy.data[offset..offset + extranonce.len()].copy_from_slice(&extranonce);
        let offset = self.witness.extra_nonce_offset as usize;
        self.witness.data[offset..offset + extranonce.len()].copy_from_slice(&extranonce);

        self.header.time = msg.time;
        self.header.nonce = msg.nonce;
        self.header.version = match msg.version_bits {
            Some(bits) => (self.version_base & !self.version_mask) | (bits & self.version_mask),
            None => self.version_base,
        };

        let coinbase_txid = hash256(&self.legacy.data);
        self.header.merkle_root = merkle::root_from_path(coinbase_txid, &self.merkle_path);

        self.state = WorkState::Submitting;
        tracing::debug!(
            ticker = C::TICKER,
            height = self.height,
            worker = %worker.name,
            "prepared share for submission"
        );
        Ok(())
    }

    /// Check the current header against the chain's proof-of-work rule.
    /// Returns validity against the network target and the share difficulty
    /// the hash met.
    pub fn check_consensus(&self) -> (bool, f64) {
        C::check_consensus(&self.header)
    }

    /// Serialize the full block, lowercase hex:
    /// `header ‖ CompactSize(txNum + 1) ‖ witness coinbase ‖ transactions`.
    pub fn build_block(&self) -> WorkResult<String> {
        let mut buf = Vec::with_capacity(80 + 9 + self.witness.data.len());
        buf.extend_from_slice(&self.header.as_bytes());
        write_compact_int(&mut buf, (self.tx_count + 1) as u64)?;
        buf.extend_from_slice(&self.witness.data);
        let mut block = hex::encode(buf);
        block.push_str(&self.tx_hex);
        Ok(block)
    }

    /// The expected work of the bound template: the network difficulty
    /// implied by its compact target.
    pub fn expected_work(&self) -> f64 {
        difficulty(self.header.bits)
    }

    /// The display hash of the current header.
    pub fn share_hash(&self) -> BlockHash {
        C::display_hash(&self.header.as_bytes())
    }

    /// Record upstream acceptance of the submitted block.
    pub fn accepted(&mut self) {
        if self.state == WorkState::Submitting {
            self.state = WorkState::Accepted;
        }
    }

    /// Record upstream rejection of the submitted block.
    pub fn rejected(&mut self) {
        if self.state == WorkState::Submitting {
            self.state = WorkState::Rejected;
        }
    }

    /// The commitment output script: the node-supplied value verbatim when
    /// present, otherwise computed over the selected wtxids with the null
    /// coinbase placeholder at leaf 0.
    fn commitment_script(
        template: &BlockTemplate,
        selected: &[crate::select::SelectedTx],
    ) -> WorkResult<ScriptPubkey> {
        if let Some(default) = &template.default_witness_commitment {
            let bytes = hex::decode(default).map_err(|e| {
                WorkError::WitnessComputationFailed(format!(
                    "field `default_witness_commitment`: {e}"
                ))
            })?;
            return Ok(ScriptPubkey::new(bytes));
        }

        let mut leaves = vec![Hash256Digest::default()];
        for tx in selected {
            let wtxid_hex = tx.wtxid_hex.as_ref().unwrap_or(&tx.txid_hex);
            let wtxid = Wtxid::from_be_hex(wtxid_hex).map_err(|e| {
                WorkError::WitnessComputationFailed(format!(
                    "transaction hash {wtxid_hex}: {e}"
                ))
            })?;
            leaves.push(wtxid.internal());
        }
        Ok(merkle::witness_commitment_script(
            &merkle::witness_commitment(&leaves),
        ))
    }

    fn build_notify(&self, clean_jobs: bool) -> NotifyPayload {
        let offset = self.legacy.extra_nonce_offset as usize;
        NotifyPayload {
            job_id: format!("{:x}{:08x}", self.height, self.header.time),
            prev_hash: stratum_prev_hash(&self.header.prev_block),
            coinb1: hex::encode(&self.legacy.data[..offset]),
            coinb2: hex::encode(&self.legacy.data[offset + self.extra_nonce_len..]),
            merkle_branch: self
                .merkle_path
                .iter()
                .map(|node| hex::encode(node.as_ref()))
                .collect(),
            version: format!("{:08x}", self.header.version),
            nbits: format!("{:08x}", self.header.bits),
            ntime: format!("{:08x}", self.header.time),
            clean_jobs,
        }
    }
}

fn unix_now() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use smelter_chains::nets::Bitcoin;

    fn config() -> MiningConfig {
        MiningConfig {
            mining_address: "1111111111111111111114oLvT2".into(),
            fixed_extra_nonce_size: 4,
            mutable_extra_nonce_size: 4,
            ..Default::default()
        }
    }

    fn template() -> Value {
        json!({
            "height": 700_000u64,
            "version": 0x2000_0000u32,
            "previousblockhash":
                "0000000000000000000000000000000000000000000000000000000000000011",
            "curtime": 1_700_000_000u32,
            "bits": "170b2c70",
            "coinbasevalue": 625_000_000i64,
            "transactions": [],
        })
    }

    #[test]
    fn the_state_machine_gates_operations() {
        let mut work = Work::<Bitcoin>::load(&config(), &template()).unwrap();
        assert_eq!(work.state(), WorkState::Loaded);
        assert!(work.ready());

        work.mutate_at(1_700_000_100).unwrap();
        assert_eq!(work.state(), WorkState::Mutated);
        assert_eq!(work.header.time, 1_700_000_100);
        assert!(!work.notify().clean_jobs);

        let worker = WorkerConfig {
            name: "rig0".into(),
            extra_nonce_fixed: vec![0; 4],
        };
        let submit = StratumSubmit {
            extra_nonce: vec![0; 4],
            time: 1_700_000_101,
            nonce: 42,
            ..Default::default()
        };
        work.prepare_for_submit(&worker, &submit).unwrap();
        assert_eq!(work.state(), WorkState::Submitting);
        assert!(!work.ready());
        assert!(work.mutate_at(0).is_err());

        work.accepted();
        assert_eq!(work.state(), WorkState::Accepted);
    }

    #[test]
    fn it_rejects_short_extranonces() {
        let mut work = Work::<Bitcoin>::load(&config(), &template()).unwrap();
        let worker = WorkerConfig::default();
        let submit = StratumSubmit {
            extra_nonce: vec![1, 2, 3],
            ..Default::default()
        };
        match work.prepare_for_submit(&worker, &submit) {
            Err(WorkError::ExtraNonceSize { got: 3, want: 8 }) => {}
            other => panic!("expected ExtraNonceSize, got {:?}", other),
        }
    }

    #[test]
    fn notify_splits_the_coinbase_around_the_extranonce() {
        let work = Work::<Bitcoin>::load(&config(), &template()).unwrap();
        let notify = work.notify();
        let reassembled = format!(
            "{}{}{}",
            notify.coinb1,
            "00".repeat(8),
            notify.coinb2
        );
        assert_eq!(reassembled, hex::encode(&work.legacy.data));
        assert!(notify.clean_jobs);
    }

    #[test]
    fn version_rolling_respects_the_mask() {
        let mut work = Work::<Bitcoin>::load(&config(), &template()).unwrap();
        let worker = WorkerConfig {
            extra_nonce_fixed: vec![0; 4],
            ..Default::default()
        };
        let submit = StratumSubmit {
            extra_nonce: vec![0; 4],
            time: 1,
            nonce: 2,
            version_bits: Some(0xffff_ffff),
            ..Default::default()
        };
        work.prepare_for_submit(&worker, &submit).unwrap();
        assert_eq!(
            work.header.version,
            0x2000_0000 | 0x1fff_e000,
            "only masked bits may roll"
        );
    }
}
