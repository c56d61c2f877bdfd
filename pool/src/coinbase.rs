//! Coinbase construction.
//!
//! The coinbase is serialized once per template, in both legacy and witness
//! forms, with the byte offsets of the extra-data and extranonce regions
//! recorded. Miners mutate the extranonce bytes in place millions of times a
//! second; nothing on the hot path may reserialize the transaction.

use smelter_chains::types::{Outpoint, ScriptPubkey, Tx, TxIn, TxOut, WitnessStackItem};
use smelter_core::ser::write_height_code;

use crate::error::{WorkError, WorkResult};

/// Consensus bound on the coinbase scriptSig.
pub const MAX_COINBASE_SCRIPT_SIG: usize = 100;

/// One serialized form of the coinbase, with the mutation offsets recorded.
#[derive(Clone, Debug, Default)]
pub struct CoinbaseTx {
    /// The serialized transaction.
    pub data: Vec<u8>,
    /// Absolute offset of the coinbase extra-data region inside `data`.
    pub extra_data_offset: u32,
    /// Absolute offset of the reserved extranonce region inside `data`.
    pub extra_nonce_offset: u32,
}

/// The coinbase in both serialization forms. For non-segwit templates the
/// two are identical.
#[derive(Clone, Debug, Default)]
pub struct CoinbasePair {
    /// Legacy serialization; its SHA-256d is the coinbase txid.
    pub legacy: CoinbaseTx,
    /// Witness serialization; this is the form embedded in the block.
    pub witness: CoinbaseTx,
}

/// Everything the builder needs from the template, the configuration, and
/// the chain grafts.
#[derive(Clone, Debug)]
pub struct CoinbaseParams<'a> {
    /// Block height, BIP-34 encoded at the front of the scriptSig.
    pub height: u64,
    /// Satoshis paid to the pool address.
    pub block_reward: u64,
    /// The pool payout script.
    pub payout_script: &'a ScriptPubkey,
    /// Satoshis redirected to a dev/miner-fund output; 0 disables it.
    pub dev_fee: u64,
    /// The dev output script, used verbatim.
    pub dev_script: &'a ScriptPubkey,
    /// The witness commitment script; presence implies segwit.
    pub witness_commitment: Option<&'a ScriptPubkey>,
    /// Caller-supplied bytes placed ahead of the message.
    pub coinbase_extra: &'a [u8],
    /// The pool's coinbase message, uninterpreted bytes.
    pub coinbase_message: &'a [u8],
    /// Total reserved extranonce bytes (fixed + mutable).
    pub extra_nonce_size: usize,
}

/// Assemble the coinbase and serialize it twice.
///
/// scriptSig layout: BIP-34 height push, then the extra-data region
/// (caller extra bytes followed by the message), then `extra_nonce_size`
/// zero bytes reserved for in-place mutation.
pub fn build_coinbase(params: &CoinbaseParams<'_>) -> WorkResult<CoinbasePair> {
    let segwit = params.witness_commitment.is_some();

    let mut script_sig: Vec<u8> = vec![];
    write_height_code(&mut script_sig, params.height)?;
    let extra_data_local = script_sig.len();
    script_sig.extend_from_slice(params.coinbase_extra);
    script_sig.extend_from_slice(params.coinbase_message);
    let extra_nonce_local = script_sig.len();
    script_sig.resize(extra_nonce_local + params.extra_nonce_size, 0);

    if script_sig.len() > MAX_COINBASE_SCRIPT_SIG {
        return Err(WorkError::ScriptSigOverflow {
            got: script_sig.len(),
            max: MAX_COINBASE_SCRIPT_SIG,
        });
    }

    let mut vout = vec![TxOut::new(params.block_reward, params.payout_script.clone())];
    if params.dev_fee > 0 {
        vout.push(TxOut::new(params.dev_fee, params.dev_script.clone()));
    }
    if let Some(commitment) = params.witness_commitment {
        vout.push(TxOut::new(0, commitment.clone()));
    }

    let mut tx = Tx::new(
        if segwit { 2 } else { 1 },
        vec![TxIn::new(Outpoint::null(), script_sig, 0xffff_ffff)],
        vout,
        0,
    );
    if segwit {
        // the witness reserved value
        tx.witnesses = vec![vec![WitnessStackItem::new(vec![0u8; 32])]];
    }

    let legacy_base = tx.script_sig_offset(false)?;
    let mut legacy_data = vec![];
    tx.write_legacy_to(&mut legacy_data)?;
    let legacy = CoinbaseTx {
        data: legacy_data,
        extra_data_offset: (legacy_base + extra_data_local) as u32,
        extra_nonce_offset: (legacy_base + extra_nonce_local) as u32,
    };

    let witness = if segwit {
        let witness_base = tx.script_sig_offset(true)?;
        let mut witness_data = vec![];
        tx.write_witness_to(&mut witness_data)?;
        CoinbaseTx {
            data: witness_data,
            extra_data_offset: (witness_base + extra_data_local) as u32,
            extra_nonce_offset: (witness_base + extra_nonce_local) as u32,
        }
    } else {
        legacy.clone()
    };

    Ok(CoinbasePair { legacy, witness })
}

#[cfg(test)]
mod test {
    use super::*;
    use smelter_core::ser::ByteFormat;

    fn params<'a>(
        payout: &'a ScriptPubkey,
        dev: &'a ScriptPubkey,
        commitment: Option<&'a ScriptPubkey>,
    ) -> CoinbaseParams<'a> {
        CoinbaseParams {
            height: 700_000,
            block_reward: 625_000_000,
            payout_script: payout,
            dev_fee: 0,
            dev_script: dev,
            witness_commitment: commitment,
            coinbase_extra: &[],
            coinbase_message: b"/smelter/",
            extra_nonce_size: 8,
        }
    }

    #[test]
    fn the_offsets_point_at_the_reserved_regions() {
        let payout = ScriptPubkey::p2pkh(&[0u8; 20]);
        let dev = ScriptPubkey::null();
        let commitment = ScriptPubkey::op_return(&[0xaa; 36]);

        for with_commitment in [None, Some(&commitment)] {
            let p = params(&payout, &dev, with_commitment);
            let pair = build_coinbase(&p).unwrap();

            for form in [&pair.legacy, &pair.witness] {
                let ed = form.extra_data_offset as usize;
                let en = form.extra_nonce_offset as usize;
                assert_eq!(&form.data[ed..en], b"/smelter/");
                assert_eq!(&form.data[en..en + 8], &[0u8; 8]);
            }
            // BIP-34 height push right at the front of the scriptSig
            let ed = pair.legacy.extra_data_offset as usize;
            assert_eq!(&pair.legacy.data[ed - 4..ed], &[0x03, 0x60, 0xae, 0x0a]);
        }
    }

    #[test]
    fn segwit_builds_distinct_forms_with_version_two() {
        let payout = ScriptPubkey::p2pkh(&[0u8; 20]);
        let dev = ScriptPubkey::null();
        let commitment = ScriptPubkey::op_return(&[0xaa; 36]);

        let plain = build_coinbase(&params(&payout, &dev, None)).unwrap();
        assert_eq!(plain.legacy.data, plain.witness.data);
        assert_eq!(&plain.legacy.data[0..4], &[1, 0, 0, 0]);

        let segwit = build_coinbase(&params(&payout, &dev, Some(&commitment))).unwrap();
        assert_eq!(&segwit.legacy.data[0..4], &[2, 0, 0, 0]);
        assert_eq!(&segwit.witness.data[4..6], &[0x00, 0x01]);
        assert_eq!(
            segwit.witness.extra_nonce_offset,
            segwit.legacy.extra_nonce_offset + 2
        );

        // the witness carries the 32-byte zero reserved value
        let parsed = Tx::deserialize_hex(&hex::encode(&segwit.witness.data)).unwrap();
        assert_eq!(parsed.witnesses.len(), 1);
        assert_eq!(parsed.witnesses[0][0].items(), &[0u8; 32]);
    }

    #[test]
    fn the_dev_output_appears_between_payout_and_commitment() {
        let payout = ScriptPubkey::p2pkh(&[0u8; 20]);
        let dev = ScriptPubkey::p2pkh(&[7u8; 20]);
        let commitment = ScriptPubkey::op_return(&[0xaa; 36]);

        let mut p = params(&payout, &dev, Some(&commitment));
        p.dev_fee = 10_000_000;
        let pair = build_coinbase(&p).unwrap();
        let parsed = Tx::deserialize_hex(&hex::encode(&pair.legacy.data)).unwrap();
        assert_eq!(parsed.vout.len(), 3);
        assert_eq!(parsed.vout[0].value, 625_000_000);
        assert_eq!(parsed.vout[1].value, 10_000_000);
        assert_eq!(parsed.vout[1].script_pubkey, dev);
        assert_eq!(parsed.vout[2].value, 0);
    }

    #[test]
    fn patching_the_region_matches_rebuilding_the_transaction() {
        let payout = ScriptPubkey::p2pkh(&[0u8; 20]);
        let dev = ScriptPubkey::null();
        let p = params(&payout, &dev, None);
        let pair = build_coinbase(&p).unwrap();

        // patch the reserved region in place
        let pattern = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
        let mut patched = pair.legacy.data.clone();
        let en = pair.legacy.extra_nonce_offset as usize;
        patched[en..en + 8].copy_from_slice(&pattern);

        // rebuild from scratch with the pattern inside the scriptSig
        let mut parsed = Tx::deserialize_hex(&hex::encode(&pair.legacy.data)).unwrap();
        let mut sig = parsed.vin[0].script_sig.items().to_vec();
        let sig_en = sig.len() - 8;
        sig[sig_en..].copy_from_slice(&pattern);
        parsed.vin[0].script_sig = sig.into();
        let mut rebuilt = vec![];
        parsed.write_legacy_to(&mut rebuilt).unwrap();

        assert_eq!(patched, rebuilt);
    }

    #[test]
    fn it_refuses_oversized_script_sigs() {
        let payout = ScriptPubkey::p2pkh(&[0u8; 20]);
        let dev = ScriptPubkey::null();
        let mut p = params(&payout, &dev, None);
        let long_message = [b'x'; 120];
        p.coinbase_message = &long_message;
        match build_coinbase(&p) {
            Err(WorkError::ScriptSigOverflow { got, max }) => {
                assert!(got > max);
            }
            other => panic!("expected ScriptSigOverflow, got {:?}", other),
        }
    }
}
