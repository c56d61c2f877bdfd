//! Payout-address decoding. The pool configuration supplies the mining
//! address as a string; this module turns it into the output script the
//! coinbase pays, checking the chain's version byte or bech32 prefix.

use bech32::FromBase32;
use thiserror::Error;

use crate::{nets::Chain, types::script::ScriptPubkey};

/// Errors decoding a configured address.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Base58check decode failure (bad character or checksum).
    #[error(transparent)]
    Base58(#[from] bs58::decode::Error),

    /// Bech32 decode failure.
    #[error(transparent)]
    Bech32(#[from] bech32::Error),

    /// The base58 version byte matches neither the chain's P2PKH nor P2SH
    /// version.
    #[error("Unknown address version byte {got:#04x}")]
    WrongVersion {
        /// The decoded version byte.
        got: u8,
    },

    /// The bech32 human-readable prefix is not the chain's.
    #[error("Unknown bech32 prefix {got:?}")]
    WrongHrp {
        /// The decoded prefix.
        got: String,
    },

    /// Only witness version 0 programs are supported for payouts.
    #[error("Unsupported witness program version {got}")]
    WrongWitnessVersion {
        /// The decoded witness version.
        got: u8,
    },

    /// The decoded payload does not match the 20-byte hash the chain's
    /// standard scripts carry.
    #[error("Address payload must be 20 bytes, got {got}")]
    InvalidPayloadLength {
        /// The decoded payload size.
        got: usize,
    },
}

/// Decode a base58check string into its version byte and payload.
pub fn decode_base58check(s: &str) -> Result<(u8, Vec<u8>), EncodingError> {
    let raw = bs58::decode(s).with_check(None).into_vec()?;
    match raw.split_first() {
        Some((version, payload)) => Ok((*version, payload.to_vec())),
        None => Err(EncodingError::InvalidPayloadLength { got: 0 }),
    }
}

/// Decode a configured payout address into the output script the coinbase
/// pays. Accepts the chain's base58 P2PKH and P2SH forms, and native bech32
/// v0 key-hash addresses where the chain defines a prefix.
pub fn payout_script<C: Chain>(addr: &str) -> Result<ScriptPubkey, EncodingError> {
    if let Some(hrp) = C::BECH32_HRP {
        let prefix_len = hrp.len();
        if addr.len() > prefix_len + 1
            && addr[..prefix_len].eq_ignore_ascii_case(hrp)
            && addr.as_bytes()[prefix_len] == b'1'
        {
            return witness_script(addr, hrp);
        }
    }

    let (version, payload) = decode_base58check(addr)?;
    let hash = payload_hash(&payload)?;
    if version == C::P2PKH_VERSION {
        Ok(ScriptPubkey::p2pkh(&hash))
    } else if version == C::P2SH_VERSION {
        Ok(ScriptPubkey::p2sh(&hash))
    } else {
        Err(EncodingError::WrongVersion { got: version })
    }
}

fn witness_script(addr: &str, hrp: &str) -> Result<ScriptPubkey, EncodingError> {
    let (got_hrp, data, _variant) = bech32::decode(addr)?;
    if got_hrp != hrp {
        return Err(EncodingError::WrongHrp { got: got_hrp });
    }
    let version = match data.first() {
        Some(v) => v.to_u8(),
        None => return Err(EncodingError::InvalidPayloadLength { got: 0 }),
    };
    if version != 0 {
        return Err(EncodingError::WrongWitnessVersion { got: version });
    }
    let program = Vec::<u8>::from_base32(&data[1..])?;
    Ok(ScriptPubkey::p2wpkh(&payload_hash(&program)?))
}

fn payload_hash(payload: &[u8]) -> Result<[u8; 20], EncodingError> {
    if payload.len() != 20 {
        return Err(EncodingError::InvalidPayloadLength { got: payload.len() });
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(payload);
    Ok(hash)
}
