//! The `nets` module defines the `Chain` trait: the per-chain profile the
//! assembler is parameterized over. A profile fixes the ticker, the
//! consensus and display hash flavors, the share-difficulty factor, the
//! transaction ordering rule, and the address version bytes.
//!
//! Chains are unit types; the `Work` object and the address encoder take a
//! `Chain` type parameter, so per-chain differences resolve at compile time.

use smelter_core::hashes::{hash256, scrypt_1024_pow, Hash256Digest};

use crate::{
    hashes::BlockHash,
    header::BlockHeader,
    target::{expand_bits, hash_meets_target, share_difficulty},
};

/// A Bitcoin-family chain profile.
pub trait Chain {
    /// The chain's ticker, carried into notify payloads and log events.
    const TICKER: &'static str;

    /// Multiplier applied to the raw share difficulty. Scrypt chains use
    /// 65536 so that pool-side difficulty matches miner expectations.
    const DIFFICULTY_FACTOR: f64 = 1.0;

    /// True for chains that order the non-coinbase transaction set by
    /// ascending hex txid (canonical transaction ordering).
    const SORT_TXIDS: bool = false;

    /// Base58 version byte for pay-to-pubkey-hash addresses.
    const P2PKH_VERSION: u8;

    /// Base58 version byte for pay-to-script-hash addresses.
    const P2SH_VERSION: u8;

    /// Bech32 human-readable prefix for native witness addresses, if the
    /// chain has segwit.
    const BECH32_HRP: Option<&'static str> = None;

    /// The proof-of-work hash of an 80-byte header. Consensus-critical and
    /// chain-specific.
    fn pow_hash(header: &[u8; 80]) -> Hash256Digest {
        hash256(header)
    }

    /// The display hash of an 80-byte header. SHA-256d on every supported
    /// chain, including those whose proof of work is not.
    fn display_hash(header: &[u8; 80]) -> BlockHash {
        hash256(header).into()
    }

    /// Check a header against its own compact target. Returns whether the
    /// proof of work is valid for the network, and the share difficulty the
    /// hash actually met.
    fn check_consensus(header: &BlockHeader) -> (bool, f64) {
        let bytes = header.as_bytes();
        let pow = Self::pow_hash(&bytes);
        let target = expand_bits(header.bits);
        let ok = hash_meets_target(&pow, &target);
        (ok, share_difficulty(&pow) * Self::DIFFICULTY_FACTOR)
    }
}

/// Bitcoin.
#[derive(Debug, Clone, Copy)]
pub struct Bitcoin;

impl Chain for Bitcoin {
    const TICKER: &'static str = "BTC";
    const P2PKH_VERSION: u8 = 0x00;
    const P2SH_VERSION: u8 = 0x05;
    const BECH32_HRP: Option<&'static str> = Some("bc");
}

/// Litecoin. Consensus hashing is scrypt; display and merkle hashing remain
/// SHA-256d. The two must never be unified.
#[derive(Debug, Clone, Copy)]
pub struct Litecoin;

impl Chain for Litecoin {
    const TICKER: &'static str = "LTC";
    const DIFFICULTY_FACTOR: f64 = 65536.0;
    const P2PKH_VERSION: u8 = 0x30;
    const P2SH_VERSION: u8 = 0x32;
    const BECH32_HRP: Option<&'static str> = Some("ltc");

    fn pow_hash(header: &[u8; 80]) -> Hash256Digest {
        scrypt_1024_pow(header)
    }
}

/// Bitcoin Cash (BCHN node lineage). Orders the selected transaction set by
/// ascending hex txid.
#[derive(Debug, Clone, Copy)]
pub struct BitcoinCashNode;

impl Chain for BitcoinCashNode {
    const TICKER: &'static str = "BCHN";
    const SORT_TXIDS: bool = true;
    const P2PKH_VERSION: u8 = 0x00;
    const P2SH_VERSION: u8 = 0x05;
}

/// Bitcoin Cash (ABC lineage). Like BCHN, plus the node may request a
/// miner-fund redirection through the block template.
#[derive(Debug, Clone, Copy)]
pub struct BitcoinCashAbc;

impl Chain for BitcoinCashAbc {
    const TICKER: &'static str = "BCHABC";
    const SORT_TXIDS: bool = true;
    const P2PKH_VERSION: u8 = 0x00;
    const P2SH_VERSION: u8 = 0x05;
}

/// FreeCash. Templates carry a mandatory dev-reward output description.
#[derive(Debug, Clone, Copy)]
pub struct Freecash;

impl Chain for Freecash {
    const TICKER: &'static str = "FCH";
    const P2PKH_VERSION: u8 = 0x23;
    const P2SH_VERSION: u8 = 0x05;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_hash_is_shared_but_pow_differs() {
        let header = [0x42u8; 80];
        assert_eq!(
            Bitcoin::display_hash(&header),
            Litecoin::display_hash(&header)
        );
        assert_ne!(Bitcoin::pow_hash(&header), Litecoin::pow_hash(&header));
        assert_eq!(
            Bitcoin::pow_hash(&header),
            BitcoinCashNode::pow_hash(&header)
        );
    }

    #[test]
    fn it_rejects_headers_above_target() {
        // An effectively-zero target: only the zero hash could meet it
        let header = BlockHeader {
            bits: 0x0300_0001,
            ..Default::default()
        };
        let (ok, share) = Bitcoin::check_consensus(&header);
        assert!(!ok);
        assert!(share > 0.0);
    }

    #[test]
    fn ltc_share_difficulty_carries_the_factor() {
        let header = BlockHeader {
            bits: 0x0300_0001,
            ..Default::default()
        };
        let bytes = header.as_bytes();
        let (_, ltc_share) = Litecoin::check_consensus(&header);
        let raw = crate::target::share_difficulty(&Litecoin::pow_hash(&bytes));
        assert!((ltc_share - raw * 65536.0).abs() / ltc_share < 1e-12);
    }
}
