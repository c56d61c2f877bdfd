//! Simple types for Bitcoin Script and witness stack datastructures, each of
//! which is treated as an opaque, wrapped byte vector.
//!
//! We do not handle assembly, disassembly, or Script execution. The block
//! assembler only ever needs to construct the handful of standard output
//! scripts below and to carry template-supplied scripts through unchanged.

use smelter_core::wrap_prefixed_byte_vector;

/// Script opcodes the assembler emits.
pub mod opcodes {
    /// Push an empty byte vector.
    pub const OP_0: u8 = 0x00;
    /// Marks an output as unspendable data carrier.
    pub const OP_RETURN: u8 = 0x6a;
    /// Duplicate the top stack item.
    pub const OP_DUP: u8 = 0x76;
    /// Equality check.
    pub const OP_EQUAL: u8 = 0x87;
    /// Equality check, fail the script on mismatch.
    pub const OP_EQUALVERIFY: u8 = 0x88;
    /// Hash160 (SHA-256 then RIPEMD-160) of the top stack item.
    pub const OP_HASH160: u8 = 0xa9;
    /// Signature check.
    pub const OP_CHECKSIG: u8 = 0xac;
}

wrap_prefixed_byte_vector!(
    /// A ScriptSig is a wrapped byte vector carried in a transaction input.
    ///
    /// `ScriptSig::null()` and `ScriptSig::default()` return the empty byte
    /// vector with a 0 prefix.
    ScriptSig
);
wrap_prefixed_byte_vector!(
    /// A WitnessStackItem is a wrapped byte vector intended for use in
    /// witnesses. Each input's witness is a prefixed vector of stack items;
    /// the transaction's `witnesses` is an UNPREFIXED `Vec<Witness>`.
    WitnessStackItem
);
wrap_prefixed_byte_vector!(
    /// A ScriptPubkey is a wrapped byte vector used as the payment predicate
    /// in transaction outputs.
    ScriptPubkey
);

/// A Witness is the stack item vector corresponding to a single input.
pub type Witness = Vec<WitnessStackItem>;

/// Standard script types, and a non-standard type for all other scripts.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ScriptType {
    /// Pay to Pubkeyhash.
    Pkh,
    /// Pay to Scripthash.
    Sh,
    /// Pay to Witness Pubkeyhash.
    Wpkh,
    /// Pay to Witness Scripthash.
    Wsh,
    /// An OP_RETURN data carrier.
    OpReturn,
    /// Nonstandard or unknown `Script` type. May be a newer witness version.
    NonStandard,
}

impl ScriptPubkey {
    /// `OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(hash: &[u8; 20]) -> Self {
        let mut v = Vec::with_capacity(25);
        v.extend_from_slice(&[opcodes::OP_DUP, opcodes::OP_HASH160, 0x14]);
        v.extend_from_slice(hash);
        v.extend_from_slice(&[opcodes::OP_EQUALVERIFY, opcodes::OP_CHECKSIG]);
        Self::new(v)
    }

    /// `OP_HASH160 <20-byte hash> OP_EQUAL`
    pub fn p2sh(hash: &[u8; 20]) -> Self {
        let mut v = Vec::with_capacity(23);
        v.extend_from_slice(&[opcodes::OP_HASH160, 0x14]);
        v.extend_from_slice(hash);
        v.push(opcodes::OP_EQUAL);
        Self::new(v)
    }

    /// `OP_0 <20-byte hash>` — native witness v0 key hash.
    pub fn p2wpkh(hash: &[u8; 20]) -> Self {
        let mut v = Vec::with_capacity(22);
        v.extend_from_slice(&[opcodes::OP_0, 0x14]);
        v.extend_from_slice(hash);
        Self::new(v)
    }

    /// `OP_RETURN <data>` — `data` must fit a single direct push (75 bytes).
    pub fn op_return(data: &[u8]) -> Self {
        debug_assert!(data.len() <= 75);
        let mut v = Vec::with_capacity(2 + data.len());
        v.push(opcodes::OP_RETURN);
        v.push(data.len() as u8);
        v.extend_from_slice(data);
        Self::new(v)
    }

    /// Inspect the script to determine its standard type.
    pub fn standard_type(&self) -> ScriptType {
        let items = self.items();
        match self.len() {
            0x19 => {
                if items[0..3] == [opcodes::OP_DUP, opcodes::OP_HASH160, 0x14]
                    && items[0x17..] == [opcodes::OP_EQUALVERIFY, opcodes::OP_CHECKSIG]
                {
                    ScriptType::Pkh
                } else {
                    ScriptType::NonStandard
                }
            }
            0x17 => {
                if items[0..2] == [opcodes::OP_HASH160, 0x14] && items[0x16] == opcodes::OP_EQUAL {
                    ScriptType::Sh
                } else {
                    ScriptType::NonStandard
                }
            }
            0x16 => {
                if items[0..2] == [opcodes::OP_0, 0x14] {
                    ScriptType::Wpkh
                } else {
                    ScriptType::NonStandard
                }
            }
            0x22 => {
                if items[0..2] == [opcodes::OP_0, 0x20] {
                    ScriptType::Wsh
                } else {
                    ScriptType::NonStandard
                }
            }
            _ => {
                if !items.is_empty() && items[0] == opcodes::OP_RETURN {
                    ScriptType::OpReturn
                } else {
                    ScriptType::NonStandard
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use smelter_core::ser::ByteFormat;

    #[test]
    fn it_serializes_and_deserializes_script_sigs() {
        let cases = [
            (
                ScriptSig::new(
                    hex::decode("0014758ce550380d964051086798d6546bebdca27a73").unwrap(),
                ),
                "160014758ce550380d964051086798d6546bebdca27a73",
                22,
            ),
            (ScriptSig::new(vec![]), "00", 0),
            (ScriptSig::null(), "00", 0),
        ];
        for case in cases.iter() {
            let script = ScriptSig::deserialize_hex(case.1).unwrap();
            assert_eq!(case.0.serialize_hex().unwrap(), case.1);
            assert_eq!(case.0.len(), case.2);
            assert_eq!(case.0.is_empty(), case.2 == 0);

            assert_eq!(script, case.0);
            assert_eq!(script.serialize_hex().unwrap(), case.1);
        }
    }

    #[test]
    fn it_constructs_standard_scripts() {
        let hash = [0x11u8; 20];

        let pkh = ScriptPubkey::p2pkh(&hash);
        assert_eq!(pkh.len(), 25);
        assert_eq!(pkh.standard_type(), ScriptType::Pkh);

        let sh = ScriptPubkey::p2sh(&hash);
        assert_eq!(sh.len(), 23);
        assert_eq!(sh.standard_type(), ScriptType::Sh);

        let wpkh = ScriptPubkey::p2wpkh(&hash);
        assert_eq!(wpkh.len(), 22);
        assert_eq!(wpkh.standard_type(), ScriptType::Wpkh);

        let data_carrier = ScriptPubkey::op_return(&[0xaa; 36]);
        assert_eq!(data_carrier.len(), 38);
        assert_eq!(data_carrier.standard_type(), ScriptType::OpReturn);
    }
}
