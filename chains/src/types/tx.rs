//! The Bitcoin-family transaction, serializable in legacy and witness forms.
//!
//! The assembler must accept template payloads of either form, re-emit them
//! byte-for-byte, and locate scriptSig offsets inside both serializations so
//! that miners can mutate the coinbase extranonce in place. One type carrying
//! optional witnesses serves all of that; we do not maintain the legacy /
//! witness type distinction at the type level.

use std::io::{Read, Write};

use smelter_core::{
    hashes::{Hash256Writer, MarkedDigestWriter},
    ser::{self, ByteFormat, SerError},
};
use thiserror::Error;

use crate::{
    hashes::{Txid, Wtxid},
    types::{
        script::{Witness, WitnessStackItem},
        txin::TxIn,
        txout::TxOut,
    },
};

/// An error in transaction encoding or decoding.
#[derive(Debug, Error)]
pub enum TxError {
    /// Serialization error bubbled up from a component.
    #[error(transparent)]
    Ser(#[from] SerError),

    /// IO error bubbled up from a reader or writer.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The segwit marker byte was present but the flag byte was not 0x01.
    #[error("Bad witness flag: expected 0001, got 00{0:02x}")]
    BadWitnessFlag(u8),

    /// The operation requires at least one input.
    #[error("Transaction has no inputs")]
    NoInputs,
}

/// Type alias for transaction results.
pub type TxResult<T> = Result<T, TxError>;

/// A transaction. `witnesses` is empty for legacy transactions; a
/// witness-serialized transaction carries exactly one witness stack per
/// input (possibly empty stacks).
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Eq, PartialEq, Default)]
pub struct Tx {
    /// The version number.
    pub version: u32,
    /// The input vector.
    pub vin: Vec<TxIn>,
    /// The output vector.
    pub vout: Vec<TxOut>,
    /// Per-input witness stacks. Empty when the tx has no witness data.
    pub witnesses: Vec<Witness>,
    /// The nLockTime field.
    pub locktime: u32,
}

impl Tx {
    /// Instantiate a new transaction.
    pub fn new<I, O>(version: u32, vin: I, vout: O, locktime: u32) -> Self
    where
        I: Into<Vec<TxIn>>,
        O: Into<Vec<TxOut>>,
    {
        Self {
            version,
            vin: vin.into(),
            vout: vout.into(),
            witnesses: vec![],
            locktime,
        }
    }

    /// True if the transaction carries witness data and serializes with the
    /// segwit marker by default.
    pub fn has_witness(&self) -> bool {
        !self.witnesses.is_empty()
    }

    /// Serialize in the legacy form:
    /// `version ‖ CompactSize(|vin|) ‖ vin ‖ CompactSize(|vout|) ‖ vout ‖ locktime`.
    pub fn write_legacy_to<W: Write>(&self, writer: &mut W) -> TxResult<usize> {
        let mut len = Self::write_u32_le(writer, self.version)?;
        len += Self::write_prefix_vec(writer, &self.vin)?;
        len += Self::write_prefix_vec(writer, &self.vout)?;
        len += Self::write_u32_le(writer, self.locktime)?;
        Ok(len)
    }

    /// Serialize in the witness form:
    /// `version ‖ 0x00 ‖ 0x01 ‖ CompactSize(|vin|) ‖ vin ‖ CompactSize(|vout|)
    /// ‖ vout ‖ witness stacks ‖ locktime`. Inputs without a recorded witness
    /// get an empty stack.
    pub fn write_witness_to<W: Write>(&self, writer: &mut W) -> TxResult<usize> {
        let mut len = Self::write_u32_le(writer, self.version)?;
        len += writer.write(&[0u8, 1u8])?;
        len += Self::write_prefix_vec(writer, &self.vin)?;
        len += Self::write_prefix_vec(writer, &self.vout)?;
        let empty: Witness = vec![];
        for i in 0..self.vin.len() {
            let wit = self.witnesses.get(i).unwrap_or(&empty);
            len += Self::write_prefix_vec(writer, wit)?;
        }
        len += Self::write_u32_le(writer, self.locktime)?;
        Ok(len)
    }

    /// The transaction ID: SHA-256d over the legacy serialization.
    pub fn txid(&self) -> Txid {
        let mut w = Hash256Writer::default();
        self.write_legacy_to(&mut w)
            .expect("no IOError from hashing");
        w.finish_marked()
    }

    /// The witness transaction ID: SHA-256d over the witness serialization.
    /// Equal to `txid()` for transactions without witness data.
    pub fn wtxid(&self) -> Wtxid {
        let mut w = Hash256Writer::default();
        if self.has_witness() {
            self.write_witness_to(&mut w)
                .expect("no IOError from hashing");
        } else {
            self.write_legacy_to(&mut w)
                .expect("no IOError from hashing");
        }
        w.finish_marked()
    }

    /// The absolute byte offset of the first input's scriptSig content
    /// (past its CompactSize length prefix) within the requested
    /// serialization form.
    pub fn script_sig_offset(&self, with_witness: bool) -> TxResult<usize> {
        let first = self.vin.first().ok_or(TxError::NoInputs)?;
        let mut offset = 4usize; // version
        if with_witness {
            offset += 2; // marker + flag
        }
        offset += ser::prefix_byte_len(self.vin.len() as u64) as usize;
        offset += 36; // outpoint
        offset += ser::prefix_byte_len(first.script_sig.len() as u64) as usize;
        Ok(offset)
    }
}

impl ByteFormat for Tx {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        let mut len = 4; // version
        len += ser::prefix_byte_len(self.vin.len() as u64) as usize;
        len += self.vin.serialized_length();
        len += ser::prefix_byte_len(self.vout.len() as u64) as usize;
        len += self.vout.serialized_length();
        if self.has_witness() {
            len += 2; // marker + flag
            for i in 0..self.vin.len() {
                match self.witnesses.get(i) {
                    Some(wit) => {
                        len += ser::prefix_byte_len(wit.len() as u64) as usize;
                        len += wit.serialized_length();
                    }
                    None => len += 1,
                }
            }
        }
        len += 4; // locktime
        len
    }

    fn read_from<R>(reader: &mut R, _limit: usize) -> Result<Self, Self::Error>
    where
        R: Read,
        Self: std::marker::Sized,
    {
        let version = Self::read_u32_le(reader)?;
        let mut first = [0u8; 1];
        reader.read_exact(&mut first)?;
        if first[0] == 0 {
            // Segwit marker: a legacy tx cannot have a zero input count.
            let mut flag = [0u8; 1];
            reader.read_exact(&mut flag)?;
            if flag[0] != 1 {
                return Err(TxError::BadWitnessFlag(flag[0]));
            }
            let vin: Vec<TxIn> = Self::read_prefix_vec(reader)?;
            let vout: Vec<TxOut> = Self::read_prefix_vec(reader)?;
            let mut witnesses: Vec<Witness> = Vec::with_capacity(vin.len());
            for _ in vin.iter() {
                let wit: Vec<WitnessStackItem> = Self::read_prefix_vec(reader)?;
                witnesses.push(wit);
            }
            let locktime = Self::read_u32_le(reader)?;
            Ok(Self {
                version,
                vin,
                vout,
                witnesses,
                locktime,
            })
        } else {
            let n_vin = ser::read_compact_int_tail(reader, first[0])?;
            let mut vin = vec![];
            for _ in 0..n_vin {
                vin.push(TxIn::read_from(reader, 0)?);
            }
            let vout: Vec<TxOut> = Self::read_prefix_vec(reader)?;
            let locktime = Self::read_u32_le(reader)?;
            Ok(Self {
                version,
                vin,
                vout,
                witnesses: vec![],
                locktime,
            })
        }
    }

    fn write_to<W>(&self, writer: &mut W) -> Result<usize, Self::Error>
    where
        W: Write,
    {
        if self.has_witness() {
            self.write_witness_to(writer)
        } else {
            self.write_legacy_to(writer)
        }
    }
}
