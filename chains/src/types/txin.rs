//! Outpoint, TxIn, and Vin types.

use std::io::{Read, Write};

use smelter_core::ser::{ByteFormat, SerError, SerResult};

use crate::{hashes::Txid, types::script::ScriptSig};

/// An Outpoint. This is a unique identifier for a UTXO, and is composed of a
/// transaction ID (in internal LE format), and the index of the output being
/// spent within that transaction's output vector.
///
/// `Outpoint::null()` and `Outpoint::default()` return the null Outpoint,
/// which references a txid of all 0, and an index of 0xffff_ffff. The null
/// outpoint is used in every coinbase transaction.
#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Outpoint {
    /// The txid that created the UTXO being pointed to.
    pub txid: Txid,
    /// The index of that UTXO in the transaction's output vector.
    pub idx: u32,
}

impl Outpoint {
    /// Returns a new Outpoint from a digest and index.
    pub fn new(txid: Txid, idx: u32) -> Self {
        Self { txid, idx }
    }

    /// Returns the `default`, or `null` Outpoint. This is used in the coinbase input.
    pub fn null() -> Self {
        Outpoint {
            txid: Txid::default(),
            idx: 0xffff_ffff,
        }
    }
}

impl Default for Outpoint {
    fn default() -> Self {
        Outpoint::null()
    }
}

impl ByteFormat for Outpoint {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        36
    }

    fn read_from<T>(reader: &mut T, _limit: usize) -> SerResult<Self>
    where
        T: Read,
        Self: std::marker::Sized,
    {
        Ok(Outpoint {
            txid: Txid::read_from(reader, 0)?,
            idx: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<T>(&self, writer: &mut T) -> SerResult<usize>
    where
        T: Write,
    {
        let mut len = self.txid.write_to(writer)?;
        len += Self::write_u32_le(writer, self.idx)?;
        Ok(len)
    }
}

/// A transaction input. Contains an outpoint referencing an existing UTXO, a
/// `script_sig` carrying spend authorization (or, in a coinbase, the height
/// push, pool tag, and extranonce bytes), and a sequence number.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Eq, PartialEq, Default)]
pub struct TxIn {
    /// The Outpoint identifying the UTXO being spent.
    pub outpoint: Outpoint,
    /// The authorization information necessary to spend the UTXO.
    pub script_sig: ScriptSig,
    /// The nSequence field.
    pub sequence: u32,
}

impl TxIn {
    /// Instantiate a new TxIn.
    pub fn new<T>(outpoint: Outpoint, script_sig: T, sequence: u32) -> Self
    where
        T: Into<ScriptSig>,
    {
        TxIn {
            outpoint,
            script_sig: script_sig.into(),
            sequence,
        }
    }
}

impl ByteFormat for TxIn {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        let mut len = self.outpoint.serialized_length();
        len += self.script_sig.serialized_length();
        len += 4; // sequence
        len
    }

    fn read_from<T>(reader: &mut T, _limit: usize) -> SerResult<Self>
    where
        T: Read,
        Self: std::marker::Sized,
    {
        Ok(TxIn {
            outpoint: Outpoint::read_from(reader, 0)?,
            script_sig: ScriptSig::read_from(reader, 0)?,
            sequence: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<T>(&self, writer: &mut T) -> SerResult<usize>
    where
        T: Write,
    {
        let mut len = self.outpoint.write_to(writer)?;
        len += self.script_sig.write_to(writer)?;
        len += Self::write_u32_le(writer, self.sequence)?;
        Ok(len)
    }
}

/// Vin is a type alias for `Vec<TxIn>`.
pub type Vin = Vec<TxIn>;
