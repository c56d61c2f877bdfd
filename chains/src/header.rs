//! The 80-byte block header.

use std::io::{Read, Write};

use smelter_core::{
    hashes::Hash256Digest,
    ser::{ByteFormat, SerError, SerResult},
};

use crate::hashes::BlockHash;

/// A block header. Serialized little-endian into exactly 80 bytes; the
/// proof-of-work and display hashes are computed over that serialization.
#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct BlockHeader {
    /// Block version, with any BIP-9 / version-rolling bits.
    pub version: u32,
    /// The previous block's hash, internal byte order.
    pub prev_block: BlockHash,
    /// The merkle root over the block's txids. Left null by the template
    /// loader; each submitted share recomputes it from the mutated coinbase.
    pub merkle_root: Hash256Digest,
    /// Block timestamp (Unix seconds).
    pub time: u32,
    /// Compact difficulty target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialize into the fixed 80-byte buffer miners hash.
    pub fn as_bytes(&self) -> [u8; 80] {
        let mut buf = [0u8; 80];
        buf[0..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..36].copy_from_slice(self.prev_block.as_ref());
        buf[36..68].copy_from_slice(self.merkle_root.as_ref());
        buf[68..72].copy_from_slice(&self.time.to_le_bytes());
        buf[72..76].copy_from_slice(&self.bits.to_le_bytes());
        buf[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        buf
    }
}

impl ByteFormat for BlockHeader {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        80
    }

    fn read_from<R>(reader: &mut R, _limit: usize) -> SerResult<Self>
    where
        R: Read,
        Self: std::marker::Sized,
    {
        Ok(BlockHeader {
            version: Self::read_u32_le(reader)?,
            prev_block: BlockHash::read_from(reader, 0)?,
            merkle_root: Hash256Digest::read_from(reader, 0)?,
            time: Self::read_u32_le(reader)?,
            bits: Self::read_u32_le(reader)?,
            nonce: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> SerResult<usize>
    where
        W: Write,
    {
        Ok(writer.write(&self.as_bytes())?)
    }
}
