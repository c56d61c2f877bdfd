//! Bitcoin-style double-SHA-256 and the raw 32-byte digest it produces.

use sha2::{Digest as Sha2Digest, Sha256};
use std::io::{Read, Result as IOResult, Write};

use crate::{
    hashes::marked::{Digest, MarkedDigestWriter},
    ser::{ByteFormat, SerError, SerResult},
};

/// A 32-byte digest in the internal (little-endian) byte order. The all-zero
/// digest is the null value, used as the coinbase outpoint txid and as the
/// coinbase wtxid placeholder in the witness tree.
#[derive(
    serde::Serialize, serde::Deserialize, Copy, Clone, Default, Debug, Eq, PartialEq, Hash,
)]
pub struct Hash256Digest(pub [u8; 32]);

impl Hash256Digest {
    /// True if every byte is zero.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Return a copy with the byte order reversed.
    pub fn reversed(&self) -> Self {
        let mut buf = self.0;
        buf.reverse();
        Self(buf)
    }
}

impl Digest for Hash256Digest {}

impl AsRef<[u8]> for Hash256Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Hash256Digest {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<[u8; 32]> for Hash256Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl ByteFormat for Hash256Digest {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        32
    }

    fn read_from<R>(reader: &mut R, _limit: usize) -> SerResult<Self>
    where
        R: Read,
        Self: std::marker::Sized,
    {
        let mut buf = Hash256Digest::default();
        reader.read_exact(buf.as_mut())?;
        Ok(buf)
    }

    fn write_to<W>(&self, writer: &mut W) -> SerResult<usize>
    where
        W: Write,
    {
        Ok(writer.write(self.as_ref())?)
    }
}

/// A struct that exposes a Bitcoin-style Hash256 `Write` interface by wrapping
/// an internal SHA2 instance.
#[derive(Default)]
pub struct Hash256Writer {
    internal: Sha256,
}

impl Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

impl MarkedDigestWriter<Hash256Digest> for Hash256Writer {
    fn finish(self) -> Hash256Digest {
        let first = self.internal.finalize();
        let second = Sha256::digest(first);
        let mut digest = Hash256Digest::default();
        digest.as_mut().copy_from_slice(&second[..]);
        digest
    }
}

/// One-shot double-SHA-256.
pub fn hash256(data: &[u8]) -> Hash256Digest {
    let mut w = Hash256Writer::default();
    // Writing to a hasher does not error
    let _ = w.write(data);
    w.finish()
}
