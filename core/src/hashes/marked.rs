//! Marker traits for digests and digest writers.

use std::io::Write;

/// A marker trait for 32-byte digest types. Digests expose their bytes for
/// serialization and in-place reversal between the internal (little-endian)
/// and display (big-endian) conventions.
pub trait Digest: Copy + Default + AsRef<[u8]> + AsMut<[u8]> {}

/// A marked digest is a newtype wrapping a raw digest in order to distinguish
/// TXIDs from WTXIDs from block hashes at the type level.
pub trait MarkedDigest: Copy + Default {
    /// The underlying digest type.
    type Digest: Digest;

    /// Wrap a raw digest in the marked newtype.
    fn new(hash: Self::Digest) -> Self;

    /// Return the raw digest.
    fn internal(&self) -> Self::Digest;

    /// Return the digest bytes as a vector.
    fn bytes(&self) -> Vec<u8>;

    /// Return a copy with the byte order reversed. Hex display uses the
    /// reversed (big-endian) order; wire serialization and map keys use the
    /// internal order.
    fn reversed(&self) -> Self {
        let mut digest = self.internal();
        digest.as_mut().reverse();
        Self::new(digest)
    }
}

/// A `Write`-implementing hasher that can finalize into a raw or marked digest.
pub trait MarkedDigestWriter<D: Digest>: Default + Write {
    /// Consume the writer and produce the digest.
    fn finish(self) -> D;

    /// Consume the writer and produce a marked digest.
    fn finish_marked<M: MarkedDigest<Digest = D>>(self) -> M
    where
        Self: Sized,
    {
        M::new(self.finish())
    }
}
