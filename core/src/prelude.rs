//! Re-exports of common traits.
pub use crate::{
    hashes::{Hash256Digest, MarkedDigest, MarkedDigestWriter},
    ser::ByteFormat,
};
