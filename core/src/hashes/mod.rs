//! Holds utilities for working with cryptographic digests, and disambiguating digests via marker
//! traits.
//!
//! We want to wrap hashes in marked newtypes in order to prevent type-confusion between TXIDs,
//! block hashes, and other digests with the same length.

/// Marked hashes
pub mod marked;

/// Tooling for bitcoin-style double-sha2
pub mod hash256;

/// Tooling for the scrypt proof-of-work digest
pub mod scrypt1024;

pub use hash256::*;
pub use marked::*;
pub use scrypt1024::*;
