//! The scrypt proof-of-work digest used by Litecoin-lineage chains.
//!
//! Consensus hashes the 80-byte header with scrypt(N=1024, r=1, p=1),
//! using the header itself as the salt. Display hashes and merkle hashing
//! remain double-SHA-256 on those chains.

use scrypt::Params;

use crate::hashes::hash256::Hash256Digest;

/// scrypt(N=1024, r=1, p=1, dkLen=32) with `data` as both password and salt.
pub fn scrypt_1024_pow(data: &[u8]) -> Hash256Digest {
    // log2(1024) = 10; parameters are fixed by consensus
    let params = Params::new(10, 1, 1, 32).expect("consensus scrypt params are valid");
    let mut output = [0u8; 32];
    scrypt::scrypt(data, data, &params, &mut output).expect("32-byte output is valid");
    Hash256Digest(output)
}
