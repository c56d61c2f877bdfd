//! This module holds the `MarkedDigest` types used throughout block assembly:
//! `Txid`s, `Wtxid`s, and block hashes.

use smelter_core::hashes::Hash256Digest;
use smelter_core::mark_32_byte_hash;

mark_32_byte_hash!(
    /// A marked Hash256Digest representing transaction IDs
    Txid,
    Hash256Digest
);
mark_32_byte_hash!(
    /// A marked Hash256Digest representing witness transaction IDs
    Wtxid,
    Hash256Digest
);
mark_32_byte_hash!(
    /// A marked Hash256Digest representing block hashes
    BlockHash,
    Hash256Digest
);

#[cfg(test)]
mod test {
    use super::*;
    use smelter_core::ser::ByteFormat;

    #[test]
    fn it_serializes_and_deserializes_txids() {
        let cases = [(
            Txid::default(),
            "0000000000000000000000000000000000000000000000000000000000000000",
        )];
        for case in cases.iter() {
            let digest = Txid::deserialize_hex(case.1).unwrap();
            assert_eq!(digest.serialized_length(), 32);
            assert_eq!(digest, case.0);
            assert_eq!(digest.serialize_hex().unwrap(), case.1);
        }
    }

    #[test]
    fn it_converts_between_be_and_le_hex() {
        let be = "00000000000000000000d4b698cbfcf2e6b01e8e5eb51c6b7b16bbe2eb45c00a";
        let txid = Txid::from_be_hex(be).unwrap();
        assert_eq!(txid.to_be_hex(), be);
        assert_eq!(AsRef::<[u8; 32]>::as_ref(&txid)[0], 0x0a);
    }
}
