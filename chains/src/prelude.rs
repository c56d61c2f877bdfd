//! Re-exports of common traits and types.
pub use crate::{
    hashes::{BlockHash, Txid, Wtxid},
    header::BlockHeader,
    nets::Chain,
    types::{Outpoint, ScriptPubkey, ScriptSig, Tx, TxIn, TxOut, Witness, WitnessStackItem},
};
pub use smelter_core::prelude::*;
