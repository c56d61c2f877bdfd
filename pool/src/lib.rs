//! Block-template assembly for Bitcoin-family proof-of-work pools.
//!
//! Given a node-supplied `getblocktemplate` payload and pool configuration,
//! this crate selects transactions under the configured cap, builds the
//! coinbase with reserved extranonce offsets, computes the merkle path and
//! witness commitment, and binds it all into a [`work::Work`] that the
//! stratum front-end notifies miners from and rebuilds submitted blocks
//! with.
//!
//! Everything here is CPU-bound and synchronous; a `Work` is owned by a
//! single session thread and discarded when a fresh template arrives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod coinbase;
pub mod config;
pub mod error;
pub mod fanin;
pub mod merkle;
pub mod select;
pub mod stratum;
pub mod template;
pub mod work;

pub use coinbase::*;
pub use config::*;
pub use error::*;
pub use select::*;
pub use stratum::*;
pub use template::*;
pub use work::*;
