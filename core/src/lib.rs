//! Byte-exact serialization and digest tooling shared by every chain the
//! smelter block assembler serves.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[doc(hidden)]
pub use hex;

#[macro_use]
pub mod macros;

pub mod hashes;
pub mod ser;

pub mod prelude;

pub use hashes::*;
pub use ser::*;
