//! Holds Bitcoin-family wire types: scripts, witnesses, inputs, outputs, and
//! transactions in their legacy and witness serializations.

pub mod script;
pub mod tx;
pub mod txin;
pub mod txout;

pub use script::*;
pub use tx::*;
pub use txin::*;
pub use txout::*;
