//! Assembly errors. Nothing here is retried internally: a bad template or a
//! bad submission is surfaced to the caller and the work stays unready.

use smelter_chains::{enc::EncodingError, types::tx::TxError};
use smelter_core::ser::SerError;
use thiserror::Error;

/// Errors raised while loading a template or preparing a submission.
#[derive(Debug, Error)]
pub enum WorkError {
    /// A required template field is missing or has the wrong type.
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    /// A template transaction failed to decode, or left trailing bytes.
    #[error("Malformed transaction at template index {index}: {reason}")]
    MalformedTransaction {
        /// Index into the template's transaction array.
        index: usize,
        /// Decode failure detail.
        reason: String,
    },

    /// SegWit is active but the witness commitment could not be computed.
    #[error("Witness commitment computation failed: {0}")]
    WitnessComputationFailed(String),

    /// The configured mining address does not decode to the chain's
    /// 20-byte address type.
    #[error("Mining address does not fit the chain address type: {0}")]
    AddressMismatch(#[from] EncodingError),

    /// A submission's extranonce does not fill the reserved region.
    #[error("Extranonce must be {want} bytes, got {got}")]
    ExtraNonceSize {
        /// Bytes supplied by the worker.
        got: usize,
        /// The reserved region size.
        want: usize,
    },

    /// The coinbase scriptSig would exceed the consensus limit.
    #[error("Coinbase scriptSig is {got} bytes, limit is {max}")]
    ScriptSigOverflow {
        /// Computed scriptSig size.
        got: usize,
        /// The consensus limit.
        max: usize,
    },

    /// The operation requires a loaded work.
    #[error("Work is not ready: {0}")]
    NotReady(&'static str),

    /// Transaction codec error.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// Serialization error.
    #[error(transparent)]
    Ser(#[from] SerError),
}

/// Type alias for assembly results.
pub type WorkResult<T> = Result<T, WorkError>;
