//! Error type for engine operations.

use thiserror::Error;

use crate::types::CallState;

/// Errors reported by engine control operations.
///
/// Every variant is recoverable from the caller's point of view: the
/// daemon converts them into textual `Error` responses and carries on.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced call does not exist (or no longer exists).
    #[error("call not found")]
    CallNotFound,

    /// The referenced proxy does not exist.
    #[error("proxy not found")]
    ProxyNotFound,

    /// The referenced audio stream does not exist.
    #[error("audio stream not found")]
    StreamNotFound,

    /// The referenced codec does not exist.
    #[error("codec not found")]
    CodecNotFound,

    /// A SIP address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The operation is not permitted in the call's current state.
    #[error("operation not allowed in state {state}")]
    InvalidState {
        /// The call's state at the time of the attempt.
        state: CallState,
    },

    /// The engine rejected the operation for another reason.
    #[error("{0}")]
    Rejected(String),
}
