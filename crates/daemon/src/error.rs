//! Error type for daemon start-up and transport failures.
//!
//! Steady-state failures (unknown commands, missing handles, malformed
//! arguments, rejected engine calls) are never `Err` values: they are
//! converted to textual `Error` responses at the handler boundary. The
//! variants here cover only what can go wrong outside that cycle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort daemon start-up or a transport loop.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Binding the control socket failed.
    #[error("failed to bind control socket {path}: {source}")]
    Bind {
        /// The socket path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// I/O failure on standard input/output or thread spawning.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
