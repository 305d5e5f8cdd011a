//! Client-facing transports.
//!
//! Two ways to talk to a running daemon: an interactive line-oriented
//! session on stdin/stdout, and a single-client unix socket carrying
//! NUL-delimited requests. Both funnel every request line through
//! [`Daemon::handle_line`](crate::daemon::Daemon::handle_line).

pub mod interactive;
#[cfg(unix)]
pub mod pipe;
