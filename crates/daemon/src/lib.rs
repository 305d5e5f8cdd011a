//! Text-protocol control daemon for a telephony engine.
//!
//! The daemon exposes an engine implementing
//! [`voipd_engine_core::Engine`] over a line-oriented command protocol:
//! a client sends one command per line (`call sip:bob@example.org`,
//! `answer 2`, `pop-event`) and receives a structured textual response
//! beginning with `Status: Ok` or `Status: Error`. Asynchronous engine
//! activity (call state changes, DTMF, stream statistics) is queued as
//! rendered events that clients drain with `pop-event`.
//!
//! Two transports are provided: an interactive stdin/stdout session and,
//! on Unix, a single-client socket carrying NUL-delimited requests. A
//! background thread pumps the engine continuously in both modes.
//!
//! ```
//! use voipd_daemon::Daemon;
//! use voipd_daemon::protocol::Status;
//! use voipd_engine_core::{SoftEngine, SoftEngineConfig};
//!
//! let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
//! let mut daemon = Daemon::start(Box::new(engine), false).unwrap();
//! let response = daemon.handle_line("version");
//! assert_eq!(response.status(), Status::Ok);
//! daemon.shutdown();
//! ```

pub mod commands;
pub mod core;
mod daemon;
pub mod error;
pub mod events;
mod iterate;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use daemon::Daemon;
pub use error::DaemonError;
