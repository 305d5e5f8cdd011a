//! Engine facade for the voipd control daemon
//!
//! This crate defines the public interface of the VoIP engine that the
//! daemon drives: call setup and teardown, registration, codec
//! configuration, raw audio streaming, and the event stream the engine
//! produces while its internal state machine advances.
//!
//! The daemon itself never depends on a concrete engine. Everything it
//! does goes through the [`Engine`] trait, which models the engine as a
//! synchronous, non-blocking control surface pumped by a periodic call to
//! [`Engine::iterate`]. Events (call state transitions, statistics
//! updates, received DTMF) are produced synchronously from within the
//! pump, never from an unrelated thread.
//!
//! # Provided implementation
//!
//! [`SoftEngine`] is a deterministic in-process simulation of a VoIP
//! engine. It is what the `voipd` binary runs against and what the
//! daemon's integration tests script via [`SoftEngineController`]:
//!
//! ```rust
//! use voipd_engine_core::{Engine, SoftEngine, SoftEngineConfig};
//!
//! let (mut engine, controller) = SoftEngine::new(SoftEngineConfig::default());
//! let id = engine.invite("sip:bob@example.org").unwrap();
//!
//! // The remote side is scripted through the controller.
//! controller.remote_accept(id).unwrap();
//! let events = engine.iterate();
//! assert!(!events.is_empty());
//! ```

mod engine;
mod error;
mod soft;
mod types;

pub use engine::Engine;
pub use error::EngineError;
pub use soft::{SoftEngine, SoftEngineConfig, SoftEngineController};
pub use types::{
    AuthInfo, CallDirection, CallId, CallInfo, CallState, CodecInfo, EngineEvent, FirewallPolicy,
    MediaEncryption, ProxyConfig, ProxyId, ProxyInfo, RegistrationState, RtpStats, StreamId,
    StreamStatsEvent,
};
