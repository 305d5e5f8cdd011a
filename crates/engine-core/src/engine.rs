//! The `Engine` trait: the control surface the daemon drives.

use std::net::SocketAddr;

use crate::error::EngineError;
use crate::types::{
    AuthInfo, CallId, CallInfo, CodecInfo, EngineEvent, FirewallPolicy, MediaEncryption,
    ProxyConfig, ProxyId, ProxyInfo, RtpStats, StreamId, StreamStatsEvent,
};

/// Synchronous control interface of a VoIP engine.
///
/// Every method is a non-blocking control operation: it issues or queries
/// something and returns immediately. Long-running work (call setup,
/// registration) completes asynchronously and is reported through the
/// events returned by [`iterate`](Engine::iterate).
///
/// The daemon calls all of these while holding its single shared mutex,
/// so implementations must never wait on the network or sleep.
pub trait Engine: Send {
    /// Engine version string, reported by the `version` command.
    fn version(&self) -> String;

    /// Advance the engine's internal state machine by one step.
    ///
    /// Returns the events produced during this step, in emission order.
    /// This is the only place events are ever produced; callbacks in the
    /// traditional sense do not exist at this boundary.
    fn iterate(&mut self) -> Vec<EngineEvent>;

    // ---- Calls ----

    /// Place an outgoing call to `uri`. Completion is reported as events.
    fn invite(&mut self, uri: &str) -> Result<CallId, EngineError>;

    /// Accept an incoming call.
    fn accept_call(&mut self, id: CallId) -> Result<(), EngineError>;

    /// Terminate a call in any state.
    fn terminate_call(&mut self, id: CallId) -> Result<(), EngineError>;

    /// Terminate every live call.
    fn terminate_all_calls(&mut self);

    /// Put a connected call on hold.
    fn pause_call(&mut self, id: CallId) -> Result<(), EngineError>;

    /// Resume a call previously paused by this side.
    fn resume_call(&mut self, id: CallId) -> Result<(), EngineError>;

    /// Send a DTMF digit on a connected call.
    fn send_dtmf(&mut self, id: CallId, digit: char) -> Result<(), EngineError>;

    /// The engine's live call list, in creation order.
    fn calls(&self) -> Vec<CallId>;

    /// Snapshot of one call, if it is still live.
    fn call_info(&self, id: CallId) -> Option<CallInfo>;

    /// Current RTP statistics of one call.
    fn call_stats(&self, id: CallId) -> Option<RtpStats>;

    /// The call currently in focus (most recently active), if any.
    fn current_call(&self) -> Option<CallId>;

    // ---- Registration ----

    /// Create a proxy configuration; registration starts immediately when
    /// `config.register` is set.
    fn add_proxy(&mut self, config: ProxyConfig) -> Result<ProxyId, EngineError>;

    /// Remove a proxy, unregistering first if needed.
    fn remove_proxy(&mut self, id: ProxyId) -> Result<(), EngineError>;

    /// The engine's proxy list, in creation order.
    fn proxies(&self) -> Vec<ProxyId>;

    /// Snapshot of one proxy.
    fn proxy_info(&self, id: ProxyId) -> Option<ProxyInfo>;

    /// Re-issue REGISTER on every registering proxy.
    fn refresh_registers(&mut self);

    // ---- Authentication ----

    /// Add credentials to the engine's auth store.
    fn add_auth_info(&mut self, info: AuthInfo);

    /// Current auth store contents, in insertion order.
    fn auth_infos(&self) -> Vec<AuthInfo>;

    /// Remove the auth entry at `index` (0-based).
    fn clear_auth_info(&mut self, index: usize) -> Result<(), EngineError>;

    /// Empty the auth store.
    fn clear_all_auth_info(&mut self);

    // ---- Codecs ----

    /// The engine's audio codec table, in priority order.
    fn audio_codecs(&self) -> Vec<CodecInfo>;

    /// Enable or disable the codec at `index` (0-based).
    fn enable_audio_codec(&mut self, index: usize, enabled: bool) -> Result<(), EngineError>;

    /// Preferred packetization time in milliseconds.
    fn ptime(&self) -> u32;

    /// Set the preferred packetization time.
    fn set_ptime(&mut self, ms: u32);

    // ---- Standalone audio streams ----

    /// Start an RTP audio stream to `remote` with the given payload type.
    fn start_audio_stream(
        &mut self,
        remote: SocketAddr,
        payload_type: u8,
    ) -> Result<StreamId, EngineError>;

    /// Stop a running audio stream.
    fn stop_audio_stream(&mut self, id: StreamId) -> Result<(), EngineError>;

    /// Drain the stream's private statistics queue.
    ///
    /// Items accumulate while the engine pumps; the daemon drains them on
    /// every iteration tick.
    fn poll_stream_stats(&mut self, id: StreamId) -> Vec<StreamStatsEvent>;

    // ---- Settings ----

    /// Mute or unmute the microphone.
    fn mute_mic(&mut self, muted: bool);

    /// Whether the microphone is muted.
    fn mic_muted(&self) -> bool;

    /// The primary contact address presented in signaling.
    fn primary_contact(&self) -> String;

    /// Set the primary contact address.
    fn set_primary_contact(&mut self, uri: &str) -> Result<(), EngineError>;

    /// Whether IPv6 support is enabled.
    fn ipv6_enabled(&self) -> bool;

    /// Enable or disable IPv6 support.
    fn enable_ipv6(&mut self, enabled: bool);

    /// Current media encryption policy.
    fn media_encryption(&self) -> MediaEncryption;

    /// Set the media encryption policy.
    fn set_media_encryption(&mut self, encryption: MediaEncryption) -> Result<(), EngineError>;

    /// Current NAT traversal policy.
    fn firewall_policy(&self) -> FirewallPolicy;

    /// Set the NAT traversal policy.
    fn set_firewall_policy(&mut self, policy: FirewallPolicy);
}
