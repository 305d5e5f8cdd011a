//! Deterministic in-process engine simulation
//!
//! `SoftEngine` implements [`Engine`] without touching the network. Call
//! setup, registration and stream statistics advance on pump ticks
//! according to fixed rules, which makes every scenario reproducible:
//! the same command sequence against the same configuration produces the
//! same event stream.
//!
//! The remote side of every call is scripted through
//! [`SoftEngineController`], a handle sharing state with the engine.
//! Tests use it to ring the daemon, answer, hang up, or inject statistics
//! reports at exact points in a scenario.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::types::{
    AuthInfo, CallDirection, CallId, CallInfo, CallState, CodecInfo, EngineEvent, FirewallPolicy,
    MediaEncryption, ProxyConfig, ProxyId, ProxyInfo, RegistrationState, RtpStats, StreamId,
    StreamStatsEvent,
};

/// Tuning knobs for the simulation.
#[derive(Debug, Clone)]
pub struct SoftEngineConfig {
    /// Version string reported by the `version` command.
    pub version: String,
    /// Ticks spent ringing before the simulated remote answers an
    /// outgoing call; `None` leaves the call ringing until the
    /// controller intervenes.
    pub answer_after: Option<u32>,
    /// Ticks between periodic call statistics refreshes.
    pub stats_interval: u32,
    /// Ticks between RTCP receiver/sender reports on audio streams.
    pub report_interval: u32,
    /// Ticks a terminated call stays visible in the live list.
    pub linger_ticks: u32,
}

impl Default for SoftEngineConfig {
    fn default() -> Self {
        Self {
            version: format!("voipd-soft/{}", env!("CARGO_PKG_VERSION")),
            answer_after: Some(3),
            stats_interval: 25,
            report_interval: 50,
            linger_ticks: 2,
        }
    }
}

/// Per-tick media simulation constants: 50 packets of 160 payload bytes
/// approximates 20 ms PCMU packetization over one second of media.
const PACKETS_PER_TICK: u64 = 50;
const BYTES_PER_PACKET: u64 = 160;

struct SimCall {
    info: CallInfo,
    ticks_in_state: u32,
    linger: u32,
    stats: RtpStats,
}

struct SimProxy {
    info: ProxyInfo,
    ticks_in_state: u32,
}

struct SimStream {
    id: StreamId,
    #[allow(dead_code)]
    remote: SocketAddr,
    #[allow(dead_code)]
    payload_type: u8,
    ticks: u32,
    stats: RtpStats,
    queue: VecDeque<StreamStatsEvent>,
}

struct SoftState {
    config: SoftEngineConfig,
    calls: Vec<SimCall>,
    proxies: Vec<SimProxy>,
    auth: Vec<AuthInfo>,
    codecs: Vec<CodecInfo>,
    streams: Vec<SimStream>,
    ptime: u32,
    mic_muted: bool,
    contact: String,
    ipv6: bool,
    encryption: MediaEncryption,
    firewall: FirewallPolicy,
    // Events staged by control operations, delivered at the next pump.
    pending: Vec<EngineEvent>,
}

impl SoftState {
    fn call_mut(&mut self, id: CallId) -> Result<&mut SimCall, EngineError> {
        self.calls
            .iter_mut()
            .find(|c| c.info.id == id)
            .ok_or(EngineError::CallNotFound)
    }

    fn set_call_state(&mut self, id: CallId, state: CallState, message: Option<String>) {
        if let Some(call) = self.calls.iter_mut().find(|c| c.info.id == id) {
            call.info.state = state;
            call.ticks_in_state = 0;
            self.pending.push(EngineEvent::CallStateChanged { id, state, message });
        }
    }
}

fn default_codecs() -> Vec<CodecInfo> {
    let table: [(&str, u32, u8, u8, bool); 6] = [
        ("PCMU", 8000, 1, 0, true),
        ("PCMA", 8000, 1, 8, true),
        ("G722", 8000, 1, 9, true),
        ("opus", 48000, 2, 96, true),
        ("speex", 16000, 1, 97, false),
        ("telephone-event", 8000, 1, 101, true),
    ];
    table
        .into_iter()
        .map(|(mime, clock_rate, channels, payload_type, enabled)| CodecInfo {
            mime: mime.to_string(),
            clock_rate,
            channels,
            payload_type,
            enabled,
        })
        .collect()
}

/// Normalize a dialed address the way the engine's URL interpreter does:
/// bare `user@host` gains a `sip:` scheme.
fn interpret_uri(uri: &str) -> Result<String, EngineError> {
    let uri = uri.trim();
    if uri.is_empty() || uri.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidAddress(uri.to_string()));
    }
    if uri.starts_with("sip:") || uri.starts_with("sips:") {
        Ok(uri.to_string())
    } else {
        Ok(format!("sip:{uri}"))
    }
}

/// Deterministic simulated VoIP engine.
///
/// See the [module documentation](self) for the simulation rules.
pub struct SoftEngine {
    state: Arc<Mutex<SoftState>>,
}

/// Scripting handle for the remote side of [`SoftEngine`] scenarios.
///
/// Cloneable; all clones share the engine's state.
#[derive(Clone)]
pub struct SoftEngineController {
    state: Arc<Mutex<SoftState>>,
}

impl SoftEngine {
    /// Create an engine and its controller handle.
    pub fn new(config: SoftEngineConfig) -> (Self, SoftEngineController) {
        let state = Arc::new(Mutex::new(SoftState {
            config,
            calls: Vec::new(),
            proxies: Vec::new(),
            auth: Vec::new(),
            codecs: default_codecs(),
            streams: Vec::new(),
            ptime: 20,
            mic_muted: false,
            contact: "sip:voipd@localhost".to_string(),
            ipv6: false,
            encryption: MediaEncryption::None,
            firewall: FirewallPolicy::None,
            pending: Vec::new(),
        }));
        let controller = SoftEngineController {
            state: Arc::clone(&state),
        };
        (Self { state }, controller)
    }
}

impl SoftEngineController {
    /// Ring the engine with an incoming call from `remote_uri`.
    pub fn push_incoming_call(&self, remote_uri: &str) -> CallId {
        let id = Uuid::new_v4();
        let mut st = self.state.lock();
        st.calls.push(SimCall {
            info: CallInfo {
                id,
                direction: CallDirection::Incoming,
                remote_uri: remote_uri.to_string(),
                state: CallState::IncomingReceived,
                started_at: Utc::now(),
            },
            ticks_in_state: 0,
            linger: 0,
            stats: RtpStats::default(),
        });
        st.pending.push(EngineEvent::CallStateChanged {
            id,
            state: CallState::IncomingReceived,
            message: None,
        });
        id
    }

    /// Make the remote party answer an outgoing call.
    pub fn remote_accept(&self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::OutgoingInit | CallState::OutgoingProgress | CallState::OutgoingRinging => {
                st.set_call_state(id, CallState::Connected, None);
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    /// Make the remote party hang up.
    pub fn remote_hangup(&self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        if !call.info.state.is_active() {
            return Err(EngineError::InvalidState {
                state: call.info.state,
            });
        }
        st.set_call_state(id, CallState::Terminated, Some("Remote hangup".to_string()));
        Ok(())
    }

    /// Make the remote party put the call on hold.
    pub fn remote_pause(&self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::Connected => {
                st.set_call_state(id, CallState::PausedByRemote, None);
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    /// Deliver a DTMF digit from the remote party.
    pub fn inject_dtmf(&self, id: CallId, digit: char) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        st.call_mut(id)?;
        st.pending.push(EngineEvent::DtmfReceived { id, digit });
        Ok(())
    }

    /// Deliver a call statistics update with an explicit periodic flag.
    pub fn inject_call_stats(
        &self,
        id: CallId,
        stats: RtpStats,
        periodic: bool,
    ) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        st.call_mut(id)?;
        st.pending.push(EngineEvent::CallStatsUpdated { id, stats, periodic });
        Ok(())
    }

    /// Push an item onto an audio stream's statistics queue.
    pub fn inject_stream_event(
        &self,
        id: StreamId,
        event: StreamStatsEvent,
    ) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let stream = st
            .streams
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(EngineError::StreamNotFound)?;
        stream.queue.push_back(event);
        Ok(())
    }
}

impl Engine for SoftEngine {
    fn version(&self) -> String {
        self.state.lock().config.version.clone()
    }

    fn iterate(&mut self) -> Vec<EngineEvent> {
        let mut st = self.state.lock();
        let mut events = std::mem::take(&mut st.pending);
        let answer_after = st.config.answer_after;
        let stats_interval = st.config.stats_interval.max(1);
        let report_interval = st.config.report_interval.max(1);
        let linger_ticks = st.config.linger_ticks;

        // Advance every call by one tick.
        let mut transitions: Vec<(CallId, CallState)> = Vec::new();
        for call in &mut st.calls {
            call.ticks_in_state += 1;
            match call.info.state {
                CallState::OutgoingInit => {
                    transitions.push((call.info.id, CallState::OutgoingProgress));
                }
                CallState::OutgoingProgress => {
                    transitions.push((call.info.id, CallState::OutgoingRinging));
                }
                CallState::OutgoingRinging => {
                    if let Some(after) = answer_after {
                        if call.ticks_in_state >= after {
                            transitions.push((call.info.id, CallState::Connected));
                        }
                    }
                }
                CallState::Connected | CallState::Paused | CallState::PausedByRemote => {
                    call.stats.sent_packets += PACKETS_PER_TICK;
                    call.stats.sent_bytes += PACKETS_PER_TICK * BYTES_PER_PACKET;
                    if call.info.state == CallState::Connected {
                        call.stats.recv_packets += PACKETS_PER_TICK;
                        call.stats.recv_bytes += PACKETS_PER_TICK * BYTES_PER_PACKET;
                    }
                    call.stats.jitter_ms = 1.5;
                    call.stats.round_trip_ms = 30;
                    call.stats.download_bw_kbps = 64;
                    call.stats.upload_bw_kbps = 64;
                    if call.ticks_in_state % stats_interval == 0 {
                        events.push(EngineEvent::CallStatsUpdated {
                            id: call.info.id,
                            stats: call.stats.clone(),
                            periodic: true,
                        });
                    }
                }
                CallState::IncomingReceived => {}
                CallState::Terminated | CallState::Error => {
                    call.linger += 1;
                }
            }
        }
        for (id, state) in transitions {
            if let Some(call) = st.calls.iter_mut().find(|c| c.info.id == id) {
                call.info.state = state;
                call.ticks_in_state = 0;
            }
            events.push(EngineEvent::CallStateChanged { id, state, message: None });
        }
        // Drop calls whose linger period ended.
        st.calls
            .retain(|c| c.info.state.is_active() || c.linger <= linger_ticks);

        // Registrations complete one tick after they start.
        for proxy in &mut st.proxies {
            proxy.ticks_in_state += 1;
            if proxy.info.state == RegistrationState::Progress && proxy.ticks_in_state >= 1 {
                proxy.info.state = RegistrationState::Ok;
                proxy.ticks_in_state = 0;
            }
        }

        // Audio streams: one bandwidth measurement per tick, RTCP reports
        // every `report_interval` ticks.
        for stream in &mut st.streams {
            stream.ticks += 1;
            stream.stats.sent_packets += PACKETS_PER_TICK;
            stream.stats.sent_bytes += PACKETS_PER_TICK * BYTES_PER_PACKET;
            stream.stats.recv_packets += PACKETS_PER_TICK;
            stream.stats.recv_bytes += PACKETS_PER_TICK * BYTES_PER_PACKET;
            stream.stats.download_bw_kbps = 64;
            stream.stats.upload_bw_kbps = 64;
            stream
                .queue
                .push_back(StreamStatsEvent::BandwidthTick(stream.stats.clone()));
            if stream.ticks % report_interval == 0 {
                stream.stats.jitter_ms = 2.0;
                stream.stats.round_trip_ms = 25;
                stream
                    .queue
                    .push_back(StreamStatsEvent::ReceiverReport(stream.stats.clone()));
                stream
                    .queue
                    .push_back(StreamStatsEvent::SenderReport(stream.stats.clone()));
            }
        }

        events
    }

    fn invite(&mut self, uri: &str) -> Result<CallId, EngineError> {
        let remote_uri = interpret_uri(uri)?;
        let id = Uuid::new_v4();
        debug!(%id, %remote_uri, "placing outgoing call");
        let mut st = self.state.lock();
        st.calls.push(SimCall {
            info: CallInfo {
                id,
                direction: CallDirection::Outgoing,
                remote_uri,
                state: CallState::OutgoingInit,
                started_at: Utc::now(),
            },
            ticks_in_state: 0,
            linger: 0,
            stats: RtpStats::default(),
        });
        st.pending.push(EngineEvent::CallStateChanged {
            id,
            state: CallState::OutgoingInit,
            message: None,
        });
        Ok(id)
    }

    fn accept_call(&mut self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::IncomingReceived => {
                st.set_call_state(id, CallState::Connected, None);
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    fn terminate_call(&mut self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        if !call.info.state.is_active() {
            return Err(EngineError::InvalidState {
                state: call.info.state,
            });
        }
        st.set_call_state(id, CallState::Terminated, None);
        Ok(())
    }

    fn terminate_all_calls(&mut self) {
        let mut st = self.state.lock();
        let live: Vec<CallId> = st
            .calls
            .iter()
            .filter(|c| c.info.state.is_active())
            .map(|c| c.info.id)
            .collect();
        for id in live {
            st.set_call_state(id, CallState::Terminated, None);
        }
    }

    fn pause_call(&mut self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::Connected => {
                st.set_call_state(id, CallState::Paused, None);
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    fn resume_call(&mut self, id: CallId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::Paused => {
                st.set_call_state(id, CallState::Connected, None);
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    fn send_dtmf(&mut self, id: CallId, digit: char) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let call = st.call_mut(id)?;
        match call.info.state {
            CallState::Connected => {
                // The simulated remote echoes every digit back.
                st.pending.push(EngineEvent::DtmfReceived { id, digit });
                Ok(())
            }
            state => Err(EngineError::InvalidState { state }),
        }
    }

    fn calls(&self) -> Vec<CallId> {
        self.state.lock().calls.iter().map(|c| c.info.id).collect()
    }

    fn call_info(&self, id: CallId) -> Option<CallInfo> {
        self.state
            .lock()
            .calls
            .iter()
            .find(|c| c.info.id == id)
            .map(|c| c.info.clone())
    }

    fn call_stats(&self, id: CallId) -> Option<RtpStats> {
        self.state
            .lock()
            .calls
            .iter()
            .find(|c| c.info.id == id)
            .map(|c| c.stats.clone())
    }

    fn current_call(&self) -> Option<CallId> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find(|c| c.info.state.is_active())
            .map(|c| c.info.id)
    }

    fn add_proxy(&mut self, config: ProxyConfig) -> Result<ProxyId, EngineError> {
        interpret_uri(&config.server_uri)?;
        interpret_uri(&config.identity)?;
        let id = Uuid::new_v4();
        debug!(%id, server = %config.server_uri, "adding proxy");
        let state = if config.register {
            RegistrationState::Progress
        } else {
            RegistrationState::None
        };
        self.state.lock().proxies.push(SimProxy {
            info: ProxyInfo { id, config, state },
            ticks_in_state: 0,
        });
        Ok(id)
    }

    fn remove_proxy(&mut self, id: ProxyId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let before = st.proxies.len();
        st.proxies.retain(|p| p.info.id != id);
        if st.proxies.len() == before {
            return Err(EngineError::ProxyNotFound);
        }
        Ok(())
    }

    fn proxies(&self) -> Vec<ProxyId> {
        self.state.lock().proxies.iter().map(|p| p.info.id).collect()
    }

    fn proxy_info(&self, id: ProxyId) -> Option<ProxyInfo> {
        self.state
            .lock()
            .proxies
            .iter()
            .find(|p| p.info.id == id)
            .map(|p| p.info.clone())
    }

    fn refresh_registers(&mut self) {
        let mut st = self.state.lock();
        for proxy in &mut st.proxies {
            if proxy.info.config.register {
                proxy.info.state = RegistrationState::Progress;
                proxy.ticks_in_state = 0;
            }
        }
    }

    fn add_auth_info(&mut self, info: AuthInfo) {
        self.state.lock().auth.push(info);
    }

    fn auth_infos(&self) -> Vec<AuthInfo> {
        self.state.lock().auth.clone()
    }

    fn clear_auth_info(&mut self, index: usize) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        if index >= st.auth.len() {
            return Err(EngineError::Rejected(format!(
                "no auth info at index {index}"
            )));
        }
        st.auth.remove(index);
        Ok(())
    }

    fn clear_all_auth_info(&mut self) {
        self.state.lock().auth.clear();
    }

    fn audio_codecs(&self) -> Vec<CodecInfo> {
        self.state.lock().codecs.clone()
    }

    fn enable_audio_codec(&mut self, index: usize, enabled: bool) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let codec = st.codecs.get_mut(index).ok_or(EngineError::CodecNotFound)?;
        codec.enabled = enabled;
        Ok(())
    }

    fn ptime(&self) -> u32 {
        self.state.lock().ptime
    }

    fn set_ptime(&mut self, ms: u32) {
        self.state.lock().ptime = ms;
    }

    fn start_audio_stream(
        &mut self,
        remote: SocketAddr,
        payload_type: u8,
    ) -> Result<StreamId, EngineError> {
        let known = self
            .state
            .lock()
            .codecs
            .iter()
            .any(|c| c.payload_type == payload_type);
        if !known {
            return Err(EngineError::CodecNotFound);
        }
        let id = Uuid::new_v4();
        debug!(%id, %remote, payload_type, "starting audio stream");
        self.state.lock().streams.push(SimStream {
            id,
            remote,
            payload_type,
            ticks: 0,
            stats: RtpStats::default(),
            queue: VecDeque::new(),
        });
        Ok(id)
    }

    fn stop_audio_stream(&mut self, id: StreamId) -> Result<(), EngineError> {
        let mut st = self.state.lock();
        let before = st.streams.len();
        st.streams.retain(|s| s.id != id);
        if st.streams.len() == before {
            return Err(EngineError::StreamNotFound);
        }
        debug!(%id, "stopped audio stream");
        Ok(())
    }

    fn poll_stream_stats(&mut self, id: StreamId) -> Vec<StreamStatsEvent> {
        let mut st = self.state.lock();
        st.streams
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| s.queue.drain(..).collect())
            .unwrap_or_default()
    }

    fn mute_mic(&mut self, muted: bool) {
        self.state.lock().mic_muted = muted;
    }

    fn mic_muted(&self) -> bool {
        self.state.lock().mic_muted
    }

    fn primary_contact(&self) -> String {
        self.state.lock().contact.clone()
    }

    fn set_primary_contact(&mut self, uri: &str) -> Result<(), EngineError> {
        let contact = interpret_uri(uri)?;
        self.state.lock().contact = contact;
        Ok(())
    }

    fn ipv6_enabled(&self) -> bool {
        self.state.lock().ipv6
    }

    fn enable_ipv6(&mut self, enabled: bool) {
        self.state.lock().ipv6 = enabled;
    }

    fn media_encryption(&self) -> MediaEncryption {
        self.state.lock().encryption
    }

    fn set_media_encryption(&mut self, encryption: MediaEncryption) -> Result<(), EngineError> {
        self.state.lock().encryption = encryption;
        Ok(())
    }

    fn firewall_policy(&self) -> FirewallPolicy {
        self.state.lock().firewall.clone()
    }

    fn set_firewall_policy(&mut self, policy: FirewallPolicy) {
        self.state.lock().firewall = policy;
    }
}
