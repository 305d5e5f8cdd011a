//! Daemon core state shared between the command and iteration threads
//!
//! `DaemonCore` owns the engine handle, the resource registries, the
//! audio-stream table and the event queue. Exactly one instance exists
//! per daemon, always behind the daemon's single mutex: command handlers
//! mutate it for the duration of one dispatch, the iteration loop for the
//! duration of one pump-and-drain tick.

use std::collections::HashMap;

use tracing::{trace, warn};

use voipd_engine_core::{
    AuthInfo, CallId, Engine, EngineEvent, ProxyId, RtpStats, StreamId, StreamStatsEvent,
};

use crate::events::EventQueue;
use crate::protocol::Response;
use crate::registry::HandleMap;

/// Reason string for a call handle that resolves to nothing.
pub const NO_CALL: &str = "No call with such id.";
/// Reason string for a proxy handle that resolves to nothing.
pub const NO_PROXY: &str = "No proxy with such id.";
/// Reason string for an audio-stream handle that resolves to nothing.
pub const NO_STREAM: &str = "No audio stream with such id.";
/// Reason string for an auth-info ordinal that resolves to nothing.
pub const NO_AUTH_INFO: &str = "No auth info with such index.";

/// Daemon-side record of a running standalone audio stream.
///
/// The engine exposes no per-stream user-data slot, so streams are
/// tracked in an explicit table keyed by the daemon-assigned handle,
/// carrying the engine stream id and the statistics accumulated from the
/// stream's report queue.
#[derive(Debug)]
pub struct AudioStreamEntry {
    /// Engine identifier of the stream.
    pub stream: StreamId,
    /// Statistics folded from receiver/sender reports so far.
    pub stats: RtpStats,
}

/// The daemon's shared mutable state.
pub struct DaemonCore {
    engine: Box<dyn Engine>,
    calls: HandleMap<CallId>,
    proxies: HandleMap<ProxyId>,
    streams: HashMap<u32, AudioStreamEntry>,
    next_stream_handle: u32,
    events: EventQueue,
    quit: bool,
}

impl DaemonCore {
    /// Wrap an engine handle with fresh registries and an empty queue.
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            calls: HandleMap::new(),
            proxies: HandleMap::new(),
            streams: HashMap::new(),
            next_stream_handle: 1,
            events: EventQueue::new(),
            quit: false,
        }
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Control access to the engine.
    pub fn engine_mut(&mut self) -> &mut dyn Engine {
        self.engine.as_mut()
    }

    // ---- Handle registries ----

    /// The controller handle for a call, assigned on first reference.
    pub fn handle_for_call(&mut self, id: CallId) -> u32 {
        self.calls.handle_of(id)
    }

    /// The controller handle for a proxy, assigned on first reference.
    pub fn handle_for_proxy(&mut self, id: ProxyId) -> u32 {
        self.proxies.handle_of(id)
    }

    /// Resolve a call handle against the engine's live call list.
    pub fn find_call(&self, handle: u32) -> Option<CallId> {
        self.engine
            .calls()
            .into_iter()
            .find(|id| self.calls.handle(id) == Some(handle))
    }

    /// Resolve a proxy handle against the engine's proxy list.
    pub fn find_proxy(&self, handle: u32) -> Option<ProxyId> {
        self.engine
            .proxies()
            .into_iter()
            .find(|id| self.proxies.handle(id) == Some(handle))
    }

    /// Resolve a 1-based ordinal into the engine's auth-info list.
    pub fn find_auth_info(&self, ordinal: usize) -> Option<AuthInfo> {
        let index = ordinal.checked_sub(1)?;
        self.engine.auth_infos().get(index).cloned()
    }

    // ---- Audio stream table ----

    /// Track a newly started stream; returns its controller handle.
    pub fn register_audio_stream(&mut self, stream: StreamId) -> u32 {
        let handle = self.next_stream_handle;
        self.next_stream_handle += 1;
        self.streams.insert(
            handle,
            AudioStreamEntry {
                stream,
                stats: RtpStats::default(),
            },
        );
        handle
    }

    /// Resolve an audio-stream handle.
    pub fn find_audio_stream(&self, handle: u32) -> Option<&AudioStreamEntry> {
        self.streams.get(&handle)
    }

    /// Stop tracking a stream, releasing its statistics state.
    pub fn remove_audio_stream(&mut self, handle: u32) -> Option<AudioStreamEntry> {
        self.streams.remove(&handle)
    }

    // ---- Event queue ----

    /// Queue an already-rendered event response.
    pub fn queue_event(&mut self, event: Response) {
        self.events.push(event);
    }

    /// Pop the oldest pending event, reporting the remaining depth.
    pub fn pull_event(&mut self) -> (Option<Response>, usize) {
        self.events.try_pop()
    }

    /// Current event queue depth.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ---- Shutdown ----

    /// Mark the daemon for shutdown; checked after each dispatch and at
    /// the top of each iteration tick.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Whether a `quit` command has been processed.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Force-stop every still-open audio stream. Part of teardown.
    pub fn shutdown_streams(&mut self) {
        for (handle, entry) in self.streams.drain() {
            if let Err(error) = self.engine.stop_audio_stream(entry.stream) {
                warn!(handle, %error, "failed to stop audio stream during shutdown");
            }
        }
    }

    // ---- Iteration tick ----

    /// One pump-and-drain step: advance the engine, turn its events into
    /// queued responses, poll per-stream statistics queues, and prune
    /// handle mappings for objects gone from the live lists.
    pub fn tick(&mut self) {
        for event in self.engine.iterate() {
            self.process_engine_event(event);
        }
        self.poll_audio_streams();
        let live_calls = self.engine.calls();
        self.calls.prune(&live_calls);
        let live_proxies = self.engine.proxies();
        self.proxies.prune(&live_proxies);
    }

    fn process_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::CallStateChanged { id, state, message } => {
                let handle = self.calls.handle_of(id);
                let mut body =
                    format!("Event-type: call-state-changed\nId: {handle}\nState: {state}");
                if let Some(info) = self.engine.call_info(id) {
                    body.push_str(&format!(
                        "\nDirection: {}\nRemote: {}",
                        info.direction, info.remote_uri
                    ));
                }
                if let Some(message) = message {
                    body.push_str(&format!("\nMessage: {message}"));
                }
                self.events.push(Response::ok().with_body(body));
            }
            EngineEvent::CallStatsUpdated { id, stats, periodic } => {
                // Routine timer-driven refreshes would flood the
                // controller with several events per second per call.
                if periodic {
                    trace!(%id, "suppressing periodic call stats update");
                    return;
                }
                let handle = self.calls.handle_of(id);
                let body = format!(
                    "Event-type: call-stats-updated\nId: {handle}\n{}",
                    format_rtp_stats(&stats)
                );
                self.events.push(Response::ok().with_body(body));
            }
            EngineEvent::DtmfReceived { id, digit } => {
                let handle = self.calls.handle_of(id);
                let body = format!("Event-type: receiving-tone\nId: {handle}\nTone: {digit}");
                self.events.push(Response::ok().with_body(body));
            }
        }
    }

    fn poll_audio_streams(&mut self) {
        let mut handles: Vec<u32> = self.streams.keys().copied().collect();
        handles.sort_unstable();
        for handle in handles {
            let Some(stream) = self.streams.get(&handle).map(|e| e.stream) else {
                continue;
            };
            for item in self.engine.poll_stream_stats(stream) {
                let (kind, report) = match item {
                    StreamStatsEvent::ReceiverReport(report) => ("receiver-report", report),
                    StreamStatsEvent::SenderReport(report) => ("sender-report", report),
                    // Routine per-tick bandwidth measurements never
                    // surface as controller events.
                    StreamStatsEvent::BandwidthTick(_) => continue,
                };
                if let Some(entry) = self.streams.get_mut(&handle) {
                    entry.stats.accumulate(&report);
                }
                let body = format!(
                    "Event-type: audio-stream-stats-updated\nId: {handle}\nKind: {kind}\n{}",
                    format_rtp_stats(&report)
                );
                self.events.push(Response::ok().with_body(body));
            }
        }
    }
}

/// Render an [`RtpStats`] snapshot as response body lines.
pub fn format_rtp_stats(stats: &RtpStats) -> String {
    format!(
        "Sent-packets: {}\nSent-bytes: {}\nReceived-packets: {}\nReceived-bytes: {}\n\
         Jitter-ms: {:.1}\nLoss-percent: {:.1}\nRound-trip-ms: {}\n\
         Download-bandwidth-kbps: {}\nUpload-bandwidth-kbps: {}",
        stats.sent_packets,
        stats.sent_bytes,
        stats.recv_packets,
        stats.recv_bytes,
        stats.jitter_ms,
        stats.loss_percent,
        stats.round_trip_ms,
        stats.download_bw_kbps,
        stats.upload_bw_kbps,
    )
}
