//! Shared telephony types for the engine facade
//!
//! These are the value types that cross the boundary between the engine
//! and the daemon: call and registration state, RTP statistics, codec
//! descriptors, proxy and authentication records, and the events the
//! engine emits from its pump.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique identifier for a call, stable for the call's lifetime.
pub type CallId = Uuid;

/// Unique identifier for a proxy configuration.
pub type ProxyId = Uuid;

/// Unique identifier for a standalone audio stream.
pub type StreamId = Uuid;

/// State of a call as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// An incoming call has been received and is awaiting a decision.
    IncomingReceived,
    /// An outgoing call is being set up.
    OutgoingInit,
    /// The outgoing call is in progress (provisional response received).
    OutgoingProgress,
    /// The remote party is ringing.
    OutgoingRinging,
    /// Media is flowing in both directions.
    Connected,
    /// The call is paused by this side.
    Paused,
    /// The call is paused by the remote side.
    PausedByRemote,
    /// The call has ended.
    Terminated,
    /// The call failed.
    Error,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IncomingReceived => "IncomingReceived",
            Self::OutgoingInit => "OutgoingInit",
            Self::OutgoingProgress => "OutgoingProgress",
            Self::OutgoingRinging => "OutgoingRinging",
            Self::Connected => "Connected",
            Self::Paused => "Paused",
            Self::PausedByRemote => "PausedByRemote",
            Self::Terminated => "Terminated",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

impl CallState {
    /// Whether the call is still part of the engine's live set.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Terminated | Self::Error)
    }
}

/// Direction of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    /// The call was received from a remote party.
    Incoming,
    /// The call was placed by this endpoint.
    Outgoing,
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => f.write_str("Incoming"),
            Self::Outgoing => f.write_str("Outgoing"),
        }
    }
}

/// Snapshot of a call's identity and state.
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// The call's engine-internal identifier.
    pub id: CallId,
    /// Whether the call was placed or received.
    pub direction: CallDirection,
    /// SIP URI of the remote party.
    pub remote_uri: String,
    /// Current call state.
    pub state: CallState,
    /// When the call object was created.
    pub started_at: DateTime<Utc>,
}

/// RTP-level statistics for a call or a standalone audio stream.
///
/// Counters are cumulative since the start of the session; jitter, loss,
/// round-trip time and bandwidth are the most recent measurements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtpStats {
    /// Packets sent since session start.
    pub sent_packets: u64,
    /// Payload bytes sent since session start.
    pub sent_bytes: u64,
    /// Packets received since session start.
    pub recv_packets: u64,
    /// Payload bytes received since session start.
    pub recv_bytes: u64,
    /// Interarrival jitter in milliseconds.
    pub jitter_ms: f32,
    /// Cumulative packet loss percentage (0.0 - 100.0).
    pub loss_percent: f32,
    /// Most recent round-trip time in milliseconds.
    pub round_trip_ms: u32,
    /// Current receive bandwidth in kbit/s.
    pub download_bw_kbps: u32,
    /// Current send bandwidth in kbit/s.
    pub upload_bw_kbps: u32,
}

impl RtpStats {
    /// Fold a receiver- or sender-side report into this accumulator.
    ///
    /// Counters take the report's (larger) cumulative values; gauges are
    /// replaced by the report's most recent measurements.
    pub fn accumulate(&mut self, report: &RtpStats) {
        self.sent_packets = self.sent_packets.max(report.sent_packets);
        self.sent_bytes = self.sent_bytes.max(report.sent_bytes);
        self.recv_packets = self.recv_packets.max(report.recv_packets);
        self.recv_bytes = self.recv_bytes.max(report.recv_bytes);
        self.jitter_ms = report.jitter_ms;
        self.loss_percent = report.loss_percent;
        self.round_trip_ms = report.round_trip_ms;
        self.download_bw_kbps = report.download_bw_kbps;
        self.upload_bw_kbps = report.upload_bw_kbps;
    }
}

/// Description of an audio codec known to the engine.
///
/// A codec is addressed either by its position in the engine's codec list
/// or by its `mime/rate/channels` triple (e.g. `PCMU/8000/1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    /// Codec MIME subtype (e.g. "PCMU", "opus").
    pub mime: String,
    /// Sampling rate in Hz.
    pub clock_rate: u32,
    /// Number of audio channels.
    pub channels: u8,
    /// RTP payload type number.
    pub payload_type: u8,
    /// Whether the codec is enabled for negotiation.
    pub enabled: bool,
}

impl CodecInfo {
    /// Whether this codec matches a `mime/rate/channels` triple.
    ///
    /// The MIME comparison is case-insensitive, as payload type names are
    /// in SDP.
    pub fn matches(&self, mime: &str, clock_rate: u32, channels: u8) -> bool {
        self.mime.eq_ignore_ascii_case(mime)
            && self.clock_rate == clock_rate
            && self.channels == channels
    }
}

impl fmt::Display for CodecInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.mime, self.clock_rate, self.channels)
    }
}

/// State of a registration on a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// No registration has been attempted.
    None,
    /// A REGISTER is in flight.
    Progress,
    /// Registration succeeded.
    Ok,
    /// Registration was removed.
    Cleared,
    /// Registration failed.
    Failed,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::Progress => "Progress",
            Self::Ok => "Ok",
            Self::Cleared => "Cleared",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Parameters for a proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// SIP URI of the proxy server.
    pub server_uri: String,
    /// Identity to register as (e.g. "sip:alice@example.org").
    pub identity: String,
    /// Whether to register on this proxy.
    pub register: bool,
}

/// Snapshot of a configured proxy and its registration state.
#[derive(Debug, Clone)]
pub struct ProxyInfo {
    /// The proxy's engine-internal identifier.
    pub id: ProxyId,
    /// The configuration the proxy was created with.
    pub config: ProxyConfig,
    /// Current registration state.
    pub state: RegistrationState,
}

/// Authentication credentials known to the engine.
///
/// Auth infos have no engine-side identifier; the controller addresses
/// them by ordinal position in the engine's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// Authentication username.
    pub username: String,
    /// Authentication realm, empty if not yet known.
    pub realm: String,
    /// Cleartext password, if provided.
    pub password: Option<String>,
}

/// Media encryption policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEncryption {
    /// No media encryption.
    None,
    /// SRTP with SDES key exchange.
    Srtp,
    /// ZRTP end-to-end encryption.
    Zrtp,
}

impl fmt::Display for MediaEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Srtp => f.write_str("srtp"),
            Self::Zrtp => f.write_str("zrtp"),
        }
    }
}

/// NAT traversal policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallPolicy {
    /// Direct connection, no traversal help.
    None,
    /// Use a statically configured public address.
    NatAddress(String),
    /// Discover the public address through a STUN server.
    Stun(String),
}

impl fmt::Display for FirewallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::NatAddress(addr) => write!(f, "nat {addr}"),
            Self::Stun(server) => write!(f, "stun {server}"),
        }
    }
}

/// An event produced by the engine from within one pump step.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A call changed state.
    CallStateChanged {
        /// The call concerned.
        id: CallId,
        /// The new state.
        state: CallState,
        /// Optional human-readable detail (e.g. an error cause).
        message: Option<String>,
    },
    /// Fresh statistics are available for a call.
    CallStatsUpdated {
        /// The call concerned.
        id: CallId,
        /// The updated statistics snapshot.
        stats: RtpStats,
        /// True for the routine timer-driven refresh the engine performs
        /// several times per second; false for report-driven updates.
        periodic: bool,
    },
    /// A DTMF tone was received on a call.
    DtmfReceived {
        /// The call concerned.
        id: CallId,
        /// The received digit.
        digit: char,
    },
}

/// An item drained from a standalone audio stream's statistics queue.
#[derive(Debug, Clone)]
pub enum StreamStatsEvent {
    /// An RTCP receiver report arrived.
    ReceiverReport(RtpStats),
    /// An RTCP sender report arrived.
    SenderReport(RtpStats),
    /// Routine bandwidth measurement; produced every pump tick while the
    /// stream runs and of no interest to the controller.
    BandwidthTick(RtpStats),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_state_display_matches_wire_names() {
        assert_eq!(CallState::OutgoingRinging.to_string(), "OutgoingRinging");
        assert_eq!(CallState::IncomingReceived.to_string(), "IncomingReceived");
    }

    #[test]
    fn terminated_and_error_are_not_active() {
        assert!(CallState::Connected.is_active());
        assert!(CallState::Paused.is_active());
        assert!(!CallState::Terminated.is_active());
        assert!(!CallState::Error.is_active());
    }

    #[test]
    fn codec_triple_matching_is_case_insensitive() {
        let codec = CodecInfo {
            mime: "PCMU".to_string(),
            clock_rate: 8000,
            channels: 1,
            payload_type: 0,
            enabled: true,
        };
        assert!(codec.matches("pcmu", 8000, 1));
        assert!(!codec.matches("PCMU", 16000, 1));
        assert_eq!(codec.to_string(), "PCMU/8000/1");
    }

    #[test]
    fn stats_accumulate_keeps_counters_monotonic() {
        let mut acc = RtpStats {
            sent_packets: 100,
            sent_bytes: 16000,
            ..Default::default()
        };
        let report = RtpStats {
            sent_packets: 90,
            sent_bytes: 14400,
            jitter_ms: 2.5,
            round_trip_ms: 40,
            ..Default::default()
        };
        acc.accumulate(&report);
        assert_eq!(acc.sent_packets, 100);
        assert_eq!(acc.round_trip_ms, 40);
        assert!((acc.jitter_ms - 2.5).abs() < f32::EPSILON);
    }
}
