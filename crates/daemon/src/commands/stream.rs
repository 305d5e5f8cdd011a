//! Standalone audio stream commands.
//!
//! Streams started here are tracked in the daemon's stream table; their
//! statistics accumulate from the reports drained on every iteration
//! tick and can be read back with `audio-stream-stats`.

use std::net::{IpAddr, SocketAddr};

use crate::core::{format_rtp_stats, DaemonCore, NO_STREAM};
use crate::protocol::Response;

use super::{parse_handle, single_token, Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "audio-stream-start",
            "audio-stream-start <remote-ip> <remote-port> <payload-type>",
            "Start an RTP audio stream to a remote endpoint.",
            cmd_stream_start,
        )
        .example("audio-stream-start 192.168.1.28 7078 0", "Status: Ok\n\nId: 1"),
    );
    registry.register(
        Command::new(
            "audio-stream-stop",
            "audio-stream-stop <stream-id>",
            "Stop a running audio stream.",
            cmd_stream_stop,
        )
        .example("audio-stream-stop 1", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "audio-stream-stats",
            "audio-stream-stats <stream-id>",
            "Show the statistics accumulated for an audio stream.",
            cmd_stream_stats,
        )
        .example(
            "audio-stream-stats 1",
            "Status: Ok\n\nSent-packets: 250\nSent-bytes: 40000\n...",
        ),
    );
}

fn cmd_stream_start(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let mut tokens = args.split_whitespace();
    let (Some(ip), Some(port), Some(payload_type)) =
        (tokens.next(), tokens.next(), tokens.next())
    else {
        return Response::error("Expected: audio-stream-start <remote-ip> <remote-port> <payload-type>");
    };
    if tokens.next().is_some() {
        return Response::error("Expected: audio-stream-start <remote-ip> <remote-port> <payload-type>");
    }
    let Ok(ip) = ip.parse::<IpAddr>() else {
        return Response::error("Invalid remote IP address.");
    };
    let Ok(port) = port.parse::<u16>() else {
        return Response::error("Invalid remote port.");
    };
    let Ok(payload_type) = payload_type.parse::<u8>() else {
        return Response::error("Invalid payload type.");
    };
    match core
        .engine_mut()
        .start_audio_stream(SocketAddr::new(ip, port), payload_type)
    {
        Ok(stream) => {
            let handle = core.register_audio_stream(stream);
            Response::ok().with_body(format!("Id: {handle}"))
        }
        Err(error) => Response::error(format!("Could not start audio stream: {error}")),
    }
}

fn cmd_stream_stop(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let Some(handle) = single_token(args).and_then(parse_handle) else {
        return Response::error("Expected a stream id.");
    };
    let Some(stream) = core.find_audio_stream(handle).map(|entry| entry.stream) else {
        return Response::error(NO_STREAM);
    };
    // The entry is dropped only once the engine has let go of the
    // stream, so a failed stop can be retried under the same handle.
    match core.engine_mut().stop_audio_stream(stream) {
        Ok(()) => {
            core.remove_audio_stream(handle);
            Response::ok()
        }
        Err(error) => Response::error(format!("Could not stop audio stream: {error}")),
    }
}

fn cmd_stream_stats(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let Some(handle) = single_token(args).and_then(parse_handle) else {
        return Response::error("Expected a stream id.");
    };
    match core.find_audio_stream(handle) {
        Some(entry) => Response::ok().with_body(format_rtp_stats(&entry.stats)),
        None => Response::error(NO_STREAM),
    }
}
