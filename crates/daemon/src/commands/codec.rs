//! Audio codec commands: listing, enabling, packetization time.

use voipd_engine_core::CodecInfo;

use crate::core::DaemonCore;
use crate::protocol::Response;

use super::{single_token, Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "audio-codec-list",
            "audio-codec-list [<mime[/rate/channels]>|<index>]",
            "List the audio codec table, or one codec.",
            cmd_codec_list,
        )
        .example(
            "audio-codec-list PCMU/8000/1",
            "Status: Ok\n\nIndex: 0 | PCMU/8000/1 | Payload-type: 0 | Enabled: true",
        ),
    );
    registry.register(
        Command::new(
            "audio-codec-enable",
            "audio-codec-enable <mime[/rate/channels]>|<index>|ALL",
            "Enable an audio codec for negotiation.",
            cmd_codec_enable,
        )
        .example("audio-codec-enable speex/16000/1", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "audio-codec-disable",
            "audio-codec-disable <mime[/rate/channels]>|<index>|ALL",
            "Disable an audio codec.",
            cmd_codec_disable,
        )
        .example("audio-codec-disable opus", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "ptime",
            "ptime [<milliseconds>]",
            "Show or set the preferred packetization time.",
            cmd_ptime,
        )
        .example("ptime", "Status: Ok\n\nPtime: 20")
        .example("ptime 40", "Status: Ok\n\nPtime: 40"),
    );
}

/// Resolve a codec selector: a list index, a bare MIME, or a full
/// `mime/rate/channels` triple.
fn resolve_codec(codecs: &[CodecInfo], selector: &str) -> Option<usize> {
    if let Ok(index) = selector.parse::<usize>() {
        return (index < codecs.len()).then_some(index);
    }
    let mut parts = selector.split('/');
    let mime = parts.next()?;
    match (parts.next(), parts.next(), parts.next()) {
        // Full triple.
        (Some(rate), Some(channels), None) => {
            let rate: u32 = rate.parse().ok()?;
            let channels: u8 = channels.parse().ok()?;
            codecs.iter().position(|c| c.matches(mime, rate, channels))
        }
        // Bare MIME: first match wins.
        (None, _, _) => codecs
            .iter()
            .position(|c| c.mime.eq_ignore_ascii_case(mime)),
        _ => None,
    }
}

fn describe_codec(index: usize, codec: &CodecInfo) -> String {
    format!(
        "Index: {index} | {codec} | Payload-type: {} | Enabled: {}",
        codec.payload_type, codec.enabled
    )
}

fn cmd_codec_list(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let codecs = core.engine().audio_codecs();
    let args = args.trim();
    if args.is_empty() {
        let body = codecs
            .iter()
            .enumerate()
            .map(|(i, c)| describe_codec(i, c))
            .collect::<Vec<_>>()
            .join("\n");
        return Response::ok().with_body(body);
    }
    let Some(selector) = single_token(args) else {
        return Response::error("Expected a codec mime type or index.");
    };
    match resolve_codec(&codecs, selector) {
        Some(index) => Response::ok().with_body(describe_codec(index, &codecs[index])),
        None => Response::error("No codec matches."),
    }
}

fn set_codec_enabled(core: &mut DaemonCore, args: &str, enabled: bool) -> Response {
    let Some(selector) = single_token(args.trim()) else {
        return Response::error("Expected a codec mime type, index or ALL.");
    };
    let codecs = core.engine().audio_codecs();
    if selector.eq_ignore_ascii_case("all") {
        for index in 0..codecs.len() {
            if let Err(error) = core.engine_mut().enable_audio_codec(index, enabled) {
                return Response::error(format!("Could not update codec: {error}"));
            }
        }
        return Response::ok();
    }
    match resolve_codec(&codecs, selector) {
        Some(index) => match core.engine_mut().enable_audio_codec(index, enabled) {
            Ok(()) => Response::ok(),
            Err(error) => Response::error(format!("Could not update codec: {error}")),
        },
        None => Response::error("No codec matches."),
    }
}

fn cmd_codec_enable(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    set_codec_enabled(core, args, true)
}

fn cmd_codec_disable(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    set_codec_enabled(core, args, false)
}

fn cmd_ptime(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let args = args.trim();
    if !args.is_empty() {
        let Some(ms) = single_token(args).and_then(|t| t.parse::<u32>().ok()) else {
            return Response::error("Expected a ptime in milliseconds.");
        };
        core.engine_mut().set_ptime(ms);
    }
    Response::ok().with_body(format!("Ptime: {}", core.engine().ptime()))
}
