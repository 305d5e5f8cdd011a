//! Call control commands: placing, answering, holding, DTMF, status.

use chrono::Utc;

use voipd_engine_core::{CallId, CallState};

use crate::core::{format_rtp_stats, DaemonCore, NO_CALL};
use crate::protocol::Response;

use super::{parse_handle, single_token, Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "call",
            "call <sip-address>",
            "Place an outgoing call.",
            cmd_call,
        )
        .example("call sip:bob@example.org", "Status: Ok\n\nId: 1")
        .example("call daemon test", "Status: Error\nReason: Invalid SIP address."),
    );
    registry.register(
        Command::new("calls", "calls", "List all current calls.", cmd_calls)
            .example("calls", "Status: Ok\n\nCall-count: 1\nId: 1 | Outgoing | sip:bob@example.org | Connected"),
    );
    registry.register(
        Command::new(
            "answer",
            "answer [<call-id>]",
            "Accept an incoming call; without an id, the oldest ringing call.",
            cmd_answer,
        )
        .example("answer 3", "Status: Error\nReason: No call with such id."),
    );
    registry.register(
        Command::new(
            "terminate",
            "terminate [<call-id>|all]",
            "End one call (default: the current one) or every call.",
            cmd_terminate,
        )
        .example("terminate 2", "Status: Ok")
        .example("terminate all", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "pause",
            "pause [<call-id>]",
            "Put a connected call on hold.",
            cmd_pause,
        )
        .example("pause 1", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "resume",
            "resume [<call-id>]",
            "Resume a call previously paused by this side.",
            cmd_resume,
        )
        .example("resume 1", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "call-status",
            "call-status [<call-id>]",
            "Show state, direction, remote address and duration of a call.",
            cmd_call_status,
        )
        .example(
            "call-status 1",
            "Status: Ok\n\nState: Connected\nDirection: Outgoing\nRemote: sip:bob@example.org\nDuration: 12",
        ),
    );
    registry.register(
        Command::new(
            "call-stats",
            "call-stats <call-id>",
            "Show RTP statistics of a call.",
            cmd_call_stats,
        )
        .example(
            "call-stats 1",
            "Status: Ok\n\nSent-packets: 500\nSent-bytes: 80000\n...",
        ),
    );
    registry.register(
        Command::new(
            "dtmf",
            "dtmf <digits> [<call-id>]",
            "Send DTMF digits (0-9, *, #, A-D) on a connected call.",
            cmd_dtmf,
        )
        .example("dtmf 142# 1", "Status: Ok"),
    );
    registry.register(
        Command::new("mute", "mute", "Mute the microphone.", cmd_mute)
            .example("mute", "Status: Ok"),
    );
    registry.register(
        Command::new("unmute", "unmute", "Unmute the microphone.", cmd_unmute)
            .example("unmute", "Status: Ok"),
    );
}

/// Resolve an optional call-id argument, defaulting to the current call.
fn call_from_args(core: &DaemonCore, args: &str) -> Result<CallId, Response> {
    let args = args.trim();
    if args.is_empty() {
        return core
            .engine()
            .current_call()
            .ok_or_else(|| Response::error("No active call."));
    }
    let token = single_token(args).ok_or_else(|| Response::error("Expected a single call id."))?;
    let handle = parse_handle(token).ok_or_else(|| Response::error("Expected a call id."))?;
    core.find_call(handle).ok_or_else(|| Response::error(NO_CALL))
}

fn cmd_call(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let uri = args.trim();
    if uri.is_empty() {
        return Response::error("Missing SIP address.");
    }
    match core.engine_mut().invite(uri) {
        Ok(id) => {
            let handle = core.handle_for_call(id);
            Response::ok().with_body(format!("Id: {handle}"))
        }
        Err(voipd_engine_core::EngineError::InvalidAddress(_)) => {
            Response::error("Invalid SIP address.")
        }
        Err(error) => Response::error(error.to_string()),
    }
}

fn cmd_calls(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    let ids = core.engine().calls();
    let mut body = format!("Call-count: {}", ids.len());
    for id in ids {
        let handle = core.handle_for_call(id);
        if let Some(info) = core.engine().call_info(id) {
            body.push_str(&format!(
                "\nId: {handle} | {} | {} | {}",
                info.direction, info.remote_uri, info.state
            ));
        }
    }
    Response::ok().with_body(body)
}

fn cmd_answer(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let args = args.trim();
    let id = if args.is_empty() {
        // Oldest ringing call.
        let ringing = core.engine().calls().into_iter().find(|&id| {
            core.engine()
                .call_info(id)
                .is_some_and(|info| info.state == CallState::IncomingReceived)
        });
        match ringing {
            Some(id) => id,
            None => return Response::error("No incoming call to answer."),
        }
    } else {
        let Some(handle) = single_token(args).and_then(parse_handle) else {
            return Response::error("Expected a call id.");
        };
        match core.find_call(handle) {
            Some(id) => id,
            None => return Response::error(NO_CALL),
        }
    };
    match core.engine_mut().accept_call(id) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not accept call: {error}")),
    }
}

fn cmd_terminate(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    if args.trim().eq_ignore_ascii_case("all") {
        core.engine_mut().terminate_all_calls();
        return Response::ok();
    }
    let id = match call_from_args(core, args) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match core.engine_mut().terminate_call(id) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not terminate call: {error}")),
    }
}

fn cmd_pause(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let id = match call_from_args(core, args) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match core.engine_mut().pause_call(id) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not pause call: {error}")),
    }
}

fn cmd_resume(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let id = match call_from_args(core, args) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match core.engine_mut().resume_call(id) {
        Ok(()) => Response::ok(),
        Err(error) => Response::error(format!("Could not resume call: {error}")),
    }
}

fn cmd_call_status(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let id = match call_from_args(core, args) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(info) = core.engine().call_info(id) else {
        return Response::error(NO_CALL);
    };
    let duration = (Utc::now() - info.started_at).num_seconds().max(0);
    Response::ok().with_body(format!(
        "State: {}\nDirection: {}\nRemote: {}\nDuration: {duration}",
        info.state, info.direction, info.remote_uri
    ))
}

fn cmd_call_stats(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let token = match single_token(args) {
        Some(token) => token,
        None => return Response::error("Expected a call id."),
    };
    let Some(handle) = parse_handle(token) else {
        return Response::error("Expected a call id.");
    };
    let Some(id) = core.find_call(handle) else {
        return Response::error(NO_CALL);
    };
    match core.engine().call_stats(id) {
        Some(stats) => Response::ok().with_body(format_rtp_stats(&stats)),
        None => Response::error(NO_CALL),
    }
}

fn cmd_dtmf(core: &mut DaemonCore, _registry: &CommandRegistry, args: &str) -> Response {
    let mut tokens = args.split_whitespace();
    let Some(digits) = tokens.next() else {
        return Response::error("Expected DTMF digits.");
    };
    let valid = digits
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '*' | '#' | 'A'..='D' | 'a'..='d'));
    if !valid {
        return Response::error("Invalid DTMF digits.");
    }
    let rest = tokens.next().map(str::trim).unwrap_or("");
    if tokens.next().is_some() {
        return Response::error("Expected: dtmf <digits> [<call-id>]");
    }
    let id = match call_from_args(core, rest) {
        Ok(id) => id,
        Err(response) => return response,
    };
    for digit in digits.chars() {
        if let Err(error) = core.engine_mut().send_dtmf(id, digit) {
            return Response::error(format!("Could not send DTMF: {error}"));
        }
    }
    Response::ok()
}

fn cmd_mute(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    core.engine_mut().mute_mic(true);
    Response::ok()
}

fn cmd_unmute(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    core.engine_mut().mute_mic(false);
    Response::ok()
}

#[cfg(test)]
mod tests {
    use super::super::build_registry;
    use crate::core::DaemonCore;
    use crate::protocol::Status;
    use voipd_engine_core::{SoftEngine, SoftEngineConfig, SoftEngineController};

    fn core() -> (DaemonCore, SoftEngineController) {
        let (engine, controller) = SoftEngine::new(SoftEngineConfig {
            answer_after: None,
            ..Default::default()
        });
        (DaemonCore::new(Box::new(engine)), controller)
    }

    #[test]
    fn call_assigns_handle_one() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        let response = registry.dispatch(&mut core, "call sip:bob@example.org");
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.body(), Some("Id: 1"));
    }

    #[test]
    fn answer_of_unknown_handle_reports_no_call() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        let response = registry.dispatch(&mut core, "answer 3");
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.reason(), Some("No call with such id."));
    }

    #[test]
    fn answer_without_args_accepts_ringing_call() {
        let registry = build_registry();
        let (mut core, controller) = core();
        controller.push_incoming_call("sip:alice@example.org");
        core.tick();
        let response = registry.dispatch(&mut core, "answer");
        assert_eq!(response.status(), Status::Ok);
    }

    #[test]
    fn call_status_shows_state_line() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        registry.dispatch(&mut core, "call sip:bob@example.org");
        let response = registry.dispatch(&mut core, "call-status 1");
        assert_eq!(response.status(), Status::Ok);
        assert!(response.body().unwrap().contains("State: "));
        assert!(response.body().unwrap().contains("Remote: sip:bob@example.org"));
    }

    #[test]
    fn terminate_all_ends_every_call() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        registry.dispatch(&mut core, "call sip:a@example.org");
        registry.dispatch(&mut core, "call sip:b@example.org");
        let response = registry.dispatch(&mut core, "terminate all");
        assert_eq!(response.status(), Status::Ok);
        for _ in 0..6 {
            core.tick();
        }
        assert!(core.engine().calls().is_empty());
    }

    #[test]
    fn dtmf_rejects_invalid_digits() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        let response = registry.dispatch(&mut core, "dtmf 12x");
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.reason(), Some("Invalid DTMF digits."));
    }

    #[test]
    fn mute_and_unmute_toggle_the_microphone() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        assert_eq!(registry.dispatch(&mut core, "mute").status(), Status::Ok);
        assert!(core.engine().mic_muted());
        assert_eq!(registry.dispatch(&mut core, "unmute").status(), Status::Ok);
        assert!(!core.engine().mic_muted());
    }

    #[test]
    fn calls_lists_handles_in_creation_order() {
        let registry = build_registry();
        let (mut core, _controller) = core();
        registry.dispatch(&mut core, "call sip:a@example.org");
        registry.dispatch(&mut core, "call sip:b@example.org");
        let response = registry.dispatch(&mut core, "calls");
        let body = response.body().unwrap();
        assert!(body.starts_with("Call-count: 2"));
        let id1 = body.find("Id: 1").unwrap();
        let id2 = body.find("Id: 2").unwrap();
        assert!(id1 < id2);
    }
}
