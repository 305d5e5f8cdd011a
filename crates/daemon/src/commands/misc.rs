//! Daemon-level commands: help, version, quit, event polling.

use crate::core::DaemonCore;
use crate::protocol::Response;

use super::{Command, CommandRegistry};

pub fn register_commands(registry: &mut CommandRegistry) {
    registry.register(
        Command::new(
            "help",
            "help [<command>]",
            "Show usage for one command, or list all commands.",
            cmd_help,
        )
        .example("help version", "Status: Ok\n\nversion\n  Show the engine version."),
    );
    registry.register(
        Command::new("version", "version", "Show the engine version.", cmd_version)
            .example("version", "Status: Ok\n\nVersion: voipd-soft/0.1.0"),
    );
    registry.register(
        Command::new(
            "quit",
            "quit",
            "Stop the daemon: end all calls and streams, then exit.",
            cmd_quit,
        )
        .example("quit", "Status: Ok"),
    );
    registry.register(
        Command::new(
            "pop-event",
            "pop-event",
            "Dequeue the oldest pending event; always reports the remaining queue depth.",
            cmd_pop_event,
        )
        .example("pop-event", "Status: Ok\n\nSize: 0")
        .example(
            "pop-event",
            "Status: Ok\n\nEvent-type: receiving-tone\nId: 1\nTone: 5\nSize: 2",
        ),
    );
}

fn cmd_help(_core: &mut DaemonCore, registry: &CommandRegistry, args: &str) -> Response {
    Response::ok().with_body(registry.help(args))
}

fn cmd_version(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    Response::ok().with_body(format!("Version: {}", core.engine().version()))
}

fn cmd_quit(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    core.request_quit();
    Response::ok()
}

fn cmd_pop_event(core: &mut DaemonCore, _registry: &CommandRegistry, _args: &str) -> Response {
    let (event, remaining) = core.pull_event();
    let mut body = String::new();
    if let Some(event) = event {
        if let Some(event_body) = event.body() {
            body.push_str(event_body);
            if !body.ends_with('\n') {
                body.push('\n');
            }
        }
    }
    body.push_str(&format!("Size: {remaining}"));
    Response::ok().with_body(body)
}

#[cfg(test)]
mod tests {
    use super::super::build_registry;
    use crate::core::DaemonCore;
    use crate::protocol::{Response, Status};
    use voipd_engine_core::{SoftEngine, SoftEngineConfig};

    fn core() -> DaemonCore {
        let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
        DaemonCore::new(Box::new(engine))
    }

    #[test]
    fn version_reports_engine_version() {
        let registry = build_registry();
        let mut core = core();
        let response = registry.dispatch(&mut core, "version");
        assert_eq!(response.status(), Status::Ok);
        assert!(response.body().unwrap().starts_with("Version: voipd-soft/"));
    }

    #[test]
    fn quit_requests_shutdown() {
        let registry = build_registry();
        let mut core = core();
        assert!(!core.quit_requested());
        let response = registry.dispatch(&mut core, "quit");
        assert_eq!(response.status(), Status::Ok);
        assert!(core.quit_requested());
    }

    #[test]
    fn pop_event_returns_events_fifo_with_sizes() {
        let registry = build_registry();
        let mut core = core();
        core.queue_event(Response::ok().with_body("Event-type: test\nSeq: 1"));
        core.queue_event(Response::ok().with_body("Event-type: test\nSeq: 2"));

        let first = registry.dispatch(&mut core, "pop-event");
        assert_eq!(first.body(), Some("Event-type: test\nSeq: 1\nSize: 1"));

        let second = registry.dispatch(&mut core, "pop-event");
        assert_eq!(second.body(), Some("Event-type: test\nSeq: 2\nSize: 0"));

        let empty = registry.dispatch(&mut core, "pop-event");
        assert_eq!(empty.body(), Some("Size: 0"));
    }
}
