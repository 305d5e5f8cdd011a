//! End-to-end command scenarios against the simulated engine.
//!
//! Each scenario drives the dispatcher exactly as a transport would:
//! request lines in, rendered responses out, with engine time advanced
//! by explicit ticks so the event stream is fully deterministic.

use std::time::{Duration, Instant};

use voipd_daemon::commands::{build_registry, CommandRegistry};
use voipd_daemon::core::DaemonCore;
use voipd_daemon::protocol::Status;
use voipd_daemon::Daemon;
use voipd_engine_core::{SoftEngine, SoftEngineConfig, SoftEngineController};

fn session(config: SoftEngineConfig) -> (CommandRegistry, DaemonCore, SoftEngineController) {
    let (engine, controller) = SoftEngine::new(config);
    (build_registry(), DaemonCore::new(Box::new(engine)), controller)
}

#[test]
fn version_renders_ok_with_body() {
    let (registry, mut core, _controller) = session(SoftEngineConfig::default());
    let response = registry.dispatch(&mut core, "version");
    let rendered = response.render();
    assert!(rendered.starts_with("Status: Ok\n\nVersion: voipd-soft/"));
    assert!(rendered.ends_with('\n'));
}

#[test]
fn answer_with_unknown_handle_is_a_clean_error() {
    let (registry, mut core, _controller) = session(SoftEngineConfig::default());
    let response = registry.dispatch(&mut core, "answer 3");
    assert_eq!(
        response.render(),
        "Status: Error\nReason: No call with such id.\n"
    );
}

#[test]
fn place_call_then_inspect_status() {
    let (registry, mut core, _controller) = session(SoftEngineConfig::default());

    let placed = registry.dispatch(&mut core, "call sip:bob@example.org");
    assert_eq!(placed.status(), Status::Ok);
    assert_eq!(placed.body(), Some("Id: 1"));

    // Default simulation: init, progress, ringing, then the remote
    // answers after three ringing ticks.
    for _ in 0..6 {
        core.tick();
    }

    let status = registry.dispatch(&mut core, "call-status 1");
    assert_eq!(status.status(), Status::Ok);
    let body = status.body().unwrap();
    assert!(body.contains("State: Connected"));
    assert!(body.contains("Direction: Outgoing"));
    assert!(body.contains("Remote: sip:bob@example.org"));

    let listed = registry.dispatch(&mut core, "calls");
    assert!(listed.body().unwrap().starts_with("Call-count: 1"));
}

#[test]
fn two_events_drain_with_size_countdown() {
    let (registry, mut core, controller) = session(SoftEngineConfig::default());
    controller.push_incoming_call("sip:alice@example.org");
    controller.push_incoming_call("sip:carol@example.org");
    core.tick();
    assert_eq!(core.pending_events(), 2);

    let first = registry.dispatch(&mut core, "pop-event");
    let body = first.body().unwrap();
    assert!(body.contains("Event-type: call-state-changed"));
    assert!(body.contains("State: IncomingReceived"));
    assert!(body.contains("Remote: sip:alice@example.org"));
    assert!(body.ends_with("Size: 1"));

    let second = registry.dispatch(&mut core, "pop-event");
    let body = second.body().unwrap();
    assert!(body.contains("Remote: sip:carol@example.org"));
    assert!(body.ends_with("Size: 0"));

    let empty = registry.dispatch(&mut core, "pop-event");
    assert_eq!(empty.body(), Some("Size: 0"));
}

#[test]
fn incoming_call_answer_dtmf_hangup_flow() {
    let (registry, mut core, controller) = session(SoftEngineConfig::default());
    let id = controller.push_incoming_call("sip:alice@example.org");
    core.tick();

    // The ring event assigns handle 1.
    let ring = registry.dispatch(&mut core, "pop-event");
    assert!(ring.body().unwrap().contains("Id: 1"));

    let answered = registry.dispatch(&mut core, "answer 1");
    assert_eq!(answered.status(), Status::Ok);

    let sent = registry.dispatch(&mut core, "dtmf 5 1");
    assert_eq!(sent.status(), Status::Ok);
    core.tick();

    // Drain until the echoed tone shows up.
    let mut tone = None;
    while let (Some(event), _) = core.pull_event() {
        if event.body().unwrap_or("").contains("receiving-tone") {
            tone = event.body().map(str::to_string);
        }
    }
    let tone = tone.expect("tone event queued");
    assert!(tone.contains("Id: 1"));
    assert!(tone.contains("Tone: 5"));

    controller.remote_hangup(id).unwrap();
    core.tick();
    let mut terminated = false;
    while let (Some(event), _) = core.pull_event() {
        let body = event.body().unwrap_or("");
        if body.contains("State: Terminated") {
            assert!(body.contains("Message: Remote hangup"));
            terminated = true;
        }
    }
    assert!(terminated);
}

#[test]
fn register_flow_reaches_ok_and_unregisters() {
    let (registry, mut core, _controller) = session(SoftEngineConfig::default());

    let registered = registry.dispatch(
        &mut core,
        "register sip:alice@example.org sip:proxy.example.org secret example.org",
    );
    assert_eq!(registered.status(), Status::Ok);
    assert_eq!(registered.body(), Some("Id: 1"));

    core.tick();
    let status = registry.dispatch(&mut core, "register-status 1");
    assert!(status.body().unwrap().contains("State: Ok"));

    let gone = registry.dispatch(&mut core, "unregister 1");
    assert_eq!(gone.status(), Status::Ok);
    let missing = registry.dispatch(&mut core, "register-status 1");
    assert_eq!(missing.reason(), Some("No proxy with such id."));
}

#[test]
fn command_burst_against_live_iteration_keeps_handles_consistent() {
    let (engine, _controller) = SoftEngine::new(SoftEngineConfig {
        answer_after: None,
        ..SoftEngineConfig::default()
    });
    let mut daemon = Daemon::start(Box::new(engine), false).unwrap();

    // Fire a burst of commands while the 20 ms loop pumps the engine
    // underneath. Every dispatch races call state transitions and event
    // queueing on the other thread.
    let mut handles = Vec::new();
    for i in 0..20 {
        let placed = daemon.handle_line(&format!("call sip:peer{i}@example.org"));
        assert_eq!(placed.status(), Status::Ok);
        let id: u32 = placed
            .body()
            .unwrap()
            .strip_prefix("Id: ")
            .unwrap()
            .parse()
            .unwrap();
        handles.push(id);
        daemon.handle_line("calls");
        daemon.handle_line("pop-event");
    }

    // No handle was lost or duplicated across the burst.
    assert_eq!(handles, (1..=20).collect::<Vec<u32>>());
    let listed = daemon.handle_line("calls");
    assert!(listed.body().unwrap().starts_with("Call-count: 20"));

    // With no scripted answer every call settles in OutgoingRinging,
    // after which the engine emits nothing further.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let body = daemon.handle_line("calls").body().unwrap().to_string();
        if !body.contains("OutgoingInit") && !body.contains("OutgoingProgress") {
            break;
        }
        assert!(Instant::now() < deadline, "calls never settled");
        std::thread::sleep(Duration::from_millis(10));
    }

    // The queue drains exactly to empty: each pop reports the remaining
    // depth, and depth reaches zero and stays there.
    let mut previous_size = usize::MAX;
    loop {
        let popped = daemon.handle_line("pop-event");
        assert_eq!(popped.status(), Status::Ok);
        let body = popped.body().unwrap();
        let size: usize = body
            .lines()
            .last()
            .unwrap()
            .strip_prefix("Size: ")
            .unwrap()
            .parse()
            .unwrap();
        assert!(size < previous_size || size == 0);
        previous_size = size;
        if body == "Size: 0" {
            break;
        }
    }
    assert_eq!(daemon.handle_line("pop-event").body(), Some("Size: 0"));
    daemon.shutdown();
}

#[test]
fn handles_survive_interleaved_ticks() {
    let (registry, mut core, controller) = session(SoftEngineConfig {
        answer_after: None,
        ..SoftEngineConfig::default()
    });

    let placed = registry.dispatch(&mut core, "call sip:bob@example.org");
    assert_eq!(placed.body(), Some("Id: 1"));
    for _ in 0..10 {
        core.tick();
    }
    controller.push_incoming_call("sip:alice@example.org");
    core.tick();

    // The outgoing call keeps handle 1 no matter how many ticks passed;
    // the incoming one gets the next handle.
    let listed = registry.dispatch(&mut core, "calls");
    let body = listed.body().unwrap();
    assert!(body.starts_with("Call-count: 2"));
    assert!(body.contains("Id: 1 | Outgoing"));
    assert!(body.contains("Id: 2 | Incoming"));
}
