//! Engine iteration loop
//!
//! A dedicated background thread keeps the engine's state machine
//! advancing for the whole process lifetime, independent of whether a
//! command is currently being processed. Each tick takes the shared
//! mutex, performs one pump-and-drain step, and sleeps a fixed short
//! interval. Nothing in the tick may block while the mutex is held.

use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::daemon::Shared;

/// Fixed sleep between iteration ticks.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Start the iteration thread.
///
/// With `auto_drain` set (interactive mode), at most one pending event is
/// popped per tick and printed to stdout. Pipe mode never auto-drains:
/// all output there is request-triggered.
pub(crate) fn spawn(shared: Arc<Shared>, auto_drain: bool) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("voipd-iterate".to_string())
        .spawn(move || run(&shared, auto_drain))
}

fn run(shared: &Shared, auto_drain: bool) {
    debug!(auto_drain, "iteration loop started");
    while shared.running.load(Ordering::Acquire) {
        {
            let mut core = shared.core.lock();
            core.tick();
            if auto_drain {
                // At most one event per tick; draining the whole queue
                // here would change the interleaving with command
                // responses observed by the controller.
                if let (Some(event), _) = core.pull_event() {
                    let mut stdout = std::io::stdout().lock();
                    let _ = stdout.write_all(event.render().as_bytes());
                    let _ = stdout.flush();
                }
            }
            if core.quit_requested() {
                shared.running.store(false, Ordering::Release);
            }
        }
        thread::sleep(TICK_INTERVAL);
    }
    debug!("iteration loop stopped");
}
