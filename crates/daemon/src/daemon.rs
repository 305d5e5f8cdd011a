//! Daemon composition root.
//!
//! Owns the two-thread runtime: the engine iteration loop runs on a
//! background thread while the calling thread serves a transport. Both
//! sides share one [`DaemonCore`] behind a mutex, so a command handler
//! always observes the engine between ticks, never mid-tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{info, warn};

use voipd_engine_core::Engine;

use crate::commands::{build_registry, CommandRegistry};
use crate::core::DaemonCore;
use crate::error::DaemonError;
use crate::iterate;
use crate::protocol::Response;

/// State shared between the transport thread and the iteration thread.
pub(crate) struct Shared {
    /// The dispatcher state and engine, behind one lock.
    pub(crate) core: Mutex<DaemonCore>,
    /// Cleared when the daemon should stop. Checked by both threads.
    pub(crate) running: AtomicBool,
}

/// A running control daemon.
///
/// Construct with [`Daemon::start`], feed it request lines with
/// [`Daemon::handle_line`] (or hand it to a transport loop), then call
/// [`Daemon::shutdown`].
pub struct Daemon {
    shared: Arc<Shared>,
    registry: CommandRegistry,
    iterate: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Start the daemon around `engine` and spawn the iteration thread.
    ///
    /// With `auto_drain` set, the iteration thread prints at most one
    /// queued event to stdout per tick. Interactive sessions enable it;
    /// socket clients poll with `pop-event` instead.
    pub fn start(engine: Box<dyn Engine>, auto_drain: bool) -> Result<Self, DaemonError> {
        let shared = Arc::new(Shared {
            core: Mutex::new(DaemonCore::new(engine)),
            running: AtomicBool::new(true),
        });
        let iterate = iterate::spawn(Arc::clone(&shared), auto_drain)?;
        info!(auto_drain, "daemon started");
        Ok(Self {
            shared,
            registry: build_registry(),
            iterate: Some(iterate),
        })
    }

    /// Dispatch one request line and return its response.
    pub fn handle_line(&self, line: &str) -> Response {
        let mut core = self.shared.core.lock();
        let response = self.registry.dispatch(&mut core, line);
        if core.quit_requested() {
            self.shared.running.store(false, Ordering::Release);
        }
        response
    }

    /// Whether the daemon is still accepting requests.
    pub fn running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Stop the iteration thread, tear down live streams and release the
    /// engine. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.iterate.take() {
            if handle.join().is_err() {
                warn!("iteration thread panicked during shutdown");
            }
        }
        self.shared.core.lock().shutdown_streams();
        info!("daemon stopped");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::Daemon;
    use crate::protocol::Status;
    use voipd_engine_core::{SoftEngine, SoftEngineConfig};

    fn daemon() -> Daemon {
        let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
        Daemon::start(Box::new(engine), false).unwrap()
    }

    #[test]
    fn dispatches_under_the_shared_lock() {
        let daemon = daemon();
        let response = daemon.handle_line("version");
        assert_eq!(response.status(), Status::Ok);
        assert!(daemon.running());
    }

    #[test]
    fn quit_stops_the_daemon() {
        let mut daemon = daemon();
        let response = daemon.handle_line("quit");
        assert_eq!(response.status(), Status::Ok);
        assert!(!daemon.running());
        daemon.shutdown();
        daemon.shutdown();
    }

    #[test]
    fn iteration_thread_advances_the_engine() {
        let (engine, controller) = SoftEngine::new(SoftEngineConfig {
            answer_after: Some(1),
            ..SoftEngineConfig::default()
        });
        let daemon = Daemon::start(Box::new(engine), false).unwrap();
        let response = daemon.handle_line("call sip:bob@example.org");
        assert_eq!(response.status(), Status::Ok);
        drop(controller);

        // The background loop ticks every 20ms; the scripted peer
        // answers after one tick.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            let status = daemon.handle_line("call-status 1");
            if status.body().map_or(false, |b| b.contains("State: Connected")) {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "call never connected");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }
}
