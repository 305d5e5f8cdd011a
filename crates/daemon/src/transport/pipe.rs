//! Unix socket transport.
//!
//! A non-blocking `UnixListener` serving at most one client at a time.
//! Requests arrive as NUL-terminated chunks; each chunk is one command
//! line, and the rendered response is written straight back. Everything
//! here polls with short sleeps so the daemon's iteration thread keeps
//! the engine ticking regardless of socket activity.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::daemon::Daemon;
use crate::error::DaemonError;

/// Sleep between accept/read polls while idle.
const POLL_BACKOFF: Duration = Duration::from_millis(25);
/// Sleep after a transient listener error before retrying.
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// A bound control socket.
///
/// Binding removes a stale socket file left behind by a crashed run, but
/// refuses to displace a socket another process is still answering on.
pub struct PipeServer {
    listener: UnixListener,
    path: PathBuf,
}

impl PipeServer {
    /// Bind the control socket at `path`.
    pub fn bind(path: &Path) -> Result<Self, DaemonError> {
        if path.exists() {
            if UnixStream::connect(path).is_ok() {
                return Err(DaemonError::Bind {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        ErrorKind::AddrInUse,
                        "socket is in use by another process",
                    ),
                });
            }
            debug!(path = %path.display(), "removing stale socket file");
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path).map_err(|source| DaemonError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        info!(path = %path.display(), "control socket bound");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Serve clients until the daemon stops running.
    pub fn run(&self, daemon: &Daemon) -> Result<(), DaemonError> {
        let mut client: Option<Client> = None;
        while daemon.running() {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if client.is_some() {
                        // One controller at a time; newcomers are
                        // dropped rather than queued.
                        debug!("rejecting concurrent client connection");
                        drop(stream);
                    } else {
                        stream.set_nonblocking(true)?;
                        debug!("client connected");
                        client = Some(Client::new(stream));
                    }
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => {}
                Err(error) => {
                    warn!(%error, "accept failed");
                    thread::sleep(ERROR_BACKOFF);
                    continue;
                }
            }
            let idle = match client.as_mut() {
                Some(active) => {
                    let state = active.poll(daemon);
                    if state == ClientState::Disconnected {
                        debug!("client disconnected");
                        client = None;
                    }
                    state != ClientState::Progressed
                }
                None => true,
            };
            if idle {
                thread::sleep(POLL_BACKOFF);
            }
        }
        Ok(())
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ClientState {
    /// Read at least one chunk this poll.
    Progressed,
    /// Nothing to read yet.
    Idle,
    /// Clean EOF or a fatal stream error.
    Disconnected,
}

/// A connected client with its partial-frame buffer.
struct Client {
    stream: UnixStream,
    buffer: Vec<u8>,
}

impl Client {
    fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    fn poll(&mut self, daemon: &Daemon) -> ClientState {
        let mut chunk = [0u8; 4096];
        match self.stream.read(&mut chunk) {
            Ok(0) => ClientState::Disconnected,
            Ok(read) => {
                self.buffer.extend_from_slice(&chunk[..read]);
                match self.dispatch_frames(daemon) {
                    Ok(()) => ClientState::Progressed,
                    Err(error) => {
                        warn!(%error, "client write failed");
                        ClientState::Disconnected
                    }
                }
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => ClientState::Idle,
            Err(error) if error.kind() == ErrorKind::Interrupted => ClientState::Idle,
            Err(error) => {
                warn!(%error, "client read failed");
                ClientState::Disconnected
            }
        }
    }

    /// Dispatch every complete NUL-terminated frame in the buffer.
    fn dispatch_frames(&mut self, daemon: &Daemon) -> std::io::Result<()> {
        while let Some(end) = self.buffer.iter().position(|&byte| byte == 0) {
            let frame: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&frame[..frame.len() - 1]);
            if line.trim().is_empty() {
                continue;
            }
            let response = daemon.handle_line(&line);
            self.stream.write_all(response.render().as_bytes())?;
            self.stream.flush()?;
        }
        Ok(())
    }
}
