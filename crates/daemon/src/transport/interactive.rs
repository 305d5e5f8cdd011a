//! Interactive stdin/stdout session.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::daemon::Daemon;
use crate::error::DaemonError;

/// Run a line-oriented session until `quit` or end of input.
///
/// Blank lines are ignored. Each response is rendered in full before the
/// next line is read, so a scripted caller can pipe commands in and
/// parse the output stream.
pub fn run(daemon: &Daemon) -> Result<(), DaemonError> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    while daemon.running() {
        let Some(line) = lines.next() else {
            debug!("stdin closed, leaving interactive session");
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = daemon.handle_line(&line);
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(response.render().as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}
