//! voipd binary entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use voipd_daemon::{transport, Daemon};
use voipd_engine_core::{SoftEngine, SoftEngineConfig};

/// Control daemon exposing a telephony engine over a text protocol.
#[derive(Debug, Parser)]
#[command(name = "voipd", version, about)]
struct Args {
    /// Serve a unix control socket at this path instead of stdin/stdout.
    #[arg(long, value_name = "PATH")]
    pipe: Option<PathBuf>,

    /// Print the command reference as HTML and exit.
    #[arg(long)]
    dump_commands_help_html: bool,

    /// Log filter when RUST_LOG is not set (e.g. "info", "voipd_daemon=debug").
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the command protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.dump_commands_help_html {
        print!(
            "{}",
            voipd_daemon::commands::build_registry().dump_help_html()
        );
        return Ok(());
    }

    let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
    let interactive = args.pipe.is_none();
    let mut daemon =
        Daemon::start(Box::new(engine), interactive).context("failed to start daemon")?;

    let result = match &args.pipe {
        Some(path) => run_pipe(&daemon, path),
        None => transport::interactive::run(&daemon).map_err(Into::into),
    };

    daemon.shutdown();
    info!("exiting");
    result
}

#[cfg(unix)]
fn run_pipe(daemon: &Daemon, path: &std::path::Path) -> anyhow::Result<()> {
    let server = transport::pipe::PipeServer::bind(path)
        .with_context(|| format!("failed to serve control socket {}", path.display()))?;
    server.run(daemon)?;
    Ok(())
}

#[cfg(not(unix))]
fn run_pipe(_daemon: &Daemon, _path: &std::path::Path) -> anyhow::Result<()> {
    anyhow::bail!("--pipe is only supported on unix platforms")
}
