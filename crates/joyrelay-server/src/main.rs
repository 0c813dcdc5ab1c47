//! joyrelayd entry point.
//!
//! Builds a current-thread Tokio runtime so every connection task shares the
//! slot table without locks, then runs the accept loop until it fails or the
//! process is signalled.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use joyrelay_server::infrastructure::storage::ServerSettings;

#[derive(Parser, Debug)]
#[command(name = "joyrelayd", about = "Virtual joystick relay server")]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, env = "JOYRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port, overriding the settings file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Connection slots, overriding the settings file.
    #[arg(long)]
    max_clients: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    // Structured logging; level overridden by RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => ServerSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ServerSettings::default(),
    };
    if let Some(port) = cli.port {
        settings.network.port = port;
    }
    if let Some(max_clients) = cli.max_clients {
        settings.network.max_clients = max_clients;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        info!("joyrelayd starting");
        serve(&settings).await
    })
}

#[cfg(target_os = "linux")]
async fn serve(settings: &ServerSettings) -> anyhow::Result<()> {
    use std::rc::Rc;

    use joyrelay_server::infrastructure::device::uinput::UinputDriver;
    use joyrelay_server::infrastructure::network::Server;

    let server = Server::bind(settings, Rc::new(UinputDriver::new()))?;
    tokio::select! {
        result = server.run() => result.map_err(Into::into),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}

// Without uinput the server still runs, against the recording driver; useful
// for protocol testing on development machines.
#[cfg(not(target_os = "linux"))]
async fn serve(settings: &ServerSettings) -> anyhow::Result<()> {
    use std::rc::Rc;

    use joyrelay_server::infrastructure::device::mock::RecordingDriver;
    use joyrelay_server::infrastructure::network::Server;
    use tracing::warn;

    warn!("no uinput on this platform; events will be recorded, not injected");
    let server = Server::bind(settings, Rc::new(RecordingDriver::new()))?;
    tokio::select! {
        result = server.run() => result.map_err(Into::into),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
