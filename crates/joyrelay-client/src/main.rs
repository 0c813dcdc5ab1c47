//! joyrelay entry point.
//!
//! Captures events from one local input device and relays its state to a
//! joyrelayd server:
//!
//! ```text
//! main()
//!  └─ EvdevSource::open()   -- describe the physical device
//!  └─ spawn_blocking        -- blocking evdev read loop -> mpsc
//!  └─ forward loop          -- fold events, send a report per sync,
//!                              reconnect when the server drops us
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use joyrelay_client::application::EventForwarder;
use joyrelay_client::infrastructure::network::ServerConnection;
use joyrelay_core::RawEvent;

#[derive(Parser, Debug)]
#[command(name = "joyrelay", about = "Relay a local input device to a joyrelayd server")]
struct Cli {
    /// Input device node, e.g. /dev/input/event3.
    device: PathBuf,

    /// Server address, e.g. 192.168.1.10:4444.
    server: SocketAddr,

    /// Seconds to wait between reconnect attempts.
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,
}

#[cfg(target_os = "linux")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use joyrelay_client::infrastructure::source::evdev::EvdevSource;
    use joyrelay_client::infrastructure::source::EventSource;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut source = EvdevSource::open(&cli.device)
        .with_context(|| format!("opening {}", cli.device.display()))?;
    let config = source.describe().context("describing device")?;
    info!(
        name = %config.name,
        abs = config.abs_axes.len(),
        rel = config.rel_axes.len(),
        buttons = config.buttons.len(),
        "capturing device"
    );

    // Blocking evdev reads happen off the async runtime; the channel closes
    // when the device goes away, which ends the forward loop.
    let (tx, mut rx) = mpsc::channel::<RawEvent>(256);
    let reader = tokio::task::spawn_blocking(move || loop {
        match source.read_events() {
            Ok(events) => {
                for event in events {
                    if tx.blocking_send(event).is_err() {
                        return Ok(());
                    }
                }
            }
            Err(e) => return Err(e),
        }
    });

    let mut forwarder = EventForwarder::new(&config);
    let reconnect = Duration::from_secs(cli.reconnect_secs);

    'reconnect: loop {
        let mut connection = loop {
            match ServerConnection::connect(cli.server).await {
                Ok(connection) => break connection,
                Err(e) => {
                    warn!(error = %e, "connect failed, retrying in {}s", cli.reconnect_secs);
                    tokio::time::sleep(reconnect).await;
                }
            }
        };
        if let Err(e) = connection.send_config(&config).await {
            warn!(error = %e, "config send failed");
            tokio::time::sleep(reconnect).await;
            continue 'reconnect;
        }
        info!("device configured on server");

        while let Some(event) = rx.recv().await {
            if let Some(report) = forwarder.apply(event) {
                if let Err(e) = connection.send_report(&report).await {
                    warn!(error = %e, "report send failed, reconnecting");
                    continue 'reconnect;
                }
            }
        }

        // Channel closed: the device is gone.
        break;
    }

    match reader.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e).context("reading input device"),
        Err(e) => Err(e).context("device reader task"),
    }
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    let _ = Cli::parse();
    anyhow::bail!("joyrelay captures devices through Linux evdev")
}
