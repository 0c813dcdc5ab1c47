//! TCP connection from the client to the relay server.
//!
//! Traffic is one-way: the client sends a config message after connecting
//! and a report message per device sync.  The write path tolerates partial
//! writes and transient errors so a slow or congested server never corrupts
//! the frame stream.

use std::net::SocketAddr;

use joyrelay_core::device::config::ConfigError;
use joyrelay_core::{encode_message, DeviceConfig, MessageTag, WireError};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The server closed the connection, e.g. admission control refused us.
    #[error("connection closed by server")]
    Closed,
    /// The device config could not be serialized.
    #[error("config encode error: {0}")]
    Config(#[from] ConfigError),
    /// A message could not be encoded for the wire.
    #[error("message encode error: {0}")]
    Wire(#[from] WireError),
}

/// An established connection to the relay server.
pub struct ServerConnection {
    stream: TcpStream,
}

impl ServerConnection {
    /// Connects to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientNetworkError::ConnectFailed`] when the TCP connect
    /// fails.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientNetworkError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientNetworkError::ConnectFailed { addr, source })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to server");
        Ok(Self { stream })
    }

    /// Sends the device config.  Must be the first message on a connection.
    pub async fn send_config(&mut self, config: &DeviceConfig) -> Result<(), ClientNetworkError> {
        let wire = encode_message(MessageTag::Config, &config.to_wire()?)?;
        write_all_robust(&mut self.stream, &wire).await
    }

    /// Sends one report payload.
    pub async fn send_report(&mut self, payload: &[u8]) -> Result<(), ClientNetworkError> {
        let wire = encode_message(MessageTag::Report, payload)?;
        write_all_robust(&mut self.stream, &wire).await
    }
}

/// Writes all of `bytes`, surviving partial writes and transient errors.
///
/// A short write advances and retries; `WouldBlock` and `Interrupted` retry
/// without advancing.  A zero-length write means the peer is gone.
async fn write_all_robust<W: AsyncWrite + Unpin>(
    writer: &mut W,
    bytes: &[u8],
) -> Result<(), ClientNetworkError> {
    let mut sent = 0;
    while sent < bytes.len() {
        match writer.write(&bytes[sent..]).await {
            Ok(0) => return Err(ClientNetworkError::Closed),
            Ok(n) => {
                sent += n;
                debug!(sent, total = bytes.len(), "wrote chunk");
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
