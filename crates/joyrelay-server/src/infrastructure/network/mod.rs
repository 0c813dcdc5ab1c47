//! TCP listener, slot table, and per-connection read pumps.
//!
//! The whole server runs on one thread inside a `tokio::task::LocalSet`:
//! each accepted connection gets a `spawn_local` task that pumps bytes into
//! its [`Session`], and the slot table is shared through `Rc<RefCell<..>>`
//! without any locking.
//!
//! Admission control happens at accept time.  The slot table has a fixed
//! capacity; when it is full the new socket is accepted and immediately
//! dropped, which the client observes as a refused session rather than a
//! connect timeout.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use crate::application::Session;
use crate::infrastructure::device::DeviceDriver;
use crate::infrastructure::storage::{KeepaliveSettings, ServerSettings};

/// Pending-connection queue length passed to `listen(2)`.
const LISTEN_BACKLOG: u32 = 4;

/// Read chunk size for the per-connection pump.
const READ_BUF_SIZE: usize = 2048;

/// Error type for server setup and accept-loop failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

// ── Slot table ────────────────────────────────────────────────────────────────

/// Fixed-capacity table of live connections.
struct SlotTable {
    capacity: usize,
    active: HashMap<usize, SocketAddr>,
}

impl SlotTable {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            active: HashMap::with_capacity(capacity),
        }
    }

    /// Claims the lowest free slot id, or `None` when the table is full.
    fn acquire(&mut self, peer: SocketAddr) -> Option<usize> {
        let slot = (0..self.capacity).find(|id| !self.active.contains_key(id))?;
        self.active.insert(slot, peer);
        Some(slot)
    }

    fn release(&mut self, slot: usize) {
        self.active.remove(&slot);
    }

    fn len(&self) -> usize {
        self.active.len()
    }
}

/// RAII claim on a slot; releases it when the connection task ends.
struct SlotGuard {
    table: Rc<RefCell<SlotTable>>,
    slot: usize,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.table.borrow_mut().release(self.slot);
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// The relay server: listener plus shared slot table and device driver.
pub struct Server<D: DeviceDriver> {
    listener: TcpListener,
    slots: Rc<RefCell<SlotTable>>,
    driver: Rc<D>,
    keepalive: KeepaliveSettings,
}

impl<D: DeviceDriver + 'static> Server<D> {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidAddress`] for an unparseable bind
    /// address and [`ServerError::BindFailed`] when the socket cannot be
    /// bound or put into listening state.
    pub fn bind(settings: &ServerSettings, driver: Rc<D>) -> Result<Self, ServerError> {
        let addr: SocketAddr = format!(
            "{}:{}",
            settings.network.bind_address, settings.network.port
        )
        .parse()
        .map_err(|source| ServerError::InvalidAddress {
            addr: settings.network.bind_address.clone(),
            source,
        })?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(|source| ServerError::BindFailed { addr, source })?;
        socket
            .set_reuseaddr(true)
            .and_then(|()| socket.bind(addr))
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let listener = socket
            .listen(LISTEN_BACKLOG)
            .map_err(|source| ServerError::BindFailed { addr, source })?;

        info!(%addr, max_clients = settings.network.max_clients, "listening");

        Ok(Self {
            listener,
            slots: Rc::new(RefCell::new(SlotTable::new(settings.network.max_clients))),
            driver,
            keepalive: settings.keepalive.clone(),
        })
    }

    /// The actual bound address, useful when the port was 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop.  Must be polled from inside a `LocalSet`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Accept`] only for accept failures that signal
    /// a broken listener; per-connection errors end that connection's task.
    pub async fn run(&self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self.listener.accept().await.map_err(ServerError::Accept)?;

            let slot = self.slots.borrow_mut().acquire(peer);
            let Some(slot) = slot else {
                warn!(%peer, "refusing connection: all slots in use");
                drop(stream);
                continue;
            };

            if let Err(e) = tune_keepalive(&stream, &self.keepalive) {
                warn!(%peer, error = %e, "keepalive setup failed");
            }

            info!(%peer, slot, active = self.slots.borrow().len(), "client connected");

            let guard = SlotGuard {
                table: Rc::clone(&self.slots),
                slot,
            };
            let session = Session::new(Rc::clone(&self.driver), slot);
            tokio::task::spawn_local(async move {
                connection_pump(stream, session, peer).await;
                drop(guard);
            });
        }
    }
}

/// Reads the socket until EOF or error, feeding every chunk to the session.
async fn connection_pump<D: DeviceDriver>(
    mut stream: TcpStream,
    mut session: Session<D>,
    peer: SocketAddr,
) {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                info!(%peer, "client disconnected");
                break;
            }
            Ok(n) => {
                debug!(%peer, bytes = n, "received");
                session.ingest(&buf[..n]);
            }
            Err(e) => {
                warn!(%peer, error = %e, "read failed, closing connection");
                break;
            }
        }
    }
    session.close();
}

// ── Keepalive tuning ──────────────────────────────────────────────────────────

/// Arms TCP keepalive probing so a vanished client is detected and its slot
/// and virtual device reclaimed.
#[cfg(target_os = "linux")]
fn tune_keepalive(stream: &TcpStream, settings: &KeepaliveSettings) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    fn setsockopt(
        fd: libc::c_int,
        level: libc::c_int,
        name: libc::c_int,
        value: libc::c_int,
    ) -> std::io::Result<()> {
        // SAFETY: value points to a c_int for the whole call.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                level,
                name,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    let fd = stream.as_raw_fd();
    setsockopt(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1)?;
    setsockopt(
        fd,
        libc::IPPROTO_TCP,
        libc::TCP_KEEPIDLE,
        settings.idle_secs as libc::c_int,
    )?;
    setsockopt(
        fd,
        libc::IPPROTO_TCP,
        libc::TCP_KEEPINTVL,
        settings.interval_secs as libc::c_int,
    )?;
    setsockopt(
        fd,
        libc::IPPROTO_TCP,
        libc::TCP_KEEPCNT,
        settings.probes as libc::c_int,
    )?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn tune_keepalive(_stream: &TcpStream, _settings: &KeepaliveSettings) -> std::io::Result<()> {
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
