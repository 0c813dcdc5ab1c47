//! Virtual-device drivers.
//!
//! The protocol handler talks to the OS through the [`DeviceDriver`] trait so
//! that sessions can be unit-tested against the in-memory
//! [`mock::RecordingDriver`] while production uses the Linux uinput driver.

use joyrelay_core::{DeviceConfig, RawEvent};
use thiserror::Error;

pub mod mock;
#[cfg(target_os = "linux")]
pub mod uinput;

/// Error type for virtual-device operations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error on virtual device: {0}")]
    Io(#[from] std::io::Error),
    #[error("device platform error: {0}")]
    Platform(String),
}

/// Creates, feeds, and tears down one virtual input device per connection.
///
/// `create` is called once when a connection's config is accepted and returns
/// a handle the session owns for its lifetime; `destroy` releases the OS
/// resources behind that handle.
pub trait DeviceDriver {
    type Handle;

    /// Registers a new virtual device shaped like `config`.
    fn create(&self, config: &DeviceConfig) -> Result<Self::Handle, DriverError>;

    /// Injects one event into the virtual device.
    fn emit(&self, handle: &mut Self::Handle, event: RawEvent) -> Result<(), DriverError>;

    /// Unregisters the virtual device.
    fn destroy(&self, handle: Self::Handle) -> Result<(), DriverError>;
}
