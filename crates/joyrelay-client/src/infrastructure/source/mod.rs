//! Physical input-event sources.
//!
//! The forwarding loop reads through the [`EventSource`] trait so it can be
//! tested against the scripted [`mock::ScriptedSource`] while production
//! captures from a Linux evdev node.

use joyrelay_core::{DeviceConfig, RawEvent};
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod evdev;
pub mod mock;

/// Error type for event-source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error on input device: {0}")]
    Io(#[from] std::io::Error),
    /// The device was disconnected or the script ran out.
    #[error("input device is gone")]
    Closed,
}

/// A physical device that can be described once and then read forever.
///
/// `read_events` blocks; drive it from a blocking thread.
pub trait EventSource {
    /// Queries the device's identity, capabilities, and axis ranges.
    fn describe(&mut self) -> Result<DeviceConfig, SourceError>;

    /// Blocks until at least one event is available and returns the batch.
    fn read_events(&mut self) -> Result<Vec<RawEvent>, SourceError>;
}
