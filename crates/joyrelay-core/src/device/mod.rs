//! Device model: configuration, state reports, and raw-event vocabulary.
//!
//! A device is described once per connection by a [`DeviceConfig`] and then
//! streamed as state reports.  Report slot *i* always corresponds to config
//! descriptor slot *i* — raw OS event codes never appear in a report, only
//! in the config's descriptor ids.

pub mod config;
pub mod index_map;
pub mod report;

pub use config::{AbsAxisSpec, DeviceConfig};
pub use index_map::SlotMap;
pub use report::{ReportBuffer, ReportLayout, ReportView};

/// The classes of input events a device can produce.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum EventClass {
    /// Absolute axis (stick position, trigger travel).
    Absolute,
    /// Relative axis (wheel/trackball deltas).
    Relative,
    /// Button / key, value 0 or 1.
    Button,
    /// Synchronization marker: the device state is consistent and may be
    /// flushed.
    Sync,
}

/// One raw event as produced by a physical device or consumed by a virtual
/// one.  `code` is the OS-level event id; it is only ever passed through,
/// never interpreted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RawEvent {
    pub class: EventClass,
    pub code: u32,
    pub value: i32,
}

impl RawEvent {
    /// The synchronization marker event.
    pub const SYNC: RawEvent = RawEvent {
        class: EventClass::Sync,
        code: 0,
        value: 0,
    };
}
