//! Accumulates raw events into the device report and snapshots it on sync.
//!
//! Raw events carry OS event codes; the report carries slot-indexed values.
//! The forwarder resolves each code through the [`SlotMap`] built from the
//! device's config and folds the value into a [`ReportBuffer`].  Nothing is
//! transmitted until the device signals a sync, so a report always captures a
//! consistent device state, and reports leave in the same order the syncs
//! arrived.

use joyrelay_core::{DeviceConfig, EventClass, RawEvent, ReportBuffer, SlotMap};
use tracing::debug;

/// Folds raw events into report snapshots for one device.
pub struct EventForwarder {
    slots: SlotMap,
    report: ReportBuffer,
}

impl EventForwarder {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            slots: SlotMap::from_config(config),
            report: ReportBuffer::for_config(config),
        }
    }

    /// Applies one event.  Returns the report payload to transmit when the
    /// event is a sync marker, `None` otherwise.
    ///
    /// Events whose code the config does not describe are dropped; the
    /// kernel can deliver events for capabilities we chose not to relay.
    pub fn apply(&mut self, event: RawEvent) -> Option<Vec<u8>> {
        if event.class == EventClass::Sync {
            return Some(self.report.as_bytes().to_vec());
        }

        let Some(slot) = self.slots.slot(event.class, event.code) else {
            debug!(?event, "dropping event for undescribed code");
            return None;
        };
        match event.class {
            EventClass::Absolute => self.report.set_abs(slot, event.value),
            EventClass::Relative => self.report.set_rel(slot, event.value),
            EventClass::Button => self.report.set_button(slot, event.value != 0),
            EventClass::Sync => unreachable!(),
        };
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
