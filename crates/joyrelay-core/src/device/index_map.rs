//! Reverse lookup from raw OS event codes to report slots.

use std::collections::HashMap;

use super::config::DeviceConfig;
use super::EventClass;

/// Maps `(class, code)` pairs from raw events to the report slot the code
/// occupies in the device config.
///
/// Built once per config; lookups are per-event on the hot path.
#[derive(Debug, Default)]
pub struct SlotMap {
    abs: HashMap<u32, usize>,
    rel: HashMap<u32, usize>,
    buttons: HashMap<u32, usize>,
}

impl SlotMap {
    /// Indexes every descriptor of `config` by its event code.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            abs: config
                .abs_axes
                .iter()
                .enumerate()
                .map(|(slot, axis)| (axis.id, slot))
                .collect(),
            rel: index_codes(&config.rel_axes),
            buttons: index_codes(&config.buttons),
        }
    }

    /// The report slot for `code` within `class`, or `None` when the config
    /// does not describe that code.  Sync events have no slot.
    pub fn slot(&self, class: EventClass, code: u32) -> Option<usize> {
        let table = match class {
            EventClass::Absolute => &self.abs,
            EventClass::Relative => &self.rel,
            EventClass::Button => &self.buttons,
            EventClass::Sync => return None,
        };
        table.get(&code).copied()
    }
}

fn index_codes(codes: &[u32]) -> HashMap<u32, usize> {
    codes
        .iter()
        .enumerate()
        .map(|(slot, &code)| (code, slot))
        .collect()
}
