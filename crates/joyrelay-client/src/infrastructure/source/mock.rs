//! Scripted event source for unit testing.
//!
//! Plays back a fixed config and a queue of event batches, then reports the
//! device as gone.  This stands in for a real evdev node, which needs actual
//! hardware and read permissions on `/dev/input`.

use std::collections::VecDeque;

use joyrelay_core::{DeviceConfig, RawEvent};

use super::{EventSource, SourceError};

/// A source that replays pre-recorded batches.
pub struct ScriptedSource {
    config: DeviceConfig,
    batches: VecDeque<Vec<RawEvent>>,
}

impl ScriptedSource {
    pub fn new(config: DeviceConfig, batches: Vec<Vec<RawEvent>>) -> Self {
        Self {
            config,
            batches: batches.into(),
        }
    }
}

impl EventSource for ScriptedSource {
    fn describe(&mut self) -> Result<DeviceConfig, SourceError> {
        Ok(self.config.clone())
    }

    fn read_events(&mut self) -> Result<Vec<RawEvent>, SourceError> {
        self.batches.pop_front().ok_or(SourceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joyrelay_core::EventClass;

    #[test]
    fn test_batches_replay_in_order_then_close() {
        let press = RawEvent { class: EventClass::Button, code: 0x130, value: 1 };
        let mut source = ScriptedSource::new(
            DeviceConfig::default(),
            vec![vec![press, RawEvent::SYNC], vec![RawEvent::SYNC]],
        );

        assert_eq!(source.read_events().unwrap(), vec![press, RawEvent::SYNC]);
        assert_eq!(source.read_events().unwrap(), vec![RawEvent::SYNC]);
        assert!(matches!(source.read_events(), Err(SourceError::Closed)));
    }
}
