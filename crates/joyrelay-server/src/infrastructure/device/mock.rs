//! Mock device driver for unit testing.
//!
//! The real driver registers devices with the kernel through `/dev/uinput`,
//! which needs root and actually creates input nodes on the test machine.
//! `RecordingDriver` replaces every OS call with in-memory recording so tests
//! can assert exactly which devices were created and which events were
//! injected, in order.
//!
//! Set `fail_create` before a test to simulate the kernel rejecting the
//! device; this exercises the session's create-failure path.

use std::cell::{Cell, RefCell};

use joyrelay_core::{DeviceConfig, RawEvent};

use super::{DeviceDriver, DriverError};

/// One recorded driver call.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DriverCall {
    Created { device: u32, name: String },
    Emitted { device: u32, event: RawEvent },
    Destroyed { device: u32 },
}

/// A driver that records all calls without touching the OS.
///
/// Server sessions run on one thread, so plain `RefCell`/`Cell` interior
/// mutability is enough; tests share the driver through an `Rc`.
#[derive(Default)]
pub struct RecordingDriver {
    pub calls: RefCell<Vec<DriverCall>>,
    /// When `true`, `create` fails with a platform error.
    pub fail_create: Cell<bool>,
    next_id: Cell<u32>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The events emitted to device `device`, in emission order.
    pub fn events_for(&self, device: u32) -> Vec<RawEvent> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Emitted { device: d, event } if *d == device => Some(*event),
                _ => None,
            })
            .collect()
    }

    /// Count of devices created so far.
    pub fn created_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DriverCall::Created { .. }))
            .count()
    }

    /// Whether device `device` has been destroyed.
    pub fn is_destroyed(&self, device: u32) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| matches!(call, DriverCall::Destroyed { device: d } if *d == device))
    }
}

impl DeviceDriver for RecordingDriver {
    type Handle = u32;

    fn create(&self, config: &DeviceConfig) -> Result<u32, DriverError> {
        if self.fail_create.get() {
            return Err(DriverError::Platform("mock create failure".into()));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.calls.borrow_mut().push(DriverCall::Created {
            device: id,
            name: config.name.clone(),
        });
        Ok(id)
    }

    fn emit(&self, handle: &mut u32, event: RawEvent) -> Result<(), DriverError> {
        self.calls.borrow_mut().push(DriverCall::Emitted {
            device: *handle,
            event,
        });
        Ok(())
    }

    fn destroy(&self, handle: u32) -> Result<(), DriverError> {
        self.calls
            .borrow_mut()
            .push(DriverCall::Destroyed { device: handle });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joyrelay_core::EventClass;

    fn config() -> DeviceConfig {
        DeviceConfig {
            name: "mock-pad".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let driver = RecordingDriver::new();
        assert_eq!(driver.create(&config()).unwrap(), 0);
        assert_eq!(driver.create(&config()).unwrap(), 1);
        assert_eq!(driver.created_count(), 2);
    }

    #[test]
    fn test_events_are_recorded_per_device() {
        let driver = RecordingDriver::new();
        let mut a = driver.create(&config()).unwrap();
        let mut b = driver.create(&config()).unwrap();

        let press = RawEvent { class: EventClass::Button, code: 0x130, value: 1 };
        driver.emit(&mut a, press).unwrap();
        driver.emit(&mut b, RawEvent::SYNC).unwrap();

        assert_eq!(driver.events_for(a), vec![press]);
        assert_eq!(driver.events_for(b), vec![RawEvent::SYNC]);
    }

    #[test]
    fn test_fail_create_returns_platform_error() {
        let driver = RecordingDriver::new();
        driver.fail_create.set(true);
        assert!(matches!(
            driver.create(&config()),
            Err(DriverError::Platform(_))
        ));
        assert_eq!(driver.created_count(), 0);
    }
}
