//! Per-connection protocol session.
//!
//! A session owns the receive pipeline for one client: frame decoding,
//! envelope validation, and message dispatch into the device driver.  It is a
//! three-phase state machine:
//!
//! ```text
//! AwaitingConfig ──(valid config, device created)──▶ Configured ──▶ Terminated
//! ```
//!
//! Malformed input never terminates a session.  Oversized or corrupt frames,
//! bad envelopes, unknown tags, wrong-sized reports, and out-of-phase
//! messages are each logged and skipped; the stream stays in sync because
//! frame delimiters are self-synchronising.  Only the peer closing the
//! connection (or dropping the session) ends it, at which point the virtual
//! device is destroyed.

use std::rc::Rc;

use joyrelay_core::{
    decode_envelope, DeviceConfig, FrameDecoder, FrameProgress, MessageTag, RawEvent,
    ReportLayout, ReportView, CONFIG_WIRE_SIZE,
};
use tracing::{debug, info, warn};

use crate::infrastructure::device::DeviceDriver;

/// Receive buffer ceiling: the config message is the largest legal frame.
const MAX_FRAME_SIZE: usize = CONFIG_WIRE_SIZE + 8;

enum Phase<H> {
    AwaitingConfig,
    Configured {
        config: DeviceConfig,
        layout: ReportLayout,
        handle: H,
    },
    Terminated,
}

/// One client's protocol session.
///
/// Dropping a configured session destroys its virtual device.
pub struct Session<D: DeviceDriver> {
    driver: Rc<D>,
    decoder: FrameDecoder,
    phase: Phase<D::Handle>,
    slot: usize,
}

impl<D: DeviceDriver> Session<D> {
    pub fn new(driver: Rc<D>, slot: usize) -> Self {
        Self {
            driver,
            decoder: FrameDecoder::new(MAX_FRAME_SIZE),
            phase: Phase::AwaitingConfig,
            slot,
        }
    }

    /// Whether a config has been accepted and a device exists.
    pub fn is_configured(&self) -> bool {
        matches!(self.phase, Phase::Configured { .. })
    }

    /// Feeds received bytes through the decode pipeline, dispatching every
    /// completed message.
    pub fn ingest(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match self.decoder.decode_byte(byte) {
                Ok(FrameProgress::Consumed) => {}
                Ok(FrameProgress::EndOfFrame) => {
                    // Back-to-back messages produce empty frames between the
                    // trailing and leading delimiters; skip them silently.
                    if !self.decoder.frame().is_empty() {
                        self.dispatch_frame();
                    }
                    self.decoder.reset();
                }
                Err(e) => {
                    warn!(slot = self.slot, error = %e, "dropping frame");
                    self.decoder.reset();
                }
            }
        }
    }

    /// Tears the session down, destroying the virtual device if one exists.
    pub fn close(&mut self) {
        if let Phase::Configured { handle, config, .. } =
            std::mem::replace(&mut self.phase, Phase::Terminated)
        {
            info!(slot = self.slot, name = %config.name, "destroying virtual device");
            if let Err(e) = self.driver.destroy(handle) {
                warn!(slot = self.slot, error = %e, "device destroy failed");
            }
        }
    }

    fn dispatch_frame(&mut self) {
        let envelope = match decode_envelope(self.decoder.frame()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(slot = self.slot, error = %e, "dropping invalid envelope");
                return;
            }
        };

        match MessageTag::try_from(envelope.tag) {
            Ok(MessageTag::Config) => {
                let payload = envelope.payload.to_vec();
                self.on_config(&payload);
            }
            Ok(MessageTag::Report) => {
                let payload = envelope.payload.to_vec();
                self.on_report(&payload);
            }
            Err(e) => {
                warn!(slot = self.slot, error = %e, "ignoring message");
            }
        }
    }

    fn on_config(&mut self, payload: &[u8]) {
        if !matches!(self.phase, Phase::AwaitingConfig) {
            warn!(slot = self.slot, "ignoring config on configured session");
            return;
        }

        let config = match DeviceConfig::from_wire(payload) {
            Ok(config) => config,
            Err(e) => {
                warn!(slot = self.slot, error = %e, "rejecting malformed config");
                return;
            }
        };

        match self.driver.create(&config) {
            Ok(handle) => {
                info!(
                    slot = self.slot,
                    name = %config.name,
                    abs = config.abs_axes.len(),
                    rel = config.rel_axes.len(),
                    buttons = config.buttons.len(),
                    "virtual device created"
                );
                let layout = config.report_layout();
                self.phase = Phase::Configured {
                    config,
                    layout,
                    handle,
                };
            }
            Err(e) => {
                // Stay in AwaitingConfig; the client may retry with a new
                // config on the same connection.
                warn!(slot = self.slot, error = %e, "device create failed");
            }
        }
    }

    fn on_report(&mut self, payload: &[u8]) {
        let Phase::Configured {
            config,
            layout,
            handle,
        } = &mut self.phase
        else {
            debug!(slot = self.slot, "ignoring report before config");
            return;
        };

        let view = match ReportView::new(*layout, payload) {
            Ok(view) => view,
            Err(e) => {
                warn!(slot = self.slot, error = %e, "dropping report");
                return;
            }
        };

        // Replay the full device state, slot by slot, then sync.
        for (axis, value) in config.abs_axes.iter().zip(view.abs_values()) {
            emit(&self.driver, handle, self.slot, RawEvent {
                class: joyrelay_core::EventClass::Absolute,
                code: axis.id,
                value,
            });
        }
        for (&code, value) in config.rel_axes.iter().zip(view.rel_values()) {
            emit(&self.driver, handle, self.slot, RawEvent {
                class: joyrelay_core::EventClass::Relative,
                code,
                value,
            });
        }
        for (&code, value) in config.buttons.iter().zip(view.button_values()) {
            emit(&self.driver, handle, self.slot, RawEvent {
                class: joyrelay_core::EventClass::Button,
                code,
                value: i32::from(value),
            });
        }
        emit(&self.driver, handle, self.slot, RawEvent::SYNC);
    }
}

fn emit<D: DeviceDriver>(driver: &Rc<D>, handle: &mut D::Handle, slot: usize, event: RawEvent) {
    if let Err(e) = driver.emit(handle, event) {
        warn!(slot, error = %e, "event injection failed");
    }
}

impl<D: DeviceDriver> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::device::mock::{DriverCall, RecordingDriver};
    use joyrelay_core::{encode_message, AbsAxisSpec, EventClass, ReportBuffer};

    fn gamepad() -> DeviceConfig {
        DeviceConfig {
            name: "pad".into(),
            vendor_id: 0xDEAD,
            product_id: 0xBEEF,
            abs_axes: vec![
                AbsAxisSpec { id: 0, min: -16384, max: 16384, ..Default::default() },
                AbsAxisSpec { id: 1, min: -16384, max: 16384, ..Default::default() },
            ],
            rel_axes: vec![],
            buttons: (0x130..0x138).collect(),
        }
    }

    fn session() -> (Rc<RecordingDriver>, Session<RecordingDriver>) {
        let driver = Rc::new(RecordingDriver::new());
        let session = Session::new(Rc::clone(&driver), 0);
        (driver, session)
    }

    fn config_bytes(config: &DeviceConfig) -> Vec<u8> {
        encode_message(MessageTag::Config, &config.to_wire().unwrap()).unwrap()
    }

    #[test]
    fn test_config_creates_device() {
        let (driver, mut session) = session();
        session.ingest(&config_bytes(&gamepad()));
        assert!(session.is_configured());
        assert_eq!(driver.created_count(), 1);
    }

    #[test]
    fn test_report_replays_state_and_syncs() {
        let (driver, mut session) = session();
        let config = gamepad();
        session.ingest(&config_bytes(&config));

        let mut report = ReportBuffer::for_config(&config);
        report.set_abs(0, 16384);
        report.set_abs(1, -16384);
        report.set_button(3, true);
        session.ingest(&encode_message(MessageTag::Report, report.as_bytes()).unwrap());

        let events = driver.events_for(0);
        assert_eq!(events.len(), 2 + 8 + 1);
        assert_eq!(
            events[0],
            RawEvent { class: EventClass::Absolute, code: 0, value: 16384 }
        );
        assert_eq!(
            events[1],
            RawEvent { class: EventClass::Absolute, code: 1, value: -16384 }
        );
        assert_eq!(
            events[2 + 3],
            RawEvent { class: EventClass::Button, code: 0x133, value: 1 }
        );
        assert_eq!(*events.last().unwrap(), RawEvent::SYNC);
    }

    #[test]
    fn test_report_before_config_is_ignored() {
        let (driver, mut session) = session();
        session.ingest(&encode_message(MessageTag::Report, &[0; 9]).unwrap());
        assert!(driver.calls.borrow().is_empty());
        assert!(!session.is_configured());
    }

    #[test]
    fn test_second_config_is_ignored() {
        let (driver, mut session) = session();
        session.ingest(&config_bytes(&gamepad()));
        session.ingest(&config_bytes(&gamepad()));
        assert_eq!(driver.created_count(), 1);
    }

    #[test]
    fn test_create_failure_leaves_session_awaiting_config() {
        let (driver, mut session) = session();
        driver.fail_create.set(true);
        session.ingest(&config_bytes(&gamepad()));
        assert!(!session.is_configured());

        // A later config on the same connection can still succeed.
        driver.fail_create.set(false);
        session.ingest(&config_bytes(&gamepad()));
        assert!(session.is_configured());
    }

    #[test]
    fn test_corrupt_envelope_does_not_kill_session() {
        let (driver, mut session) = session();
        let mut wire = config_bytes(&gamepad());
        let mid = wire.len() / 2;
        wire[mid] ^= 0x01;
        session.ingest(&wire);
        assert!(!session.is_configured());

        session.ingest(&config_bytes(&gamepad()));
        assert!(session.is_configured());
        assert_eq!(driver.created_count(), 1);
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let (driver, mut session) = session();
        session.ingest(&config_bytes(&gamepad()));

        // Hand-build an envelope with a reserved tag through the public
        // encoder by corrupting nothing: craft tag 7 manually.
        let payload = [0u8];
        let mut body = Vec::new();
        body.extend_from_slice(&7u16.to_le_bytes());
        body.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        body.extend_from_slice(&payload);
        let sum: u16 = body.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        body.extend_from_slice(&sum.to_le_bytes());

        let mut wire = vec![0xC0];
        wire.extend_from_slice(&body);
        wire.push(0xC0);
        session.ingest(&wire);

        // Only the device creation is recorded.
        assert_eq!(driver.calls.borrow().len(), 1);
    }

    #[test]
    fn test_wrong_sized_report_is_dropped() {
        let (driver, mut session) = session();
        session.ingest(&config_bytes(&gamepad()));
        session.ingest(&encode_message(MessageTag::Report, &[0; 3]).unwrap());
        assert_eq!(driver.events_for(0), vec![]);
    }

    #[test]
    fn test_oversized_frame_is_dropped_and_stream_recovers() {
        let (_driver, mut session) = session();
        let huge = vec![0x55u8; MAX_FRAME_SIZE + 16];
        let mut wire = vec![0xC0];
        wire.extend_from_slice(&huge);
        wire.push(0xC0);
        session.ingest(&wire);

        session.ingest(&config_bytes(&gamepad()));
        assert!(session.is_configured());
    }

    #[test]
    fn test_torn_delivery_is_reassembled() {
        let (driver, mut session) = session();
        let wire = config_bytes(&gamepad());
        for chunk in wire.chunks(7) {
            session.ingest(chunk);
        }
        assert_eq!(driver.created_count(), 1);
    }

    #[test]
    fn test_drop_destroys_device() {
        let (driver, mut session) = session();
        session.ingest(&config_bytes(&gamepad()));
        drop(session);
        assert!(driver.is_destroyed(0));
        assert_eq!(
            driver.calls.borrow().last(),
            Some(&DriverCall::Destroyed { device: 0 })
        );
    }

    #[test]
    fn test_drop_without_config_destroys_nothing() {
        let (driver, session) = session();
        drop(session);
        assert!(driver.calls.borrow().is_empty());
    }
}
