//! Pipeline test: scripted device -> forwarder -> wire -> decoded report.
//!
//! Exercises the same path the binary drives, minus the socket: events come
//! from a scripted source, the forwarder snapshots on sync, and the payload
//! is pushed through the real codec before being checked.

use joyrelay_client::application::EventForwarder;
use joyrelay_client::infrastructure::source::mock::ScriptedSource;
use joyrelay_client::infrastructure::source::{EventSource, SourceError};
use joyrelay_core::{
    decode_envelope, encode_message, AbsAxisSpec, DeviceConfig, EventClass, FrameDecoder,
    FrameProgress, MessageTag, RawEvent, ReportView,
};

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

fn abs(code: u32, value: i32) -> RawEvent {
    RawEvent { class: EventClass::Absolute, code, value }
}

fn button(code: u32, value: i32) -> RawEvent {
    RawEvent { class: EventClass::Button, code, value }
}

/// Decodes one report payload from an encoded wire message.
fn decode_report(wire: &[u8]) -> Vec<u8> {
    let mut decoder = FrameDecoder::new(wire.len());
    for &b in wire {
        if decoder.decode_byte(b).unwrap() == FrameProgress::EndOfFrame
            && !decoder.frame().is_empty()
        {
            let envelope = decode_envelope(decoder.frame()).unwrap();
            assert_eq!(envelope.tag, MessageTag::Report as u16);
            return envelope.payload.to_vec();
        }
    }
    panic!("no frame in wire bytes");
}

#[test]
fn test_stick_and_button_reach_the_wire() {
    let config = gamepad();
    let mut source = ScriptedSource::new(
        config.clone(),
        vec![vec![
            abs(0, 16384),
            abs(1, -16384),
            button(0x133, 1),
            RawEvent::SYNC,
        ]],
    );

    let described = source.describe().unwrap();
    let mut forwarder = EventForwarder::new(&described);

    let mut reports = Vec::new();
    loop {
        let batch = match source.read_events() {
            Ok(batch) => batch,
            Err(SourceError::Closed) => break,
            Err(e) => panic!("unexpected source error: {e}"),
        };
        for event in batch {
            if let Some(payload) = forwarder.apply(event) {
                reports.push(encode_message(MessageTag::Report, &payload).unwrap());
            }
        }
    }

    assert_eq!(reports.len(), 1, "one sync, one report");
    let payload = decode_report(&reports[0]);
    let view = ReportView::new(config.report_layout(), &payload).unwrap();
    assert_eq!(view.abs_values().collect::<Vec<_>>(), vec![16384, -16384]);
    let buttons: Vec<u8> = view.button_values().collect();
    assert_eq!(buttons[3], 1);
    assert_eq!(buttons.iter().filter(|&&b| b == 1).count(), 1);
}

#[test]
fn test_reports_leave_in_sync_order() {
    let config = gamepad();
    let mut source = ScriptedSource::new(
        config.clone(),
        vec![
            vec![abs(0, 1), RawEvent::SYNC, abs(0, 2), RawEvent::SYNC],
            vec![abs(0, 3), RawEvent::SYNC],
        ],
    );

    let mut forwarder = EventForwarder::new(&config);
    let mut first_axis = Vec::new();
    while let Ok(batch) = source.read_events() {
        for event in batch {
            if let Some(payload) = forwarder.apply(event) {
                let view = ReportView::new(config.report_layout(), &payload).unwrap();
                first_axis.push(view.abs_values().next().unwrap());
            }
        }
    }

    assert_eq!(first_axis, vec![1, 2, 3]);
}
