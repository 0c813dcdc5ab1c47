//! # joyrelay-core
//!
//! Shared library for joyrelay containing the transport codecs and the
//! device model used by both endpoints.
//!
//! joyrelay forwards the state of a physical input device (joystick, gamepad,
//! wheel) from the machine it is plugged into to a remote machine, which
//! recreates it as a virtual device.  The physical side runs the `joyrelay`
//! client; the virtual side runs the `joyrelayd` server.  The two only share
//! the wire protocol defined here.
//!
//! The protocol is layered, bottom up:
//!
//! - **`framing`** – escape-based frame delimiting over a raw byte stream.
//!   TCP has no message boundaries, so each message is wrapped between
//!   reserved delimiter bytes, with occurrences of the reserved bytes inside
//!   the message escaped.
//!
//! - **`protocol`** – a self-describing envelope inside each frame: a 16-bit
//!   tag, a 16-bit length, the payload, and a 16-bit additive checksum.  The
//!   envelope is what tells the receiver *what* a frame contains and whether
//!   it arrived intact.
//!
//! - **`device`** – the two message payloads: a one-shot [`DeviceConfig`]
//!   describing a device's axes and buttons, and fixed-layout state reports
//!   whose shape is derived from that config.
//!
//! This crate performs no socket or device I/O.

pub mod device;
pub mod framing;
pub mod protocol;

pub use device::config::{AbsAxisSpec, DeviceConfig, CONFIG_WIRE_SIZE};
pub use device::index_map::SlotMap;
pub use device::report::{ReportBuffer, ReportLayout, ReportView};
pub use device::{EventClass, RawEvent};
pub use framing::{FrameDecoder, FrameError, FrameEncoder, FrameProgress};
pub use protocol::envelope::{decode_envelope, encode_envelope, EncodedEnvelope, Envelope};
pub use protocol::messages::MessageTag;
pub use protocol::wire::{encode_message, WireError};
