//! Protocol module: the checksummed message envelope, message tags, and the
//! combined envelope+frame transmit helper.

pub mod envelope;
pub mod messages;
pub mod wire;

pub use envelope::{decode_envelope, encode_envelope, EncodedEnvelope, Envelope, EnvelopeError};
pub use messages::MessageTag;
pub use wire::{encode_message, WireError};
