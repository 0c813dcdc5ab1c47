//! Message tags carried in the envelope header.

use thiserror::Error;

/// The envelope tag is not a recognized message type.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("unknown message tag: {0}")]
pub struct UnknownTag(pub u16);

/// The two messages of the proxy protocol.
///
/// A connection carries exactly one accepted [`Config`](MessageTag::Config)
/// followed by any number of [`Report`](MessageTag::Report)s.  All other tag
/// values are reserved; receivers log and ignore them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u16)]
pub enum MessageTag {
    /// Device description ([`crate::DeviceConfig`] wire form), sent once.
    Config = 0,
    /// Device state snapshot, shaped by the accepted config.
    Report = 1,
}

impl TryFrom<u16> for MessageTag {
    type Error = UnknownTag;

    fn try_from(value: u16) -> Result<Self, UnknownTag> {
        match value {
            0 => Ok(MessageTag::Config),
            1 => Ok(MessageTag::Report),
            other => Err(UnknownTag(other)),
        }
    }
}
