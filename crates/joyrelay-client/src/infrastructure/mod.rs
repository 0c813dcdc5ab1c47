//! Infrastructure layer: event sources and the server connection.

pub mod network;
pub mod source;
