//! Application layer: per-connection protocol sessions.

pub mod session;

pub use session::Session;
