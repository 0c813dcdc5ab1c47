//! Application layer: turning raw device events into wire reports.

pub mod forward_events;

pub use forward_events::EventForwarder;
