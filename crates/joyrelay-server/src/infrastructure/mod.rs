//! Infrastructure layer: platform device drivers, TCP server, settings.

pub mod device;
pub mod network;
pub mod storage;
