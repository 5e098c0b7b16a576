//! Metal backend for program execution (macOS)

pub mod buffer_ops;
pub mod compile;
pub mod device_init;
pub mod dispatch;
