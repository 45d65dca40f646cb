//! Modules shipped with the crate.

mod base;
mod device;

pub use base::{create_data, BaseModule};
pub use device::{register_device_converters, DeviceModule};
