//! Domain types shared across the bioterm crates.
//!
//! These are plain data records: what a terminal stores about a user, a
//! fingerprint template, one attendance punch, and the device capability
//! snapshot. All wire-format knowledge lives in `bioterm-core`.

pub mod attendance;
pub mod device_info;
pub mod finger;
pub mod generation;
pub mod sizes;
pub mod user;

pub use attendance::Attendance;
pub use device_info::DeviceInfo;
pub use finger::Finger;
pub use generation::DeviceGeneration;
pub use sizes::DeviceSizes;
pub use user::{Privilege, User};
