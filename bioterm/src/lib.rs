//! High-level async client for standalone biometric access-control
//! terminals speaking the 8-byte-header binary protocol over UDP or TCP.
//!
//! The [`Device`] type owns a transport and a session and exposes the
//! device's operations as async methods: reading and writing user
//! records, pulling attendance logs and fingerprint templates, querying
//! option strings, streaming live punch events and driving fingerprint
//! enrollment.
//!
//! # Example
//!
//! ```no_run
//! use bioterm::Device;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = Device::tcp("192.168.1.201", 4370);
//!     device.connect().await?;
//!
//!     println!("firmware: {}", device.get_firmware_version().await?);
//!     for user in device.get_users().await? {
//!         println!("{:5} {}", user.uid, user.name);
//!     }
//!
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

mod bulk;
pub mod device;
pub mod enroll;
pub mod error;
pub mod live;
mod records;

#[cfg(test)]
pub(crate) mod mock;

pub use device::Device;
pub use enroll::EnrollOutcome;
pub use error::{Error, Result};
pub use live::{CancelHandle, LiveCapture, LiveEvent};

pub use bioterm_core::{Command, DEFAULT_PORT};
pub use bioterm_types::{
    Attendance, DeviceGeneration, DeviceInfo, DeviceSizes, Finger, Privilege, User,
};
