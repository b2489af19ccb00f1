//! Device identity, assembled from option queries.

use std::fmt;

/// Device information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version string reported at connect time.
    pub firmware_version: String,

    /// Device serial number (`~SerialNumber` option).
    pub serial_number: Option<String>,

    /// Platform name (`~Platform` option).
    pub platform: Option<String>,

    /// User-assigned device name (`~DeviceName` option).
    pub device_name: Option<String>,

    /// MAC address (`MAC` option).
    pub mac_address: Option<String>,

    /// Configured IP address (`IPAddress` option).
    pub ip_address: Option<String>,
}

impl DeviceInfo {
    pub fn new(firmware_version: impl Into<String>) -> Self {
        Self {
            firmware_version: firmware_version.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[SN: {}, FW: {}]",
            self.serial_number.as_deref().unwrap_or("?"),
            self.firmware_version
        )
    }
}
