//! Device capability snapshot.

use std::fmt;

/// Counts and capacities reported by the free-sizes query.
///
/// Read via a dedicated command and cached on the connection. The cached
/// record counts drive stride computation during bulk decodes; counts are
/// never inferred from payload sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSizes {
    pub users: u32,
    pub fingers: u32,
    pub records: u32,
    pub cards: u32,
    pub users_cap: u32,
    pub fingers_cap: u32,
    pub records_cap: u32,
    pub users_available: u32,
    pub fingers_available: u32,
    pub records_available: u32,
    /// Face counts, absent on fingerprint-only hardware.
    pub faces: Option<u32>,
    pub faces_cap: Option<u32>,
}

impl fmt::Display for DeviceSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users {}/{}, fingers {}/{}, records {}/{}",
            self.users,
            self.users_cap,
            self.fingers,
            self.fingers_cap,
            self.records,
            self.records_cap
        )?;
        if let Some(faces) = self.faces {
            write!(f, ", faces {}/{}", faces, self.faces_cap.unwrap_or(0))?;
        }
        Ok(())
    }
}
