//! User records as stored on the terminal.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// User privilege bits.
    ///
    /// The firmware treats these as a small bit set rather than an ordered
    /// level: an administrator is `0b1110`, a manager `0b0110`, an enroller
    /// `0b0010` and a default user carries no bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Privilege: u8 {
        const ENROLLER = 0b0010;
        const MANAGER_EXTRA = 0b0100;
        const ADMIN_EXTRA = 0b1000;
    }
}

impl Privilege {
    /// Ordinary user, no special rights.
    pub const DEFAULT: Privilege = Privilege::empty();

    /// Manager: enroller plus device menu access.
    pub const MANAGER: Privilege =
        Privilege::ENROLLER.union(Privilege::MANAGER_EXTRA);

    /// Full administrator.
    pub const ADMIN: Privilege = Privilege::MANAGER.union(Privilege::ADMIN_EXTRA);

    /// Raw firmware value for the wire record.
    pub fn to_raw(self) -> u8 {
        self.bits()
    }

    /// Build from a raw wire value, keeping only known bits.
    pub fn from_raw(raw: u8) -> Self {
        Privilege::from_bits_truncate(raw)
    }
}

impl Default for Privilege {
    fn default() -> Self {
        Privilege::DEFAULT
    }
}

/// One user record.
///
/// `uid` is the dense, device-assigned slot number and is unique on a
/// device. `user_id` is the caller-chosen identifier shown on the terminal;
/// its uniqueness is soft and it is what attendance records reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: u16,
    pub user_id: String,
    pub name: String,
    pub privilege: Privilege,
    pub password: String,
    pub group_id: String,
    /// Proximity card number, up to 40 bits.
    pub card: u64,
}

impl User {
    pub fn new(uid: u16, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid,
            user_id: user_id.into(),
            name: name.into(),
            privilege: Privilege::DEFAULT,
            password: String::new(),
            group_id: String::new(),
            card: 0,
        }
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn with_card(mut self, card: u64) -> Self {
        self.card = card;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.privilege.contains(Privilege::ADMIN)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User[{}] {} ({})", self.uid, self.name, self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_raw_values() {
        assert_eq!(Privilege::DEFAULT.to_raw(), 0);
        assert_eq!(Privilege::ENROLLER.to_raw(), 2);
        assert_eq!(Privilege::MANAGER.to_raw(), 6);
        assert_eq!(Privilege::ADMIN.to_raw(), 14);
    }

    #[test]
    fn test_privilege_from_raw_truncates() {
        assert_eq!(Privilege::from_raw(14), Privilege::ADMIN);
        // Unknown high bits are dropped
        assert_eq!(Privilege::from_raw(0xF2), Privilege::from_raw(2));
    }

    #[test]
    fn test_user_builder() {
        let user = User::new(5, "1001", "Alice")
            .with_privilege(Privilege::ADMIN)
            .with_card(0x00_FF00FF00);
        assert!(user.is_admin());
        assert_eq!(user.card, 0x00_FF00FF00);
        assert_eq!(user.to_string(), "User[5] Alice (1001)");
    }
}
