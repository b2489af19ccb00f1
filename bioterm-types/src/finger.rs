//! Fingerprint templates.

use std::fmt;

/// One fingerprint template slot.
///
/// The template blob is vendor-specific minutiae data and is treated as
/// opaque; typical sizes run from a few hundred bytes to ~2 KiB.
#[derive(Clone, PartialEq, Eq)]
pub struct Finger {
    /// Owning user's device slot.
    pub uid: u16,
    /// Finger slot index, 0..=9.
    pub fid: u8,
    /// Whether the terminal considers the template usable.
    pub valid: bool,
    pub template: Vec<u8>,
}

impl Finger {
    pub fn new(uid: u16, fid: u8, valid: bool, template: Vec<u8>) -> Self {
        Self {
            uid,
            fid,
            valid,
            template,
        }
    }

    pub fn size(&self) -> usize {
        self.template.len()
    }
}

impl fmt::Debug for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finger")
            .field("uid", &self.uid)
            .field("fid", &self.fid)
            .field("valid", &self.valid)
            .field("size", &self.size())
            .finish()
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Finger[{}:{}] {} bytes{}",
            self.uid,
            self.fid,
            self.size(),
            if self.valid { "" } else { " (invalid)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_equality_is_structural() {
        let a = Finger::new(1, 6, true, vec![1, 2, 3]);
        let b = Finger::new(1, 6, true, vec![1, 2, 3]);
        let c = Finger::new(1, 7, true, vec![1, 2, 3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_finger_debug_hides_blob() {
        let finger = Finger::new(9, 0, true, vec![0xAB; 512]);
        let dbg = format!("{finger:?}");
        assert!(dbg.contains("size: 512"));
        assert!(!dbg.contains("171")); // raw bytes not dumped
    }
}
