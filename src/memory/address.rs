// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Address in the target task, always sized to the widest pointer width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const MAX: Self = Self { value: u64::MAX };

    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn from_ptr(ptr: *const u8) -> Self {
        Self { value: ptr as u64 }
    }

    pub const fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn checked_add(&self, rhs: u64) -> Option<Self> {
        self.value.checked_add(rhs).map(Self::new)
    }

    pub fn saturating_add(&self, rhs: u64) -> Self {
        Self::new(self.value.saturating_add(rhs))
    }

    pub fn is_aligned(&self, alignment: u64) -> bool {
        alignment == 0 || self.value % alignment == 0
    }

    pub fn align_down(&self, alignment: u64) -> Self {
        if alignment == 0 {
            return *self;
        }
        Self { value: self.value & !(alignment - 1) }
    }

    /// Next multiple of `alignment`, or `None` past the top of the space.
    pub fn checked_align_up(&self, alignment: u64) -> Option<Self> {
        if alignment == 0 {
            return Some(*self);
        }
        let value = self.value.checked_add(alignment - 1)? & !(alignment - 1);
        Some(Self { value })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

/// Distance in bytes; callers guarantee `self >= rhs`.
impl Sub<Address> for Address {
    type Output = u64;
    fn sub(self, rhs: Address) -> Self::Output {
        self.value - rhs.value
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(Address::new(0x1000).checked_add(0x10), Some(Address::new(0x1010)));
        assert_eq!(Address::MAX.checked_add(1), None);
    }

    #[test]
    fn test_alignment() {
        let addr = Address::new(0x1234);
        assert_eq!(addr.align_down(0x1000), Address::new(0x1000));
        assert_eq!(addr.checked_align_up(0x1000), Some(Address::new(0x2000)));
        assert_eq!(Address::MAX.checked_align_up(0x1000), None);
        assert!(Address::new(0x4000).is_aligned(0x4000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new(0x1000).to_string(), "0x0000000000001000");
        assert_eq!(format!("{:x}", Address::new(0xabc)), "abc");
    }
}
