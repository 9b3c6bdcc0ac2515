// Tue Jan 13 2026 - Alex

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Protection bits as reported by the kernel (`VM_PROT_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Protection: u32 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
    }
}

impl Protection {
    pub fn from_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags)
    }

    pub fn to_flags(self) -> u32 {
        self.bits()
    }

    pub fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn is_executable(self) -> bool {
        self.contains(Self::EXECUTE)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.is_readable() { 'r' } else { '-' },
            if self.is_writable() { 'w' } else { '-' },
            if self.is_executable() { 'x' } else { '-' }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags_truncates() {
        let prot = Protection::from_flags(0x13);
        assert_eq!(prot, Protection::READ | Protection::WRITE);
        assert!(!prot.is_executable());
    }

    #[test]
    fn test_display() {
        assert_eq!((Protection::READ | Protection::EXECUTE).to_string(), "r-x");
        assert_eq!(Protection::empty().to_string(), "---");
    }
}
