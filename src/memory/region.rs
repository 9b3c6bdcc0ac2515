// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryRange, Protection};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Private,
    Shared,
    Reserved,
}

impl RegionKind {
    pub fn from_basic_info(shared: bool, reserved: bool) -> Self {
        if reserved {
            Self::Reserved
        } else if shared {
            Self::Shared
        } else {
            Self::Private
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Shared => write!(f, "shared"),
            Self::Reserved => write!(f, "reserved"),
        }
    }
}

/// Snapshot of one region taken at enumeration time. The target may unmap or
/// re-protect it before it is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    range: MemoryRange,
    protection: Protection,
    max_protection: Protection,
    kind: RegionKind,
    offset: u64,
    user_wired_count: u16,
}

impl RegionDescriptor {
    pub fn new(range: MemoryRange, protection: Protection, kind: RegionKind) -> Self {
        Self {
            range,
            protection,
            max_protection: protection,
            kind,
            offset: 0,
            user_wired_count: 0,
        }
    }

    pub fn with_max_protection(mut self, max_protection: Protection) -> Self {
        self.max_protection = max_protection;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_user_wired_count(mut self, count: u16) -> Self {
        self.user_wired_count = count;
        self
    }

    pub fn range(&self) -> &MemoryRange {
        &self.range
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn max_protection(&self) -> Protection {
        self.max_protection
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn user_wired_count(&self) -> u16 {
        self.user_wired_count
    }

    pub fn base(&self) -> Address {
        self.range.start()
    }

    pub fn end(&self) -> Address {
        self.range.end()
    }

    pub fn size(&self) -> u64 {
        self.range.size()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    pub fn is_readable(&self) -> bool {
        self.protection.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.protection.is_writable()
    }

    pub fn is_executable(&self) -> bool {
        self.protection.is_executable()
    }

    pub fn is_code(&self) -> bool {
        self.is_executable() && !self.is_writable()
    }

    pub fn is_data(&self) -> bool {
        !self.is_executable() && (self.is_readable() || self.is_writable())
    }

    /// The part of the region at or above `start`, with the object offset
    /// moved along. `None` when the region ends at or before `start`.
    pub fn clip_from(&self, start: Address) -> Option<Self> {
        if start <= self.base() {
            return Some(self.clone());
        }
        let range = MemoryRange::new(start, self.end()).ok()?;
        Some(Self {
            range,
            offset: self.offset.saturating_add(start - self.base()),
            ..self.clone()
        })
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} {} 0x{:x}",
            self.range, self.protection, self.max_protection, self.kind, self.size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_from() {
        let region = RegionDescriptor::new(
            MemoryRange::new(Address::new(0x1000), Address::new(0x3000)).unwrap(),
            Protection::READ,
            RegionKind::Private,
        )
        .with_offset(0x100);

        let clipped = region.clip_from(Address::new(0x2000)).unwrap();
        assert_eq!(clipped.base(), Address::new(0x2000));
        assert_eq!(clipped.end(), Address::new(0x3000));
        assert_eq!(clipped.offset(), 0x1100);
        assert_eq!(clipped.protection(), Protection::READ);

        assert_eq!(region.clip_from(Address::new(0x800)), Some(region.clone()));
        assert_eq!(region.clip_from(Address::new(0x3000)), None);
    }
}
