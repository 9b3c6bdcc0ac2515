// Tue Jan 13 2026 - Alex

use crate::memory::{Address, MemoryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open address range `[start, end)`, never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct MemoryRange {
    start: Address,
    end: Address,
}

/// A validated `{address, length}` pair handed to the safe reader.
pub type ReadRequest = MemoryRange;

impl MemoryRange {
    pub fn new(start: Address, end: Address) -> Result<Self, MemoryError> {
        if end <= start {
            return Err(MemoryError::InvalidRange(format!("{} .. {} is empty or inverted", start, end)));
        }
        Ok(Self { start, end })
    }

    pub fn from_start_size(start: Address, size: u64) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidRange(format!("zero-length range at {}", start)));
        }
        let end = start
            .checked_add(size)
            .ok_or_else(|| MemoryError::InvalidRange(format!("{} + 0x{:x} overflows", start, size)))?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Consecutive sub-ranges of at most `max` bytes, in increasing address order.
    pub fn chunks(&self, max: u64) -> Chunks {
        Chunks {
            next: self.start,
            end: self.end,
            max: max.max(1),
        }
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

pub struct Chunks {
    next: Address,
    end: Address,
    max: u64,
}

impl Chunks {
    /// Start of the next chunk, if any remain.
    pub fn next_start(&self) -> Option<Address> {
        if self.next < self.end {
            Some(self.next)
        } else {
            None
        }
    }
}

impl Iterator for Chunks {
    type Item = MemoryRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let len = (self.end - self.next).min(self.max);
        let chunk = MemoryRange {
            start: self.next,
            end: Address::new(self.next.as_u64() + len),
        };
        self.next = chunk.end;
        Some(chunk)
    }
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    start: u64,
    end: u64,
}

impl TryFrom<RawRange> for MemoryRange {
    type Error = MemoryError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(Address::new(raw.start), Address::new(raw.end))
    }
}

impl From<MemoryRange> for RawRange {
    fn from(range: MemoryRange) -> Self {
        Self {
            start: range.start.as_u64(),
            end: range.end.as_u64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_length() {
        assert!(matches!(
            MemoryRange::from_start_size(Address::new(0x1000), 0),
            Err(MemoryError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(matches!(
            MemoryRange::from_start_size(Address::new(u64::MAX - 0x10), 0x100),
            Err(MemoryError::InvalidRange(_))
        ));
        assert!(MemoryRange::from_start_size(Address::new(u64::MAX - 0x10), 0x10).is_ok());
    }

    #[test]
    fn test_rejects_inverted() {
        assert!(MemoryRange::new(Address::new(0x2000), Address::new(0x1000)).is_err());
    }

    #[test]
    fn test_intersection() {
        let a = MemoryRange::new(Address::new(0x1000), Address::new(0x3000)).unwrap();
        let b = MemoryRange::new(Address::new(0x2000), Address::new(0x4000)).unwrap();
        let c = MemoryRange::new(Address::new(0x3000), Address::new(0x4000)).unwrap();

        assert_eq!(
            a.intersection(&b),
            Some(MemoryRange::new(Address::new(0x2000), Address::new(0x3000)).unwrap())
        );
        assert_eq!(a.intersection(&c), None);
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_chunks_cover_range_in_order() {
        let range = MemoryRange::from_start_size(Address::new(0x1000), 0x2800).unwrap();
        let chunks: Vec<_> = range.chunks(0x1000).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start(), Address::new(0x1000));
        assert_eq!(chunks[2].size(), 0x800);
        assert_eq!(chunks[2].end(), range.end());
        assert!(chunks.windows(2).all(|w| w[0].end() == w[1].start()));
    }

    #[test]
    fn test_serde_validates() {
        let range: MemoryRange = serde_json::from_str(r#"{"start": 4096, "end": 8192}"#).unwrap();
        assert_eq!(range.size(), 0x1000);
        assert!(serde_json::from_str::<MemoryRange>(r#"{"start": 8192, "end": 4096}"#).is_err());
    }
}
