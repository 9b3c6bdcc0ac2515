// Sat Jan 18 2026 - Alex

use crate::memory::{Address, ScanChunk};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,
    #[error("Invalid pattern token '{0}'")]
    InvalidToken(String),
    #[error("Pattern must contain at least one concrete byte")]
    AllWildcards,
}

/// One token: `??`/`?` matches anything, otherwise one or two hex digits.
/// Returns `(value, mask)`.
fn parse_token(token: &str) -> Result<(u8, u8), PatternError> {
    if token == "?" || token == "??" {
        return Ok((0, 0));
    }
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PatternError::InvalidToken(token.to_string()));
    }
    u8::from_str_radix(token, 16)
        .map(|value| (value, 0xFF))
        .map_err(|_| PatternError::InvalidToken(token.to_string()))
}

/// Space separated hex bytes with `??` wildcards, e.g. `48 8B ?? 05`.
/// Stored as value/mask pairs; a wildcard has a zero mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    values: Vec<u8>,
    masks: Vec<u8>,
}

impl BytePattern {
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let (values, masks): (Vec<u8>, Vec<u8>) = text
            .split_whitespace()
            .map(parse_token)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();
        if values.is_empty() {
            return Err(PatternError::Empty);
        }
        if masks.iter().all(|&m| m == 0) {
            return Err(PatternError::AllWildcards);
        }
        Ok(Self { values, masks })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatternError> {
        if bytes.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self {
            values: bytes.to_vec(),
            masks: vec![0xFF; bytes.len()],
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn matches_at(&self, data: &[u8], offset: usize) -> bool {
        match data.get(offset..offset + self.len()) {
            Some(window) => window
                .iter()
                .zip(self.values.iter().zip(&self.masks))
                .all(|(&b, (&value, &mask))| b & mask == value),
            None => false,
        }
    }

    pub fn find_all(&self, data: &[u8]) -> Vec<usize> {
        if data.len() < self.len() {
            return Vec::new();
        }
        (0..=data.len() - self.len())
            .filter(|&i| self.matches_at(data, i))
            .collect()
    }
}

impl fmt::Display for BytePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (value, mask)) in self.values.iter().zip(&self.masks).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if *mask == 0 {
                write!(f, "??")?;
            } else {
                write!(f, "{:02X}", value)?;
            }
        }
        Ok(())
    }
}

/// Feeds scan chunks through a pattern, including matches that straddle two
/// consecutive chunks of the same region.
pub struct PatternSearch {
    pattern: BytePattern,
    carry: Vec<u8>,
    carry_end: Option<Address>,
    matches: Vec<Address>,
}

impl PatternSearch {
    pub fn new(pattern: BytePattern) -> Self {
        Self {
            pattern,
            carry: Vec::new(),
            carry_end: None,
            matches: Vec::new(),
        }
    }

    pub fn pattern(&self) -> &BytePattern {
        &self.pattern
    }

    /// Returns the matches found in this chunk.
    pub fn feed(&mut self, chunk: &ScanChunk) -> Vec<Address> {
        let result = &chunk.result;
        if result.is_empty() {
            self.carry.clear();
            self.carry_end = None;
            return Vec::new();
        }

        let contiguous = self.carry_end == Some(result.address());
        let (base, window) = if contiguous {
            let mut window = std::mem::take(&mut self.carry);
            window.extend_from_slice(result.data());
            (result.address().as_u64() - (window.len() - result.len()) as u64, window)
        } else {
            (result.address().as_u64(), result.data().to_vec())
        };

        let found: Vec<Address> = self
            .pattern
            .find_all(&window)
            .into_iter()
            .map(|offset| Address::new(base + offset as u64))
            .collect();

        let keep = (self.pattern.len() - 1).min(window.len());
        self.carry = window[window.len() - keep..].to_vec();
        self.carry_end = if result.is_complete() && chunk.region.contains(result.end_of_data()) {
            Some(result.end_of_data())
        } else {
            None
        };

        self.matches.extend_from_slice(&found);
        found
    }

    pub fn matches(&self) -> &[Address] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<Address> {
        self.matches
    }
}
