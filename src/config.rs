// Tue Jan 13 2026 - Alex

use crate::memory::{MemoryError, MemoryRange, RegionFilter};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Largest single remote read; bigger regions are chunked.
    pub max_transfer_size: u64,
    pub page_size: u64,
    /// Follow-up reads attempted after a partial transfer.
    pub partial_retries: u32,
    /// Re-read a failed chunk page by page to recover its readable prefix.
    pub salvage_pages: bool,
    pub bounds: Option<MemoryRange>,
    pub filter: RegionFilter,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_transfer_size: 16 * 1024 * 1024,
            page_size: 0x4000,
            partial_retries: 1,
            salvage_pages: true,
            bounds: None,
            filter: RegionFilter::default(),
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MemoryError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_transfer_size(mut self, size: u64) -> Self {
        self.max_transfer_size = size;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_partial_retries(mut self, retries: u32) -> Self {
        self.partial_retries = retries;
        self
    }

    pub fn with_salvage_pages(mut self, salvage: bool) -> Self {
        self.salvage_pages = salvage;
        self
    }

    pub fn with_bounds(mut self, bounds: MemoryRange) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(MemoryError::InvalidConfig(format!(
                "page_size 0x{:x} must be a non-zero power of two",
                self.page_size
            )));
        }
        if self.max_transfer_size < self.page_size {
            return Err(MemoryError::InvalidConfig(format!(
                "max_transfer_size 0x{:x} is smaller than a page",
                self.max_transfer_size
            )));
        }
        if self.max_transfer_size > u32::MAX as u64 {
            return Err(MemoryError::InvalidConfig(format!(
                "max_transfer_size 0x{:x} exceeds the 32-bit transfer count",
                self.max_transfer_size
            )));
        }
        if usize::try_from(self.max_transfer_size).is_err() {
            return Err(MemoryError::InvalidConfig(
                "max_transfer_size does not fit in this address space".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Protection;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_page_size() {
        assert!(ScanConfig::new().with_page_size(0).validate().is_err());
        assert!(ScanConfig::new().with_page_size(0x3000).validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_transfer() {
        let config = ScanConfig::new().with_page_size(0x1000).with_max_transfer_size(0x800);
        assert!(matches!(config.validate(), Err(MemoryError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_transfer_beyond_count_width() {
        let config = ScanConfig::new().with_max_transfer_size(u32::MAX as u64 + 1);
        assert!(matches!(config.validate(), Err(MemoryError::InvalidConfig(_))));
        assert!(ScanConfig::new().with_max_transfer_size(0x8000_0000).validate().is_ok());
    }

    #[test]
    fn test_json_partial_fields() {
        let config: ScanConfig = serde_json::from_str(
            r#"{ "max_transfer_size": 65536, "bounds": { "start": 4096, "end": 12288 } }"#,
        )
        .unwrap();
        assert_eq!(config.max_transfer_size, 0x10000);
        assert_eq!(config.page_size, 0x4000);
        assert_eq!(config.bounds.unwrap().size(), 0x2000);
        assert_eq!(config.filter.require, Protection::READ);
    }

    #[test]
    fn test_inverted_bounds_rejected_on_load() {
        let parsed = serde_json::from_str::<ScanConfig>(r#"{ "bounds": { "start": 8192, "end": 4096 } }"#);
        assert!(parsed.is_err());
    }
}
