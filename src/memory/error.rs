// Tue Jan 13 2026 - Alex

use crate::memory::KernReturn;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid task handle ({0})")]
    InvalidHandle(KernReturn),
    #[error("Permission denied ({0})")]
    PermissionDenied(KernReturn),
    #[error("Invalid memory range: {0}")]
    InvalidRange(String),
    #[error("Read failed at address 0x{0:016x} ({1})")]
    ReadFailed(u64, KernReturn),
    #[error("Region enumeration failed at address 0x{0:016x}: {1}")]
    EnumerationFailed(u64, String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl MemoryError {
    /// Whether the error ends a whole scan rather than a single region.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidHandle(_) | Self::PermissionDenied(_) | Self::EnumerationFailed(..)
        )
    }
}
