// Tue Jan 13 2026 - Alex

pub mod config;
pub mod memory;
pub mod search;

pub use config::ScanConfig;
pub use memory::{MemoryError, ReadResult, RegionDescriptor, SafeReader, ScanDriver};
pub use search::{BytePattern, PatternSearch};
