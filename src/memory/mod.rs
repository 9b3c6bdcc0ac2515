// Tue Jan 13 2026 - Alex

pub mod address;
pub mod enumerator;
pub mod error;
pub mod filter;
pub mod kern;
pub mod protection;
pub mod range;
pub mod reader;
pub mod region;
pub mod scanner;
pub mod simulated;
pub mod traits;
pub mod transfer;

#[cfg(target_os = "macos")]
pub mod mach;
#[cfg(target_os = "macos")]
pub mod process;

pub use address::Address;
pub use enumerator::{RegionEnumerator, Regions};
pub use error::MemoryError;
pub use filter::RegionFilter;
pub use kern::KernReturn;
pub use protection::Protection;
pub use range::{MemoryRange, ReadRequest};
pub use reader::{ReadFailure, ReadResult, ReadStatus, SafeReader};
pub use region::{RegionDescriptor, RegionKind};
pub use scanner::{Scan, ScanChunk, ScanDriver, ScanStats};
pub use simulated::SimulatedSpace;
pub use traits::{MemoryReader, RawRegion, Transfer, VmPrimitives};
pub use transfer::TransferBuffer;

#[cfg(target_os = "macos")]
pub use mach::MachTask;
#[cfg(target_os = "macos")]
pub use process::TaskPort;
