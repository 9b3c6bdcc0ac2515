// Wed Jan 15 2026 - Alex

use crate::memory::{Address, KernReturn, MemoryError};

/// Region information exactly as the kernel reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRegion {
    pub address: u64,
    pub size: u64,
    pub protection: u32,
    pub max_protection: u32,
    pub shared: bool,
    pub reserved: bool,
    pub offset: u64,
    pub user_wired_count: u16,
}

/// Bytes staged by a remote read in the caller's own address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub address: u64,
    pub size: u64,
}

/// The three kernel operations the scanner is built on.
///
/// # Safety
///
/// A `Transfer` returned by `read` must name `size` initialized bytes in the
/// calling process that stay valid and unaliased until they are passed to
/// `deallocate`.
pub unsafe trait VmPrimitives: Send + Sync {
    /// Region containing `address`, or the first one above it.
    fn region(&self, address: u64) -> Result<RawRegion, KernReturn>;

    fn read(&self, address: u64, size: u64) -> Result<Transfer, KernReturn>;

    fn deallocate(&self, transfer: Transfer) -> Result<(), KernReturn>;
}

unsafe impl<P: VmPrimitives + ?Sized> VmPrimitives for &P {
    fn region(&self, address: u64) -> Result<RawRegion, KernReturn> {
        (**self).region(address)
    }

    fn read(&self, address: u64, size: u64) -> Result<Transfer, KernReturn> {
        (**self).read(address, size)
    }

    fn deallocate(&self, transfer: Transfer) -> Result<(), KernReturn> {
        (**self).deallocate(transfer)
    }
}

pub trait MemoryReader: Send + Sync {
    /// Exactly `len` bytes at `addr`; a short transfer is an error.
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError>;

    fn read_u8(&self, addr: Address) -> Result<u8, MemoryError> {
        let bytes = self.read_bytes(addr, 1)?;
        Ok(bytes[0])
    }

    fn read_u16(&self, addr: Address) -> Result<u16, MemoryError> {
        let bytes = self.read_bytes(addr, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&self, addr: Address) -> Result<u64, MemoryError> {
        let bytes = self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    fn read_i32(&self, addr: Address) -> Result<i32, MemoryError> {
        Ok(self.read_u32(addr)? as i32)
    }

    fn read_i64(&self, addr: Address) -> Result<i64, MemoryError> {
        Ok(self.read_u64(addr)? as i64)
    }

    fn read_ptr(&self, addr: Address) -> Result<Address, MemoryError> {
        Ok(Address::new(self.read_u64(addr)?))
    }

    /// NUL-terminated string of at most `max_len` bytes, read in one transfer.
    fn read_c_string(&self, addr: Address, max_len: usize) -> Result<String, MemoryError> {
        let bytes = self.read_bytes(addr, max_len)?;
        let null_pos = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..null_pos]).into_owned())
    }
}
