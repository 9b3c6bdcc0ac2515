// Thu Jan 16 2026 - Alex

use crate::memory::{
    Address, KernReturn, MemoryError, MemoryRange, MemoryReader, ReadRequest, TransferBuffer, VmPrimitives,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    InvalidHandle(KernReturn),
    PermissionDenied(KernReturn),
    ReadFailed(KernReturn),
}

impl ReadFailure {
    pub fn from_kern(kr: KernReturn) -> Self {
        if kr.is_handle_error() {
            Self::InvalidHandle(kr)
        } else if kr.is_access_error() {
            Self::PermissionDenied(kr)
        } else {
            Self::ReadFailed(kr)
        }
    }

    pub fn code(&self) -> KernReturn {
        match self {
            Self::InvalidHandle(kr) | Self::PermissionDenied(kr) | Self::ReadFailed(kr) => *kr,
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle(kr) => write!(f, "invalid handle: {}", kr),
            Self::PermissionDenied(kr) => write!(f, "permission denied: {}", kr),
            Self::ReadFailed(kr) => write!(f, "read failed: {}", kr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Complete,
    Partial,
    Failed(ReadFailure),
}

/// Bytes copied out of the target, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    request: ReadRequest,
    data: Vec<u8>,
    status: ReadStatus,
}

impl ReadResult {
    pub fn failed(request: ReadRequest, failure: ReadFailure) -> Self {
        Self {
            request,
            data: Vec::new(),
            status: ReadStatus::Failed(failure),
        }
    }

    fn transferred(request: ReadRequest, data: Vec<u8>) -> Self {
        let status = if data.len() as u64 == request.size() {
            ReadStatus::Complete
        } else {
            ReadStatus::Partial
        };
        Self { request, data, status }
    }

    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    pub fn address(&self) -> Address {
        self.request.start()
    }

    pub fn requested(&self) -> u64 {
        self.request.size()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReadStatus::Complete
    }

    pub fn is_partial(&self) -> bool {
        self.status == ReadStatus::Partial
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ReadStatus::Failed(_))
    }

    /// First address not covered by `data`.
    pub fn end_of_data(&self) -> Address {
        Address::new(self.request.start().as_u64() + self.data.len() as u64)
    }

    /// Appends a follow-up read that starts exactly where this one stopped.
    pub(crate) fn append(&mut self, next: ReadResult) -> bool {
        if next.is_failed() || next.is_empty() || next.address() != self.end_of_data() {
            return false;
        }
        let room = (self.request.size() - self.data.len() as u64) as usize;
        let take = next.data.len().min(room);
        self.data.extend_from_slice(&next.data[..take]);
        if self.data.len() as u64 == self.request.size() {
            self.status = ReadStatus::Complete;
        }
        true
    }

    /// Replaces a failed result with a salvaged prefix.
    pub(crate) fn salvage(&mut self, data: Vec<u8>) {
        if data.is_empty() {
            return;
        }
        *self = Self::transferred(self.request, data);
    }
}

/// Copies ranges out of a task, releasing every staged transfer buffer
/// before returning.
pub struct SafeReader<P: VmPrimitives> {
    primitives: P,
}

impl<P: VmPrimitives> SafeReader<P> {
    pub fn new(primitives: P) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    pub fn read_at(&self, address: Address, len: u64) -> Result<ReadResult, MemoryError> {
        self.read(MemoryRange::from_start_size(address, len)?)
    }

    /// `Err` only for an invalid request, which never reaches the kernel.
    /// Kernel failures are reported through the result's status.
    pub fn read(&self, request: ReadRequest) -> Result<ReadResult, MemoryError> {
        let size = request.size();
        if size == 0 || request.start().checked_add(size).is_none() {
            return Err(MemoryError::InvalidRange(format!("unreadable request {}", request)));
        }
        if usize::try_from(size).is_err() {
            return Err(MemoryError::InvalidRange(format!(
                "0x{:x} bytes does not fit in this address space",
                size
            )));
        }

        let transfer = match self.primitives.read(request.start().as_u64(), size) {
            Ok(transfer) => transfer,
            Err(kr) => {
                log::trace!("Read of {} failed: {}", request, kr);
                return Ok(ReadResult::failed(request, ReadFailure::from_kern(kr)));
            }
        };

        let buffer = TransferBuffer::new(&self.primitives, transfer);
        if buffer.len() > size {
            log::warn!(
                "Kernel staged 0x{:x} bytes for a 0x{:x} byte request at {}",
                buffer.len(),
                size,
                request.start()
            );
        }
        let staged = buffer.as_slice();
        let count = staged.len().min(size as usize);
        let data = staged[..count].to_vec();

        if let Err(kr) = buffer.release() {
            log::warn!("Failed to release transfer buffer for {}: {}", request, kr);
        }

        if data.is_empty() {
            return Ok(ReadResult::failed(request, ReadFailure::ReadFailed(KernReturn::FAILURE)));
        }
        Ok(ReadResult::transferred(request, data))
    }
}

impl<P: VmPrimitives> MemoryReader for SafeReader<P> {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        let result = self.read_at(addr, len as u64)?;
        match result.status() {
            ReadStatus::Complete => Ok(result.into_data()),
            ReadStatus::Partial => Err(MemoryError::ReadFailed(
                result.end_of_data().as_u64(),
                KernReturn::INVALID_ADDRESS,
            )),
            ReadStatus::Failed(failure) => Err(MemoryError::ReadFailed(addr.as_u64(), failure.code())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Protection, RawRegion, SimulatedSpace, Transfer};
    use parking_lot::Mutex;

    /// Stages 0x10 bytes more than every request asks for.
    #[derive(Default)]
    struct OversizedTransfers {
        live: Mutex<Vec<Box<[u8]>>>,
        allocations: Mutex<u64>,
        deallocations: Mutex<u64>,
    }

    unsafe impl VmPrimitives for OversizedTransfers {
        fn region(&self, _address: u64) -> Result<RawRegion, KernReturn> {
            Err(KernReturn::INVALID_ADDRESS)
        }

        fn read(&self, _address: u64, size: u64) -> Result<Transfer, KernReturn> {
            let staged: Box<[u8]> = (0..size + 0x10).map(|i| i as u8).collect();
            let transfer = Transfer {
                address: staged.as_ptr() as u64,
                size: staged.len() as u64,
            };
            self.live.lock().push(staged);
            *self.allocations.lock() += 1;
            Ok(transfer)
        }

        fn deallocate(&self, transfer: Transfer) -> Result<(), KernReturn> {
            *self.deallocations.lock() += 1;
            let mut live = self.live.lock();
            let before = live.len();
            live.retain(|b| b.as_ptr() as u64 != transfer.address);
            if live.len() == before {
                Err(KernReturn::INVALID_ADDRESS)
            } else {
                Ok(())
            }
        }
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_full_read_matches_shadow() {
        let shadow = pattern(0x1000, 3);
        let space = SimulatedSpace::new();
        space.map(0x1000, shadow.clone(), Protection::READ);
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x1100), 0x200).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.data(), &shadow[0x100..0x300]);
        assert_eq!(space.allocations(), 1);
        assert_eq!(space.deallocations(), 1);
    }

    #[test]
    fn test_partial_read_returns_prefix() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![0x5A; 0x80], Protection::READ);
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x1000), 0x100).unwrap();
        assert_eq!(result.status(), ReadStatus::Partial);
        assert_eq!(result.len(), 0x80);
        assert_eq!(result.end_of_data(), Address::new(0x1080));
        assert_eq!(space.outstanding(), 0);
    }

    #[test]
    fn test_failed_read_carries_no_bytes() {
        let space = SimulatedSpace::new();
        space.map(0x2000, vec![0u8; 0x1000], Protection::empty());
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x2000), 0x1000).unwrap();
        assert_eq!(
            result.status(),
            ReadStatus::Failed(ReadFailure::PermissionDenied(KernReturn::PROTECTION_FAILURE))
        );
        assert!(result.is_empty());
        assert_eq!(space.allocations(), space.deallocations());
    }

    #[test]
    fn test_overflowing_request_never_reaches_kernel() {
        let space = SimulatedSpace::new();
        let reader = SafeReader::new(&space);

        let err = reader.read_at(Address::new(u64::MAX - 0x10), 0x100).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidRange(_)));
        let err = reader.read_at(Address::new(0x1000), 0).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidRange(_)));
        assert_eq!(space.read_calls(), 0);
    }

    #[test]
    fn test_empty_transfer_is_released_and_failed() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![1u8; 0x100], Protection::READ);
        space.empty_transfers(true);
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x1000), 0x100).unwrap();
        assert!(result.is_failed());
        assert_eq!(space.allocations(), 1);
        assert_eq!(space.deallocations(), 1);
        assert_eq!(space.outstanding(), 0);
    }

    #[test]
    fn test_failed_deallocation_does_not_lose_data() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![9u8; 0x40], Protection::READ);
        space.fail_deallocate(true);
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x1000), 0x40).unwrap();
        assert!(result.is_complete());
        assert_eq!(space.deallocations(), 1);
    }

    #[test]
    fn test_exited_task_is_invalid_handle() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![0u8; 0x100], Protection::READ);
        space.invalidate_handle(true);
        let reader = SafeReader::new(&space);

        let result = reader.read_at(Address::new(0x1000), 0x10).unwrap();
        assert_eq!(
            result.status(),
            ReadStatus::Failed(ReadFailure::InvalidHandle(KernReturn::INVALID_TASK))
        );
    }

    #[test]
    fn test_typed_reads() {
        let space = SimulatedSpace::new();
        let mut data = vec![0u8; 0x40];
        data[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        data[8..16].copy_from_slice(&0x1122334455667788u64.to_le_bytes());
        data[16..22].copy_from_slice(b"hello\0");
        space.map(0x1000, data, Protection::READ);
        let reader = SafeReader::new(&space);

        assert_eq!(reader.read_u32(Address::new(0x1000)).unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64(Address::new(0x1008)).unwrap(), 0x1122334455667788);
        assert_eq!(reader.read_ptr(Address::new(0x1008)).unwrap(), Address::new(0x1122334455667788));
        assert_eq!(reader.read_c_string(Address::new(0x1010), 0x20).unwrap(), "hello");
        assert!(matches!(
            reader.read_u64(Address::new(0x103C)),
            Err(MemoryError::ReadFailed(0x1040, _))
        ));
    }

    #[test]
    fn test_oversized_transfer_is_clamped_and_released() {
        let primitives = OversizedTransfers::default();
        let reader = SafeReader::new(&primitives);

        let result = reader.read_at(Address::new(0x1000), 0x20).unwrap();
        assert!(result.is_complete());
        assert_eq!(result.len(), 0x20);
        assert_eq!(result.data(), &(0..0x20u8).collect::<Vec<_>>()[..]);
        assert_eq!(*primitives.allocations.lock(), 1);
        assert_eq!(*primitives.deallocations.lock(), 1);
        assert!(primitives.live.lock().is_empty());
    }
}
