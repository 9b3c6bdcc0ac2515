// Wed Jan 15 2026 - Alex

use crate::memory::{KernReturn, Transfer, VmPrimitives};

/// Owns a staged transfer until it is handed back to the kernel. Dropping the
/// guard deallocates, so every exit path of a read releases the buffer once.
pub struct TransferBuffer<'a, P: VmPrimitives + ?Sized> {
    primitives: &'a P,
    transfer: Option<Transfer>,
}

impl<'a, P: VmPrimitives + ?Sized> TransferBuffer<'a, P> {
    pub fn new(primitives: &'a P, transfer: Transfer) -> Self {
        Self {
            primitives,
            transfer: Some(transfer),
        }
    }

    pub fn len(&self) -> u64 {
        self.transfer.map_or(0, |t| t.size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self.transfer {
            Some(t) if t.size > 0 && t.address != 0 => {
                // SAFETY: `VmPrimitives` guarantees the staged bytes stay valid
                // until deallocated, and the guard has not released them yet.
                unsafe { std::slice::from_raw_parts(t.address as *const u8, t.size as usize) }
            }
            _ => &[],
        }
    }

    /// Deallocates now and reports the kernel status.
    pub fn release(mut self) -> Result<(), KernReturn> {
        match self.transfer.take() {
            Some(transfer) => self.primitives.deallocate(transfer),
            None => Ok(()),
        }
    }
}

impl<P: VmPrimitives + ?Sized> Drop for TransferBuffer<'_, P> {
    fn drop(&mut self) {
        if let Some(transfer) = self.transfer.take() {
            if let Err(kr) = self.primitives.deallocate(transfer) {
                log::warn!(
                    "Failed to deallocate transfer buffer 0x{:x} (0x{:x} bytes): {}",
                    transfer.address,
                    transfer.size,
                    kr
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Protection, SimulatedSpace};

    #[test]
    fn test_drop_deallocates_once() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![7u8; 0x100], Protection::READ);

        let transfer = space.read(0x1000, 0x100).unwrap();
        {
            let buffer = TransferBuffer::new(&space, transfer);
            assert_eq!(buffer.as_slice(), &[7u8; 0x100][..]);
            assert_eq!(space.outstanding(), 1);
        }

        assert_eq!(space.allocations(), 1);
        assert_eq!(space.deallocations(), 1);
        assert_eq!(space.outstanding(), 0);
    }

    #[test]
    fn test_release_reports_status() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![0u8; 0x10], Protection::READ);
        space.fail_deallocate(true);

        let transfer = space.read(0x1000, 0x10).unwrap();
        let buffer = TransferBuffer::new(&space, transfer);

        assert_eq!(buffer.release(), Err(KernReturn::INVALID_ADDRESS));
        assert_eq!(space.deallocations(), 1);
    }

    #[test]
    fn test_panicking_copy_still_deallocates() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![3u8; 0x40], Protection::READ);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let transfer = space.read(0x1000, 0x40).unwrap();
            let buffer = TransferBuffer::new(&space, transfer);
            let copy: Vec<u8> = buffer
                .as_slice()
                .iter()
                .map(|&b| if b == 3 { panic!("copy interrupted") } else { b })
                .collect();
            copy.len()
        }));

        assert!(outcome.is_err());
        assert_eq!(space.allocations(), 1);
        assert_eq!(space.deallocations(), 1);
        assert_eq!(space.outstanding(), 0);
    }
}
