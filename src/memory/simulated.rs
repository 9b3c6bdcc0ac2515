// Thu Jan 16 2026 - Alex

//! In-process shadow of a target address space.
//!
//! `SimulatedSpace` implements [`VmPrimitives`] over plain byte vectors so the
//! enumerator, reader and scan driver can be exercised without a task port.
//! Every transfer buffer it hands out is a real heap allocation in the
//! calling process and is tracked until it is deallocated.

use crate::memory::{KernReturn, Protection, RawRegion, RegionKind, Transfer, VmPrimitives};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

struct SimRegion {
    protection: Protection,
    max_protection: Protection,
    kind: RegionKind,
    data: Vec<u8>,
}

impl SimRegion {
    fn end(&self, base: u64) -> u64 {
        base + self.data.len() as u64
    }
}

#[derive(Default)]
struct State {
    regions: BTreeMap<u64, SimRegion>,
    live: HashMap<u64, Box<[u8]>>,
    allocations: u64,
    deallocations: u64,
    region_queries: u64,
    read_calls: u64,
    invalid_handle: bool,
    deny_enumeration: bool,
    fail_deallocate: bool,
    fail_region_at: Option<u64>,
    transfer_cap: Option<u64>,
    empty_transfers: bool,
    strict_reads: bool,
}

impl State {
    fn region_at(&self, address: u64) -> Option<(u64, &SimRegion)> {
        let (&base, region) = self.regions.range(..=address).next_back()?;
        if address < region.end(base) {
            Some((base, region))
        } else {
            None
        }
    }

    fn region_at_mut(&mut self, address: u64) -> Option<(u64, &mut SimRegion)> {
        let (&base, region) = self.regions.range_mut(..=address).next_back()?;
        if address < region.end(base) {
            Some((base, region))
        } else {
            None
        }
    }

    fn stage(&mut self, bytes: Vec<u8>, reported: u64) -> Transfer {
        let boxed = bytes.into_boxed_slice();
        let address = boxed.as_ptr() as u64;
        self.live.insert(address, boxed);
        self.allocations += 1;
        Transfer { address, size: reported }
    }
}

#[derive(Default)]
pub struct SimulatedSpace {
    state: Mutex<State>,
}

impl SimulatedSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self, base: u64, data: Vec<u8>, protection: Protection) {
        self.map_with_kind(base, data, protection, RegionKind::Private);
    }

    pub fn map_with_kind(&self, base: u64, data: Vec<u8>, protection: Protection, kind: RegionKind) {
        self.state.lock().regions.insert(
            base,
            SimRegion {
                protection,
                max_protection: Protection::all(),
                kind,
                data,
            },
        );
    }

    pub fn unmap(&self, base: u64) -> bool {
        self.state.lock().regions.remove(&base).is_some()
    }

    pub fn protect(&self, base: u64, protection: Protection) -> bool {
        match self.state.lock().regions.get_mut(&base) {
            Some(region) => {
                region.protection = protection;
                true
            }
            None => false,
        }
    }

    /// Writes into a single mapped region, ignoring protection.
    pub fn write(&self, address: u64, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        match state.region_at_mut(address) {
            Some((base, region)) => {
                let offset = (address - base) as usize;
                if offset + bytes.len() > region.data.len() {
                    return false;
                }
                region.data[offset..offset + bytes.len()].copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Every call fails as if the task port were a dead name.
    pub fn invalidate_handle(&self, invalid: bool) {
        self.state.lock().invalid_handle = invalid;
    }

    pub fn deny_enumeration(&self, deny: bool) {
        self.state.lock().deny_enumeration = deny;
    }

    /// Deallocation still frees the buffer but reports failure.
    pub fn fail_deallocate(&self, fail: bool) {
        self.state.lock().fail_deallocate = fail;
    }

    /// Region queries at or above `address` fail with `KERN_FAILURE`.
    pub fn fail_region_at(&self, address: Option<u64>) {
        self.state.lock().fail_region_at = address;
    }

    /// Caps every transfer at `cap` bytes.
    pub fn cap_transfers(&self, cap: Option<u64>) {
        self.state.lock().transfer_cap = cap;
    }

    /// Reads fail outright unless the whole range is readable, the way
    /// `mach_vm_read` behaves.
    pub fn strict_reads(&self, strict: bool) {
        self.state.lock().strict_reads = strict;
    }

    /// Reads stage a buffer but report zero bytes transferred.
    pub fn empty_transfers(&self, empty: bool) {
        self.state.lock().empty_transfers = empty;
    }

    pub fn allocations(&self) -> u64 {
        self.state.lock().allocations
    }

    pub fn deallocations(&self) -> u64 {
        self.state.lock().deallocations
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn region_queries(&self) -> u64 {
        self.state.lock().region_queries
    }

    pub fn read_calls(&self) -> u64 {
        self.state.lock().read_calls
    }
}

unsafe impl VmPrimitives for SimulatedSpace {
    fn region(&self, address: u64) -> Result<RawRegion, KernReturn> {
        let mut state = self.state.lock();
        state.region_queries += 1;

        if state.invalid_handle {
            return Err(KernReturn::INVALID_TASK);
        }
        if state.deny_enumeration {
            return Err(KernReturn::PROTECTION_FAILURE);
        }
        if matches!(state.fail_region_at, Some(at) if address >= at) {
            return Err(KernReturn::FAILURE);
        }

        let found = match state.region_at(address) {
            Some((base, region)) => Some((base, region)),
            None => state.regions.range(address..).next().map(|(&base, region)| (base, region)),
        };

        match found {
            Some((base, region)) => Ok(RawRegion {
                address: base,
                size: region.data.len() as u64,
                protection: region.protection.bits(),
                max_protection: region.max_protection.bits(),
                shared: region.kind == RegionKind::Shared,
                reserved: region.kind == RegionKind::Reserved,
                offset: 0,
                user_wired_count: 0,
            }),
            None => Err(KernReturn::INVALID_ADDRESS),
        }
    }

    fn read(&self, address: u64, size: u64) -> Result<Transfer, KernReturn> {
        let mut state = self.state.lock();
        state.read_calls += 1;

        if state.invalid_handle {
            return Err(KernReturn::INVALID_TASK);
        }

        let wanted = match state.transfer_cap {
            Some(cap) => size.min(cap),
            None => size,
        };

        let mut bytes = Vec::new();
        let mut cursor = address;
        while (bytes.len() as u64) < wanted {
            let (base, region) = match state.region_at(cursor) {
                Some(found) => found,
                None if bytes.is_empty() || state.strict_reads => return Err(KernReturn::INVALID_ADDRESS),
                None => break,
            };
            if !region.protection.is_readable() {
                if bytes.is_empty() || state.strict_reads {
                    return Err(KernReturn::PROTECTION_FAILURE);
                }
                break;
            }
            let offset = (cursor - base) as usize;
            let take = ((wanted - bytes.len() as u64) as usize).min(region.data.len() - offset);
            bytes.extend_from_slice(&region.data[offset..offset + take]);
            cursor += take as u64;
        }

        if state.empty_transfers {
            return Ok(state.stage(vec![0u8; 1], 0));
        }
        let reported = bytes.len() as u64;
        Ok(state.stage(bytes, reported))
    }

    fn deallocate(&self, transfer: Transfer) -> Result<(), KernReturn> {
        let mut state = self.state.lock();
        state.deallocations += 1;

        if state.live.remove(&transfer.address).is_none() {
            return Err(KernReturn::INVALID_ADDRESS);
        }
        if state.fail_deallocate {
            return Err(KernReturn::INVALID_ADDRESS);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_snaps_up_to_next_mapping() {
        let space = SimulatedSpace::new();
        space.map(0x4000, vec![0u8; 0x1000], Protection::READ);

        let region = space.region(0x1000).unwrap();
        assert_eq!(region.address, 0x4000);
        assert_eq!(region.size, 0x1000);

        let inside = space.region(0x4800).unwrap();
        assert_eq!(inside.address, 0x4000);

        assert_eq!(space.region(0x5000), Err(KernReturn::INVALID_ADDRESS));
    }

    #[test]
    fn test_read_stops_at_gap() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![1u8; 0x80], Protection::READ);

        let transfer = space.read(0x1000, 0x100).unwrap();
        assert_eq!(transfer.size, 0x80);
        space.deallocate(transfer).unwrap();
        assert_eq!(space.outstanding(), 0);
    }

    #[test]
    fn test_read_spans_adjacent_regions() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![1u8; 0x1000], Protection::READ);
        space.map(0x2000, vec![2u8; 0x1000], Protection::READ | Protection::WRITE);

        let transfer = space.read(0x1800, 0x1000).unwrap();
        assert_eq!(transfer.size, 0x1000);
        space.deallocate(transfer).unwrap();
    }

    #[test]
    fn test_unreadable_region_fails_without_allocating() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![0u8; 0x1000], Protection::empty());

        assert_eq!(space.read(0x1000, 0x10), Err(KernReturn::PROTECTION_FAILURE));
        assert_eq!(space.read(0x8000, 0x10), Err(KernReturn::INVALID_ADDRESS));
        assert_eq!(space.allocations(), 0);
    }

    #[test]
    fn test_strict_reads_fail_whole_range() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![1u8; 0x80], Protection::READ);
        space.strict_reads(true);

        assert_eq!(space.read(0x1000, 0x100), Err(KernReturn::INVALID_ADDRESS));
        assert_eq!(space.allocations(), 0);
    }

    #[test]
    fn test_unknown_deallocation_is_rejected() {
        let space = SimulatedSpace::new();
        let bogus = Transfer { address: 0xdead, size: 4 };
        assert_eq!(space.deallocate(bogus), Err(KernReturn::INVALID_ADDRESS));
    }

    #[test]
    fn test_write_and_protect() {
        let space = SimulatedSpace::new();
        space.map(0x1000, vec![0u8; 0x10], Protection::READ);

        assert!(space.write(0x1004, &[0xAA, 0xBB]));
        assert!(!space.write(0x100f, &[1, 2]));
        assert!(space.protect(0x1000, Protection::empty()));
        assert_eq!(space.read(0x1000, 1), Err(KernReturn::PROTECTION_FAILURE));
        assert!(space.unmap(0x1000));
        assert!(!space.unmap(0x1000));
    }
}
