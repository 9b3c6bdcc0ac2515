// Thu Jan 16 2026 - Alex

use crate::memory::{
    Address, KernReturn, MemoryError, MemoryRange, Protection, RawRegion, RegionDescriptor, RegionKind,
    VmPrimitives,
};

/// Walks the region table of a task one query at a time.
pub struct RegionEnumerator<P: VmPrimitives> {
    primitives: P,
}

impl<P: VmPrimitives> RegionEnumerator<P> {
    pub fn new(primitives: P) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    /// Region containing `cursor` or the first one above it; `None` once the
    /// cursor is past the last mapping.
    pub fn next_region(&self, cursor: Address) -> Result<Option<RegionDescriptor>, MemoryError> {
        let raw = match self.primitives.region(cursor.as_u64()) {
            Ok(raw) => raw,
            Err(kr) if kr == KernReturn::INVALID_ADDRESS || kr == KernReturn::NO_SPACE => return Ok(None),
            Err(kr) => return Err(translate(cursor, kr)),
        };

        let region = describe(cursor, &raw)?;
        if region.end() <= cursor {
            return Err(MemoryError::EnumerationFailed(
                cursor.as_u64(),
                format!("kernel returned {} which ends before the cursor", region.range()),
            ));
        }
        Ok(Some(region))
    }

    pub fn regions(&self) -> Regions<'_, P> {
        Regions {
            enumerator: self,
            cursor: Some(Address::zero()),
        }
    }
}

fn translate(cursor: Address, kr: KernReturn) -> MemoryError {
    if kr.is_handle_error() {
        MemoryError::InvalidHandle(kr)
    } else if kr.is_access_error() {
        MemoryError::PermissionDenied(kr)
    } else {
        MemoryError::EnumerationFailed(cursor.as_u64(), kr.to_string())
    }
}

fn describe(cursor: Address, raw: &RawRegion) -> Result<RegionDescriptor, MemoryError> {
    let range = MemoryRange::from_start_size(Address::new(raw.address), raw.size).map_err(|_| {
        MemoryError::EnumerationFailed(
            cursor.as_u64(),
            format!("kernel returned unusable region 0x{:x} + 0x{:x}", raw.address, raw.size),
        )
    })?;

    Ok(RegionDescriptor::new(
        range,
        Protection::from_flags(raw.protection),
        RegionKind::from_basic_info(raw.shared, raw.reserved),
    )
    .with_max_protection(Protection::from_flags(raw.max_protection))
    .with_offset(raw.offset)
    .with_user_wired_count(raw.user_wired_count))
}

/// Every region of the space in address order. Yields at most one error.
pub struct Regions<'a, P: VmPrimitives> {
    enumerator: &'a RegionEnumerator<P>,
    cursor: Option<Address>,
}

impl<P: VmPrimitives> Iterator for Regions<'_, P> {
    type Item = Result<RegionDescriptor, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        match self.enumerator.next_region(cursor) {
            Ok(Some(region)) if region.base() < cursor => {
                log::debug!("Region {} grew below the cursor {}, clipping", region, cursor);
                let clipped = region.clip_from(cursor)?;
                self.cursor = Some(clipped.end());
                Some(Ok(clipped))
            }
            Ok(Some(region)) => {
                self.cursor = Some(region.end());
                Some(Ok(region))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
