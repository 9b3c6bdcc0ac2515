// Fri Jan 17 2026 - Alex

use crate::config::ScanConfig;
use crate::memory::range::Chunks;
use crate::memory::{
    Address, MemoryError, MemoryRange, ReadResult, RegionDescriptor, RegionEnumerator, SafeReader, VmPrimitives,
};

/// One read issued by a scan, together with the region it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanChunk {
    pub region: RegionDescriptor,
    pub result: ReadResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub regions_visited: u64,
    pub regions_selected: u64,
    pub chunks: u64,
    pub bytes_read: u64,
    pub partial_chunks: u64,
    pub failed_chunks: u64,
    pub retries: u64,
    pub salvaged_chunks: u64,
}

/// Sweeps a task's address space region by region.
///
/// The driver itself is stateless between scans; each call to [`scan`]
/// returns an iterator that owns its own cursor, so several scans may run
/// against the same task from different threads.
///
/// [`scan`]: ScanDriver::scan
pub struct ScanDriver<P: VmPrimitives> {
    primitives: P,
    config: ScanConfig,
}

impl<P: VmPrimitives> ScanDriver<P> {
    pub fn new(primitives: P, config: ScanConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        Ok(Self { primitives, config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    pub fn enumerator(&self) -> RegionEnumerator<&P> {
        RegionEnumerator::new(&self.primitives)
    }

    pub fn reader(&self) -> SafeReader<&P> {
        SafeReader::new(&self.primitives)
    }

    pub fn scan<F>(&self, bounds: Option<MemoryRange>, predicate: F) -> Scan<'_, P, F>
    where
        F: FnMut(&RegionDescriptor) -> bool,
    {
        let start = bounds.map_or(Address::zero(), |b| b.start());
        self.scan_from(start, bounds, predicate)
    }

    /// Restarts a sweep at `start`, typically a previous [`Scan::resume_address`].
    pub fn scan_from<F>(&self, start: Address, bounds: Option<MemoryRange>, predicate: F) -> Scan<'_, P, F>
    where
        F: FnMut(&RegionDescriptor) -> bool,
    {
        let start = bounds.map_or(start, |b| start.max(b.start()));
        Scan {
            enumerator: self.enumerator(),
            reader: self.reader(),
            config: &self.config,
            predicate,
            lower: start,
            upper: bounds.map(|b| b.end()),
            cursor: ScanCursor {
                next_address: Some(start),
                advanced: false,
                active: None,
            },
            stats: ScanStats::default(),
        }
    }

    /// Sweep using the bounds and filter from the driver's configuration.
    pub fn scan_configured(&self) -> Scan<'_, P, impl FnMut(&RegionDescriptor) -> bool + '_> {
        let filter = &self.config.filter;
        self.scan(self.config.bounds, move |region: &RegionDescriptor| filter.matches(region))
    }
}

struct ActiveRegion {
    region: RegionDescriptor,
    chunks: Chunks,
}

struct ScanCursor {
    next_address: Option<Address>,
    advanced: bool,
    active: Option<ActiveRegion>,
}

/// Lazy, forward-only sweep. Stops after the first fatal error.
pub struct Scan<'a, P: VmPrimitives, F> {
    enumerator: RegionEnumerator<&'a P>,
    reader: SafeReader<&'a P>,
    config: &'a ScanConfig,
    predicate: F,
    lower: Address,
    upper: Option<Address>,
    cursor: ScanCursor,
    stats: ScanStats,
}

impl<'a, P: VmPrimitives, F> Scan<'a, P, F>
where
    F: FnMut(&RegionDescriptor) -> bool,
{
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Where a new scan should start to pick up after the last yielded chunk.
    pub fn resume_address(&self) -> Option<Address> {
        match &self.cursor.active {
            Some(active) => active.chunks.next_start().or(self.cursor.next_address),
            None => self.cursor.next_address,
        }
    }

    fn finish(&mut self) {
        self.cursor.next_address = None;
        self.cursor.active = None;
    }

    /// Moves the cursor to the next selected region. `Ok(false)` at the end.
    fn advance(&mut self) -> Result<bool, MemoryError> {
        loop {
            let cursor = match self.cursor.next_address {
                Some(cursor) => cursor,
                None => return Ok(false),
            };
            if matches!(self.upper, Some(upper) if cursor >= upper) {
                return Ok(false);
            }

            let region = match self.enumerator.next_region(cursor)? {
                Some(region) => region,
                None => return Ok(false),
            };
            let region = if self.cursor.advanced && region.base() < cursor {
                log::debug!("Region {} grew below the cursor {}, clipping", region, cursor);
                region.clip_from(cursor).ok_or_else(|| {
                    MemoryError::EnumerationFailed(
                        cursor.as_u64(),
                        format!("region {} ends before the cursor", region.range()),
                    )
                })?
            } else {
                region
            };
            self.cursor.advanced = true;
            self.cursor.next_address = Some(region.end());
            self.stats.regions_visited += 1;

            if matches!(self.upper, Some(upper) if region.base() >= upper) {
                return Ok(false);
            }
            if !(self.predicate)(&region) {
                log::trace!("Skipping region {}", region);
                continue;
            }

            let start = region.base().max(self.lower);
            let end = match self.upper {
                Some(upper) => region.end().min(upper),
                None => region.end(),
            };
            let window = match MemoryRange::new(start, end) {
                Ok(window) => window,
                Err(_) => continue,
            };

            log::debug!("Scanning region {} window {}", region, window);
            self.stats.regions_selected += 1;
            self.cursor.active = Some(ActiveRegion {
                region,
                chunks: window.chunks(self.config.max_transfer_size),
            });
            return Ok(true);
        }
    }

    fn read_chunk(&mut self, chunk: MemoryRange) -> Result<ReadResult, MemoryError> {
        let mut result = self.reader.read(chunk)?;

        let mut attempts = 0;
        while result.is_partial() && attempts < self.config.partial_retries {
            attempts += 1;
            self.stats.retries += 1;
            let rest = MemoryRange::new(result.end_of_data(), chunk.end())?;
            log::debug!("Partial read of {}, retrying {}", chunk, rest);
            let next = self.reader.read(rest)?;
            if !result.append(next) {
                break;
            }
        }

        if result.is_failed() && self.config.salvage_pages && chunk.size() > self.config.page_size {
            self.salvage(chunk, &mut result)?;
        }

        Ok(result)
    }

    /// Reads a failed chunk one page at a time and keeps the readable prefix.
    fn salvage(&mut self, chunk: MemoryRange, result: &mut ReadResult) -> Result<(), MemoryError> {
        let page = self.config.page_size;
        let mut data = Vec::new();
        let mut start = chunk.start();

        while start < chunk.end() {
            let boundary = start
                .align_down(page)
                .checked_add(page)
                .map_or(chunk.end(), |b| b.min(chunk.end()));
            let piece = self.reader.read(MemoryRange::new(start, boundary)?)?;
            let complete = piece.is_complete();
            data.extend_from_slice(piece.data());
            if !complete {
                break;
            }
            start = boundary;
        }

        if !data.is_empty() {
            log::debug!("Salvaged 0x{:x} of 0x{:x} bytes from {}", data.len(), chunk.size(), chunk);
            self.stats.salvaged_chunks += 1;
            result.salvage(data);
        }
        Ok(())
    }

    fn record(&mut self, result: &ReadResult) {
        self.stats.chunks += 1;
        self.stats.bytes_read += result.len() as u64;
        if result.is_partial() {
            self.stats.partial_chunks += 1;
        } else if result.is_failed() {
            self.stats.failed_chunks += 1;
        }
    }
}

impl<'a, P: VmPrimitives, F> Iterator for Scan<'a, P, F>
where
    F: FnMut(&RegionDescriptor) -> bool,
{
    type Item = Result<ScanChunk, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = match self.cursor.active.as_mut() {
                Some(active) => active.chunks.next().map(|chunk| (active.region.clone(), chunk)),
                None => None,
            };

            if let Some((region, chunk)) = next {
                return match self.read_chunk(chunk) {
                    Ok(result) => {
                        log::trace!("Chunk {} -> {:?} (0x{:x} bytes)", chunk, result.status(), result.len());
                        self.record(&result);
                        Some(Ok(ScanChunk { region, result }))
                    }
                    Err(e) => {
                        self.finish();
                        Some(Err(e))
                    }
                };
            }

            self.cursor.active = None;
            match self.advance() {
                Ok(true) => continue,
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    log::warn!("Scan aborted: {}", e);
                    self.finish();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<P: VmPrimitives, F> std::iter::FusedIterator for Scan<'_, P, F> where F: FnMut(&RegionDescriptor) -> bool {}
