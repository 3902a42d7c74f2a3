use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard},
};

use segstore_common::{Result, error::Error, verify_arg};
use segstore_page_alloc::vm_region::VmRegion;
use segstore_provider::{Segment, StatsSnapshot, StorageProvider, StorageStats};

use crate::validate_segment_size;

/// Carves segments out of a single address-space reservation made up front.
///
/// The whole `capacity` is reserved (not committed) at construction. Segments are
/// numbered slots inside it; `acquire` commits the lowest free slot, and
/// `release` decommits the slot and makes it available again. Once every slot is
/// in use, `acquire` returns `None`.
pub struct ContiguousVAStorageProvider {
    region: VmRegion,
    segment_size: usize,
    slots: usize,
    state: Mutex<SlotState>,
    stats: StorageStats,
}

#[derive(Default)]
struct SlotState {
    /// Slots below `level` that have been released.
    free: BTreeSet<usize>,
    /// Slots at or above `level` have never been handed out.
    level: usize,
}

impl ContiguousVAStorageProvider {
    /// Reserves `capacity` bytes of address space for `segment_size`-byte segments.
    ///
    /// `capacity` must be a non-zero multiple of `segment_size`.
    pub fn new(segment_size: usize, capacity: usize) -> Result<ContiguousVAStorageProvider> {
        validate_segment_size(segment_size)?;
        verify_arg!(capacity, capacity != 0);
        verify_arg!(capacity, capacity.is_multiple_of(segment_size));

        let region = VmRegion::reserve(capacity, segment_size)
            .map_err(|e| Error::io("reserve contiguous storage region", e))?;
        log::debug!(
            "reserved {capacity} bytes at {:?} for {}-byte segments",
            region.ptr(),
            segment_size
        );
        Ok(ContiguousVAStorageProvider {
            region,
            segment_size,
            slots: capacity / segment_size,
            state: Mutex::new(SlotState::default()),
            stats: StorageStats::new(),
        })
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Total number of segments the reservation can hold.
    pub fn capacity_segments(&self) -> usize {
        self.slots
    }

    /// Number of segments currently handed out.
    pub fn live_segments(&self) -> usize {
        let state = self.lock();
        state.level - state.free.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_slot(&self) -> Option<usize> {
        let mut state = self.lock();
        if let Some(slot) = state.free.pop_first() {
            return Some(slot);
        }
        if state.level < self.slots {
            state.level += 1;
            return Some(state.level - 1);
        }
        None
    }

    fn return_slot(&self, slot: usize) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if slot + 1 == state.level {
            state.level -= 1;
            while state.level > 0 && state.free.remove(&(state.level - 1)) {
                state.level -= 1;
            }
        } else {
            state.free.insert(slot);
        }
    }

    /// Maps a segment address back to its slot, or `None` if the address was not
    /// handed out by this provider.
    fn slot_of(&self, segment: &Segment) -> Option<usize> {
        let addr = segment.addr();
        if !self.region.contains(addr) {
            return None;
        }
        let offset = addr - self.region.ptr() as usize;
        if !offset.is_multiple_of(self.segment_size) {
            return None;
        }
        let slot = offset / self.segment_size;
        let state = self.lock();
        (slot < state.level && !state.free.contains(&slot)).then_some(slot)
    }
}

impl StorageProvider for ContiguousVAStorageProvider {
    fn acquire(&self, name: &str) -> Option<Segment> {
        let segment = self.take_slot().and_then(|slot| {
            match self.region.commit(slot * self.segment_size, self.segment_size) {
                // SAFETY: the slot was free, so nothing else refers to it.
                Ok(ptr) => unsafe { Segment::from_ptr(ptr) },
                Err(e) => {
                    log::trace!("commit of segment '{name}' failed: {e}");
                    self.return_slot(slot);
                    None
                }
            }
        });
        log::trace!("acquire '{name}' -> {segment:?}");
        self.stats.record_acquire(&segment);
        segment
    }

    fn release(&self, segment: Segment) {
        let Some(slot) = self.slot_of(&segment) else {
            log::error!("released {segment:?}, which is not a live segment of this provider");
            return;
        };
        log::trace!("release {segment:?} (slot {slot})");
        if let Err(e) = self
            .region
            .decommit(slot * self.segment_size, self.segment_size)
        {
            log::warn!("failed to decommit storage segment {segment:?}: {e}");
        }
        self.return_slot(slot);
        self.stats.record_release();
    }
}

impl std::fmt::Debug for ContiguousVAStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContiguousVAStorageProvider")
            .field("region", &self.region)
            .field("segment_size", &self.segment_size)
            .field("live_segments", &self.live_segments())
            .field("stats", &self.stats())
            .finish()
    }
}
