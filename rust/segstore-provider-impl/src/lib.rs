//! Concrete [`StorageProvider`] implementations and the configuration layer that
//! assembles them.

use segstore_common::{Result, verify_arg};
use segstore_page_alloc::vm_region::VmRegion;
use segstore_provider::StorageProvider;

pub mod config;
pub mod contiguous_va;
pub mod limited;
pub mod malloc;
pub mod mmap;

pub use config::{ProviderKind, StorageConfig, StorageProviderBuilder};

pub fn create_mmap(segment_size: usize) -> Result<Box<dyn StorageProvider>> {
    Ok(Box::new(mmap::MmapStorageProvider::new(segment_size)?))
}

pub fn create_contiguous_va(
    segment_size: usize,
    capacity: usize,
) -> Result<Box<dyn StorageProvider>> {
    Ok(Box::new(contiguous_va::ContiguousVAStorageProvider::new(
        segment_size,
        capacity,
    )?))
}

pub fn create_malloc(segment_size: usize) -> Result<Box<dyn StorageProvider>> {
    Ok(Box::new(malloc::MallocStorageProvider::new(segment_size)?))
}

pub fn create_from_config(config: &StorageConfig) -> Result<Box<dyn StorageProvider>> {
    StorageProviderBuilder::from_config(config.clone()).build()
}

/// Checks that `segment_size` is a power of two and a multiple of the page size.
pub fn validate_segment_size(segment_size: usize) -> Result<()> {
    verify_arg!(segment_size, segment_size.is_power_of_two());
    verify_arg!(
        segment_size,
        segment_size.is_multiple_of(VmRegion::page_size())
    );
    Ok(())
}
