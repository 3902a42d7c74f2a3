//! Virtual memory primitives for segment storage providers.
//!
//! The [`vm`] module exposes a small platform-specific surface: reserve an aligned
//! range of address space, commit and decommit pages within it, and release it.
//! [`vm_region::VmRegion`] is an owning wrapper over one reserved range.

pub mod vm_region;

#[cfg_attr(any(target_os = "linux"), path = "vm_linux.rs")]
#[cfg_attr(windows, path = "vm_win.rs")]
#[cfg_attr(not(any(target_os = "linux", windows)), path = "vm_fallback.rs")]
pub mod vm;

/// Rounds `size` up to the next multiple of `alignment`, which must be a power of two.
#[inline]
pub fn align_up(size: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests;
