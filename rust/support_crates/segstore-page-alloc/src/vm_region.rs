//! An owned range of reserved virtual address space.
//!
//! `VmRegion` reserves its range on creation and releases it on drop. Pages inside
//! the range start out inaccessible and are made usable piecewise with
//! [`VmRegion::commit`], then handed back with [`VmRegion::decommit`].
//!
//! # Safety
//!
//! `VmRegion` implements `Send` and `Sync`; it hands out raw addresses only and
//! never reads or writes the memory itself. Callers that write through those
//! addresses from multiple threads must synchronize the accesses themselves.

use crate::vm;

/// A reserved, aligned range of virtual address space.
pub struct VmRegion {
    /// Start of the reserved range.
    ptr: *mut u8,
    /// Size of the range in bytes, a multiple of the page size.
    size: usize,
    /// Alignment requested at reservation time.
    alignment: usize,
}

impl VmRegion {
    /// Returns the size of a regular memory page on the current system.
    pub fn page_size() -> usize {
        vm::get_page_size()
    }

    /// Reserves `size` bytes of address space aligned to `alignment`.
    ///
    /// # Arguments
    ///
    /// * `size` - The number of bytes to reserve. Rounded up to the page size.
    /// * `alignment` - A power of two. Values below the page size are raised to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the system cannot reserve the requested range.
    pub fn reserve(size: usize, alignment: usize) -> std::io::Result<VmRegion> {
        if !alignment.is_power_of_two() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "alignment must be a power of two",
            ));
        }
        let alignment = alignment.max(Self::page_size());
        let size = crate::align_up(size.max(1), Self::page_size());
        let ptr = vm::reserve(size, alignment)?;
        assert!((ptr as usize).is_multiple_of(alignment));
        Ok(VmRegion {
            ptr: ptr as _,
            size,
            alignment,
        })
    }

    /// Start of the reserved range.
    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Size of the reserved range in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns `true` if `addr` falls inside the reserved range.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.ptr as usize;
        addr >= start && addr < start + self.size
    }

    /// Commits `len` bytes starting at `offset`, making them readable and writable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the range is out of bounds or not page-aligned, or
    /// the OS error if the commit fails.
    pub fn commit(&self, offset: usize, len: usize) -> std::io::Result<*mut u8> {
        self.check_range(offset, len)?;
        let ptr = unsafe { self.ptr.add(offset) };
        unsafe { vm::commit(ptr as _, len)? };
        Ok(ptr)
    }

    /// Decommits `len` bytes starting at `offset`. The contents are discarded and
    /// the address space stays reserved.
    ///
    /// The caller must ensure nothing still refers to the decommitted memory.
    pub fn decommit(&self, offset: usize, len: usize) -> std::io::Result<()> {
        self.check_range(offset, len)?;
        unsafe { vm::decommit(self.ptr.add(offset) as _, len) }
    }

    fn check_range(&self, offset: usize, len: usize) -> std::io::Result<()> {
        let page_size = Self::page_size();
        let in_bounds = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size);
        if !in_bounds || !offset.is_multiple_of(page_size) || !len.is_multiple_of(page_size) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "range is out of bounds or not page-aligned",
            ));
        }
        Ok(())
    }
}

impl Drop for VmRegion {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            let _ = unsafe { vm::release(self.ptr as _, self.size, self.alignment) };
        }
    }
}

// SAFETY: VmRegion owns the reservation and releases it on drop.
unsafe impl Send for VmRegion {}

// SAFETY: the shared-reference methods only change page protections.
unsafe impl Sync for VmRegion {}

impl std::fmt::Debug for VmRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmRegion")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .finish()
    }
}
