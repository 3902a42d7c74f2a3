use std::sync::OnceLock;

use crate::align_up;

/// Reserves `size` bytes of address space aligned to `alignment`.
///
/// The reserved range is inaccessible (`PROT_NONE`) until pages are committed
/// with [`commit`]. `MAP_NORESERVE` is used so that the reservation does not count
/// against the overcommit limit.
///
/// # Arguments
///
/// * `size` - The number of bytes to reserve. Must be a non-zero multiple of the
///   system page size.
/// * `alignment` - Required alignment of the returned address. Must be a power of two.
///   Alignments larger than the page size are satisfied by over-reserving and
///   trimming the unaligned head and tail.
///
/// # Returns
///
/// Returns the start of the reserved range, or an `io::Error` if the kernel
/// refused the mapping (typically address space exhaustion).
///
/// # Notes
///
/// The returned range must be released with [`release`] using the same `size`.
pub fn reserve(size: usize, alignment: usize) -> std::io::Result<*mut std::ffi::c_void> {
    let page_size = get_page_size();
    assert!(alignment.is_power_of_two());
    assert!(size > 0 && size.is_multiple_of(page_size));

    let alignment = alignment.max(page_size);
    let total = if alignment > page_size {
        size.checked_add(alignment)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))?
    } else {
        size
    };

    let raw = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            total,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
            -1,
            0,
        )
    };
    if raw.is_null() || raw == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }

    let raw_addr = raw as usize;
    let aligned_addr = align_up(raw_addr, alignment);
    let head = aligned_addr - raw_addr;
    let tail = total - head - size;
    if let Err(e) = unsafe { trim(raw, head, aligned_addr + size, tail) } {
        // Whatever part of the mapping survived the failed trim is still ours.
        let _ = unsafe { unmap(raw, total) };
        return Err(e);
    }
    Ok(aligned_addr as *mut std::ffi::c_void)
}

/// Unmaps the `head` bytes at `raw` and the `tail` bytes at `tail_addr`.
unsafe fn trim(
    raw: *mut std::ffi::c_void,
    head: usize,
    tail_addr: usize,
    tail: usize,
) -> std::io::Result<()> {
    if head > 0 {
        unsafe { unmap(raw, head)? };
    }
    if tail > 0 {
        unsafe { unmap(tail_addr as *mut std::ffi::c_void, tail)? };
    }
    Ok(())
}

/// Makes `size` bytes starting at `ptr` readable and writable.
///
/// Freshly committed pages read as zero.
///
/// # Safety
///
/// `ptr..ptr + size` must lie within a range returned by [`reserve`] and both
/// `ptr` and `size` must be page-aligned.
pub unsafe fn commit(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { libc::mprotect(ptr, size, libc::PROT_READ | libc::PROT_WRITE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Returns the physical pages backing `ptr..ptr + size` to the system and makes
/// the range inaccessible again. The address space stays reserved.
///
/// # Safety
///
/// Same requirements as [`commit`]. Any data in the range is discarded.
pub unsafe fn decommit(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { libc::madvise(ptr, size, libc::MADV_DONTNEED) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let res = unsafe { libc::mprotect(ptr, size, libc::PROT_NONE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Releases a range previously returned by [`reserve`].
///
/// # Safety
///
/// - `ptr` was returned by [`reserve`] with the same `size` and `alignment`
/// - The range has not already been released
/// - No references into the range remain
pub unsafe fn release(
    ptr: *mut std::ffi::c_void,
    size: usize,
    _alignment: usize,
) -> std::io::Result<()> {
    unsafe { unmap(ptr, size) }
}

unsafe fn unmap(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { libc::munmap(ptr, size) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Gets the system's standard page size in bytes.
///
/// The value is cached after the first call. Falls back to 4KB if
/// `sysconf(_SC_PAGESIZE)` fails.
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| read_page_size().unwrap_or(4 * 1024))
}

fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    assert!(res < i32::MAX as _);
    Ok(res as usize)
}
