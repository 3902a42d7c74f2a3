use std::sync::OnceLock;
use windows_sys::Win32::{
    Foundation::GetLastError,
    System::{
        Memory::{
            MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE,
            VirtualAlloc, VirtualFree,
        },
        SystemInformation::{GetSystemInfo, SYSTEM_INFO},
    },
};

use crate::align_up;

/// Number of times [`reserve`] retries when another thread grabs the aligned
/// address between the probe and the real reservation.
const RESERVE_ATTEMPTS: usize = 8;

/// Reserves `size` bytes of address space aligned to `alignment`.
///
/// `VirtualAlloc` only guarantees allocation-granularity alignment (64KB), so larger
/// alignments are obtained by reserving `size + alignment`, releasing it, and
/// reserving again at the aligned address inside the probed range.
///
/// # Arguments
///
/// * `size` - The number of bytes to reserve. Must be a non-zero multiple of the
///   system page size.
/// * `alignment` - Required alignment of the returned address. Must be a power of two.
///
/// # Notes
///
/// The returned range must be released with [`release`].
pub fn reserve(size: usize, alignment: usize) -> std::io::Result<*mut std::ffi::c_void> {
    let page_size = get_page_size();
    assert!(alignment.is_power_of_two());
    assert!(size > 0 && size.is_multiple_of(page_size));

    let alignment = alignment.max(page_size);
    let ptr = unsafe { VirtualAlloc(std::ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
    if ptr.is_null() {
        return Err(last_error());
    }
    if (ptr as usize).is_multiple_of(alignment) {
        return Ok(ptr);
    }
    unsafe { free_reservation(ptr)? };

    let total = size
        .checked_add(alignment)
        .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))?;
    for _ in 0..RESERVE_ATTEMPTS {
        let probe = unsafe { VirtualAlloc(std::ptr::null(), total, MEM_RESERVE, PAGE_NOACCESS) };
        if probe.is_null() {
            return Err(last_error());
        }
        let aligned = align_up(probe as usize, alignment);
        unsafe { free_reservation(probe)? };

        let ptr = unsafe {
            VirtualAlloc(
                aligned as *const std::ffi::c_void,
                size,
                MEM_RESERVE,
                PAGE_NOACCESS,
            )
        };
        if !ptr.is_null() {
            return Ok(ptr);
        }
    }
    Err(std::io::Error::from(std::io::ErrorKind::OutOfMemory))
}

/// Makes `size` bytes starting at `ptr` readable and writable.
///
/// # Safety
///
/// `ptr..ptr + size` must lie within a range returned by [`reserve`].
pub unsafe fn commit(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { VirtualAlloc(ptr, size, MEM_COMMIT, PAGE_READWRITE) };
    if res.is_null() {
        return Err(last_error());
    }
    Ok(())
}

/// Decommits `ptr..ptr + size`, keeping the address space reserved.
///
/// # Safety
///
/// Same requirements as [`commit`]. Any data in the range is discarded.
pub unsafe fn decommit(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    let res = unsafe { VirtualFree(ptr, size, MEM_DECOMMIT) };
    if res == 0 {
        return Err(last_error());
    }
    Ok(())
}

/// Releases a range previously returned by [`reserve`].
///
/// # Safety
///
/// - `ptr` was returned by [`reserve`]
/// - The range has not already been released
/// - No references into the range remain
pub unsafe fn release(
    ptr: *mut std::ffi::c_void,
    size: usize,
    _alignment: usize,
) -> std::io::Result<()> {
    assert!(size.is_multiple_of(get_page_size()));
    unsafe { free_reservation(ptr) }
}

unsafe fn free_reservation(ptr: *mut std::ffi::c_void) -> std::io::Result<()> {
    let res = unsafe { VirtualFree(ptr, 0, MEM_RELEASE) };
    if res == 0 {
        return Err(last_error());
    }
    Ok(())
}

fn last_error() -> std::io::Error {
    let error = unsafe { GetLastError() };
    std::io::Error::from_raw_os_error(error as i32)
}

pub fn get_page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

    *PAGE_SIZE.get_or_init(|| unsafe {
        let mut system_info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut system_info);
        system_info.dwPageSize as usize
    })
}
