use std::alloc::{Layout, alloc_zeroed, dealloc};

fn layout(size: usize, alignment: usize) -> std::io::Result<Layout> {
    Layout::from_size_align(size, alignment.max(get_page_size()))
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))
}

/// Reserves `size` bytes aligned to `alignment` (emulated with the global allocator).
///
/// The memory is zeroed and immediately accessible; [`commit`] is a no-op.
pub fn reserve(size: usize, alignment: usize) -> std::io::Result<*mut std::ffi::c_void> {
    assert!(alignment.is_power_of_two());
    assert!(size > 0 && size.is_multiple_of(get_page_size()));

    let layout = layout(size, alignment)?;
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "Failed to allocate memory",
        ));
    }
    Ok(ptr as *mut std::ffi::c_void)
}

/// No-op: emulated reservations are always accessible.
pub unsafe fn commit(_ptr: *mut std::ffi::c_void, _size: usize) -> std::io::Result<()> {
    Ok(())
}

/// Zero-fills the range so that a later [`commit`] observes fresh pages.
pub unsafe fn decommit(ptr: *mut std::ffi::c_void, size: usize) -> std::io::Result<()> {
    unsafe { std::ptr::write_bytes(ptr as *mut u8, 0, size) };
    Ok(())
}

/// Frees a range returned by [`reserve`] with the same `size` and `alignment`.
pub unsafe fn release(
    ptr: *mut std::ffi::c_void,
    size: usize,
    alignment: usize,
) -> std::io::Result<()> {
    let layout = layout(size, alignment)?;
    unsafe {
        dealloc(ptr as *mut u8, layout);
    }
    Ok(())
}

/// Returns the "standard page" size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}
