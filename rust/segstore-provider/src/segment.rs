use std::ptr::NonNull;

/// An opaque handle to one acquired storage segment.
///
/// A `Segment` is the address of a contiguous block whose size is fixed by the
/// provider that produced it. It is move-only: the only way to give it back is to
/// pass it by value to the same provider's
/// [`release`](crate::StorageProvider::release). Constructing a `Segment` from
/// an address is `unsafe`, so safe code can neither forge a handle nor release
/// one twice:
///
/// ```compile_fail
/// use segstore_provider::Segment;
///
/// let forged = Segment::from_ptr(std::ptr::dangling_mut());
/// ```
///
/// `Segment` never reads or writes the memory it refers to. Accessing that memory
/// through [`Segment::as_ptr`] is up to the caller.
#[derive(PartialEq, Eq, Hash)]
pub struct Segment(NonNull<u8>);

impl Segment {
    /// Wraps a non-null segment address.
    ///
    /// # Safety
    ///
    /// `ptr` must be the start of a live segment that the caller owns, and no
    /// other `Segment` for the same address may exist. Providers rely on this
    /// when they free the storage behind a released handle.
    #[inline]
    pub unsafe fn from_non_null(ptr: NonNull<u8>) -> Segment {
        Segment(ptr)
    }

    /// Wraps a raw segment address, mapping null to `None`.
    ///
    /// # Safety
    ///
    /// Same as [`Segment::from_non_null`] when `ptr` is not null.
    #[inline]
    pub unsafe fn from_ptr(ptr: *mut u8) -> Option<Segment> {
        NonNull::new(ptr).map(Segment)
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.0.as_ptr()
    }

    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.0
    }

    /// The segment's start address, for identity checks and diagnostics.
    #[inline]
    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Consumes the handle, returning the address it carried.
    #[inline]
    pub fn into_non_null(self) -> NonNull<u8> {
        self.0
    }
}

// SAFETY: a Segment is an address that names memory owned by its provider; the
// handle itself holds no thread-affine state.
unsafe impl Send for Segment {}

// SAFETY: see above; shared references only expose the address.
unsafe impl Sync for Segment {}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Segment({:#x})", self.addr())
    }
}
