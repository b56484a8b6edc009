//! The block header every allocation carries, and the unit it's sized in.

use std::ptr::NonNull;

/// The header immediately preceding every block's payload.
///
/// `next` is meaningful only while the block is linked into the free
/// list; it is left in whatever state it was last written while the
/// block is handed out to a caller. `size` counts units *including* the
/// header, so a block's payload occupies `size - 1` units.
#[repr(C)]
pub struct Header {
    pub next: *mut Header,
    pub size: usize,
}

/// The atomic size quantum of the allocator: `size_of::<Header>()` bytes.
///
/// Sizing every block in units of the header's own size is what lets
/// splits preserve alignment without a separate padding pass (see the
/// crate root docs).
pub const UNIT: usize = size_of::<Header>();

const _: () = assert!(UNIT > 0);
const _: () = assert!(align_of::<Header>() == UNIT);

impl Header {
    /// Converts a payload pointer (as handed to a caller by `malloc`)
    /// back to the header that precedes it.
    ///
    /// # Safety
    /// `payload` must have been returned by this allocator's `malloc`
    /// and not yet freed.
    #[inline]
    pub unsafe fn from_payload(payload: NonNull<u8>) -> *mut Header {
        unsafe { payload.as_ptr().cast::<Header>().sub(1) }
    }

    /// The payload address for this header: one unit past the header
    /// itself.
    ///
    /// # Safety
    /// `header` must point to a live, properly initialized `Header`.
    #[inline]
    pub unsafe fn payload(header: *mut Header) -> *mut u8 {
        unsafe { header.add(1).cast::<u8>() }
    }
}
