//! Aligned allocation facade over the platform's aligned allocator.
//!
//! This is the *only* way the free-list allocator obtains raw memory
//! from the platform. It wraps `libc::posix_memalign`/`libc::free`, the
//! same POSIX primitive an `aligned_alloc`-style crate wraps for this
//! exact problem: `malloc` already aligns to the platform's fundamental
//! alignment, but callers that need a stronger guarantee have to ask for
//! it explicitly.

use std::ffi::c_void;
use std::ptr;

/// Raises `align` to at least the pointer size and asserts it is a power
/// of two, matching `posix_memalign`'s own precondition.
#[inline]
fn effective_align(align: usize) -> usize {
    let min = size_of::<*const ()>();
    let align = align.max(min);
    debug_assert!(
        crate::align::is_power_of_two(align),
        "alignment must be a power of two"
    );
    align
}

/// Returns an `align`-aligned pointer to `size` bytes, or null on
/// failure. `align` is raised to `size_of::<*const ()>()` if smaller and
/// must otherwise be a power of two.
#[must_use]
pub fn alloc(size: usize, align: usize) -> *mut u8 {
    if size == 0 {
        return ptr::null_mut();
    }
    let align = effective_align(align);

    let mut out: *mut c_void = ptr::null_mut();
    let rc = unsafe { libc::posix_memalign(&mut out, align, size) };
    if rc != 0 {
        log::debug!("posix_memalign({size}, {align}) failed: errno {rc}");
        return ptr::null_mut();
    }
    out.cast()
}

/// As [`alloc`], then zeroes `n * size` bytes. Null on overflow or
/// allocation failure.
#[must_use]
pub fn calloc(n: usize, size: usize, align: usize) -> *mut u8 {
    let Some(total) = n.checked_mul(size) else {
        log::debug!("calloc({n}, {size}) overflows usize");
        return ptr::null_mut();
    };
    let ptr = alloc(total, align);
    if !ptr.is_null() {
        unsafe { ptr::write_bytes(ptr, 0, total) };
    }
    ptr
}

/// Resizes an allocation obtained from [`alloc`]/[`calloc`]/[`realloc`].
///
/// - `p == null` behaves like `alloc(new_size, align)`.
/// - `new_size == 0` frees `p` and returns null.
/// - Otherwise, allocates fresh, copies `min(old_size, new_size)` bytes,
///   frees the old block, and returns the new pointer. On failure `p` is
///   left untouched and null is returned.
#[must_use]
pub fn realloc(p: *mut u8, old_size: usize, new_size: usize, align: usize) -> *mut u8 {
    if p.is_null() {
        return alloc(new_size, align);
    }
    if new_size == 0 {
        free(p);
        return ptr::null_mut();
    }

    let new_ptr = alloc(new_size, align);
    if new_ptr.is_null() {
        return ptr::null_mut();
    }

    let copy_len = old_size.min(new_size);
    unsafe { ptr::copy_nonoverlapping(p, new_ptr, copy_len) };
    free(p);
    new_ptr
}

/// Frees a pointer obtained from this module. Accepts null (no-op).
pub fn free(p: *mut u8) {
    if p.is_null() {
        return;
    }
    unsafe { libc::free(p.cast()) };
}
