//! The K&R circular free-list allocator (K&R §8.7, modernized).
//!
//! A circular, address-sorted, singly-linked free list anchored by a
//! permanent zero-size sentinel (`base`). `malloc` walks the list
//! first-fit from a rolling cursor (`head`); `free` reinserts a block at
//! its address-ordered position, coalescing with either neighbor. When
//! the list is exhausted, new memory is requested from the aligned
//! allocation facade ([`crate::platform`]) and inserted exactly as a
//! freed block would be.
//!
//! This module exposes two layers:
//! - [`FreeList`]: an explicit, non-global handle. Use this if you want
//!   more than one independent free list, or want to test one in
//!   isolation.
//! - The `freelist_*` free functions: a thin wrapper over a single
//!   process-wide [`FreeList`], mirroring the classic K&R global API.

use std::cell::UnsafeCell;
use std::ptr::{self, NonNull};

use crate::align;
use crate::block::{Header, UNIT};
use crate::error::AllocError;
use crate::platform;
use crate::ram;

/// One node as reported by [`FreeList::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlockInfo {
    pub address: usize,
    pub size_units: usize,
    pub next_address: usize,
}

/// An explicit circular free-list allocator handle.
///
/// `base` is the permanent sentinel (null until [`initialize`](Self::initialize)
/// succeeds); `head` is the rolling first-fit cursor.
pub struct FreeList {
    base: *mut Header,
    head: *mut Header,
}

// The handle owns raw pointers into platform-allocated memory it alone
// manages; moving it between threads is fine as long as callers uphold
// the single-threaded usage contract documented on the crate root.
unsafe impl Send for FreeList {}

impl FreeList {
    /// An uninitialized handle. No memory is allocated until the first
    /// call to [`initialize`](Self::initialize) or [`malloc`](Self::malloc).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: ptr::null_mut(),
            head: ptr::null_mut(),
        }
    }

    /// Ensures the sentinel exists and `head` points at it. Idempotent:
    /// calling it again after success is a no-op that returns `true`.
    ///
    /// Fails only if the sentinel itself could not be allocated.
    pub fn initialize(&mut self) -> bool {
        match self.try_initialize() {
            Ok(()) => true,
            Err(err) => {
                log::error!("freelist: initialize failed: {err}");
                false
            }
        }
    }

    fn try_initialize(&mut self) -> Result<(), AllocError> {
        debug_assert_eq!(
            align_of::<Header>(),
            UNIT,
            "header alignment must equal the unit size"
        );
        if !self.base.is_null() {
            return Ok(());
        }

        let ptr = platform::alloc(UNIT, UNIT);
        if ptr.is_null() {
            return Err(AllocError::OutOfMemory);
        }

        let header = ptr.cast::<Header>();
        // The sentinel is its own successor until something is inserted.
        unsafe {
            (*header).size = 0;
            (*header).next = header;
        }
        self.base = header;
        self.head = header;
        Ok(())
    }

    /// Walks the list from `base.next`, freeing every non-sentinel node,
    /// then frees the sentinel itself and clears the handle.
    ///
    /// Fails (without side effects) if called before a successful
    /// `initialize`. After a successful `terminate`, the handle may be
    /// initialized again.
    pub fn terminate(&mut self) -> bool {
        match self.try_terminate() {
            Ok(()) => true,
            Err(err) => {
                log::error!("freelist: terminate failed: {err}");
                false
            }
        }
    }

    fn try_terminate(&mut self) -> Result<(), AllocError> {
        if self.base.is_null() {
            return Err(AllocError::Uninitialized);
        }

        let mut p = unsafe { (*self.base).next };
        while p != self.base {
            let next = unsafe { (*p).next };
            platform::free(p.cast());
            p = next;
        }
        platform::free(self.base.cast());

        self.base = ptr::null_mut();
        self.head = ptr::null_mut();
        Ok(())
    }

    /// Returns a payload pointer naming at least `n` writable, `UNIT`-aligned
    /// bytes, or null if `n == 0`, `n` exceeds [`ram::ram_max`], or heap
    /// growth fails. Free-list state is unchanged on failure.
    pub fn malloc(&mut self, n: usize) -> *mut u8 {
        match self.try_malloc(n) {
            Ok(p) => p,
            Err(err) => {
                log::debug!("freelist: malloc({n}) failed: {err}");
                ptr::null_mut()
            }
        }
    }

    fn try_malloc(&mut self, n: usize) -> Result<*mut u8, AllocError> {
        if n == 0 {
            return Err(AllocError::InvalidArgument);
        }
        if n > ram::ram_max() {
            return Err(AllocError::OutOfRange);
        }
        self.try_initialize()?;

        let payload = align::align_up(n, UNIT);
        let units = payload / UNIT + 1;
        let p = self.alloc_units(units);
        if p.is_null() {
            Err(AllocError::OutOfMemory)
        } else {
            Ok(p)
        }
    }

    /// Returns the block owning `p` to the list, coalescing with
    /// adjacent free neighbors. Accepts null (no-op).
    ///
    /// # Safety
    /// `p` must either be null or have been returned by a prior call to
    /// [`malloc`](Self::malloc) on this same handle, and not already freed.
    pub unsafe fn free(&mut self, p: *mut u8) {
        let Some(payload) = NonNull::new(p) else {
            return;
        };
        let bp = unsafe { Header::from_payload(payload) };
        unsafe { self.insert_block(bp) };
    }

    /// Walks the free list, reporting `(address, size_in_units, next_address)`
    /// per node. The sentinel is not included. Intended for tests and
    /// diagnostics.
    #[must_use]
    pub fn dump(&self) -> Vec<FreeBlockInfo> {
        let mut out = Vec::new();
        if self.base.is_null() {
            return out;
        }
        let mut p = unsafe { (*self.base).next };
        while p != self.base {
            let next = unsafe { (*p).next };
            out.push(FreeBlockInfo {
                address: p as usize,
                size_units: unsafe { (*p).size },
                next_address: next as usize,
            });
            p = next;
        }
        out
    }

    /// Sum of payload bytes across all free-list nodes (sentinel excluded).
    #[must_use]
    pub fn free_bytes(&self) -> usize {
        self.dump()
            .iter()
            .map(|b| b.size_units.saturating_sub(1) * UNIT)
            .sum()
    }

    /// Number of free blocks currently on the list (sentinel excluded).
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.dump().len()
    }

    /// True once [`initialize`](Self::initialize) has succeeded and
    /// [`terminate`](Self::terminate) has not yet been called.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        !self.base.is_null()
    }

    /// First-fit search/allocate for `units` (header included), growing
    /// the heap on exhaustion. Direct translation of K&R's `malloc` loop.
    fn alloc_units(&mut self, units: usize) -> *mut u8 {
        let mut prevp = self.head;
        let mut p = unsafe { (*prevp).next };
        loop {
            let size = unsafe { (*p).size };
            if size >= units {
                if size == units {
                    // Exact fit: unlink the whole block. The cursor
                    // resumes at the block's former predecessor.
                    unsafe { (*prevp).next = (*p).next };
                    self.head = prevp;
                } else {
                    // Oversize fit: carve the allocation from the tail.
                    // The shrunken original block stays on the list in
                    // place, so the cursor resumes there.
                    let shrunken = p;
                    unsafe {
                        (*p).size -= units;
                        p = p.add((*p).size);
                        (*p).size = units;
                    }
                    self.head = shrunken;
                }
                return unsafe { Header::payload(p) };
            }
            if p == self.head {
                match self.more_core(units) {
                    Some(new_p) => p = new_p,
                    None => return ptr::null_mut(),
                }
            }
            prevp = p;
            p = unsafe { (*p).next };
        }
    }

    /// Requests more memory from the aligned allocation facade, rounded
    /// up to a page boundary, and inserts it into the free list. Returns
    /// the block the search should resume from (K&R's `morecore` return
    /// value: the post-insertion `head`).
    fn more_core(&mut self, units: usize) -> Option<*mut Header> {
        let bytes = align::align_up_pagesize(units * UNIT);
        let grown_units = bytes / UNIT;

        let ptr = platform::alloc(bytes, UNIT);
        if ptr.is_null() {
            log::error!("freelist: heap growth of {bytes} bytes failed");
            return None;
        }

        let header = ptr.cast::<Header>();
        unsafe { (*header).size = grown_units };
        unsafe { self.insert_block(header) };
        Some(self.head)
    }

    /// Inserts `bp` at its address-ordered position in the free list,
    /// coalescing with either neighbor that is address-adjacent. Direct
    /// translation of K&R's `free`.
    ///
    /// # Safety
    /// `bp` must point to a live header not currently on the free list,
    /// and the allocator must already be initialized.
    unsafe fn insert_block(&mut self, bp: *mut Header) {
        let mut p = self.head;
        loop {
            let p_next = unsafe { (*p).next };
            let interior = (p as usize) < (bp as usize) && (bp as usize) < (p_next as usize);
            if interior {
                break;
            }
            let wrap = (p as usize) >= (p_next as usize)
                && ((bp as usize) > (p as usize) || (bp as usize) < (p_next as usize));
            if wrap {
                break;
            }
            p = p_next;
        }

        let p_next = unsafe { (*p).next };

        unsafe {
            if bp.add((*bp).size) == p_next {
                (*bp).size += (*p_next).size;
                (*bp).next = (*p_next).next;
            } else {
                (*bp).next = p_next;
            }

            if p.add((*p).size) == bp {
                (*p).size += (*bp).size;
                (*p).next = (*bp).next;
            } else {
                (*p).next = bp;
            }
        }

        self.head = p;
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

struct GlobalFreeList(UnsafeCell<FreeList>);

// Soundness of sharing this across threads rests entirely on the
// single-threaded usage contract documented on the crate root; this
// module adds no locking.
unsafe impl Sync for GlobalFreeList {}

static GLOBAL: GlobalFreeList = GlobalFreeList(UnsafeCell::new(FreeList::new()));

/// Process-wide equivalent of [`FreeList::initialize`].
///
/// # Safety
/// Must not be called concurrently with any other `freelist_*` function
/// from another thread.
pub unsafe fn freelist_initialize() -> bool {
    unsafe { (*GLOBAL.0.get()).initialize() }
}

/// Process-wide equivalent of [`FreeList::terminate`].
///
/// # Safety
/// Must not be called concurrently with any other `freelist_*` function
/// from another thread.
pub unsafe fn freelist_terminate() -> bool {
    unsafe { (*GLOBAL.0.get()).terminate() }
}

/// Process-wide equivalent of [`FreeList::malloc`].
///
/// # Safety
/// Must not be called concurrently with any other `freelist_*` function
/// from another thread.
pub unsafe fn freelist_malloc(n: usize) -> *mut u8 {
    unsafe { (*GLOBAL.0.get()).malloc(n) }
}

/// Process-wide equivalent of [`FreeList::free`].
///
/// # Safety
/// `p` must either be null or have been returned by [`freelist_malloc`]
/// and not already freed. Must not be called concurrently with any
/// other `freelist_*` function from another thread.
pub unsafe fn freelist_free(p: *mut u8) {
    unsafe { (*GLOBAL.0.get()).free(p) }
}

/// Process-wide equivalent of [`FreeList::dump`].
///
/// # Safety
/// Must not be called concurrently with any other `freelist_*` function
/// from another thread.
pub unsafe fn freelist_dump() -> Vec<FreeBlockInfo> {
    unsafe { (*GLOBAL.0.get()).dump() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_aligned(ptr: *mut u8, align: usize) -> bool {
        (ptr as usize) % align == 0
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut fl = FreeList::new();
        assert!(fl.initialize());
        assert!(fl.initialize());
        assert!(fl.terminate());
    }

    #[test]
    fn terminate_before_initialize_fails() {
        let mut fl = FreeList::new();
        assert!(!fl.terminate());
    }

    #[test]
    fn zero_size_request_returns_null() {
        let mut fl = FreeList::new();
        assert!(fl.initialize());
        let before = fl.dump();
        assert!(fl.malloc(0).is_null());
        assert_eq!(fl.dump(), before);
        fl.terminate();
    }

    #[test]
    fn over_ceiling_request_returns_null() {
        let mut fl = FreeList::new();
        assert!(fl.initialize());
        let before = fl.dump();
        assert!(fl.malloc(usize::MAX).is_null());
        assert_eq!(fl.dump(), before);
        fl.terminate();
    }

    #[test]
    fn allocation_is_aligned_and_usable() {
        let mut fl = FreeList::new();
        let p = fl.malloc(128);
        assert!(!p.is_null());
        assert!(is_aligned(p, UNIT));
        unsafe { ptr::write_bytes(p, 0xCD, 128) };
        unsafe { fl.free(p) };
        fl.terminate();
    }

    #[test]
    fn allocate_free_reallocate_cycle() {
        let mut fl = FreeList::new();
        assert!(fl.initialize());

        let p = fl.malloc(128);
        assert!(!p.is_null());
        assert!(is_aligned(p, UNIT));

        let q = fl.malloc(256);
        assert!(!q.is_null());
        assert_ne!(p, q);

        unsafe {
            fl.free(p);
            fl.free(q);
        }

        let r = fl.malloc(384);
        assert!(!r.is_null());
        assert!(is_aligned(r, UNIT));

        unsafe { fl.free(r) };
        assert!(fl.terminate());
    }

    #[test]
    fn heap_growth_only_when_necessary() {
        let mut fl = FreeList::new();
        let p = fl.malloc(64);
        assert!(!p.is_null());
        unsafe { fl.free(p) };

        let blocks_before = fl.block_count();
        let q = fl.malloc(32);
        assert!(!q.is_null());
        // Reusing the single free block must not add a new one.
        assert!(fl.block_count() <= blocks_before);
        unsafe { fl.free(q) };
        fl.terminate();
    }

    #[test]
    fn coalescing_both_sides() {
        let mut fl = FreeList::new();
        let a = fl.malloc(64);
        let b = fl.malloc(64);
        let c = fl.malloc(64);
        assert!(!a.is_null() && !b.is_null() && !c.is_null());

        unsafe {
            fl.free(a);
            fl.free(c);
        }
        assert_no_adjacency(&fl);

        unsafe { fl.free(b) };
        assert_no_adjacency(&fl);

        // All three should now be reachable as a single coalesced region.
        assert_eq!(fl.block_count(), 1);
        fl.terminate();
    }

    #[test]
    fn no_adjacency_after_mixed_workload() {
        let mut fl = FreeList::new();
        let ptrs: Vec<_> = (0..16).map(|i| fl.malloc(16 * (i + 1))).collect();
        assert!(ptrs.iter().all(|p| !p.is_null()));
        for (i, &p) in ptrs.iter().enumerate() {
            if i % 2 == 0 {
                unsafe { fl.free(p) };
            }
        }
        assert_no_adjacency(&fl);
        for (i, &p) in ptrs.iter().enumerate() {
            if i % 2 != 0 {
                unsafe { fl.free(p) };
            }
        }
        assert_no_adjacency(&fl);
        fl.terminate();
    }

    #[test]
    fn circular_sorted_invariant_holds() {
        let mut fl = FreeList::new();
        let a = fl.malloc(32);
        let b = fl.malloc(32);
        let c = fl.malloc(32);
        unsafe {
            fl.free(a);
            fl.free(b);
            fl.free(c);
        }
        assert_circular_sorted(&fl);
        fl.terminate();
    }

    #[test]
    fn split_on_oversize_fit_preserves_remainder_position() {
        let mut fl = FreeList::new();
        // Force a single free region far larger than one allocation.
        let big = fl.malloc(UNIT * 20);
        unsafe { fl.free(big) };
        let region_units_before = fl.dump()[0].size_units;

        let small = fl.malloc(UNIT * 2);
        assert!(!small.is_null());

        let remaining = fl.dump();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].size_units, region_units_before - (2 + 1));

        unsafe { fl.free(small) };
        fl.terminate();
    }

    #[test]
    fn terminate_reachability_allows_reinitialize() {
        let mut fl = FreeList::new();
        let p = fl.malloc(64);
        assert!(!p.is_null());
        unsafe { fl.free(p) };
        assert!(fl.terminate());
        assert!(fl.initialize());
        let q = fl.malloc(64);
        assert!(!q.is_null());
        unsafe { fl.free(q) };
        assert!(fl.terminate());
    }

    #[test]
    fn introspection_helpers_agree_with_dump() {
        let mut fl = FreeList::new();
        let p = fl.malloc(128);
        unsafe { fl.free(p) };
        let dumped = fl.dump();
        assert_eq!(fl.block_count(), dumped.len());
        let expected_bytes: usize = dumped.iter().map(|b| (b.size_units - 1) * UNIT).sum();
        assert_eq!(fl.free_bytes(), expected_bytes);
        fl.terminate();
    }

    fn assert_no_adjacency(fl: &FreeList) {
        let nodes = fl.dump();
        for node in &nodes {
            if node.next_address == fl_base_address(fl) {
                continue;
            }
            assert_ne!(
                node.address + node.size_units * UNIT,
                node.next_address,
                "adjacent free blocks should have been coalesced"
            );
        }
    }

    fn assert_circular_sorted(fl: &FreeList) {
        let nodes = fl.dump();
        if nodes.is_empty() {
            return;
        }
        let mut wraps = 0;
        for node in &nodes {
            if node.next_address == fl_base_address(fl) {
                continue;
            }
            if node.address >= node.next_address {
                wraps += 1;
            }
        }
        assert!(wraps <= 1, "at most one wrap edge is allowed");
    }

    fn fl_base_address(fl: &FreeList) -> usize {
        fl.base as usize
    }
}
