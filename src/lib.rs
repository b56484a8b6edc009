//! # freelist-alloc — a K&R-style circular free-list storage allocator
//!
//! This crate serves variable-sized allocation requests from a pool of
//! process memory with a single circular free list, coalescing
//! neighboring free blocks on return so the list neither fragments
//! unboundedly nor requires compaction. It is a modernized, documented
//! rendering of the allocator from K&R §8.7.
//!
//! It is meant for embedding inside larger systems where a predictable,
//! inspectable allocator is preferable to reaching for the platform's
//! `malloc`.
//!
//! ## Crate Structure
//!
//! ```text
//!   freelist_alloc
//!   ├── align     - alignment/padding/unit arithmetic (pure functions)
//!   ├── ram       - physical RAM inspection and the allocation ceiling
//!   ├── platform  - aligned alloc/calloc/realloc/free over libc
//!   ├── block     - the block header and the unit it's sized in
//!   ├── error     - the four failure kinds, for internal use and logs
//!   └── freelist  - the circular free-list allocator itself
//! ```
//!
//! ## Quick start
//!
//! ```
//! use freelist_alloc::FreeList;
//!
//! let mut heap = FreeList::new();
//! let p = heap.malloc(128);
//! assert!(!p.is_null());
//!
//! unsafe {
//!     p.write_bytes(0, 128);
//!     heap.free(p);
//! }
//!
//! heap.terminate();
//! ```
//!
//! ## Concurrency
//!
//! The allocator is single-threaded: there is no internal
//! synchronization, and no operation performs I/O, locking, or timed
//! waits (aside from what the platform allocator itself may do).
//! Concurrent calls from multiple threads are not safe; callers
//! requiring concurrency must serialize externally — this is why
//! [`freelist::freelist_malloc`] and its siblings are `unsafe fn`.
//!
//! ## Error handling
//!
//! Every failure is reported to the immediate caller as a null pointer
//! (allocation operations) or a `bool` (lifecycle operations). Nothing
//! in this crate aborts the process, panics on a normal failure path, or
//! retries internally. [`error::AllocError`] documents the taxonomy
//! behind those failures for anyone instrumenting the crate.

pub mod align;
pub mod block;
pub mod error;
pub mod freelist;
pub mod platform;
pub mod ram;

pub use error::AllocError;
pub use freelist::{FreeBlockInfo, FreeList, freelist_dump, freelist_free, freelist_initialize, freelist_malloc, freelist_terminate};
