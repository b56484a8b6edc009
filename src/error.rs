//! The four failure kinds the allocator can report.
//!
//! Used internally by the `Result`-returning helpers and for log
//! messages. The public contract (spec'd in the crate root docs) never
//! surfaces this type directly: allocation operations report failure as
//! a null pointer and lifecycle operations report it as a `bool`.

/// A failure kind for the free-list allocator and its aligned-allocation
/// facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// Zero-size allocation request, or an alignment that is not a power
    /// of two.
    #[error("invalid argument")]
    InvalidArgument,
    /// The request exceeds the configured ceiling (`ram_max()`).
    #[error("requested size exceeds the allocation ceiling")]
    OutOfRange,
    /// The platform allocator refused a heap-growth request, or the
    /// sentinel itself could not be allocated during `initialize`.
    #[error("platform allocator returned null")]
    OutOfMemory,
    /// `terminate` was called before a successful `initialize`.
    #[error("allocator is not initialized")]
    Uninitialized,
}
