//! Physical RAM inspection and the allocation ceiling derived from it.
//!
//! Bound to `libc::sysconf` on Unix, the same family of calls the
//! teacher crate already links against for `sbrk`. When the platform
//! can't report a number, each function falls back to a conservative
//! compile-time constant rather than panicking.

/// Reserve withheld from `ram_total()` when computing [`ram_max`].
pub const RESERVE: usize = 1 << 30; // 1 GiB

/// Floor below which [`ram_max`] never drops, even on a reserve-starved
/// system.
pub const FLOOR: usize = 16 << 20; // 16 MiB

/// Assumed total RAM when the platform can't report one.
pub const RAM_FALLBACK: usize = 4 << 30; // 4 GiB

/// Assumed page size when the platform can't report one.
pub const PAGE_SIZE_FALLBACK: usize = 4096;

#[inline]
fn sysconf_nonneg(name: std::os::raw::c_int) -> Option<usize> {
    let value = unsafe { libc::sysconf(name) };
    usize::try_from(value).ok()
}

/// The system page size in bytes.
#[must_use]
pub fn page_size() -> usize {
    sysconf_nonneg(libc::_SC_PAGESIZE).unwrap_or(PAGE_SIZE_FALLBACK)
}

/// Total physical RAM in bytes, or [`RAM_FALLBACK`] if the platform
/// can't report it.
#[must_use]
pub fn ram_total() -> usize {
    let pages = sysconf_nonneg(libc::_SC_PHYS_PAGES);
    match pages {
        Some(pages) => pages.saturating_mul(page_size()),
        None => {
            log::debug!("sysconf(_SC_PHYS_PAGES) unavailable, using fallback");
            RAM_FALLBACK
        }
    }
}

/// Currently free physical RAM in bytes, or [`RAM_FALLBACK`] if the
/// platform can't report it.
#[must_use]
pub fn ram_free() -> usize {
    let pages = sysconf_nonneg(libc::_SC_AVPHYS_PAGES);
    match pages {
        Some(pages) => pages.saturating_mul(page_size()),
        None => {
            log::debug!("sysconf(_SC_AVPHYS_PAGES) unavailable, using fallback");
            RAM_FALLBACK
        }
    }
}

/// The maximum size the caller is allowed to request from the free-list
/// allocator: `max(ram_total() - RESERVE, FLOOR)`.
#[must_use]
pub fn ram_max() -> usize {
    ram_total().saturating_sub(RESERVE).max(FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_max_never_below_floor() {
        assert!(ram_max() >= FLOOR);
    }

    #[test]
    fn page_size_is_power_of_two() {
        assert!(crate::align::is_power_of_two(page_size()));
    }

    #[test]
    fn ram_total_is_nonzero() {
        assert!(ram_total() > 0);
    }
}
