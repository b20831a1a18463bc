//! Allocation-tracking global allocator.
//!
//! Install it in the host binary to populate the allocator-backed runtime
//! statistics:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOC: metrics_bridge::runtime::TrackingAllocator =
//!     metrics_bridge::runtime::TrackingAllocator::new();
//! ```
//!
//! Without it, every allocator statistic reads zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static TOTAL_BYTES: AtomicU64 = AtomicU64::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static FREES: AtomicU64 = AtomicU64::new(0);

/// Wraps the system allocator and counts bytes and calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAllocator;

impl TrackingAllocator {
    pub const fn new() -> Self {
        Self
    }
}

fn record_alloc(size: usize) {
    LIVE_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    TOTAL_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
}

fn record_free(size: usize) {
    LIVE_BYTES.fetch_sub(size as u64, Ordering::Relaxed);
    FREES.fetch_add(1, Ordering::Relaxed);
}

// realloc keeps the default implementation (alloc, copy, dealloc), which
// routes through the counting methods below.
unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        record_free(layout.size());
    }
}

/// Allocator counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes currently allocated.
    pub live_bytes: u64,
    /// Bytes allocated since start, never decreasing.
    pub total_bytes: u64,
    pub allocations: u64,
    pub frees: u64,
}

impl AllocStats {
    /// Allocations not yet freed.
    pub fn live_objects(&self) -> u64 {
        self.allocations.saturating_sub(self.frees)
    }
}

/// Read the allocator counters.
pub fn alloc_stats() -> AllocStats {
    AllocStats {
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        total_bytes: TOTAL_BYTES.load(Ordering::Relaxed),
        allocations: ALLOCATIONS.load(Ordering::Relaxed),
        frees: FREES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_allocator_counts() {
        let allocator = TrackingAllocator::new();
        let layout = Layout::from_size_align(4096, 8).unwrap();

        let before = alloc_stats();
        let ptr = unsafe { allocator.alloc(layout) };
        assert!(!ptr.is_null());
        let during = alloc_stats();
        unsafe { allocator.dealloc(ptr, layout) };
        let after = alloc_stats();

        assert_eq!(during.total_bytes - before.total_bytes, 4096);
        assert_eq!(during.allocations - before.allocations, 1);
        assert_eq!(after.frees - before.frees, 1);
        assert_eq!(after.live_bytes, before.live_bytes);
    }

    #[test]
    fn test_live_objects() {
        let stats = AllocStats {
            live_bytes: 0,
            total_bytes: 0,
            allocations: 10,
            frees: 4,
        };
        assert_eq!(stats.live_objects(), 6);
    }
}
