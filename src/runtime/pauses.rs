//! Stop-the-world pause log and foreign call counter.
//!
//! Rust has no tracing collector, so "collection pauses" are whatever the
//! host reports: arena resets, cache compactions, or any other maintenance
//! that stalls request handling. Each reported pause is one cycle.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Slots in the pause ring.
pub const PAUSE_BUFFER_LEN: usize = 256;

static GLOBAL_PAUSES: PauseLog = PauseLog::new();
static FOREIGN_CALLS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy)]
struct PauseRing {
    pause_ns: [u64; PAUSE_BUFFER_LEN],
    num_cycles: u32,
    total_ns: u64,
}

/// Circular log of pause durations.
///
/// Cycle `k` (counting from 1) is stored at slot `k % PAUSE_BUFFER_LEN`, so a
/// reader that remembers the last cycle it saw can pick up exactly the new
/// ones.
#[derive(Debug)]
pub struct PauseLog {
    ring: Mutex<PauseRing>,
}

/// Copy of a pause log at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseSnapshot {
    pub pause_ns: [u64; PAUSE_BUFFER_LEN],
    /// Completed cycles. Wraps at `u32::MAX`.
    pub num_cycles: u32,
    pub total_ns: u64,
}

impl PauseLog {
    pub const fn new() -> Self {
        Self {
            ring: parking_lot::const_mutex(PauseRing {
                pause_ns: [0; PAUSE_BUFFER_LEN],
                num_cycles: 0,
                total_ns: 0,
            }),
        }
    }

    /// Append one pause.
    pub fn record(&self, pause: Duration) {
        let nanos = u64::try_from(pause.as_nanos()).unwrap_or(u64::MAX);
        let mut ring = self.ring.lock();
        ring.num_cycles = ring.num_cycles.wrapping_add(1);
        let slot = ring.num_cycles as usize % PAUSE_BUFFER_LEN;
        ring.pause_ns[slot] = nanos;
        ring.total_ns = ring.total_ns.saturating_add(nanos);
    }

    pub fn snapshot(&self) -> PauseSnapshot {
        let ring = self.ring.lock();
        PauseSnapshot {
            pause_ns: ring.pause_ns,
            num_cycles: ring.num_cycles,
            total_ns: ring.total_ns,
        }
    }
}

impl Default for PauseLog {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide pause log read by [`ProcessStats`](crate::runtime::ProcessStats).
pub fn global_pause_log() -> &'static PauseLog {
    &GLOBAL_PAUSES
}

/// Report a pause to the process-wide log.
pub fn record_pause(pause: Duration) {
    GLOBAL_PAUSES.record(pause);
}

/// Count one call across an FFI boundary.
pub fn record_foreign_call() {
    FOREIGN_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub fn foreign_calls() -> u64 {
    FOREIGN_CALLS.load(Ordering::Relaxed)
}
