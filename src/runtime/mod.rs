//! Runtime resource statistics for the current process.

mod alloc;
mod pauses;
mod stats;

pub use alloc::{alloc_stats, AllocStats, TrackingAllocator};
pub use pauses::{
    foreign_calls, global_pause_log, record_foreign_call, record_pause, PauseLog, PauseSnapshot,
    PAUSE_BUFFER_LEN,
};
pub use stats::{ProcessStats, RuntimeStats, StatsSource};
