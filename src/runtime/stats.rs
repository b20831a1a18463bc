//! Process runtime statistics.

use crate::runtime::alloc::alloc_stats;
use crate::runtime::pauses::{foreign_calls, global_pause_log, PauseLog, PAUSE_BUFFER_LEN};
use std::time::Instant;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

/// One consistent read of the process runtime.
///
/// Byte sizes and counts are unsigned; the sampler saturates them into
/// integer gauges.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStats {
    pub alloc: u64,
    pub total_alloc: u64,
    pub sys: u64,
    pub mallocs: u64,
    pub frees: u64,

    pub heap_alloc: u64,
    pub heap_sys: u64,
    pub heap_idle: u64,
    pub heap_inuse: u64,
    pub heap_released: u64,
    pub heap_objects: u64,

    pub stack_inuse: u64,
    pub stack_sys: u64,

    pub pause_total_ns: u64,
    /// Pause durations; cycle `k` sits at `pause_ns[k % PAUSE_BUFFER_LEN]`.
    pub pause_ns: [u64; PAUSE_BUFFER_LEN],
    pub num_gc: u32,
    /// Share of wall time spent paused, in [0, 1].
    pub gc_cpu_fraction: f64,

    pub threads: u64,
    pub foreign_calls: u64,
}

impl Default for RuntimeStats {
    fn default() -> Self {
        Self {
            alloc: 0,
            total_alloc: 0,
            sys: 0,
            mallocs: 0,
            frees: 0,
            heap_alloc: 0,
            heap_sys: 0,
            heap_idle: 0,
            heap_inuse: 0,
            heap_released: 0,
            heap_objects: 0,
            stack_inuse: 0,
            stack_sys: 0,
            pause_total_ns: 0,
            pause_ns: [0; PAUSE_BUFFER_LEN],
            num_gc: 0,
            gc_cpu_fraction: 0.0,
            threads: 0,
            foreign_calls: 0,
        }
    }
}

/// Something the runtime sampler can read statistics from.
pub trait StatsSource: Send + 'static {
    fn read(&mut self) -> RuntimeStats;
}

/// Reads the current process: tracking allocator counters, the operating
/// system's view of the process and a pause log.
///
/// A read refreshes one process entry through `sysinfo`, which touches the
/// filesystem on some platforms; the sampler runs it off the async workers.
#[derive(Debug)]
pub struct ProcessStats {
    pauses: &'static PauseLog,
    started: Instant,
    system: System,
    pid: Option<Pid>,
    unavailable_logged: bool,
}

impl ProcessStats {
    /// Source backed by the process-wide pause log.
    pub fn new() -> Self {
        Self::with_pause_log(global_pause_log())
    }

    pub fn with_pause_log(pauses: &'static PauseLog) -> Self {
        Self {
            pauses,
            started: Instant::now(),
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            unavailable_logged: false,
        }
    }

    fn process_usage(&mut self) -> ProcessUsage {
        let usage = match self.pid {
            Some(pid) => {
                self.system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::everything(),
                );
                self.system.process(pid).map(|process| {
                    let status = linux_status();
                    ProcessUsage {
                        rss: process.memory(),
                        virtual_memory: process.virtual_memory(),
                        threads: process
                            .tasks()
                            .map_or(status.threads, |tasks| tasks.len() as u64),
                        stack: status.stack,
                    }
                })
            }
            None => None,
        };

        usage.unwrap_or_else(|| {
            if !self.unavailable_logged {
                debug!(pid = ?self.pid, "process statistics unavailable, reporting zeros");
                self.unavailable_logged = true;
            }
            ProcessUsage::default()
        })
    }
}

impl Default for ProcessStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSource for ProcessStats {
    fn read(&mut self) -> RuntimeStats {
        let alloc = alloc_stats();
        let usage = self.process_usage();
        let pauses = self.pauses.snapshot();

        let uptime_ns = self.started.elapsed().as_nanos() as f64;
        let gc_cpu_fraction = if uptime_ns > 0.0 {
            (pauses.total_ns as f64 / uptime_ns).clamp(0.0, 1.0)
        } else {
            0.0
        };

        RuntimeStats {
            alloc: alloc.live_bytes,
            total_alloc: alloc.total_bytes,
            sys: usage.rss,
            mallocs: alloc.allocations,
            frees: alloc.frees,
            heap_alloc: alloc.live_bytes,
            heap_sys: usage.virtual_memory,
            heap_idle: usage.virtual_memory.saturating_sub(alloc.live_bytes),
            heap_inuse: alloc.live_bytes,
            heap_released: usage.virtual_memory.saturating_sub(usage.rss),
            heap_objects: alloc.live_objects(),
            stack_inuse: usage.stack,
            stack_sys: usage.stack,
            pause_total_ns: pauses.total_ns,
            pause_ns: pauses.pause_ns,
            num_gc: pauses.num_cycles,
            gc_cpu_fraction,
            threads: usage.threads,
            foreign_calls: foreign_calls(),
        }
    }
}

/// What the operating system reports for this process, sizes in bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ProcessUsage {
    rss: u64,
    virtual_memory: u64,
    threads: u64,
    stack: u64,
}

/// Fields only Linux reports, from `/proc/self/status`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LinuxStatus {
    stack: u64,
    threads: u64,
}

// sysinfo has no stack figure and fills thread lists on Linux only.
#[cfg(target_os = "linux")]
fn linux_status() -> LinuxStatus {
    std::fs::read_to_string("/proc/self/status")
        .map(|status| parse_linux_status(&status))
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
fn linux_status() -> LinuxStatus {
    LinuxStatus::default()
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_linux_status(contents: &str) -> LinuxStatus {
    let mut status = LinuxStatus::default();
    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match key {
            "VmStk" => status.stack = value * 1024,
            "Threads" => status.threads = value,
            _ => {}
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SAMPLE_STATUS: &str = "Name:\tmetrics-bridge
State:\tS (sleeping)
VmPeak:\t  120000 kB
VmRSS:\t    8192 kB
VmStk:\t     132 kB
Threads:\t7
";

    #[test]
    fn test_parse_linux_status() {
        let status = parse_linux_status(SAMPLE_STATUS);
        assert_eq!(status.stack, 132 * 1024);
        assert_eq!(status.threads, 7);
        assert_eq!(
            parse_linux_status("no colons here\nVmStk: lots"),
            LinuxStatus::default()
        );
    }

    #[test]
    fn test_process_stats_reads_pause_log() {
        static LOG: PauseLog = PauseLog::new();
        LOG.record(Duration::from_micros(5));
        LOG.record(Duration::from_micros(7));

        let mut source = ProcessStats::with_pause_log(&LOG);
        let stats = source.read();

        assert_eq!(stats.num_gc, 2);
        assert_eq!(stats.pause_ns[1], 5_000);
        assert_eq!(stats.pause_ns[2], 7_000);
        assert_eq!(stats.pause_total_ns, 12_000);
        assert!((0.0..=1.0).contains(&stats.gc_cpu_fraction));
    }

    #[test]
    fn test_process_stats_reads_operating_system() {
        let stats = ProcessStats::new().read();
        assert!(stats.sys > 0);
        assert!(stats.heap_sys >= stats.sys);
        assert_eq!(stats.heap_released, stats.heap_sys - stats.sys);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_stats_threads_and_stack_linux() {
        let stats = ProcessStats::new().read();
        assert!(stats.threads >= 1);
        assert!(stats.stack_sys > 0);
        assert_eq!(stats.stack_inuse, stats.stack_sys);
    }
}
