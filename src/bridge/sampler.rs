//! Runtime sampler.
//!
//! Copies process runtime statistics into the registry once per second.

use crate::registry::{Gauge, GaugeF64, Histogram, Registry, RegistryError};
use crate::runtime::{RuntimeStats, StatsSource, PAUSE_BUFFER_LEN};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Time between samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Gauges the sampler writes, registered once up front.
struct RuntimeGauges {
    alloc: Arc<Gauge>,
    total_alloc: Arc<Gauge>,
    sys: Arc<Gauge>,
    mallocs: Arc<Gauge>,
    frees: Arc<Gauge>,
    heap_alloc: Arc<Gauge>,
    heap_sys: Arc<Gauge>,
    heap_inuse: Arc<Gauge>,
    heap_idle: Arc<Gauge>,
    heap_released: Arc<Gauge>,
    heap_objects: Arc<Gauge>,
    stack_sys: Arc<Gauge>,
    stack_inuse: Arc<Gauge>,
    pause_total: Arc<Gauge>,
    cpu_fraction: Arc<GaugeF64>,
    num_gc: Arc<Gauge>,
    pause_duration: Arc<Histogram>,
    threads: Arc<Gauge>,
    foreign_calls: Arc<Gauge>,
}

impl RuntimeGauges {
    fn register(registry: &Registry) -> Result<Self, RegistryError> {
        Ok(Self {
            alloc: registry.get_or_register_gauge("runtime.mem.alloc")?,
            total_alloc: registry.get_or_register_gauge("runtime.mem.total-alloc")?,
            sys: registry.get_or_register_gauge("runtime.mem.sys")?,
            mallocs: registry.get_or_register_gauge("runtime.mem.mallocs")?,
            frees: registry.get_or_register_gauge("runtime.mem.frees")?,
            heap_alloc: registry.get_or_register_gauge("runtime.mem.heap.alloc")?,
            heap_sys: registry.get_or_register_gauge("runtime.mem.heap.sys")?,
            heap_inuse: registry.get_or_register_gauge("runtime.mem.heap.inuse")?,
            heap_idle: registry.get_or_register_gauge("runtime.mem.heap.idle")?,
            heap_released: registry.get_or_register_gauge("runtime.mem.heap.released")?,
            heap_objects: registry.get_or_register_gauge("runtime.mem.heap.objects")?,
            stack_sys: registry.get_or_register_gauge("runtime.mem.stack.sys")?,
            stack_inuse: registry.get_or_register_gauge("runtime.mem.stack.inuse")?,
            pause_total: registry.get_or_register_gauge("runtime.mem.gc.pause-total")?,
            cpu_fraction: registry.get_or_register_gauge_f64("runtime.mem.gc.cpu-fraction")?,
            num_gc: registry.get_or_register_gauge("runtime.mem.gc.num-gc")?,
            pause_duration: registry.get_or_register_histogram("runtime.mem.gc.duration")?,
            threads: registry.get_or_register_gauge("runtime.goroutines")?,
            foreign_calls: registry.get_or_register_gauge("runtime.cgo-calls")?,
        })
    }
}

/// Samples a [`StatsSource`] into the registry.
pub struct RuntimeSampler<S> {
    /// Shared with the blocking pool for the duration of each read.
    source: Arc<Mutex<S>>,
    gauges: RuntimeGauges,
    /// Pause cycles already fed into the duration histogram.
    last_num_gc: u32,
}

impl<S: StatsSource> RuntimeSampler<S> {
    /// Register the runtime metrics in `registry`.
    pub fn new(registry: &Registry, source: S) -> Result<Self, RegistryError> {
        Ok(Self {
            source: Arc::new(Mutex::new(source)),
            gauges: RuntimeGauges::register(registry)?,
            last_num_gc: 0,
        })
    }

    /// Take one sample.
    pub fn sample(&mut self) {
        let stats = self.source.lock().read();
        self.record(&stats);
    }

    /// Take one sample, reading the source on the blocking pool.
    async fn sample_blocking(&mut self) {
        let source = Arc::clone(&self.source);
        match tokio::task::spawn_blocking(move || source.lock().read()).await {
            Ok(stats) => self.record(&stats),
            Err(e) => warn!(error = %e, "runtime statistics read failed"),
        }
    }

    fn record(&mut self, stats: &RuntimeStats) {
        let g = &self.gauges;

        g.alloc.update(saturate(stats.alloc));
        g.total_alloc.update(saturate(stats.total_alloc));
        g.sys.update(saturate(stats.sys));
        g.mallocs.update(saturate(stats.mallocs));
        g.frees.update(saturate(stats.frees));

        g.heap_alloc.update(saturate(stats.heap_alloc));
        g.heap_sys.update(saturate(stats.heap_sys));
        g.heap_inuse.update(saturate(stats.heap_inuse));
        g.heap_idle.update(saturate(stats.heap_idle));
        g.heap_released.update(saturate(stats.heap_released));
        g.heap_objects.update(saturate(stats.heap_objects));

        g.stack_sys.update(saturate(stats.stack_sys));
        g.stack_inuse.update(saturate(stats.stack_inuse));

        g.pause_total.update(saturate(stats.pause_total_ns));
        g.cpu_fraction.update(stats.gc_cpu_fraction);
        g.num_gc.update(i64::from(stats.num_gc));

        g.threads.update(saturate(stats.threads));
        g.foreign_calls.update(saturate(stats.foreign_calls));

        self.ingest_pauses(stats);
    }

    /// Feed pauses completed since the previous sample into the histogram.
    ///
    /// Reads cycles `last_num_gc + 1 ..= num_gc`. If the ring wrapped in
    /// between, only the newest `PAUSE_BUFFER_LEN` cycles are still there.
    /// Returns the number of pauses ingested.
    fn ingest_pauses(&mut self, stats: &RuntimeStats) -> u32 {
        let new_cycles = stats.num_gc.wrapping_sub(self.last_num_gc);
        let readable = new_cycles.min(PAUSE_BUFFER_LEN as u32);
        if new_cycles > readable {
            debug!(lost = new_cycles - readable, "pause ring overran between samples");
        }

        let first = stats.num_gc.wrapping_sub(readable).wrapping_add(1);
        for offset in 0..readable {
            let cycle = first.wrapping_add(offset);
            let pause = stats.pause_ns[cycle as usize % PAUSE_BUFFER_LEN];
            self.gauges.pause_duration.update(saturate(pause));
        }

        self.last_num_gc = stats.num_gc;
        readable
    }

    /// Sample once per [`SAMPLE_INTERVAL`] until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("runtime sampler starting");

        let mut ticker = interval_at(Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample_blocking().await;
                }

                _ = shutdown.recv() => {
                    info!("runtime sampler shutting down");
                    break;
                }
            }
        }
    }
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
