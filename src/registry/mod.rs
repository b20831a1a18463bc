//! In-process metric registry: counters, gauges, timers and histograms.

mod counter;
mod histogram;
mod meter;
mod metric;
mod store;
mod timer;

pub use counter::{Counter, Gauge, GaugeF64};
pub use histogram::{
    ExpDecaySample, Histogram, HistogramSnapshot, DEFAULT_ALPHA, DEFAULT_RESERVOIR_SIZE,
};
pub use meter::{Ewma, Meter, MeterSnapshot};
pub use metric::{Metric, MetricKind};
pub use store::{Registry, RegistryError};
pub use timer::{Timer, TimerSnapshot};
