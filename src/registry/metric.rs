//! The closed set of metric kinds a registry can hold.

use crate::registry::{Counter, Gauge, GaugeF64, Histogram, Timer};
use std::fmt;
use std::sync::Arc;

/// A registered metric. Cloning shares the underlying instance.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeF64(Arc<GaugeF64>),
    Timer(Arc<Timer>),
    Histogram(Arc<Histogram>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::GaugeF64(_) => MetricKind::GaugeF64,
            Metric::Timer(_) => MetricKind::Timer,
            Metric::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// Tag of a [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    GaugeF64,
    Timer,
    Histogram,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::GaugeF64 => "float gauge",
            MetricKind::Timer => "timer",
            MetricKind::Histogram => "histogram",
        };
        f.write_str(name)
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(counter: Arc<Counter>) -> Self {
        Metric::Counter(counter)
    }
}

impl From<Arc<Gauge>> for Metric {
    fn from(gauge: Arc<Gauge>) -> Self {
        Metric::Gauge(gauge)
    }
}

impl From<Arc<GaugeF64>> for Metric {
    fn from(gauge: Arc<GaugeF64>) -> Self {
        Metric::GaugeF64(gauge)
    }
}

impl From<Arc<Timer>> for Metric {
    fn from(timer: Arc<Timer>) -> Self {
        Metric::Timer(timer)
    }
}

impl From<Arc<Histogram>> for Metric {
    fn from(histogram: Arc<Histogram>) -> Self {
        Metric::Histogram(histogram)
    }
}
