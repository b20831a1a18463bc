//! Concurrent name-to-metric registry.

use crate::registry::{Counter, Gauge, GaugeF64, Histogram, Metric, MetricKind, Timer};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric '{0}' is already registered")]
    Duplicate(String),

    #[error("metric '{name}' is registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
}

/// Shared handle to a set of named metrics.
///
/// Clones refer to the same registry. Every operation is safe to call from
/// any task or thread without external locking.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    metrics: Arc<DashMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` under `name`, failing if the name is taken.
    pub fn register(&self, name: impl Into<String>, metric: Metric) -> Result<(), RegistryError> {
        match self.metrics.entry(name.into()) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(metric);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.get(name).map(|entry| entry.value().clone())
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.remove(name).map(|(_, metric)| metric)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Visit every metric in ascending name order.
    ///
    /// Entries are copied out first, so `f` may call back into the registry.
    pub fn each(&self, mut f: impl FnMut(&str, &Metric)) {
        let mut entries: Vec<(String, Metric)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, metric) in &entries {
            f(name, metric);
        }
    }

    fn get_or_register(&self, name: &str, make: impl FnOnce() -> Metric) -> Metric {
        if let Some(existing) = self.metrics.get(name) {
            return existing.value().clone();
        }
        self.metrics
            .entry(name.to_string())
            .or_insert_with(make)
            .value()
            .clone()
    }

    pub fn get_or_register_counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        match self.get_or_register(name, || Metric::Counter(Arc::default())) {
            Metric::Counter(counter) => Ok(counter),
            other => Err(mismatch(name, other.kind(), MetricKind::Counter)),
        }
    }

    pub fn get_or_register_gauge(&self, name: &str) -> Result<Arc<Gauge>, RegistryError> {
        match self.get_or_register(name, || Metric::Gauge(Arc::default())) {
            Metric::Gauge(gauge) => Ok(gauge),
            other => Err(mismatch(name, other.kind(), MetricKind::Gauge)),
        }
    }

    pub fn get_or_register_gauge_f64(&self, name: &str) -> Result<Arc<GaugeF64>, RegistryError> {
        match self.get_or_register(name, || Metric::GaugeF64(Arc::default())) {
            Metric::GaugeF64(gauge) => Ok(gauge),
            other => Err(mismatch(name, other.kind(), MetricKind::GaugeF64)),
        }
    }

    pub fn get_or_register_timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        match self.get_or_register(name, || Metric::Timer(Arc::default())) {
            Metric::Timer(timer) => Ok(timer),
            other => Err(mismatch(name, other.kind(), MetricKind::Timer)),
        }
    }

    /// Get or register a histogram over the default decaying sample.
    pub fn get_or_register_histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        match self.get_or_register(name, || Metric::Histogram(Arc::default())) {
            Metric::Histogram(histogram) => Ok(histogram),
            other => Err(mismatch(name, other.kind(), MetricKind::Histogram)),
        }
    }
}

fn mismatch(name: &str, existing: MetricKind, requested: MetricKind) -> RegistryError {
    RegistryError::KindMismatch {
        name: name.to_string(),
        existing,
        requested,
    }
}
