//! Counters and gauges.
//!
//! Gauges wrap `prometheus_client` gauges; the counter is a bare atomic since
//! it also counts down. Reads and updates never block.

use prometheus_client::metrics::gauge as prometheus;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Monotonically adjusted integer accumulator.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by `n`.
    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Decrement by `n`.
    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// Reset to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    /// Current count.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Point-in-time integer value.
#[derive(Debug, Default)]
pub struct Gauge {
    inner: prometheus::Gauge<i64, AtomicI64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value.
    pub fn update(&self, value: i64) {
        self.inner.set(value);
    }

    pub fn value(&self) -> i64 {
        self.inner.get()
    }
}

/// Point-in-time float value, stored as raw bits.
#[derive(Debug, Default)]
pub struct GaugeF64 {
    inner: prometheus::Gauge<f64, AtomicU64>,
}

impl GaugeF64 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value.
    pub fn update(&self, value: f64) {
        self.inner.set(value);
    }

    pub fn value(&self) -> f64 {
        self.inner.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc(5);
        counter.inc(2);
        counter.dec(3);
        assert_eq!(counter.count(), 4);

        counter.clear();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_gauge_overwrites() {
        let gauge = Gauge::new();
        gauge.update(10);
        gauge.update(-7);
        assert_eq!(gauge.value(), -7);
    }

    #[test]
    fn test_gauge_f64() {
        let gauge = GaugeF64::new();
        assert_eq!(gauge.value(), 0.0);
        gauge.update(0.25);
        assert_eq!(gauge.value(), 0.25);
        gauge.update(-1.5e9);
        assert_eq!(gauge.value(), -1.5e9);
    }

    #[test]
    fn test_gauge_extremes() {
        let gauge = Gauge::new();
        assert_eq!(gauge.value(), 0);
        gauge.update(i64::MAX);
        assert_eq!(gauge.value(), i64::MAX);
        gauge.update(i64::MIN);
        assert_eq!(gauge.value(), i64::MIN);
    }
}
