//! Timers: a duration histogram paired with an event meter.

use crate::registry::histogram::{Histogram, HistogramSnapshot};
use crate::registry::meter::{Meter, MeterSnapshot};
use std::time::{Duration, Instant};

/// Records durations in nanoseconds.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one duration.
    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    /// Record the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.update_since(start);
        result
    }

    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            histogram: self.histogram.snapshot(),
            meter: self.meter.snapshot(),
        }
    }
}

/// Frozen timer state.
#[derive(Debug, Clone, Default)]
pub struct TimerSnapshot {
    histogram: HistogramSnapshot,
    meter: MeterSnapshot,
}

impl TimerSnapshot {
    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    pub fn min(&self) -> i64 {
        self.histogram.min()
    }

    pub fn max(&self) -> i64 {
        self.histogram.max()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.histogram.std_dev()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        self.histogram.percentile(p)
    }

    pub fn rate1(&self) -> f64 {
        self.meter.rate1
    }

    pub fn rate5(&self) -> f64 {
        self.meter.rate5
    }

    pub fn rate15(&self) -> f64 {
        self.meter.rate15
    }

    pub fn rate_mean(&self) -> f64 {
        self.meter.rate_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_nanoseconds() {
        let timer = Timer::new();
        timer.update(Duration::from_millis(1));
        timer.update(Duration::from_millis(3));

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.count(), 2);
        assert_eq!(snapshot.min(), 1_000_000);
        assert_eq!(snapshot.max(), 3_000_000);
        assert_eq!(snapshot.mean(), 2_000_000.0);
    }

    #[test]
    fn test_timer_time_closure() {
        let timer = Timer::new();
        let value = timer.time(|| 7);
        assert_eq!(value, 7);
        assert_eq!(timer.count(), 1);
    }
}
