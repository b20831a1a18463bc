//! Event rate meters.
//!
//! A meter counts events and tracks one, five and fifteen minute
//! exponentially-weighted moving averages plus the mean rate since creation.
//! Averages advance in fixed 5 second ticks. There is no ticker thread:
//! every mark and snapshot first applies the ticks that elapsed since the
//! previous one.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially-weighted moving average of a per-second rate.
#[derive(Debug, Clone)]
pub struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: i64,
    initialized: bool,
}

impl Ewma {
    /// Average over a window of `minutes`, ticked every 5 seconds.
    pub fn with_minutes(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp(),
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    /// Add `n` events to the current tick.
    pub fn update(&mut self, n: i64) {
        self.uncounted += n;
    }

    /// Fold the current tick into the average. The first tick seeds it.
    pub fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;

        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Events per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Frozen meter values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

#[derive(Debug)]
struct MeterState {
    count: i64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl MeterState {
    fn tick_to(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = (elapsed.as_nanos() / TICK_INTERVAL.as_nanos()) as u32;
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
        self.last_tick += TICK_INTERVAL * ticks;
    }
}

/// Counts events and their rates.
#[derive(Debug)]
pub struct Meter {
    state: Mutex<MeterState>,
}

impl Meter {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(MeterState {
                count: 0,
                m1: Ewma::with_minutes(1.0),
                m5: Ewma::with_minutes(5.0),
                m15: Ewma::with_minutes(15.0),
                start: now,
                last_tick: now,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        self.mark_at(Instant::now(), n);
    }

    fn mark_at(&self, now: Instant, n: i64) {
        let mut state = self.state.lock();
        state.tick_to(now);
        state.count += n;
        state.m1.update(n);
        state.m5.update(n);
        state.m15.update(n);
    }

    pub fn count(&self) -> i64 {
        self.state.lock().count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.state.lock();
        state.tick_to(now);

        let elapsed = now.saturating_duration_since(state.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: state.count,
            rate1: state.m1.rate(),
            rate5: state.m5.rate(),
            rate15: state.m15.rate(),
            rate_mean,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_ewma_first_tick_seeds_rate() {
        let mut ewma = Ewma::with_minutes(1.0);
        ewma.update(3);
        ewma.tick();
        assert!(approx_eq(ewma.rate(), 0.6));
    }

    #[test]
    fn test_ewma_decays() {
        let mut ewma = Ewma::with_minutes(1.0);
        ewma.update(3);
        ewma.tick();
        ewma.tick();
        assert!(approx_eq(ewma.rate(), 0.6 * (-5.0f64 / 60.0).exp()));

        for _ in 0..1000 {
            ewma.tick();
        }
        assert!(ewma.rate() < 1e-6);
    }

    #[test]
    fn test_meter_counts_without_ticking() {
        let meter = Meter::new();
        meter.mark(2);
        meter.mark(3);
        assert_eq!(meter.count(), 5);

        let snapshot = meter.snapshot();
        assert_eq!(snapshot.count, 5);
        assert_eq!(snapshot.rate1, 0.0);
    }

    #[test]
    fn test_meter_lazy_ticks() {
        let meter = Meter::new();
        let start = meter.state.lock().start;

        meter.mark_at(start + Duration::from_secs(1), 60);
        let snapshot = meter.snapshot_at(start + Duration::from_secs(6));

        assert_eq!(snapshot.count, 60);
        assert!(approx_eq(snapshot.rate1, 12.0));
        assert!(approx_eq(snapshot.rate5, 12.0));
        assert!(approx_eq(snapshot.rate15, 12.0));
        assert!(approx_eq(snapshot.rate_mean, 10.0));
    }
}
