//! Histograms backed by an exponentially-decaying reservoir sample.
//!
//! The reservoir keeps a fixed number of observations, weighting recent ones
//! more heavily: each value gets priority `exp(alpha * t) / u` where `t` is
//! seconds since the current landmark and `u` is uniform in (0, 1]. When full,
//! a new value evicts the lowest priority only if its own priority is higher.
//! Priorities grow without bound, so the landmark is moved (and every stored
//! priority rescaled) once an hour.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Default reservoir capacity, biased towards the last five minutes.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Default decay factor.
pub const DEFAULT_ALPHA: f64 = 0.015;

const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// A sampled value with its priority.
#[derive(Debug, Clone, Copy)]
struct Weighted {
    priority: f64,
    value: i64,
}

impl PartialEq for Weighted {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Weighted {}

impl PartialOrd for Weighted {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weighted {
    // Reversed: the heap top is the lowest priority.
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority.total_cmp(&self.priority)
    }
}

/// Exponentially-decaying reservoir sample.
#[derive(Debug)]
pub struct ExpDecaySample {
    alpha: f64,
    reservoir_size: usize,
    count: i64,
    t0: Instant,
    t1: Instant,
    values: BinaryHeap<Weighted>,
}

impl ExpDecaySample {
    /// Create a sample holding at most `reservoir_size` values.
    pub fn new(reservoir_size: usize, alpha: f64) -> Self {
        let now = Instant::now();
        Self {
            alpha,
            reservoir_size,
            count: 0,
            t0: now,
            t1: now + RESCALE_THRESHOLD,
            values: BinaryHeap::with_capacity(reservoir_size),
        }
    }

    /// Record a value.
    pub fn update(&mut self, value: i64) {
        self.update_at(Instant::now(), value);
    }

    fn update_at(&mut self, now: Instant, value: i64) {
        self.count += 1;

        let elapsed = now.saturating_duration_since(self.t0).as_secs_f64();
        let u = 1.0 - rand::random::<f64>();
        let item = Weighted {
            priority: (self.alpha * elapsed).exp() / u,
            value,
        };

        if self.values.len() < self.reservoir_size {
            self.values.push(item);
        } else if self
            .values
            .peek()
            .is_some_and(|lowest| item.priority > lowest.priority)
        {
            self.values.pop();
            self.values.push(item);
        }

        if now > self.t1 {
            self.rescale(now);
        }
    }

    fn rescale(&mut self, now: Instant) {
        let factor = (-self.alpha * now.saturating_duration_since(self.t0).as_secs_f64()).exp();
        self.t0 = now;
        self.t1 = now + RESCALE_THRESHOLD;
        self.values = self
            .values
            .drain()
            .map(|w| Weighted {
                priority: w.priority * factor,
                value: w.value,
            })
            .collect();
    }

    /// Total number of values recorded, including evicted ones.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Number of values currently held.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn clear(&mut self) {
        let now = Instant::now();
        self.count = 0;
        self.t0 = now;
        self.t1 = now + RESCALE_THRESHOLD;
        self.values.clear();
    }

    /// Freeze the current contents.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut values: Vec<i64> = self.values.iter().map(|w| w.value).collect();
        values.sort_unstable();
        HistogramSnapshot {
            count: self.count,
            values,
        }
    }
}

impl Default for ExpDecaySample {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE, DEFAULT_ALPHA)
    }
}

/// Frozen view of a sample. Statistics other than `count` are computed over
/// the retained values.
#[derive(Debug, Clone, Default)]
pub struct HistogramSnapshot {
    count: i64,
    /// Sorted ascending.
    values: Vec<i64>,
}

impl HistogramSnapshot {
    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    pub fn sum(&self) -> i64 {
        self.values.iter().fold(0i64, |acc, v| acc.saturating_add(*v))
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|v| *v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Population variance of the retained values.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.values
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Value at quantile `p` (0.0 to 1.0), interpolating between neighbours.
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }

        let pos = p * (n as f64 + 1.0);
        if pos < 1.0 {
            self.values[0] as f64
        } else if pos >= n as f64 {
            self.values[n - 1] as f64
        } else {
            let idx = pos as usize;
            let lower = self.values[idx - 1] as f64;
            let upper = self.values[idx] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|p| self.percentile(*p)).collect()
    }

    /// Number of retained values.
    pub fn size(&self) -> usize {
        self.values.len()
    }
}

/// Distribution of arbitrary integer observations.
#[derive(Debug, Default)]
pub struct Histogram {
    sample: Mutex<ExpDecaySample>,
}

impl Histogram {
    /// Histogram over the default decaying sample.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(reservoir_size: usize, alpha: f64) -> Self {
        Self {
            sample: Mutex::new(ExpDecaySample::new(reservoir_size, alpha)),
        }
    }

    pub fn update(&self, value: i64) {
        self.sample.lock().update(value);
    }

    pub fn count(&self) -> i64 {
        self.sample.lock().count()
    }

    pub fn clear(&self) {
        self.sample.lock().clear();
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.sample.lock().snapshot()
    }
}
