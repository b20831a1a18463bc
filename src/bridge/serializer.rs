//! Flattens a registry into timestamped JSON records.

use crate::registry::{HistogramSnapshot, Metric, Registry};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Quantiles emitted for timers and histograms, with their name suffixes.
pub const PERCENTILES: [(f64, &str); 5] = [
    (0.5, "50-percentile"),
    (0.75, "75-percentile"),
    (0.95, "95-percentile"),
    (0.99, "99-percentile"),
    (0.999, "999-percentile"),
];

/// Suffixes a timer expands into, in emission order.
pub const TIMER_SUFFIXES: [&str; 14] = [
    "count",
    "min",
    "max",
    "mean",
    "std-dev",
    "one-minute",
    "five-minute",
    "fifteen-minute",
    "mean-rate",
    "50-percentile",
    "75-percentile",
    "95-percentile",
    "99-percentile",
    "999-percentile",
];

/// Suffixes a histogram expands into, in emission order.
pub const HISTOGRAM_SUFFIXES: [&str; 10] = [
    "count",
    "min",
    "max",
    "mean",
    "std-dev",
    "50-percentile",
    "75-percentile",
    "95-percentile",
    "99-percentile",
    "999-percentile",
];

/// A record value. Integers stay integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
}

/// One flat `(timestamp, metric, value, hostname)` record.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unix seconds.
    pub timestamp: i64,
    pub metric: String,
    pub value: Value,
    pub hostname: String,
}

/// Turns registry contents into [`Record`]s under a fixed prefix and hostname.
#[derive(Debug, Clone)]
pub struct Serializer {
    prefix: String,
    hostname: String,
}

impl Serializer {
    pub fn new(prefix: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            hostname: hostname.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Serialize every metric, stamped with the current time.
    pub fn serialize(&self, registry: &Registry) -> Vec<Record> {
        self.serialize_at(registry, unix_now())
    }

    /// Serialize every metric with a caller-supplied timestamp.
    ///
    /// Every record of one call carries the same timestamp.
    pub fn serialize_at(&self, registry: &Registry, timestamp: i64) -> Vec<Record> {
        let mut values = Vec::new();
        registry.each(|name, metric| flatten(name, metric, &mut values));

        values
            .into_iter()
            .map(|(name, value)| Record {
                timestamp,
                metric: format!("{}.{}", self.prefix, name),
                value,
                hostname: self.hostname.clone(),
            })
            .collect()
    }

    /// Serialize and encode as a JSON array.
    pub fn to_json(&self, registry: &Registry) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.serialize(registry))
    }
}

fn flatten(name: &str, metric: &Metric, out: &mut Vec<(String, Value)>) {
    match metric {
        Metric::Counter(counter) => out.push((name.to_string(), Value::Int(counter.count()))),
        Metric::Gauge(gauge) => out.push((name.to_string(), Value::Int(gauge.value()))),
        Metric::GaugeF64(gauge) => out.push((name.to_string(), Value::Float(gauge.value()))),
        Metric::Timer(timer) => {
            let snapshot = timer.snapshot();
            let mut values = vec![
                Value::Int(snapshot.count()),
                Value::Int(snapshot.min()),
                Value::Int(snapshot.max()),
                Value::Float(snapshot.mean()),
                Value::Float(snapshot.std_dev()),
                Value::Float(snapshot.rate1()),
                Value::Float(snapshot.rate5()),
                Value::Float(snapshot.rate15()),
                Value::Float(snapshot.rate_mean()),
            ];
            values.extend(
                PERCENTILES
                    .iter()
                    .map(|(p, _)| Value::Float(snapshot.percentile(*p))),
            );
            push_family(name, &TIMER_SUFFIXES, values, out);
        }
        Metric::Histogram(histogram) => {
            push_family(name, &HISTOGRAM_SUFFIXES, histogram_values(&histogram.snapshot()), out);
        }
    }
}

fn histogram_values(snapshot: &HistogramSnapshot) -> Vec<Value> {
    let mut values = vec![
        Value::Int(snapshot.count()),
        Value::Int(snapshot.min()),
        Value::Int(snapshot.max()),
        Value::Float(snapshot.mean()),
        Value::Float(snapshot.std_dev()),
    ];
    values.extend(
        PERCENTILES
            .iter()
            .map(|(p, _)| Value::Float(snapshot.percentile(*p))),
    );
    values
}

fn push_family(name: &str, suffixes: &[&str], values: Vec<Value>, out: &mut Vec<(String, Value)>) {
    debug_assert_eq!(suffixes.len(), values.len());
    out.extend(
        suffixes
            .iter()
            .zip(values)
            .map(|(suffix, value)| (format!("{}.{}", name, suffix), value)),
    );
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
