//! metrics-bridge - publish an in-process metrics registry as flat JSON
//!
//! This crate provides:
//! - A concurrent registry of counters, gauges, timers and histograms
//! - A runtime sampler recording memory, thread and pause statistics
//! - An HTTP pull endpoint serving the current snapshot
//! - A push publisher POSTing the snapshot to a collector every second

pub mod bridge;
pub mod config;
pub mod registry;
pub mod runtime;
pub mod util;

pub use bridge::{Bridge, BridgeError, Record, Value};
pub use config::Config;
pub use registry::Registry;
