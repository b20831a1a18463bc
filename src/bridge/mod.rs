//! The metrics bridge: runtime sampling, pull endpoint and push publisher
//! over one registry.

mod publisher;
mod sampler;
mod serializer;
mod server;

pub use publisher::{parse_push_url, PushError, PushPublisher, DEFAULT_PUSH_TIMEOUT, PUSH_INTERVAL};
pub use sampler::{RuntimeSampler, SAMPLE_INTERVAL};
pub use serializer::{Record, Serializer, Value, HISTOGRAM_SUFFIXES, PERCENTILES, TIMER_SUFFIXES};
pub use server::{PullHandler, PullServer};

use crate::config::BridgeConfig;
use crate::registry::{Registry, RegistryError};
use crate::runtime::{ProcessStats, StatsSource};
use crate::util::{resolve_hostname, ShutdownSignal};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, Uri};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

/// Errors building or starting a bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to resolve local hostname: {0}")]
    Hostname(#[source] std::io::Error),

    #[error("invalid push URL '{url}': {reason}")]
    InvalidPushUrl { url: String, reason: String },

    #[error("failed to register runtime metrics: {0}")]
    Registry(#[from] RegistryError),

    #[error("the bridge must be started inside a tokio runtime")]
    NoRuntime,

    #[error("failed to bind pull server on {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Samples the runtime into a registry and publishes the registry.
///
/// Construction spawns the runtime sampler and, when a push URL is set, the
/// push publisher. Both stop on [`Bridge::shutdown`] or when the bridge is
/// dropped.
pub struct Bridge {
    registry: Registry,
    serializer: Serializer,
    push_url: Option<Uri>,
    runtime: Handle,
    shutdown: ShutdownSignal,
    tasks: Vec<JoinHandle<()>>,
}

impl Bridge {
    /// Start a bridge with default settings. An empty `push_url` disables push.
    pub fn new(push_url: &str, prefix: &str, registry: Registry) -> Result<Self, BridgeError> {
        let config = BridgeConfig {
            push_url: push_url.to_string(),
            prefix: prefix.to_string(),
            ..BridgeConfig::default()
        };
        Self::from_config(&config, registry)
    }

    /// Start a bridge sampling the current process.
    pub fn from_config(config: &BridgeConfig, registry: Registry) -> Result<Self, BridgeError> {
        Self::with_stats_source(config, registry, ProcessStats::new())
    }

    /// Start a bridge sampling a custom statistics source.
    pub fn with_stats_source<S: StatsSource>(
        config: &BridgeConfig,
        registry: Registry,
        source: S,
    ) -> Result<Self, BridgeError> {
        let hostname = match &config.hostname {
            Some(hostname) => hostname.clone(),
            None => resolve_hostname().map_err(BridgeError::Hostname)?,
        };

        let push_url =
            parse_push_url(&config.push_url).map_err(|reason| BridgeError::InvalidPushUrl {
                url: config.push_url.clone(),
                reason,
            })?;

        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        let serializer = Serializer::new(config.prefix.clone(), hostname);
        let sampler = RuntimeSampler::new(&registry, source)?;
        let shutdown = ShutdownSignal::new();

        let mut tasks = Vec::new();
        tasks.push(runtime.spawn(sampler.run(shutdown.subscribe())));

        if let Some(url) = &push_url {
            let publisher = PushPublisher::new(
                url.clone(),
                registry.clone(),
                serializer.clone(),
                config.push_timeout,
            );
            tasks.push(runtime.spawn(publisher.run(shutdown.subscribe())));
        }

        info!(
            hostname = %serializer.hostname(),
            prefix = %serializer.prefix(),
            push = push_url.is_some(),
            "metrics bridge started"
        );

        Ok(Self {
            registry,
            serializer,
            push_url,
            runtime,
            shutdown,
            tasks,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn hostname(&self) -> &str {
        self.serializer.hostname()
    }

    pub fn prefix(&self) -> &str {
        self.serializer.prefix()
    }

    /// Collector URL, if push is enabled.
    pub fn push_url(&self) -> Option<&Uri> {
        self.push_url.as_ref()
    }

    /// Current snapshot as records.
    pub fn serialize(&self) -> Vec<Record> {
        self.serializer.serialize(&self.registry)
    }

    /// Current snapshot as a JSON array.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.serializer.to_json(&self.registry)
    }

    /// A handler for mounting the pull endpoint in another server.
    pub fn pull_handler(&self) -> PullHandler {
        PullHandler::new(self.registry.clone(), self.serializer.clone())
    }

    /// Answer one pull request.
    pub fn respond(&self) -> Response<Full<Bytes>> {
        self.pull_handler().respond()
    }

    /// Serve the pull endpoint on `address` at `path` until shutdown.
    ///
    /// Returns the bound address, which differs from `address` when it asked
    /// for port 0.
    pub async fn serve(&mut self, address: SocketAddr, path: &str) -> Result<SocketAddr, BridgeError> {
        let server = PullServer::bind(address, path, self.pull_handler())
            .await
            .map_err(|source| BridgeError::Bind { address, source })?;
        let bound = server
            .local_addr()
            .map_err(|source| BridgeError::Bind { address, source })?;

        self.tasks
            .push(self.runtime.spawn(server.run(self.shutdown.subscribe())));
        Ok(bound)
    }

    /// Signal every background task and wait for them to stop.
    pub async fn shutdown(self) {
        self.shutdown.shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("metrics bridge stopped");
    }
}
