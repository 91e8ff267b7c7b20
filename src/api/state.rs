//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::metrics::Metrics;
use crate::read::RemoteReader;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Answers remote read requests from the store
    pub reader: Arc<RemoteReader>,
    /// Prometheus metrics exposed on `/metrics`
    pub metrics: Arc<Metrics>,
    /// API configuration
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(reader: RemoteReader, metrics: Arc<Metrics>, config: ApiConfig) -> Self {
        Self {
            reader: Arc::new(reader),
            metrics,
            config: Arc::new(config),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to listen on
    pub listen: SocketAddr,
    /// Upper bound for one remote read request
    pub request_timeout: Option<Duration>,
    /// Maximum compressed request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 10080)),
            request_timeout: Some(Duration::from_secs(120)),
            max_body_size: 32 * 1024 * 1024, // 32MB
        }
    }
}

impl ApiConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            listen: config.listen_addr()?,
            request_timeout: config.server.request_timeout(),
            ..Default::default()
        })
    }
}
