//! Request and RPC instrumentation for the API server.
//!
//! Timers ([`stat::EndpointStat`], [`stat::RpcMethodStat`]) turn finished
//! operations into raw samples with fixed positional tags and push them into
//! a [`metrics::Registry`]. The rest of the crate is the demo server that
//! wires them into axum.

pub mod config;
pub mod endpoint;
pub mod handlers;
pub mod host;
pub mod metrics;
pub mod middleware;
pub mod rpc;
pub mod server;
pub mod stat;
pub mod storage;

use std::sync::Arc;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: config::Config,

    /// Every timer and gauge emits through this.
    pub registry: metrics::Registry,

    /// In-process sink behind `registry`, read by the stats endpoints.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// Overflow chunks of large query responses.
    pub brs: Arc<storage::BigResponseStorage>,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let collector = Arc::new(metrics::MetricsCollector::new());
        let registry = metrics::Registry::new(collector.clone());
        let brs = Arc::new(storage::BigResponseStorage::new(config.brs_ttl()));
        Self {
            config,
            registry,
            metrics: collector,
            brs,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use crate::metrics::ManualClock;

    /// State backed by a real collector and a manual clock.
    pub fn test_state(chunk_rows: usize) -> (Arc<AppState>, Arc<ManualClock>) {
        let config = config::Config {
            chunk_rows,
            ..config::Config::default()
        };
        let clock = Arc::new(ManualClock::new());
        let collector = Arc::new(metrics::MetricsCollector::new());
        let registry = metrics::Registry::with_clock(collector.clone(), clock.clone());
        let brs = Arc::new(storage::BigResponseStorage::with_clock(
            config.brs_ttl(),
            clock.clone(),
        ));
        let state = Arc::new(AppState {
            config,
            registry,
            metrics: collector,
            brs,
        });
        (state, clock)
    }

    pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(user) = user {
            req = req.header(handlers::ACCESS_USER_HEADER, user);
        }
        req.body(Body::empty()).unwrap()
    }

    pub fn post(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().method("POST").uri(uri);
        if let Some(user) = user {
            req = req.header(handlers::ACCESS_USER_HEADER, user);
        }
        req.body(Body::empty()).unwrap()
    }

    pub async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
