//! Request and RPC instrumentation.
//!
//! Every timer turns one finished operation into a raw sample with fixed
//! positional tags. Emission goes through a [`Registry`] and never fails
//! from the caller's point of view.

use std::sync::Arc;
use std::time::Instant;

use crate::endpoint::Endpoint;
use crate::host;
use crate::metrics::{
    RawTags, Registry, BUILTIN_METRIC_NAME_API_BRS,
    BUILTIN_METRIC_NAME_API_ENDPOINT_RESPONSE_TIME, BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME,
    BUILTIN_METRIC_NAME_API_RPC_SERVICE_TIME,
};
use crate::rpc::{error_code_tag, RpcError};
use crate::storage::ChunkCount;

/// Tag value every email-shaped caller collapses into.
pub const USER_TOKEN_NAME: &str = "user";

/// Collapse a caller identity into a bounded-cardinality tag value.
///
/// Anything containing `@` is treated as a personal account and folded into
/// [`USER_TOKEN_NAME`]; everything else is assumed to be a service token and
/// passes through unchanged.
pub fn stat_token_name(user: &str) -> String {
    if user.contains('@') {
        return USER_TOKEN_NAME.to_string();
    }
    user.to_string()
}

// ─── HTTP endpoints ──────────────────────────────────────────────

/// Timer for one HTTP API request.
///
/// Created before authentication so the clock covers it; the caller tag is
/// filled in afterwards with [`EndpointStat::set_token_name`]. Completion
/// methods read whatever tag is present at call time (empty if never set).
#[derive(Clone)]
pub struct EndpointStat {
    registry: Registry,
    endpoint: Endpoint,
    metric: String,
    start_time: Instant,
    token_name: String,
    data_format: String,
}

impl EndpointStat {
    pub fn new(
        registry: &Registry,
        endpoint: Endpoint,
        metric_id: i32,
        data_format: impl Into<String>,
    ) -> Self {
        // metric ID key is "raw": no name lookup on the hot path
        Self::with_metric_key(registry, endpoint, metric_id.to_string(), data_format)
    }

    /// Same as [`EndpointStat::new`] for requests addressed by metric name.
    pub fn with_metric_name(
        registry: &Registry,
        endpoint: Endpoint,
        metric_name: &str,
        data_format: impl Into<String>,
    ) -> Self {
        Self::with_metric_key(registry, endpoint, metric_name.to_string(), data_format)
    }

    fn with_metric_key(
        registry: &Registry,
        endpoint: Endpoint,
        metric: String,
        data_format: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.clone(),
            endpoint,
            metric,
            start_time: registry.now(),
            token_name: String::new(),
            data_format: data_format.into(),
        }
    }

    pub fn set_token_name(&mut self, user: &str) {
        self.token_name = stat_token_name(user);
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Time the handler spent producing the result.
    pub fn service_time(&self, code: i32) {
        self.log_event(BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME, code);
    }

    /// Time until the response was handed to the transport.
    pub fn response_time(&self, code: i32) {
        self.log_event(BUILTIN_METRIC_NAME_API_ENDPOINT_RESPONSE_TIME, code);
    }

    fn log_event(&self, stat_name: &'static str, code: i32) {
        let v = self
            .registry
            .now()
            .saturating_duration_since(self.start_time)
            .as_secs_f64();
        self.registry
            .access_metric_raw(
                stat_name,
                RawTags {
                    tag1: self.endpoint.as_str().to_string(),
                    tag2: self.metric.clone(),
                    tag3: code.to_string(),
                    tag4: self.token_name.clone(),
                    tag5: self.data_format.clone(),
                },
            )
            .value(v);
    }
}

// ─── RPC methods ─────────────────────────────────────────────────

/// Timer for one RPC method call.
pub struct RpcMethodStat {
    registry: Registry,
    method: String,
    start_time: Instant,
}

impl RpcMethodStat {
    pub fn new(registry: &Registry, method: impl Into<String>) -> Self {
        Self {
            registry: registry.clone(),
            method: method.into(),
            start_time: registry.now(),
        }
    }

    pub fn service_time(&self, user: &str, err: Option<&RpcError>) {
        let v = self
            .registry
            .now()
            .saturating_duration_since(self.start_time)
            .as_secs_f64();
        self.registry
            .access_metric_raw(
                BUILTIN_METRIC_NAME_API_RPC_SERVICE_TIME,
                RawTags {
                    tag1: self.method.clone(),
                    tag2: error_code_tag(err),
                    tag3: stat_token_name(user),
                    tag4: host::hostname().to_string(),
                    ..RawTags::default()
                },
            )
            .value(v);
    }
}

// ─── Big response storage gauge ──────────────────────────────────

/// Registry callback reporting how many chunks `brs` currently holds.
pub fn current_chunks_count<C>(brs: Arc<C>) -> impl Fn(&Registry) + Send + Sync + 'static
where
    C: ChunkCount + ?Sized + 'static,
{
    move |r: &Registry| {
        r.access_metric_raw(
            BUILTIN_METRIC_NAME_API_BRS,
            RawTags {
                tag1: host::hostname().to_string(),
                ..RawTags::default()
            },
        )
        .value(brs.count() as f64);
    }
}
