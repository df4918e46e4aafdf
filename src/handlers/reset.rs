use axum::{extract::State, http::HeaderMap, response::Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::stat::EndpointStat;
use crate::AppState;

use super::{authenticate, respond, FORMAT_JSON};

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Samples the collector held before the reset.
    pub dropped_samples: u64,
}

// ─── POST /api/reset-flood ───────────────────────────────────────
/// Clears the in-process collector. The request's own service and response
/// time land in the fresh collector.

pub async fn reset_flood(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut es = EndpointStat::new(&state.registry, Endpoint::ResetFlood, 0, FORMAT_JSON);
    authenticate(&mut es, &headers);

    let dropped_samples = state.metrics.snapshot().total_samples;
    state.metrics.reset();
    tracing::info!(dropped_samples, "collector reset");

    respond(es, Ok(ResetResponse { dropped_samples }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME;
    use crate::server::create_router;
    use crate::test_support::{body_json, get, post, test_state};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn reset_clears_earlier_samples_and_times_itself() {
        let (state, _) = test_state(10);
        let router = create_router(state.clone());

        router
            .clone()
            .oneshot(get("/api/query?metric_id=5&rows=1", None))
            .await
            .unwrap();
        assert_eq!(state.metrics.snapshot().total_samples, 2);

        let resp = router
            .oneshot(post("/api/reset-flood", Some("ops@example.com")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ResetResponse = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(body.dropped_samples, 2);

        // Only the reset request's own service + response time remain.
        let snap = state.metrics.snapshot();
        assert_eq!(snap.total_samples, 2);
        let svc: Vec<_> = snap
            .series_named(BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME)
            .collect();
        assert_eq!(svc.len(), 1);
        assert_eq!(
            svc[0].tags.as_array(),
            ["reset-flood", "0", "200", "user", "json"]
        );
    }

    #[tokio::test]
    async fn reset_requires_post() {
        let (state, _) = test_state(10);
        let resp = create_router(state)
            .oneshot(get("/api/reset-flood", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
