use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::metrics::collector::SeriesSnapshot;
use crate::stat::EndpointStat;
use crate::AppState;

use super::{authenticate, check_format, rejected, respond, AppError, FORMAT_JSON};

#[derive(Debug, Deserialize)]
pub struct MetricParams {
    /// Metric name.
    pub s: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    FORMAT_JSON.into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsListResponse {
    pub metrics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MetricResponse {
    pub name: String,
    pub series: Vec<SeriesSnapshot>,
}

// ─── GET /api/metrics-list ───────────────────────────────────────

pub async fn metrics_list(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut es = EndpointStat::new(&state.registry, Endpoint::MetricList, 0, FORMAT_JSON);
    authenticate(&mut es, &headers);

    let names: BTreeSet<&str> = state
        .metrics
        .snapshot()
        .series
        .iter()
        .map(|s| s.name)
        .collect();
    let body = MetricsListResponse {
        metrics: names.into_iter().map(str::to_string).collect(),
    };
    respond(es, Ok(body))
}

// ─── GET /api/metric ─────────────────────────────────────────────

pub async fn metric(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<MetricParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return rejected(&state.registry, Endpoint::Metric, &headers, rejection),
    };
    let mut es = EndpointStat::with_metric_name(
        &state.registry,
        Endpoint::Metric,
        &params.s,
        &params.format,
    );
    authenticate(&mut es, &headers);
    respond(es, lookup_metric(&state, &params))
}

fn lookup_metric(state: &AppState, params: &MetricParams) -> Result<MetricResponse, AppError> {
    check_format(&params.format)?;
    let snapshot = state.metrics.snapshot();
    let series: Vec<SeriesSnapshot> = snapshot.series_named(&params.s).cloned().collect();
    if series.is_empty() {
        return Err(AppError::NotFound(format!("metric {:?} not found", params.s)));
    }
    Ok(MetricResponse {
        name: params.s.clone(),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        BUILTIN_METRIC_NAME_API_ENDPOINT_RESPONSE_TIME as RESPONSE_TIME,
        BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME as SERVICE_TIME,
    };
    use crate::server::create_router;
    use crate::test_support::{body_json, get, test_state};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn list_reports_metrics_seen_by_the_collector() {
        let (state, _) = test_state(10);
        let router = create_router(state.clone());

        // First request only sees what was emitted before it answered.
        router
            .clone()
            .oneshot(get("/api/metrics-list", Some("exporter")))
            .await
            .unwrap();
        let resp = router
            .oneshot(get("/api/metrics-list", Some("exporter")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: MetricsListResponse = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(
            body.metrics,
            vec![
                RESPONSE_TIME.to_string(),
                SERVICE_TIME.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn metric_lookup_tags_the_request_with_the_metric_name() {
        let (state, _) = test_state(10);
        let router = create_router(state.clone());

        let resp = router
            .oneshot(get("/api/metric?s=nope", Some("carol@example.com")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let snap = state.metrics.snapshot();
        let svc: Vec<_> = snap
            .series_named(SERVICE_TIME)
            .collect();
        assert_eq!(svc.len(), 1);
        assert_eq!(
            svc[0].tags.as_array(),
            ["metric", "nope", "404", "user", "json"]
        );
    }

    #[tokio::test]
    async fn missing_metric_name_is_still_timed() {
        let (state, _) = test_state(10);
        let resp = create_router(state.clone())
            .oneshot(get("/api/metric", Some("exporter")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let snap = state.metrics.snapshot();
        let svc: Vec<_> = snap
            .series_named(SERVICE_TIME)
            .collect();
        assert_eq!(svc.len(), 1);
        assert_eq!(svc[0].tags.as_array(), ["metric", "0", "400", "exporter", "json"]);
    }

    #[tokio::test]
    async fn unsupported_format_is_a_bad_request() {
        let (state, _) = test_state(10);
        let resp = create_router(state.clone())
            .oneshot(get("/api/metric?s=x&format=csv", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let snap = state.metrics.snapshot();
        let svc: Vec<_> = snap
            .series_named(SERVICE_TIME)
            .collect();
        assert_eq!(svc[0].tags.as_array(), ["metric", "x", "400", "", "csv"]);
    }
}
