use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::endpoint::Endpoint;
use crate::stat::EndpointStat;
use crate::AppState;

use super::{authenticate, check_format, rejected, respond, AppError, FORMAT_JSON};

const MAX_ROWS: usize = 100_000;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub metric_id: i32,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_rows")]
    pub rows: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChunkParams {
    pub metric_id: i32,
    pub id: Uuid,
    pub index: usize,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    FORMAT_JSON.into()
}
fn default_rows() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub ts: i64,
    pub value: f64,
}

/// Handle for the rest of a response that did not fit in one reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkHandle {
    pub id: Uuid,
    pub chunks: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub metric_id: i32,
    pub total_rows: usize,
    pub points: serde_json::Value,
    pub more: Option<ChunkHandle>,
}

// ─── GET /api/query ──────────────────────────────────────────────

pub async fn query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return rejected(&state.registry, Endpoint::Query, &headers, rejection),
    };
    let mut es =
        EndpointStat::new(&state.registry, Endpoint::Query, params.metric_id, &params.format);
    authenticate(&mut es, &headers);
    respond(es, run_query(&state, &params))
}

fn run_query(state: &AppState, params: &QueryParams) -> Result<QueryResponse, AppError> {
    check_format(&params.format)?;
    if params.rows > MAX_ROWS {
        return Err(AppError::BadRequest(format!(
            "rows must be at most {MAX_ROWS}"
        )));
    }

    let points = series_points(params.metric_id, params.rows);
    let mut chunks: Vec<serde_json::Value> = points
        .chunks(state.config.chunk_rows.max(1))
        .map(|c| serde_json::json!(c))
        .collect();

    let first = if chunks.is_empty() {
        serde_json::json!([])
    } else {
        chunks.remove(0)
    };

    // Everything after the first chunk goes to big response storage
    let more = if chunks.is_empty() {
        None
    } else {
        let n = chunks.len();
        Some(ChunkHandle {
            id: state.brs.set(chunks),
            chunks: n,
        })
    };

    Ok(QueryResponse {
        metric_id: params.metric_id,
        total_rows: points.len(),
        points: first,
        more,
    })
}

/// One point per second ending now; values follow a slow sine so charts
/// have something to draw.
fn series_points(metric_id: i32, rows: usize) -> Vec<Point> {
    let now = chrono::Utc::now().timestamp();
    let phase = f64::from(metric_id);
    (0..rows)
        .map(|i| {
            let age = (rows - i) as i64;
            Point {
                ts: now - age,
                value: ((i as f64) / 60.0 + phase).sin(),
            }
        })
        .collect()
}

// ─── GET /api/query/chunk ────────────────────────────────────────

pub async fn query_chunk(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ChunkParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return rejected(&state.registry, Endpoint::Query, &headers, rejection),
    };
    let mut es =
        EndpointStat::new(&state.registry, Endpoint::Query, params.metric_id, &params.format);
    authenticate(&mut es, &headers);

    let result = check_format(&params.format).and_then(|_| {
        state.brs.get(&params.id, params.index).ok_or_else(|| {
            AppError::NotFound(format!(
                "chunk {} of response {} not found or expired",
                params.index, params.id
            ))
        })
    });
    respond(es, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        BUILTIN_METRIC_NAME_API_ENDPOINT_RESPONSE_TIME as RESPONSE_TIME,
        BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME as SERVICE_TIME,
    };
    use crate::server::create_router;
    use crate::storage::ChunkCount;
    use crate::test_support::{body_json, get, test_state};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn small_query_fits_in_one_reply() {
        let (state, _) = test_state(10);
        let resp = create_router(state.clone())
            .oneshot(get("/api/query?metric_id=5&rows=7", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: QueryResponse = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(body.total_rows, 7);
        assert_eq!(body.points.as_array().map(Vec::len), Some(7));
        assert!(body.more.is_none());
        assert_eq!(state.brs.count(), 0);
    }

    #[tokio::test]
    async fn large_query_spills_into_storage_and_pages_back() {
        let (state, _) = test_state(10);
        let router = create_router(state.clone());

        let resp = router
            .clone()
            .oneshot(get("/api/query?metric_id=5&rows=25", None))
            .await
            .unwrap();
        let body: QueryResponse = serde_json::from_value(body_json(resp).await).unwrap();
        let handle = body.more.expect("remaining chunks stored");
        assert_eq!(handle.chunks, 2);

        let uri = format!("/api/query/chunk?metric_id=5&id={}&index=1", handle.id);
        let resp = router.oneshot(get(&uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let last: Vec<Point> = serde_json::from_value(body_json(resp).await).unwrap();
        assert_eq!(last.len(), 5);
    }

    #[tokio::test]
    async fn unknown_chunk_is_not_found() {
        let (state, _) = test_state(10);
        let uri = format!("/api/query/chunk?metric_id=5&id={}&index=0", Uuid::new_v4());
        let resp = create_router(state).oneshot(get(&uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_query_string_is_still_timed() {
        let (state, _) = test_state(10);
        let resp = create_router(state.clone())
            .oneshot(get("/api/query?metric_id=abc", Some("bob@example.com")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let snap = state.metrics.snapshot();
        assert_eq!(snap.total_samples, 2);
        let svc: Vec<_> = snap
            .series_named(SERVICE_TIME)
            .collect();
        assert_eq!(svc.len(), 1);
        assert_eq!(svc[0].tags.as_array(), ["query", "0", "400", "user", "json"]);
    }

    #[tokio::test]
    async fn chunk_request_without_id_is_still_timed() {
        let (state, _) = test_state(10);
        let resp = create_router(state.clone())
            .oneshot(get("/api/query/chunk?metric_id=5&index=0", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let snap = state.metrics.snapshot();
        let rsp: Vec<_> = snap
            .series_named(RESPONSE_TIME)
            .collect();
        assert_eq!(rsp.len(), 1);
        assert_eq!(rsp[0].tags.as_array(), ["query", "0", "400", "", "json"]);
    }

    #[test]
    fn points_are_one_second_apart() {
        let pts = series_points(3, 4);
        assert_eq!(pts.len(), 4);
        assert!(pts.windows(2).all(|w| w[1].ts - w[0].ts == 1));
    }
}
