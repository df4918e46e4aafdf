pub mod metrics;
pub mod query;
pub mod reset;

use axum::{
    extract::rejection::QueryRejection,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::endpoint::Endpoint;
use crate::metrics::Registry;
use crate::stat::EndpointStat;

/// Header carrying the authenticated caller, set by the auth proxy.
pub const ACCESS_USER_HEADER: &str = "x-access-user";

/// The only data format these handlers produce.
pub const FORMAT_JSON: &str = "json";

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

// ─── Instrumentation plumbing ────────────────────────────────────

/// Resolve the caller and store it on the timer.
pub fn authenticate(es: &mut EndpointStat, headers: &HeaderMap) {
    if let Some(user) = headers
        .get(ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        es.set_token_name(user);
    }
}

/// Build the response, record service time with its status, and attach the
/// timer so the middleware can record response time once the body is out.
pub fn respond<T: Serialize>(es: EndpointStat, result: Result<T, AppError>) -> Response {
    let mut response = match result {
        Ok(data) => Json(data).into_response(),
        Err(e) => e.into_response(),
    };
    es.service_time(i32::from(response.status().as_u16()));
    response.extensions_mut().insert(es);
    response
}

/// Answer a request whose query string did not parse. The timer uses
/// metric key `0` since the real one is unknown.
pub fn rejected(
    registry: &Registry,
    endpoint: Endpoint,
    headers: &HeaderMap,
    rejection: QueryRejection,
) -> Response {
    let mut es = EndpointStat::new(registry, endpoint, 0, FORMAT_JSON);
    authenticate(&mut es, headers);
    respond::<()>(es, Err(rejection.into()))
}

pub fn check_format(format: &str) -> Result<(), AppError> {
    if format == FORMAT_JSON {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("unsupported data format {format:?}")))
    }
}
