use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::stat::EndpointStat;

/// Completes endpoint instrumentation once the inner service has produced
/// its response:
///
///   * records response time for any response carrying an `EndpointStat`
///     (handlers attach one after recording service time)
///   * adds a `Server-Timing` header with the total handler wall time
///   * logs one structured line per API request
pub async fn endpoint_stat_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    let status = response.status().as_u16();
    let stat = response.extensions_mut().remove::<EndpointStat>();
    if let Some(es) = &stat {
        es.response_time(i32::from(status));
    }

    // ── Inject response header ──────────────────────────────────
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Request log ─────────────────────────────────────────────
    // Skip the stats stream, it would log every reconnect
    if path.starts_with(crate::endpoint::ROUTE_PREFIX) && !path.ends_with("/stream") {
        let endpoint = stat.as_ref().map(|es| es.endpoint().as_str()).unwrap_or("-");
        let elapsed_us = elapsed.as_micros() as u64;
        if status >= 500 {
            tracing::warn!(%method, %path, endpoint, status, elapsed_us, "api request");
        } else {
            tracing::info!(%method, %path, endpoint, status, elapsed_us, "api request");
        }
    }

    response
}
