use hdrhistogram::Histogram;
use serde::Serialize;

/// Values are stored in the histogram as integer micro-units
/// (seconds → μs for durations, count × 10⁶ for gauges).
pub const SCALE: f64 = 1_000_000.0;

/// A complete percentile breakdown for one series, in the series' own unit.
/// Serialized straight into the stats JSON and the SSE stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PercentileSet {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
    pub count: u64,
}

impl PercentileSet {
    /// Extract a full percentile set from a scaled HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        let unscale = |v: u64| v as f64 / SCALE;
        Self {
            min: unscale(hist.min()),
            max: unscale(hist.max()),
            mean: hist.mean() / SCALE,
            p50: unscale(hist.value_at_percentile(50.0)),
            p95: unscale(hist.value_at_percentile(95.0)),
            p99: unscale(hist.value_at_percentile(99.0)),
            p999: unscale(hist.value_at_percentile(99.9)),
            count: hist.len(),
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            p999: 0.0,
            count: 0,
        }
    }
}

/// Convert a sample value into histogram units. Negative and NaN values
/// clamp to zero rather than being rejected.
pub fn to_scaled(value: f64) -> u64 {
    if value.is_nan() || value < 0.0 {
        tracing::debug!(value, "sample value clamped to zero");
        return 0;
    }
    (value * SCALE).round().min(u64::MAX as f64) as u64
}
