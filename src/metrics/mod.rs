pub mod collector;
pub mod percentiles;
pub mod registry;
pub mod stream;

use serde::Serialize;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use registry::{Clock, ManualClock, Registry, SystemClock};

// ─── Builtin metric names ────────────────────────────────────────
//
// Dashboards key on these exact strings. Renaming one is a breaking change.

pub const BUILTIN_METRIC_NAME_API_ENDPOINT_SERVICE_TIME: &str = "API endpoint service time";
pub const BUILTIN_METRIC_NAME_API_ENDPOINT_RESPONSE_TIME: &str = "API endpoint response time";
pub const BUILTIN_METRIC_NAME_API_RPC_SERVICE_TIME: &str = "API RPC service time";
pub const BUILTIN_METRIC_NAME_API_BRS: &str = "API big-response-storage count";

/// Positional tag slots of a raw sample.
///
/// Slot assignment is fixed per metric name: downstream aggregation reads
/// `tag2` of "API endpoint service time" as the metric key, always. Unused
/// slots stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RawTags {
    pub tag1: String,
    pub tag2: String,
    pub tag3: String,
    pub tag4: String,
    pub tag5: String,
}

#[cfg(test)]
impl RawTags {
    pub(crate) fn as_array(&self) -> [&str; 5] {
        [&self.tag1, &self.tag2, &self.tag3, &self.tag4, &self.tag5]
    }
}

/// A single named, tagged observation.
/// This is the "write" side: timers build these and push them into a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: &'static str,
    pub tags: RawTags,
    pub value: f64,
}

/// Anything that accepts samples. Must tolerate concurrent writers and must
/// not block the caller for longer than a short critical section.
pub trait MetricSink: Send + Sync {
    fn emit(&self, sample: MetricSample);
}
