use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::{to_scaled, PercentileSet};
use super::{MetricSample, MetricSink, RawTags};

// ─── Configuration ───────────────────────────────────────────────

/// How many individual samples we keep for the live feed
const MAX_RECENT_SAMPLES: usize = 200;

/// HdrHistogram precision; the histogram auto-resizes for range.
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe in-process sink.
/// Timers push samples via `emit()`, the stats endpoints call `snapshot()`.
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

/// A single entry in the live sample feed.
#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub timestamp_ms: i64,
    pub name: &'static str,
    pub tags: RawTags,
    pub value: f64,
}

/// Aggregated view of one (metric name, tag tuple) series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSnapshot {
    pub name: &'static str,
    pub tags: RawTags,
    pub last: f64,
    pub stats: PercentileSet,
}

/// Complete snapshot shipped to `/api/stats` and every SSE tick.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_samples: u64,
    pub elapsed_secs: f64,
    pub series: Vec<SeriesSnapshot>,
    pub recent_samples: Vec<SampleRecord>,
}

impl MetricsSnapshot {
    /// All series recorded under `name`, in tag order.
    pub fn series_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SeriesSnapshot> {
        self.series.iter().filter(move |s| s.name == name)
    }
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SeriesKey {
    name: &'static str,
    tags: RawTags,
}

struct Series {
    hist: Histogram<u64>,
    last: f64,
}

struct Inner {
    series: HashMap<SeriesKey, Series>,
    total_samples: u64,
    recent_samples: VecDeque<SampleRecord>,
    // Wall-clock anchor for elapsed time
    start_time: Option<Instant>,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Wipe all data.
    pub fn reset(&self) {
        *self.inner.lock() = Inner::new();
    }

    /// Produce a read-only snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSink for MetricsCollector {
    fn emit(&self, sample: MetricSample) {
        self.inner.lock().record(sample);
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new() -> Self {
        Self {
            series: HashMap::new(),
            total_samples: 0,
            recent_samples: VecDeque::with_capacity(MAX_RECENT_SAMPLES + 1),
            start_time: None,
        }
    }

    fn record(&mut self, sample: MetricSample) {
        self.start_time.get_or_insert_with(Instant::now);
        self.total_samples += 1;

        let key = SeriesKey {
            name: sample.name,
            tags: sample.tags.clone(),
        };
        let series = match self.series.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let hist = match Histogram::<u64>::new(HIST_SIGFIG) {
                    Ok(h) => h,
                    Err(e) => {
                        tracing::debug!(error = %e, "histogram creation failed, sample dropped");
                        return;
                    }
                };
                v.insert(Series { hist, last: 0.0 })
            }
        };

        if let Err(e) = series.hist.record(to_scaled(sample.value)) {
            tracing::debug!(
                name = sample.name,
                value = sample.value,
                error = %e,
                "sample out of range"
            );
        }
        series.last = sample.value;

        // ── Live sample feed ────────────────────────────────────
        self.recent_samples.push_back(SampleRecord {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            name: sample.name,
            tags: sample.tags,
            value: sample.value,
        });
        if self.recent_samples.len() > MAX_RECENT_SAMPLES {
            self.recent_samples.pop_front();
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let elapsed_secs = self
            .start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let mut keys: Vec<&SeriesKey> = self.series.keys().collect();
        keys.sort();

        let series = keys
            .into_iter()
            .map(|k| {
                let s = &self.series[k];
                SeriesSnapshot {
                    name: k.name,
                    tags: k.tags.clone(),
                    last: s.last,
                    stats: PercentileSet::from_histogram(&s.hist),
                }
            })
            .collect();

        MetricsSnapshot {
            total_samples: self.total_samples,
            elapsed_secs,
            series,
            recent_samples: self.recent_samples.iter().cloned().collect(),
        }
    }
}
