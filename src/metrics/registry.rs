use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::{MetricSample, MetricSink, RawTags};

// ─── Clocks ──────────────────────────────────────────────────────

/// Source of "now" for every timer created through a [`Registry`].
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real monotonic clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used by tests to make elapsed
/// durations exact.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

// ─── Registry ────────────────────────────────────────────────────

type Callback = Box<dyn Fn(&Registry) + Send + Sync>;

/// Cheaply cloneable handle that every timer and gauge emits through.
///
/// Owns the sink, the clock, and the list of collection callbacks that run
/// on the registry's own schedule.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn MetricSink>,
    clock: Arc<dyn Clock>,
    callbacks: RwLock<Vec<Callback>>,
}

impl Registry {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self::with_clock(sink, Arc::new(SystemClock))
    }

    pub fn with_clock(sink: Arc<dyn MetricSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                clock,
                callbacks: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Start building a raw sample. Nothing is emitted until `.value()`.
    pub fn access_metric_raw(&self, name: &'static str, tags: RawTags) -> RawAccess<'_> {
        RawAccess {
            registry: self,
            name,
            tags,
        }
    }

    /// Add a callback invoked on every collection cycle.
    ///
    /// Callbacks must not register further callbacks from inside `collect`.
    pub fn register_callback<F>(&self, f: F)
    where
        F: Fn(&Registry) + Send + Sync + 'static,
    {
        self.inner.callbacks.write().push(Box::new(f));
    }

    /// Run every registered callback once.
    pub fn collect(&self) {
        let callbacks = self.inner.callbacks.read();
        for cb in callbacks.iter() {
            cb(self);
        }
        tracing::trace!(callbacks = callbacks.len(), "registry collection cycle");
    }

    /// Spawns a task that calls [`Registry::collect`] every `interval`.
    /// Abort the returned handle to stop it.
    pub fn spawn_collector(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.collect();
            }
        })
    }

    fn emit(&self, sample: MetricSample) {
        self.inner.sink.emit(sample);
    }
}

/// Pending raw sample, completed by [`RawAccess::value`].
pub struct RawAccess<'a> {
    registry: &'a Registry,
    name: &'static str,
    tags: RawTags,
}

impl RawAccess<'_> {
    pub fn value(self, value: f64) {
        self.registry.emit(MetricSample {
            name: self.name,
            tags: self.tags,
            value,
        });
    }
}

// ─── Test double ─────────────────────────────────────────────────
