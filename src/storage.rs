use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::metrics::{Clock, SystemClock};

/// Anything that can report how many items it currently holds.
/// Must be cheap and non-blocking: it is read on every collection cycle.
pub trait ChunkCount: Send + Sync {
    fn count(&self) -> usize;
}

/// Keeps large query responses split into chunks so clients can page
/// through them after the first reply.
///
/// Entries expire `ttl` after they were stored; expired entries are dropped
/// by [`BigResponseStorage::purge_expired`] and are never served.
pub struct BigResponseStorage {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<Uuid, Entry>>,
    // Total chunks across all entries, readable without the lock.
    chunks: AtomicUsize,
}

struct Entry {
    chunks: Vec<serde_json::Value>,
    expires_at: Instant,
}

impl BigResponseStorage {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
            chunks: AtomicUsize::new(0),
        }
    }

    /// Store a chunked response and return its handle.
    pub fn set(&self, chunks: Vec<serde_json::Value>) -> Uuid {
        let id = Uuid::new_v4();
        let n = chunks.len();
        let entry = Entry {
            chunks,
            expires_at: self.clock.now() + self.ttl,
        };
        let mut entries = self.entries.lock();
        entries.insert(id, entry);
        self.chunks.fetch_add(n, Ordering::Relaxed);
        id
    }

    /// Fetch chunk `index` of response `id`, unless it is missing or expired.
    pub fn get(&self, id: &Uuid, index: usize) -> Option<serde_json::Value> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        let entry = entries.get(id).filter(|e| e.expires_at > now)?;
        entry.chunks.get(index).cloned()
    }

    /// Drop every expired entry. Returns how many chunks were released.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut released = 0;
        let mut entries = self.entries.lock();
        entries.retain(|_, e| {
            let live = e.expires_at > now;
            if !live {
                released += e.chunks.len();
            }
            live
        });
        self.chunks.fetch_sub(released, Ordering::Relaxed);
        drop(entries);
        if released > 0 {
            tracing::debug!(released, "purged expired big responses");
        }
        released
    }
}

impl ChunkCount for BigResponseStorage {
    fn count(&self) -> usize {
        self.chunks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ManualClock;
    use serde_json::json;

    fn storage() -> (BigResponseStorage, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let brs = BigResponseStorage::with_clock(Duration::from_secs(60), clock.clone());
        (brs, clock)
    }

    #[test]
    fn stores_and_serves_chunks() {
        let (brs, _) = storage();
        let id = brs.set(vec![json!([1, 2]), json!([3])]);

        assert_eq!(brs.count(), 2);
        assert_eq!(brs.get(&id, 1), Some(json!([3])));
        assert_eq!(brs.get(&id, 2), None);
        assert_eq!(brs.get(&Uuid::new_v4(), 0), None);
    }

    #[test]
    fn expired_entries_are_hidden_then_purged() {
        let (brs, clock) = storage();
        let old = brs.set(vec![json!(1), json!(2), json!(3)]);
        clock.advance(Duration::from_secs(30));
        let fresh = brs.set(vec![json!(4)]);
        clock.advance(Duration::from_secs(31));

        assert_eq!(brs.get(&old, 0), None);
        assert_eq!(brs.get(&fresh, 0), Some(json!(4)));
        // Not yet purged: the count still includes the expired entry.
        assert_eq!(brs.count(), 4);

        assert_eq!(brs.purge_expired(), 3);
        assert_eq!(brs.count(), 1);
    }
}
