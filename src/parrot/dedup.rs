//! Replay suppression for mesh packets.
//!
//! Every packet is typically delivered several times: once per gateway that
//! heard it, plus our own transmissions looping back through the broker. The
//! cache remembers packet ids long enough to cover network propagation and
//! evicts them afterwards so memory stays bounded for long-running processes.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Time-windowed set of packet ids. First insertion wins; an id becomes
/// insertable again only after `ttl` has elapsed since it was first seen.
#[derive(Debug)]
pub struct DedupCache {
    ttl: Duration,
    ids: HashSet<u32>,
    // Insertion order; the front is always the oldest entry.
    order: VecDeque<(Instant, u32)>,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ids: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Record `id` at time `now`. Returns `true` when the id was fresh,
    /// `false` when it is a replay still inside the window.
    pub fn insert(&mut self, id: u32, now: Instant) -> bool {
        self.evict_expired(now);
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back((now, id));
        true
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&(seen_at, id)) = self.order.front() {
            if now.duration_since(seen_at) < self.ttl {
                break;
            }
            self.order.pop_front();
            self.ids.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let now = Instant::now();
        assert!(cache.insert(42, now));
        assert!(!cache.insert(42, now));
        assert!(!cache.insert(42, now + Duration::from_secs(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_ids_are_readmitted() {
        let mut cache = DedupCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(cache.insert(7, t0));
        assert!(!cache.insert(7, t0 + Duration::from_secs(9)));
        // TTL elapsed: the old entry is evicted and the id is fresh again.
        assert!(cache.insert(7, t0 + Duration::from_secs(10)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn eviction_keeps_cache_bounded() {
        let mut cache = DedupCache::new(Duration::from_secs(5));
        let t0 = Instant::now();
        for id in 0..100u32 {
            assert!(cache.insert(id, t0));
        }
        assert_eq!(cache.len(), 100);
        assert!(cache.insert(1000, t0 + Duration::from_secs(6)));
        // Everything from the first burst aged out.
        assert_eq!(cache.len(), 1);
    }
}
