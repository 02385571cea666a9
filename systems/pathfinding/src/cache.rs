//! Tick-stamped path cache with oldest-first eviction.

use std::collections::BTreeMap;

use skirmish_core::TilePos;

/// Identifies a cached search by its endpoints and the requester's radius.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CacheKey {
    start: TilePos,
    goal: TilePos,
    radius_bits: u32,
}

impl CacheKey {
    pub(crate) fn new(start: TilePos, goal: TilePos, radius: f32) -> Self {
        Self {
            start,
            goal,
            radius_bits: radius.to_bits(),
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    steps: Vec<TilePos>,
    created_tick: u64,
    sequence: u64,
}

/// Bounded cache of successful searches.
///
/// Entries older than the TTL are never returned. When the capacity is
/// exceeded the entry inserted earliest is dropped.
#[derive(Debug)]
pub(crate) struct PathCache {
    ttl: u64,
    capacity: usize,
    entries: BTreeMap<CacheKey, CacheEntry>,
    age_order: BTreeMap<u64, CacheKey>,
    next_sequence: u64,
}

impl PathCache {
    pub(crate) fn new(ttl: u64, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: BTreeMap::new(),
            age_order: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&mut self, key: &CacheKey, tick: u64) -> Option<&[TilePos]> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => self.is_expired(entry, tick),
        };

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.steps.as_slice())
    }

    /// Stores a result and returns how many entries were evicted to make room.
    pub(crate) fn insert(&mut self, key: CacheKey, steps: Vec<TilePos>, tick: u64) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        self.remove(&key);
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let _ = self.entries.insert(
            key,
            CacheEntry {
                steps,
                created_tick: tick,
                sequence,
            },
        );
        let _ = self.age_order.insert(sequence, key);

        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.age_order.pop_first() else {
                break;
            };
            let _ = self.entries.remove(&oldest);
            evicted += 1;
        }
        evicted
    }

    /// Drops every entry whose TTL elapsed and returns how many were removed.
    pub(crate) fn expire(&mut self, tick: u64) -> usize {
        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, tick))
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.age_order.clear();
    }

    fn is_expired(&self, entry: &CacheEntry, tick: u64) -> bool {
        tick.saturating_sub(entry.created_tick) >= self.ttl
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.entries.remove(key) {
            let _ = self.age_order.remove(&entry.sequence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i32) -> CacheKey {
        CacheKey::new(TilePos::new(0, 0), TilePos::new(x, 0), 0.3)
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = PathCache::new(10, 4);
        let _ = cache.insert(key(1), vec![TilePos::new(1, 0)], 5);

        assert!(cache.get(&key(1), 14).is_some());
        assert!(cache.get(&key(1), 15).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn overflow_evicts_oldest_entry() {
        let mut cache = PathCache::new(100, 2);
        assert_eq!(cache.insert(key(1), Vec::new(), 0), 0);
        assert_eq!(cache.insert(key(2), Vec::new(), 1), 0);
        assert_eq!(cache.insert(key(3), Vec::new(), 2), 1);

        assert!(cache.get(&key(1), 3).is_none());
        assert!(cache.get(&key(2), 3).is_some());
        assert!(cache.get(&key(3), 3).is_some());
    }

    #[test]
    fn reinserting_refreshes_age() {
        let mut cache = PathCache::new(100, 2);
        let _ = cache.insert(key(1), Vec::new(), 0);
        let _ = cache.insert(key(2), Vec::new(), 1);
        let _ = cache.insert(key(1), Vec::new(), 2);
        let _ = cache.insert(key(3), Vec::new(), 3);

        assert!(cache.get(&key(2), 4).is_none());
        assert!(cache.get(&key(1), 4).is_some());
    }

    #[test]
    fn expire_sweeps_stale_entries() {
        let mut cache = PathCache::new(5, 8);
        let _ = cache.insert(key(1), Vec::new(), 0);
        let _ = cache.insert(key(2), Vec::new(), 3);

        assert_eq!(cache.expire(6), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn radius_distinguishes_keys() {
        let narrow = CacheKey::new(TilePos::new(0, 0), TilePos::new(3, 3), 0.3);
        let wide = CacheKey::new(TilePos::new(0, 0), TilePos::new(3, 3), 0.9);
        assert_ne!(narrow, wide);
    }
}
