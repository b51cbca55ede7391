//! Linear probing: on a collision, try the next slot.

use std::hash::Hash;

use crate::{
    error::TableError,
    hashers::default_hash,
    map::{DEFAULT_CAPACITY, TableBuilder},
    open_addressing::{OpenAddressingMap, ProbeStrategy},
    probe::ProbeKind,
};

/// Probe policy `index_i = (home + i) mod capacity`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl<K> ProbeStrategy<K> for Linear {
    const NAME: &'static str = "lp";

    fn kind(&self, _key: &K) -> ProbeKind {
        ProbeKind::Linear
    }
}

/// Open addressing table with linear probing.
pub type LinearProbingMap<K, V> = OpenAddressingMap<K, V, Linear>;

impl<K, V> LinearProbingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    /// Creates an empty table keyed by the std `DefaultHasher`
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_CAPACITY, Box::new(default_hash::<K>), Linear)
    }

    /// Creates an empty table of at least `capacity` slots keyed by the std `DefaultHasher`
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime that large fits in a `usize`.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        TableBuilder::new(capacity).primary(default_hash::<K>).build_linear()
    }
}

impl<K, V> Default for LinearProbingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashTable;

    /// Table of 7 slots where every key hashes to itself
    fn identity_map() -> LinearProbingMap<u64, &'static str> {
        TableBuilder::new(7)
            .primary(|k: &u64| usize::try_from(*k).unwrap())
            .build_linear()
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = LinearProbingMap::new();
        assert_eq!(map.put("key1".to_string(), 1), Ok(None));
        assert_eq!(map.put("key2".to_string(), 2), Ok(None));
        assert_eq!(map.put("key3".to_string(), 3), Ok(None));

        assert_eq!(map.get(&"key1".to_string()), Some(&1));
        assert_eq!(map.get(&"key2".to_string()), Some(&2));
        assert_eq!(map.get(&"key3".to_string()), Some(&3));
        assert_eq!(map.get(&"key4".to_string()), None);
    }

    #[test]
    fn test_collisions_take_consecutive_slots() {
        let mut map = identity_map();
        for key in [1, 8, 15] {
            map.put(key, "v").unwrap();
        }

        assert_eq!(map.slot_of(&1), Some(1));
        assert_eq!(map.slot_of(&8), Some(2));
        assert_eq!(map.slot_of(&15), Some(3));
        assert_eq!(map.probe_count(&15), 3);
    }

    #[test]
    fn test_remove_keeps_later_keys_reachable() {
        let mut map = identity_map();
        map.put(1, "one").unwrap();
        map.put(8, "eight").unwrap();
        map.put(15, "fifteen").unwrap();

        assert_eq!(map.get(&15), Some(&"fifteen"));
        assert_eq!(map.remove(&8), Some("eight"));
        assert_eq!(map.get(&15), Some(&"fifteen"));
        assert_eq!(map.get(&8), None);
        assert_eq!(map.len(), 2);
        assert_eq!(map.stats().tombstones, 1);
    }

    #[test]
    fn test_put_reuses_first_tombstone() {
        let mut map = identity_map();
        map.put(1, "one").unwrap();
        map.put(8, "eight").unwrap();
        map.put(15, "fifteen").unwrap();
        map.remove(&8);

        assert_eq!(map.put(22, "twenty-two"), Ok(None));
        assert_eq!(map.slot_of(&22), Some(2));
        assert_eq!(map.stats().tombstones, 0);
    }

    #[test]
    fn test_put_over_tombstone_does_not_duplicate() {
        let mut map = identity_map();
        map.put(1, "one").unwrap();
        map.put(8, "eight").unwrap();
        map.remove(&1);

        // 8 lives past the tombstone, so this is an overwrite and not a second copy
        assert_eq!(map.put(8, "EIGHT"), Ok(Some("eight")));
        assert_eq!(map.len(), 1);
        assert_eq!(map.keys(), vec![8]);
    }

    #[test]
    fn test_resize_at_threshold() {
        let mut map = identity_map();
        // threshold is 5 of 7
        for key in 0..5 {
            map.put(key, "v").unwrap();
        }
        assert_eq!(map.capacity(), 7);

        // twice the live count, 10, rounds up to the prime 11
        map.put(5, "v").unwrap();
        assert_eq!(map.capacity(), 11);
        for key in 0..6 {
            assert_eq!(map.get(&key), Some(&"v"));
        }
    }

    #[test]
    fn test_tombstones_count_toward_growth() {
        let mut map = identity_map();
        for key in 0..4 {
            map.put(key, "v").unwrap();
        }
        for key in 0..4 {
            map.remove(&key);
        }
        map.put(4, "v").unwrap();
        // 1 live entry and 4 tombstones reach the threshold of 5
        map.put(5, "v").unwrap();

        assert_eq!(map.stats().tombstones, 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&4), Some(&"v"));
        assert_eq!(map.get(&5), Some(&"v"));
    }

    #[test]
    fn test_lookup_walks_past_tombstones() {
        let mut map = identity_map();
        for key in 0..5 {
            map.put(key, "v").unwrap();
        }
        for key in 0..5 {
            map.remove(&key);
        }

        // 7 starts at slot 0, crosses the five tombstones and stops at empty slot 5
        assert_eq!(map.get(&7), None);
        assert_eq!(map.probe_count(&7), 6);
        assert!(map.probe_count(&7) <= map.capacity() + 1);
    }

    #[test]
    fn test_get_mut() {
        let mut map = LinearProbingMap::new();
        map.put("key1".to_string(), 1).unwrap();

        if let Some(value) = map.get_mut(&"key1".to_string()) {
            *value += 10;
        }

        assert_eq!(map.get(&"key1".to_string()), Some(&11));
    }

    #[test]
    fn test_clear() {
        let mut map = identity_map();
        map.put(1, "one").unwrap();
        map.put(2, "two").unwrap();
        map.remove(&2);

        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.capacity(), 7);
        assert_eq!(map.stats().tombstones, 0);
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn test_rehash_overflow_leaves_table_untouched() {
        let mut map = identity_map();
        map.put(3, "three").unwrap();

        assert_eq!(
            map.rehash(usize::MAX),
            Err(TableError::CapacityOverflow { requested: usize::MAX })
        );
        assert_eq!(map.capacity(), 7);
        assert_eq!(map.get(&3), Some(&"three"));
    }
}
