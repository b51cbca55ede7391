use std::{fmt, hash::Hash, mem};

use log::debug;

use crate::{
    error::TableError,
    hashers::default_hash,
    map::{
        DEFAULT_CAPACITY, HashFn, HashTable, TableBuilder, TableStats, doubled, growth_threshold,
        resize_target,
    },
};

/// Load factor threshold of the chaining table, as a percentage
const LOAD_FACTOR_THRESHOLD: usize = 100;

/// A node in a bucket's singly linked list
struct Node<K, V> {
    /// The key in the key-value pair
    key: K,
    /// The value associated with the key
    value: V,
    /// Rest of the chain
    next: Link<K, V>,
}

/// Owning pointer to the next node of a chain, `None` at the tail
type Link<K, V> = Option<Box<Node<K, V>>>;

/// Drops a chain node by node.
///
/// The derived drop of `Box<Node>` recurses once per node, which overflows the stack on
/// very long chains.
fn release_chain<K, V>(mut head: Link<K, V>) {
    while let Some(mut node) = head {
        head = node.next.take();
    }
}

/// A hash table where each slot owns a linked list of the entries that hash to it.
///
/// Chains grow without bound, so correctness never depends on the capacity. The table
/// grows once it holds as many entries as it has slots.
pub struct SeparateChainingMap<K, V> {
    /// Chain heads, always a prime number of them
    buckets: Vec<Link<K, V>>,
    /// Current number of elements in the hash table
    size: usize,
    /// Threshold for load factor before resizing - stored as percentage (0-100)
    load_factor_threshold: usize,
    /// `size` at which the next insert rebuilds the table
    size_threshold: usize,
    /// Gives the bucket of a key
    hash_fn: HashFn<K>,
}

impl<K, V> fmt::Debug for SeparateChainingMap<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeparateChainingMap")
            .field("capacity", &self.buckets.len())
            .field("size", &self.size)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K, V> Drop for SeparateChainingMap<K, V> {
    fn drop(&mut self) {
        for bucket in &mut self.buckets {
            release_chain(bucket.take());
        }
    }
}

impl<K, V> SeparateChainingMap<K, V> {
    /// Returns the number of elements in the hash table
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the hash table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of buckets
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the current load factor, the mean chain length
    #[must_use]
    #[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        if self.buckets.is_empty() { 0.0 } else { self.size as f64 / self.buckets.len() as f64 }
    }

    /// Length of the longest chain
    #[must_use]
    pub fn max_bucket_depth(&self) -> usize {
        self.buckets.iter().map(chain_len).max().unwrap_or(0)
    }

    /// Returns an iterator over the key-value pairs
    #[must_use]
    #[allow(clippy::iter_without_into_iter)]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { buckets: self.buckets.iter(), node: None }
    }

    /// Clears the hash map, releasing every node
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            release_chain(bucket.take());
        }
        self.size = 0;
    }
}

/// Number of nodes in a chain
fn chain_len<K, V>(head: &Link<K, V>) -> usize {
    let mut depth: usize = 0;
    let mut node = head.as_deref();
    while let Some(n) = node {
        depth = depth.saturating_add(1);
        node = n.next.as_deref();
    }
    depth
}

impl<K, V> SeparateChainingMap<K, V>
where
    K: Eq,
{
    /// Creates an empty table of exactly `capacity` buckets, which must already be prime.
    pub(crate) fn from_parts(capacity: usize, hash_fn: HashFn<K>) -> Self {
        Self {
            buckets: empty_buckets(capacity),
            size: 0,
            load_factor_threshold: LOAD_FACTOR_THRESHOLD,
            size_threshold: growth_threshold(capacity, LOAD_FACTOR_THRESHOLD),
            hash_fn,
        }
    }

    /// Bucket index of `key`
    #[allow(clippy::arithmetic_side_effects)]
    fn bucket_of(&self, key: &K) -> usize {
        let capacity = self.buckets.len();
        if capacity == 0 { 0 } else { (self.hash_fn)(key) % capacity }
    }

    /// Retrieve a value for a given key
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut node = self.buckets.get(self.bucket_of(key))?.as_deref();
        while let Some(n) = node {
            if n.key == *key {
                return Some(&n.value);
            }
            node = n.next.as_deref();
        }
        None
    }

    /// Get a mutable reference to a value for a given key
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.bucket_of(key);
        let mut node = self.buckets.get_mut(index)?.as_deref_mut();
        while let Some(n) = node {
            if n.key == *key {
                return Some(&mut n.value);
            }
            node = n.next.as_deref_mut();
        }
        None
    }

    /// Insert a key-value pair, appending it to the tail of its chain
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if the table needs to grow and cannot.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        if self.size >= self.size_threshold {
            debug!("[sc] passed load factor threshold, rehashing");
            self.rehash(doubled(self.size)?)?;
        }

        let index = self.bucket_of(&key);
        let Some(mut cursor) = self.buckets.get_mut(index) else {
            return Ok(None);
        };

        while let Some(node) = cursor {
            if node.key == key {
                return Ok(Some(mem::replace(&mut node.value, value)));
            }
            cursor = &mut node.next;
        }

        *cursor = Some(Box::new(Node { key, value, next: None }));
        self.size += 1;
        Ok(None)
    }

    /// Removes a key-value pair, unlinking its node from the chain
    #[allow(clippy::arithmetic_side_effects)]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.bucket_of(key);
        let mut cursor = self.buckets.get_mut(index)?;

        while cursor.as_ref().is_some_and(|node| node.key != *key) {
            cursor = &mut cursor.as_mut()?.next;
        }

        let mut node = cursor.take()?;
        *cursor = node.next.take();
        self.size -= 1;
        Some(node.value)
    }

    /// Rebuilds the table with at least `size` buckets.
    ///
    /// Nodes are relinked into the new buckets rather than reallocated.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime capacity that large fits in a
    /// `usize`. The table is unchanged in that case.
    pub fn rehash(&mut self, size: usize) -> Result<(), TableError> {
        let capacity = resize_target(size, self.size, self.load_factor_threshold)?;
        let old = mem::replace(&mut self.buckets, empty_buckets(capacity));
        self.size_threshold = growth_threshold(capacity, self.load_factor_threshold);
        self.size = 0;

        for mut head in old {
            while let Some(mut node) = head {
                head = node.next.take();
                self.link(node);
            }
        }

        debug!("[sc] rehashed to {capacity} buckets");
        Ok(())
    }

    /// Pushes a detached node whose key is known to be absent onto the head of its chain
    #[allow(clippy::arithmetic_side_effects)]
    fn link(&mut self, mut node: Box<Node<K, V>>) {
        let index = self.bucket_of(&node.key);
        if let Some(bucket) = self.buckets.get_mut(index) {
            node.next = bucket.take();
            *bucket = Some(node);
            self.size += 1;
        }
    }

    /// Point-in-time diagnostics, including the longest chain
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn stats(&self) -> TableStats {
        TableStats {
            name: "sc",
            capacity: self.buckets.len(),
            len: self.size,
            load_factor: self.load_factor(),
            max_bucket_depth: Some(self.max_bucket_depth()),
            occupied_slots: self.buckets.iter().filter(|b| b.is_some()).count(),
            tombstones: 0,
            memory_bytes: size_of::<Self>()
                + self.buckets.len() * size_of::<Link<K, V>>()
                + self.size * size_of::<Node<K, V>>(),
        }
    }
}

impl<K, V> SeparateChainingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    /// Creates an empty table keyed by the std `DefaultHasher`
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_CAPACITY, Box::new(default_hash::<K>))
    }

    /// Creates an empty table of at least `capacity` buckets keyed by the std
    /// `DefaultHasher`
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime that large fits in a `usize`.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        TableBuilder::new(capacity).primary(default_hash::<K>).build_chaining()
    }
}

impl<K, V> Default for SeparateChainingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashTable<K, V> for SeparateChainingMap<K, V>
where
    K: Eq,
{
    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn put(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        Self::put(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn rehash(&mut self, size: usize) -> Result<(), TableError> {
        Self::rehash(self, size)
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn stats(&self) -> TableStats {
        Self::stats(self)
    }
}

/// `capacity` empty buckets
fn empty_buckets<K, V>(capacity: usize) -> Vec<Link<K, V>> {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, || None);
    buckets
}

/// Iterator over the key-value pairs of a chaining table
pub struct Iter<'a, K, V> {
    /// Buckets not visited yet
    buckets: std::slice::Iter<'a, Link<K, V>>,
    /// Next node of the current chain
    node: Option<&'a Node<K, V>>,
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("remaining_buckets", &self.buckets.len()).finish_non_exhaustive()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                return Some((&node.key, &node.value));
            }
            self.node = self.buckets.next()?.as_deref();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Table of `capacity` buckets where every key hashes to itself
    fn identity_map(capacity: usize) -> SeparateChainingMap<u64, u64> {
        TableBuilder::new(capacity)
            .primary(|k: &u64| usize::try_from(*k).unwrap())
            .build_chaining()
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = SeparateChainingMap::new();
        assert_eq!(map.put("key1".to_string(), 1), Ok(None));
        assert_eq!(map.put("key2".to_string(), 2), Ok(None));

        assert_eq!(map.get(&"key1".to_string()), Some(&1));
        assert_eq!(map.get(&"key2".to_string()), Some(&2));
        assert_eq!(map.get(&"key3".to_string()), None);
    }

    #[test]
    fn test_update() {
        let mut map = identity_map(5);
        assert_eq!(map.put(1, 1), Ok(None));
        assert_eq!(map.put(1, 10), Ok(Some(1)));
        assert_eq!(map.get(&1), Some(&10));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_collisions_share_a_chain() {
        let mut map = identity_map(7);
        for key in [1, 8, 15] {
            map.put(key, key).unwrap();
        }

        assert_eq!(map.max_bucket_depth(), 3);
        assert_eq!(map.stats().occupied_slots, 1);
        for key in [1, 8, 15] {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    #[test]
    fn test_remove_head_middle_and_tail() {
        let mut map = identity_map(7);
        for key in [1, 8, 15, 22] {
            map.put(key, key * 2).unwrap();
        }

        assert_eq!(map.remove(&8), Some(16));
        assert_eq!(map.remove(&1), Some(2));
        assert_eq!(map.remove(&22), Some(44));
        assert_eq!(map.remove(&22), None);
        assert_eq!(map.get(&15), Some(&30));
        assert_eq!(map.len(), 1);
        assert_eq!(map.max_bucket_depth(), 1);
    }

    #[test]
    fn test_one_resize_to_next_prime() {
        let mut map = identity_map(5);
        for key in 0..5 {
            map.put(key, key).unwrap();
        }
        assert_eq!(map.capacity(), 5);

        map.put(5, 5).unwrap();
        assert_eq!(map.capacity(), 11);
        assert_eq!(map.len(), 6);
        for key in 0..6 {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    /// Table with one bucket holding a chain of `depth` nodes, built without walking it
    fn deep_chain(depth: u64) -> SeparateChainingMap<u64, u64> {
        let mut map: SeparateChainingMap<u64, u64> =
            TableBuilder::new(2).primary(|_: &u64| 0).build_chaining().unwrap();
        let mut head = None;
        for key in 0..depth {
            head = Some(Box::new(Node { key, value: key, next: head }));
        }
        map.buckets[0] = head;
        map.size = usize::try_from(depth).unwrap();
        map
    }

    #[test]
    fn test_clear_long_chain() {
        // a recursive drop would overflow the stack at this depth
        let mut map = deep_chain(1_000_000);
        assert_eq!(map.max_bucket_depth(), 1_000_000);
        assert_eq!(map.get(&0), Some(&0));

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.capacity(), 2);
    }

    #[test]
    fn test_drop_long_chain() {
        drop(deep_chain(1_000_000));
    }

    #[test]
    fn test_rehash_relinks_long_chain() {
        let mut map = deep_chain(10_000);
        map.rehash(20_000).unwrap();

        assert_eq!(map.capacity(), 20_011);
        assert_eq!(map.len(), 10_000);
        assert_eq!(map.max_bucket_depth(), 10_000);
        assert_eq!(map.get(&9_999), Some(&9_999));
    }

    #[test]
    fn test_rehash_keeps_every_pair() {
        let mut map = identity_map(7);
        for key in 0..50 {
            map.put(key, key + 100).unwrap();
        }
        map.rehash(3).unwrap();

        // 50 entries need at least 51 buckets at a load factor of 1
        assert_eq!(map.capacity(), 53);
        let mut pairs: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, (0..50).map(|k| (k, k + 100)).collect::<Vec<_>>());
    }

    #[test]
    fn test_iter() {
        let mut map = identity_map(7);
        for key in 0..6 {
            map.put(key, key).unwrap();
        }

        let mut count = 0;
        let mut sum = 0;
        for (_, &value) in map.iter() {
            count += 1;
            sum += value;
        }

        assert_eq!(count, 6);
        assert_eq!(sum, 15);
    }

    #[test]
    fn test_get_mut() {
        let mut map = identity_map(7);
        map.put(1, 1).unwrap();

        if let Some(value) = map.get_mut(&1) {
            *value += 10;
        }

        assert_eq!(map.get(&1), Some(&11));
    }
}
