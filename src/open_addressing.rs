use std::{fmt, mem};

use log::debug;

use crate::{
    error::TableError,
    map::{HashFn, HashTable, TableStats, doubled, growth_threshold, resize_target},
    probe::{ProbeKind, ProbeSeq},
};

/// Load factor threshold of every open addressing table, as a percentage
const LOAD_FACTOR_THRESHOLD: usize = 75;

/// Collision resolution policy of an open addressing table.
///
/// Implemented by [`Linear`](crate::linear::Linear),
/// [`Quadratic`](crate::quadratic::Quadratic) and
/// [`DoubleHash`](crate::double_hashing::DoubleHash).
pub trait ProbeStrategy<K> {
    /// Short tag used in logs and stats
    const NAME: &'static str;

    /// Probe offsets to use for `key`.
    fn kind(&self, key: &K) -> ProbeKind;
}

/// One slot of the table.
#[derive(Debug, Clone)]
enum Slot<K, V> {
    /// Never used since the last rebuild; ends every probe walk
    Empty,
    /// Vacated by a removal; probe walks continue past it
    Tombstone,
    /// Holds a live pair
    Occupied(K, V),
}

impl<K, V> Slot<K, V> {
    /// Takes the pair out of an occupied slot
    fn into_entry(self) -> Option<(K, V)> {
        match self {
            Self::Occupied(k, v) => Some((k, v)),
            Self::Empty | Self::Tombstone => None,
        }
    }
}

/// Where `put` should write a key
enum Target {
    /// The key is stored at this index
    Existing(usize),
    /// The key is absent and this slot is free for it
    Vacant(usize),
    /// The key is absent and its probe sequence has no free slot
    Full,
}

/// A hash table that resolves collisions by probing other slots of one array.
///
/// The probe sequence comes from `P`; see [`LinearProbingMap`](crate::LinearProbingMap),
/// [`QuadraticProbingMap`](crate::QuadraticProbingMap) and
/// [`DoubleHashingMap`](crate::DoubleHashingMap). Removal leaves a tombstone so that keys
/// stored further along a probe sequence stay reachable. Tombstones count toward the
/// load factor and are dropped on every rebuild.
pub struct OpenAddressingMap<K, V, P> {
    /// The slots, always a prime number of them
    slots: Vec<Slot<K, V>>,
    /// Number of occupied slots
    size: usize,
    /// Number of tombstones
    tombstones: usize,
    /// Threshold for load factor before resizing - stored as percentage (0-100)
    load_factor_threshold: usize,
    /// `size + tombstones` at which the next insert rebuilds the table
    size_threshold: usize,
    /// Gives the home slot of a key
    hash_fn: HashFn<K>,
    /// Gives the rest of the probe sequence
    probe: P,
}

impl<K, V, P> fmt::Debug for OpenAddressingMap<K, V, P>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAddressingMap")
            .field("capacity", &self.slots.len())
            .field("size", &self.size)
            .field("tombstones", &self.tombstones)
            .field("probe", &self.probe)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K, V, P> OpenAddressingMap<K, V, P> {
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

    /// Returns the number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the current load factor, tombstones excluded
    #[must_use]
    #[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
    pub fn load_factor(&self) -> f64 {
        if self.slots.is_empty() { 0.0 } else { self.size as f64 / self.slots.len() as f64 }
    }

    /// Returns an iterator over the key-value pairs
    #[must_use]
    #[allow(clippy::iter_without_into_iter)]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { slots: self.slots.iter() }
    }
}

impl<K, V, P> OpenAddressingMap<K, V, P>
where
    K: Eq,
    P: ProbeStrategy<K>,
{
    /// Creates an empty table of exactly `capacity` slots, which must already be prime.
    pub(crate) fn from_parts(capacity: usize, hash_fn: HashFn<K>, probe: P) -> Self {
        Self {
            slots: empty_slots(capacity),
            size: 0,
            tombstones: 0,
            load_factor_threshold: LOAD_FACTOR_THRESHOLD,
            size_threshold: growth_threshold(capacity, LOAD_FACTOR_THRESHOLD),
            hash_fn,
            probe,
        }
    }

    /// Probe sequence of `key` in the current table
    fn probe_seq(&self, key: &K) -> ProbeSeq {
        ProbeSeq::new((self.hash_fn)(key), self.slots.len(), self.probe.kind(key))
    }

    /// Index of the slot holding `key`.
    ///
    /// Stops at the first empty slot. Walks past tombstones.
    #[must_use]
    pub fn slot_of(&self, key: &K) -> Option<usize> {
        for index in self.probe_seq(key) {
            match self.slots.get(index) {
                None | Some(Slot::Empty) => return None,
                Some(Slot::Occupied(k, _)) if k == key => return Some(index),
                Some(Slot::Occupied(..) | Slot::Tombstone) => {}
            }
        }
        None
    }

    /// Number of slots a lookup of `key` inspects, at most `capacity + 1`.
    #[must_use]
    pub fn probe_count(&self, key: &K) -> usize {
        let mut probes: usize = 0;
        for index in self.probe_seq(key) {
            probes = probes.saturating_add(1);
            match self.slots.get(index) {
                None | Some(Slot::Empty) => break,
                Some(Slot::Occupied(k, _)) if k == key => break,
                Some(Slot::Occupied(..) | Slot::Tombstone) => {}
            }
        }
        probes
    }

    /// Finds where `put` should write `key`: its current slot, the first tombstone of
    /// its probe sequence, or the first empty slot.
    fn insert_target(&self, key: &K) -> Target {
        let mut first_tombstone = None;
        for index in self.probe_seq(key) {
            match self.slots.get(index) {
                None => break,
                Some(Slot::Empty) => return Target::Vacant(first_tombstone.unwrap_or(index)),
                Some(Slot::Tombstone) => {
                    first_tombstone = first_tombstone.or(Some(index));
                }
                Some(Slot::Occupied(k, _)) if k == key => return Target::Existing(index),
                Some(Slot::Occupied(..)) => {}
            }
        }
        first_tombstone.map_or(Target::Full, Target::Vacant)
    }

    /// Retrieve a value for a given key
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.slots.get(self.slot_of(key)?) {
            Some(Slot::Occupied(_, v)) => Some(v),
            _ => None,
        }
    }

    /// Get a mutable reference to a value for a given key
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.slot_of(key)?;
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(_, v)) => Some(v),
            _ => None,
        }
    }

    /// Insert a key-value pair into the hash table
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if the table needs to grow and cannot.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        if self.size + self.tombstones >= self.size_threshold {
            debug!("[{}] passed load factor threshold, rehashing", P::NAME);
            self.rehash(doubled(self.size)?)?;
        }

        loop {
            match self.insert_target(&key) {
                Target::Existing(index) => {
                    if let Some(Slot::Occupied(_, v)) = self.slots.get_mut(index) {
                        return Ok(Some(mem::replace(v, value)));
                    }
                    return Ok(None);
                }
                Target::Vacant(index) => {
                    if let Some(slot) = self.slots.get_mut(index) {
                        if matches!(slot, Slot::Tombstone) {
                            self.tombstones -= 1;
                        }
                        *slot = Slot::Occupied(key, value);
                        self.size += 1;
                    }
                    return Ok(None);
                }
                Target::Full => {
                    // only reachable when the probe sequence skips free slots (quadratic)
                    debug!("[{}] no free slot on the probe sequence, growing", P::NAME);
                    self.rehash(doubled(self.slots.len())?)?;
                }
            }
        }
    }

    /// Removes a key-value pair, leaving a tombstone in its slot
    #[allow(clippy::arithmetic_side_effects)]
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.slot_of(key)?;
        let slot = self.slots.get_mut(index)?;
        let (_, value) = mem::replace(slot, Slot::Tombstone).into_entry()?;
        self.size -= 1;
        self.tombstones += 1;
        Some(value)
    }

    /// Clears the hash map, removing all key-value pairs and tombstones
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.size = 0;
        self.tombstones = 0;
    }

    /// Rebuilds the table with at least `size` slots.
    ///
    /// Grows further when some key finds no free slot on its probe sequence.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime capacity that large fits in a
    /// `usize`. The table is unchanged in that case.
    pub fn rehash(&mut self, size: usize) -> Result<(), TableError> {
        let mut capacity = resize_target(size, self.size, self.load_factor_threshold)?;
        while !self.rebuild(capacity) {
            debug!("[{}] some keys found no free slot in {} slots, growing", P::NAME, capacity);
            capacity = resize_target(doubled(capacity)?, self.size, self.load_factor_threshold)?;
        }
        debug!("[{}] rehashed to {} slots", P::NAME, capacity);
        Ok(())
    }

    /// Moves every pair into `capacity` empty slots, dropping tombstones.
    ///
    /// If a pair finds no empty slot on its probe sequence, every moved pair goes back to
    /// its old slot, the table is left exactly as it was and `false` is returned.
    fn rebuild(&mut self, capacity: usize) -> bool {
        let mut old = mem::replace(&mut self.slots, empty_slots(capacity));
        let saved = (self.size, self.tombstones, self.size_threshold);
        self.size = 0;
        self.tombstones = 0;
        self.size_threshold = growth_threshold(capacity, self.load_factor_threshold);

        // (old index, new index) of every moved pair
        let mut moved = Vec::with_capacity(saved.0);
        let mut stuck = None;
        for from in 0..old.len() {
            let Some(slot) = old.get_mut(from) else { break };
            if !matches!(slot, Slot::Occupied(..)) {
                continue;
            }
            let Some((key, value)) = mem::replace(slot, Slot::Empty).into_entry() else {
                continue;
            };
            match self.place(key, value) {
                Ok(to) => moved.push((from, to)),
                Err(entry) => {
                    stuck = Some((from, entry));
                    break;
                }
            }
        }

        let Some((from, (key, value))) = stuck else {
            return true;
        };
        if let Some(slot) = old.get_mut(from) {
            *slot = Slot::Occupied(key, value);
        }
        for (from, to) in moved {
            if let (Some(dst), Some(src)) = (old.get_mut(from), self.slots.get_mut(to)) {
                mem::swap(dst, src);
            }
        }
        self.slots = old;
        (self.size, self.tombstones, self.size_threshold) = saved;
        false
    }

    /// Stores a pair known to be absent into the first empty slot of its probe sequence
    /// and returns that slot.
    ///
    /// Gives the pair back if the sequence has no empty slot.
    #[allow(clippy::arithmetic_side_effects)]
    fn place(&mut self, key: K, value: V) -> Result<usize, (K, V)> {
        let target = self
            .probe_seq(&key)
            .find(|&index| matches!(self.slots.get(index), Some(Slot::Empty)));

        match target.and_then(|index| Some((index, self.slots.get_mut(index)?))) {
            Some((index, slot)) => {
                *slot = Slot::Occupied(key, value);
                self.size += 1;
                Ok(index)
            }
            None => Err((key, value)),
        }
    }

    /// Point-in-time diagnostics
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn stats(&self) -> TableStats {
        TableStats {
            name: P::NAME,
            capacity: self.slots.len(),
            len: self.size,
            load_factor: self.load_factor(),
            max_bucket_depth: None,
            occupied_slots: self.size,
            tombstones: self.tombstones,
            memory_bytes: size_of::<Self>() + self.slots.len() * size_of::<Slot<K, V>>(),
        }
    }
}

impl<K, V, P> HashTable<K, V> for OpenAddressingMap<K, V, P>
where
    K: Eq,
    P: ProbeStrategy<K>,
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
        self.slots.len()
    }

    fn stats(&self) -> TableStats {
        Self::stats(self)
    }
}

/// `capacity` empty slots
fn empty_slots<K, V>(capacity: usize) -> Vec<Slot<K, V>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}

/// Iterator over the key-value pairs of an open addressing table
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    /// Remaining slots
    slots: std::slice::Iter<'a, Slot<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((k, v)),
            Slot::Empty | Slot::Tombstone => None,
        })
    }
}
