//! The map contract shared by every collision-resolution strategy.

use std::{
    collections::HashMap,
    fmt,
    hash::{BuildHasher, Hash},
    num::NonZeroUsize,
};

use crate::{
    DoubleHashingMap, LinearProbingMap, QuadraticProbingMap, SeparateChainingMap, error::TableError,
    prime::next_prime,
};

/// Primary hash function: maps a key to its home slot before reduction by the capacity.
pub type HashFn<K> = Box<dyn Fn(&K) -> usize>;

/// Step function for double hashing. A zero step cannot be expressed.
pub type StepFn<K> = Box<dyn Fn(&K) -> NonZeroUsize>;

/// Capacity used by the `new()` constructors.
pub(crate) const DEFAULT_CAPACITY: usize = 17;

/// Operations every table in this crate supports.
///
/// Enumeration order of [`keys`](HashTable::keys) and [`values`](HashTable::values) is
/// unspecified and does not follow insertion order.
pub trait HashTable<K, V> {
    /// Returns the value paired with `key`.
    fn get(&self, key: &K) -> Option<&V>;

    /// Inserts or overwrites a pair and returns the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] when the insert needs the table to grow
    /// past what a `usize` can address. The table is left unchanged in that case.
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, TableError>;

    /// Removes a pair by its key and returns its value.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Number of live entries
    fn size(&self) -> usize;

    /// Returns true if the table holds no entries
    fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Drops every entry. Capacity is unchanged.
    fn clear(&mut self);

    /// Rebuilds the table with a capacity of at least `size`, rounded up to a prime.
    ///
    /// The capacity is also raised far enough that the live entries sit below the
    /// growth threshold.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no such prime fits in a `usize`.
    fn rehash(&mut self, size: usize) -> Result<(), TableError>;

    /// All stored keys
    fn keys(&self) -> Vec<K>
    where
        K: Clone;

    /// All stored values
    fn values(&self) -> Vec<V>
    where
        V: Clone;

    /// Number of slots currently allocated
    fn capacity(&self) -> usize;

    /// Point-in-time diagnostics for the table.
    fn stats(&self) -> TableStats;

    /// Live entries per slot.
    #[allow(clippy::cast_precision_loss)]
    fn load_factor(&self) -> f64 {
        let capacity = self.capacity();
        if capacity == 0 { 0.0 } else { self.size() as f64 / capacity as f64 }
    }

    /// Returns true if the table contains `key`
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

/// Diagnostics recorded by the comparison driver after the insert phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStats {
    /// Short strategy tag (`sc`, `lp`, `qp`, `dh` or `stl`)
    pub name: &'static str,
    /// Number of slots
    pub capacity: usize,
    /// Number of live entries
    pub len: usize,
    /// `len / capacity`
    pub load_factor: f64,
    /// Longest chain, for chaining tables only
    pub max_bucket_depth: Option<usize>,
    /// Slots holding at least one live entry
    pub occupied_slots: usize,
    /// Slots vacated by a removal and not reused yet
    pub tombstones: usize,
    /// Rough size of the table and its entries in bytes
    pub memory_bytes: usize,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] map info:", self.name)?;
        writeln!(f, "max size: {}", self.capacity)?;
        if let Some(depth) = self.max_bucket_depth {
            writeln!(f, "max depth: {depth} in same bucket")?;
        }
        writeln!(f, "size: {}", self.len)?;
        writeln!(f, "occupied slots: {}", self.occupied_slots)?;
        if self.tombstones > 0 {
            writeln!(f, "tombstones: {}", self.tombstones)?;
        }
        writeln!(f, "load factor: {:.4}", self.load_factor)?;
        write!(f, "size in memory: {} B", self.memory_bytes)
    }
}

/// Number of entries a table of `capacity` slots holds before it grows.
///
/// `load_percent` is the load factor threshold as a percentage.
#[allow(clippy::arithmetic_side_effects)]
pub(crate) fn growth_threshold(capacity: usize, load_percent: usize) -> usize {
    capacity.checked_mul(load_percent).map_or(capacity / 100 * load_percent, |c| c / 100)
}

/// Picks the capacity for a resize asked to hold `requested` slots while `count` entries
/// are live.
///
/// The result is prime and large enough that `count` sits strictly below its growth
/// threshold, so reinsertion never triggers another resize.
pub(crate) fn resize_target(
    requested: usize,
    count: usize,
    load_percent: usize,
) -> Result<usize, TableError> {
    let overflow = TableError::CapacityOverflow { requested };

    // smallest capacity with `capacity * load_percent / 100 > count`
    let minimum = count
        .checked_add(1)
        .and_then(|c| c.checked_mul(100))
        .map(|c| c.div_ceil(load_percent.max(1)))
        .ok_or_else(|| overflow.clone())?;

    next_prime(requested.max(minimum)).ok_or(overflow)
}

/// Size the automatic resize asks for: twice the live count.
pub(crate) fn doubled(count: usize) -> Result<usize, TableError> {
    count.checked_mul(2).ok_or(TableError::CapacityOverflow { requested: usize::MAX })
}

/// Builds any of the four tables from user supplied hash functions.
///
/// ```rust
/// use hashlab::{HashTable, TableBuilder, hashers};
///
/// let mut map = TableBuilder::new(7)
///     .primary(|id: &u64| hashers::mod_hash(*id, 7))
///     .step(|id: &u64| hashers::step(hashers::mod_hash(*id, 5)))
///     .build_double_hashing()
///     .unwrap();
///
/// map.put(42, "answer").unwrap();
/// assert_eq!(map.get(&42), Some(&"answer"));
/// ```
pub struct TableBuilder<K> {
    /// Requested capacity, rounded up to a prime on build
    capacity: usize,
    /// Function giving the home slot
    primary: Option<HashFn<K>>,
    /// Function giving the double hashing step
    step: Option<StepFn<K>>,
}

impl<K> fmt::Debug for TableBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBuilder")
            .field("capacity", &self.capacity)
            .field("primary", &self.primary.is_some())
            .field("step", &self.step.is_some())
            .finish()
    }
}

impl<K: Eq> TableBuilder<K> {
    /// Starts a builder for a table of at least `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, primary: None, step: None }
    }

    /// Sets the primary hash function.
    #[must_use]
    pub fn primary(mut self, hash_fn: impl Fn(&K) -> usize + 'static) -> Self {
        self.primary = Some(Box::new(hash_fn));
        self
    }

    /// Sets the step function used by double hashing.
    #[must_use]
    pub fn step(mut self, step_fn: impl Fn(&K) -> NonZeroUsize + 'static) -> Self {
        self.step = Some(Box::new(step_fn));
        self
    }

    /// Rounds the capacity up to a prime and takes the primary function.
    fn prepare(&mut self) -> Result<(usize, HashFn<K>), TableError> {
        let primary = self.primary.take().ok_or(TableError::MissingHashFn { which: "primary" })?;
        let capacity = next_prime(self.capacity)
            .ok_or(TableError::CapacityOverflow { requested: self.capacity })?;
        Ok((capacity, primary))
    }

    /// Builds a separate chaining table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingHashFn`] if no primary function was set.
    pub fn build_chaining<V>(mut self) -> Result<SeparateChainingMap<K, V>, TableError> {
        let (capacity, primary) = self.prepare()?;
        Ok(SeparateChainingMap::from_parts(capacity, primary))
    }

    /// Builds a linear probing table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingHashFn`] if no primary function was set.
    pub fn build_linear<V>(mut self) -> Result<LinearProbingMap<K, V>, TableError> {
        let (capacity, primary) = self.prepare()?;
        Ok(LinearProbingMap::from_parts(capacity, primary, crate::linear::Linear))
    }

    /// Builds a quadratic probing table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingHashFn`] if no primary function was set.
    pub fn build_quadratic<V>(mut self) -> Result<QuadraticProbingMap<K, V>, TableError> {
        let (capacity, primary) = self.prepare()?;
        Ok(QuadraticProbingMap::from_parts(capacity, primary, crate::quadratic::Quadratic))
    }

    /// Builds a double hashing table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingHashFn`] if either the primary or the step function
    /// was not set.
    pub fn build_double_hashing<V>(mut self) -> Result<DoubleHashingMap<K, V>, TableError> {
        let step = self.step.take().ok_or(TableError::MissingHashFn { which: "step" })?;
        let (capacity, primary) = self.prepare()?;
        Ok(DoubleHashingMap::from_parts(
            capacity,
            primary,
            crate::double_hashing::DoubleHash::new(step),
        ))
    }
}

/// The std library map, used as the reference in comparisons.
impl<K, V, S> HashTable<K, V> for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        Self::get(self, key)
    }

    fn put(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        Ok(self.insert(key, value))
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        Self::remove(self, key)
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn rehash(&mut self, size: usize) -> Result<(), TableError> {
        self.try_reserve(size.saturating_sub(self.len()))
            .map_err(|_| TableError::CapacityOverflow { requested: size })
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        Self::keys(self).cloned().collect()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        Self::values(self).cloned().collect()
    }

    fn capacity(&self) -> usize {
        Self::capacity(self)
    }

    #[allow(clippy::arithmetic_side_effects)]
    fn stats(&self) -> TableStats {
        TableStats {
            name: "stl",
            capacity: Self::capacity(self),
            len: self.len(),
            load_factor: HashTable::load_factor(self),
            max_bucket_depth: None,
            occupied_slots: self.len(),
            tombstones: 0,
            memory_bytes: size_of::<Self>() + Self::capacity(self) * (size_of::<(K, V)>() + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_threshold() {
        assert_eq!(growth_threshold(7, 75), 5);
        assert_eq!(growth_threshold(5, 100), 5);
        assert_eq!(growth_threshold(2, 75), 1);
        assert_eq!(growth_threshold(usize::MAX, 100), usize::MAX / 100 * 100);
    }

    #[test]
    fn test_resize_target() {
        assert_eq!(resize_target(10, 5, 100), Ok(11));
        // a request below the live count is raised until the entries fit under 75%
        assert_eq!(resize_target(20, 20, 75), Ok(29));
        assert_eq!(resize_target(0, 0, 75), Ok(2));
        assert_eq!(resize_target(2, 1, 75), Ok(3));
    }

    #[test]
    fn test_resize_target_overflow() {
        assert_eq!(
            resize_target(usize::MAX, 3, 75),
            Err(TableError::CapacityOverflow { requested: usize::MAX })
        );
        assert_eq!(
            resize_target(4, usize::MAX, 75),
            Err(TableError::CapacityOverflow { requested: 4 })
        );
        assert!(doubled(usize::MAX / 2 + 1).is_err());
        assert_eq!(doubled(3), Ok(6));
    }

    #[test]
    fn test_builder_requires_primary() {
        let err = TableBuilder::<u64>::new(7).build_chaining::<u32>().unwrap_err();
        assert_eq!(err, TableError::MissingHashFn { which: "primary" });

        let err = TableBuilder::<u64>::new(7).build_linear::<u32>().unwrap_err();
        assert_eq!(err, TableError::MissingHashFn { which: "primary" });

        let err = TableBuilder::<u64>::new(7).build_quadratic::<u32>().unwrap_err();
        assert_eq!(err, TableError::MissingHashFn { which: "primary" });
    }

    #[test]
    fn test_builder_requires_step_for_double_hashing() {
        let err = TableBuilder::new(7)
            .primary(|k: &u64| usize::try_from(*k).unwrap())
            .build_double_hashing::<u32>()
            .unwrap_err();
        assert_eq!(err, TableError::MissingHashFn { which: "step" });
    }

    #[test]
    fn test_builder_rounds_capacity_to_prime() {
        let map = TableBuilder::new(20)
            .primary(|k: &u64| usize::try_from(*k).unwrap())
            .build_chaining::<u32>()
            .unwrap();
        assert_eq!(HashTable::capacity(&map), 23);
    }

    #[test]
    fn test_std_map_contract() {
        let mut map: HashMap<u64, &str> = HashMap::new();
        assert_eq!(HashTable::put(&mut map, 1, "a"), Ok(None));
        assert_eq!(HashTable::put(&mut map, 1, "b"), Ok(Some("a")));
        assert_eq!(HashTable::get(&map, &1), Some(&"b"));
        assert_eq!(HashTable::size(&map), 1);
        assert_eq!(HashTable::remove(&mut map, &1), Some("b"));
        assert!(HashTable::empty(&map));
        assert_eq!(map.stats().name, "stl");
    }
}
