//! Double hashing: the probe step comes from a second, independent hash function.

use std::{fmt, hash::Hash};

use crate::{
    error::TableError,
    hashers::{default_hash, default_step},
    map::{DEFAULT_CAPACITY, StepFn, TableBuilder},
    open_addressing::{OpenAddressingMap, ProbeStrategy},
    probe::ProbeKind,
};

/// Probe policy `index_i = (home + i * step(key)) mod capacity`
///
/// The step function returns a `NonZeroUsize`, so a walk can never stay on its home
/// slot. Because capacities are prime, every step that is not a multiple of the
/// capacity visits all slots.
pub struct DoubleHash<K> {
    /// Second hash function
    step: StepFn<K>,
}

impl<K> DoubleHash<K> {
    /// Wraps a step function
    #[must_use]
    pub fn new(step: StepFn<K>) -> Self {
        Self { step }
    }
}

impl<K> fmt::Debug for DoubleHash<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleHash").finish_non_exhaustive()
    }
}

impl<K> ProbeStrategy<K> for DoubleHash<K> {
    const NAME: &'static str = "dh";

    fn kind(&self, key: &K) -> ProbeKind {
        ProbeKind::Double { step: (self.step)(key).get() }
    }
}

/// Open addressing table with double hashing.
pub type DoubleHashingMap<K, V> = OpenAddressingMap<K, V, DoubleHash<K>>;

impl<K, V> DoubleHashingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    /// Creates an empty table keyed by the std `DefaultHasher`, with a salted second hash
    /// as the step
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            DEFAULT_CAPACITY,
            Box::new(default_hash::<K>),
            DoubleHash::new(Box::new(default_step::<K>)),
        )
    }

    /// Creates an empty table of at least `capacity` slots keyed like [`new`](Self::new)
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime that large fits in a `usize`.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        TableBuilder::new(capacity)
            .primary(default_hash::<K>)
            .step(default_step::<K>)
            .build_double_hashing()
    }
}

impl<K, V> Default for DoubleHashingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
