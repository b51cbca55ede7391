//! Quadratic probing: the offset from the home slot grows as the square of the attempt.

use std::hash::Hash;

use crate::{
    error::TableError,
    hashers::default_hash,
    map::{DEFAULT_CAPACITY, TableBuilder},
    open_addressing::{OpenAddressingMap, ProbeStrategy},
    probe::ProbeKind,
};

/// Probe policy `index_i = (home + i²) mod capacity`
#[derive(Debug, Clone, Copy, Default)]
pub struct Quadratic;

impl<K> ProbeStrategy<K> for Quadratic {
    const NAME: &'static str = "qp";

    fn kind(&self, _key: &K) -> ProbeKind {
        ProbeKind::Quadratic
    }
}

/// Open addressing table with quadratic probing.
///
/// With a prime capacity a probe sequence only reaches about half of the slots. When an
/// insert finds none of them free, the table grows and the insert is retried.
pub type QuadraticProbingMap<K, V> = OpenAddressingMap<K, V, Quadratic>;

impl<K, V> QuadraticProbingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    /// Creates an empty table keyed by the std `DefaultHasher`
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_CAPACITY, Box::new(default_hash::<K>), Quadratic)
    }

    /// Creates an empty table of at least `capacity` slots keyed by the std `DefaultHasher`
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityOverflow`] if no prime that large fits in a `usize`.
    pub fn with_capacity(capacity: usize) -> Result<Self, TableError> {
        TableBuilder::new(capacity).primary(default_hash::<K>).build_quadratic()
    }
}

impl<K, V> Default for QuadraticProbingMap<K, V>
where
    K: Eq + Hash + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
