//! Probe sequences for the open addressing tables.

/// How the offset from the home slot grows with each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// `home + i`
    Linear,
    /// `home + i²`
    Quadratic,
    /// `home + i * step`
    Double {
        /// Step already reduced by the capacity, never zero
        step: usize,
    },
}

/// Bounded iterator over the slot indices a key may occupy.
///
/// Yields `home` first and then one index per attempt. It stops after `capacity + 1`
/// indices so that every walk over a table terminates, whatever the table holds.
#[derive(Debug, Clone)]
pub struct ProbeSeq {
    /// `primary(key) mod capacity`
    home: usize,
    /// Number of slots in the table being probed
    capacity: usize,
    /// Next attempt number
    attempt: usize,
    /// Offset generator
    kind: ProbeKind,
}

impl ProbeSeq {
    /// Creates the probe sequence for a key whose primary hash is `hash`.
    ///
    /// An empty table (capacity zero) yields nothing.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn new(hash: usize, capacity: usize, kind: ProbeKind) -> Self {
        let home = if capacity == 0 { 0 } else { hash % capacity };
        let kind = match kind {
            ProbeKind::Double { step } if capacity > 0 => {
                // a step that is a multiple of the capacity would pin the walk to `home`
                let step = step % capacity;
                ProbeKind::Double { step: if step == 0 { 1 } else { step } }
            }
            other => other,
        };
        Self { home, capacity, attempt: 0, kind }
    }

    /// Maximum number of indices any sequence over `capacity` slots yields.
    #[must_use]
    pub fn bound(capacity: usize) -> usize {
        if capacity == 0 { 0 } else { capacity.saturating_add(1) }
    }

    /// Offset of attempt `i` from `home`, reduced by the capacity.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    fn offset(&self, i: usize) -> usize {
        let c = self.capacity as u128;
        let i = i as u128 % c;
        let offset = match self.kind {
            ProbeKind::Linear => i,
            ProbeKind::Quadratic => i * i % c,
            ProbeKind::Double { step } => i * step as u128 % c,
        };
        // reduced below the capacity, which is a usize
        offset as usize
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.attempt >= Self::bound(self.capacity) {
            return None;
        }

        let offset = self.offset(self.attempt);
        self.attempt += 1;

        // both terms are below the capacity, so the sum fits in a u128 and the result in a usize
        let index = (self.home as u128 + offset as u128) % self.capacity as u128;
        Some(index as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = Self::bound(self.capacity).saturating_sub(self.attempt);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ProbeSeq {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prime::next_prime;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_linear_sequence_wraps() {
        let seq: Vec<usize> = ProbeSeq::new(5, 7, ProbeKind::Linear).collect();
        assert_eq!(seq, vec![5, 6, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_quadratic_sequence() {
        let seq: Vec<usize> = ProbeSeq::new(1, 7, ProbeKind::Quadratic).take(5).collect();
        // 1 + 0, 1 + 1, 1 + 4, 1 + 9, 1 + 16
        assert_eq!(seq, vec![1, 2, 5, 3, 3]);
    }

    #[test]
    fn test_double_sequence() {
        let seq: Vec<usize> = ProbeSeq::new(8, 7, ProbeKind::Double { step: 3 }).take(4).collect();
        assert_eq!(seq, vec![1, 4, 0, 3]);
    }

    #[test]
    fn test_double_step_multiple_of_capacity() {
        let seq: Vec<usize> = ProbeSeq::new(0, 7, ProbeKind::Double { step: 14 }).take(3).collect();
        assert_eq!(seq, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_capacity_yields_nothing() {
        assert_eq!(ProbeSeq::new(3, 0, ProbeKind::Linear).count(), 0);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let mut seq = ProbeSeq::new(usize::MAX, usize::MAX, ProbeKind::Quadratic);
        assert_eq!(seq.next(), Some(0));
        assert_eq!(seq.next(), Some(1));
        assert_eq!(seq.next(), Some(4));
    }

    proptest! {
        #[test]
        fn sequence_is_bounded(hash in any::<usize>(), capacity in 1usize..500, step in 1usize..1000) {
            for kind in [ProbeKind::Linear, ProbeKind::Quadratic, ProbeKind::Double { step }] {
                let seq = ProbeSeq::new(hash, capacity, kind);
                prop_assert_eq!(seq.len(), capacity + 1);
                prop_assert!(seq.clone().all(|i| i < capacity));
                prop_assert_eq!(seq.count(), capacity + 1);
            }
        }

        #[test]
        fn double_hashing_visits_every_slot(hash in any::<usize>(), size in 2usize..400, step in 1usize..1000) {
            let capacity = next_prime(size).unwrap();
            let visited: HashSet<usize> =
                ProbeSeq::new(hash, capacity, ProbeKind::Double { step }).collect();
            prop_assert_eq!(visited.len(), capacity);
        }
    }
}
