//! Prime sizing for every table in the crate.
//!
//! Table capacities are kept prime so that modular reduction spreads keys over all
//! slots and so that double hashing with any non-zero step visits every slot.

/// Returns true if `n` is prime.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn is_prime(n: usize) -> bool {
    if n < 3 {
        return n == 2;
    }
    if n % 2 == 0 {
        return false;
    }

    // `i <= n / i` instead of `i * i <= n` keeps the bound from overflowing
    let mut i: usize = 3;
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }

    true
}

/// Returns the smallest prime that is greater than or equal to `n`.
///
/// Returns `None` when no such prime is representable as a `usize`.
#[must_use]
pub fn next_prime(n: usize) -> Option<usize> {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_primes() {
        let primes: Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(0), Some(2));
        assert_eq!(next_prime(1), Some(2));
        assert_eq!(next_prime(2), Some(2));
        assert_eq!(next_prime(10), Some(11));
        assert_eq!(next_prime(14), Some(17));
        assert_eq!(next_prime(20011), Some(20011));
        assert_eq!(next_prime(27362), Some(27367));
    }

    #[test]
    fn test_next_prime_overflow() {
        // usize::MAX is odd but not prime on 32 or 64 bit targets, and nothing above it exists
        assert!(!is_prime(usize::MAX));
        assert_eq!(next_prime(usize::MAX), None);
    }

    #[test]
    fn test_large_prime() {
        // 2^31 - 1
        assert!(is_prime(2_147_483_647));
        assert!(!is_prime(2_147_483_649));
    }

    proptest! {
        #[test]
        fn next_prime_is_prime_and_not_smaller(n in 0usize..200_000) {
            let p = next_prime(n).unwrap();
            prop_assert!(p >= n);
            prop_assert!(is_prime(p));
            prop_assert!((n.max(2)..p).all(|m| !is_prime(m)));
        }
    }
}
