//! Hash functions used to key the tables in the comparison driver.
//!
//! Every function is reduced against a modulus `m` and returns a value in `1..=m`
//! (`m - h % m`). The tables reduce again by their own capacity, so the modulus only
//! shapes the distribution. A modulus of zero is treated as one.

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    num::NonZeroUsize,
};

/// Folds `h` into `1..=m`.
#[allow(clippy::arithmetic_side_effects)]
fn fold(h: u64, m: usize) -> usize {
    let m = m.max(1);
    // `h % m < m`, so the subtraction cannot underflow and the remainder fits in a usize
    #[allow(clippy::cast_possible_truncation)]
    let rem = (h % m as u64) as usize;
    m - rem
}

/// Plain modulo hash over a numeric id.
#[must_use]
pub fn mod_hash(id: u64, m: usize) -> usize {
    fold(id, m)
}

/// Folding hash over the decimal digits of a numeric id.
///
/// Ids below one billion use [`mod_hash`]. Longer ids are cut into two chunks (three when
/// the id has more than 15 digits), each chunk is read back as a number and the chunks
/// are summed.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn folding_hash(id: u64, m: usize) -> usize {
    if id < 1_000_000_000 {
        return mod_hash(id, m);
    }

    let digits = id.to_string();
    let chunks_amount = if digits.len() > 15 { 3 } else { 2 };
    let chunk_size = digits.len().div_ceil(chunks_amount);

    let hashed: u64 = digits
        .as_bytes()
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().fold(0u64, |acc, &d| acc * 10 + u64::from(d - b'0')))
        .sum();

    fold(hashed, m)
}

/// Bernstein's djb2 over the bytes of `s` (`h * 33 + c`).
#[must_use]
pub fn djb2(s: &str, m: usize) -> usize {
    let h = s
        .bytes()
        .fold(0u32, |h, c| (h << 5).wrapping_add(h).wrapping_add(u32::from(c)));
    fold(u64::from(h), m)
}

/// The sdbm hash over the bytes of `s`.
#[must_use]
pub fn sdbm(s: &str, m: usize) -> usize {
    let h = s.bytes().fold(0u32, |h, c| {
        u32::from(c).wrapping_add(h << 6).wrapping_add(h << 16).wrapping_sub(h)
    });
    fold(u64::from(h), m)
}

/// Jenkins' one-at-a-time hash over the bytes of `s`.
#[must_use]
pub fn shifting(s: &str, m: usize) -> usize {
    let mut h = s.bytes().fold(0u32, |mut h, c| {
        h = h.wrapping_add(u32::from(c));
        h = h.wrapping_add(h << 10);
        h ^ (h >> 6)
    });

    h = h.wrapping_add(h << 3);
    h ^= h >> 11;
    h = h.wrapping_add(h << 15);

    fold(u64::from(h), m)
}

/// Polynomial hash with base 127, reduced by `m` after every character.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn seeded(s: &str, m: usize) -> usize {
    let m = m.max(1);
    let wide = m as u128;
    // `h < m`, so `127 * h + c` stays below 2^72
    let h = s.bytes().fold(0u128, |h, c| (127 * h + u128::from(c)) % wide);
    fold(u64::try_from(h).unwrap_or(u64::MAX), m)
}

/// The std library's `DefaultHasher`, folded into `1..=m`.
#[must_use]
pub fn std_hash<T: Hash + ?Sized>(value: &T, m: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    fold(hasher.finish(), m)
}

/// Full-width `DefaultHasher` output, used as the primary function of default-built tables.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn default_hash<T: Hash + ?Sized>(value: &T) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish() as usize
}

/// Step function of default-built double hashing tables.
///
/// Hashes the key together with a salt so that the step is independent of the primary
/// index, then maps it into `1..=97`.
#[must_use]
pub fn default_step<T: Hash + ?Sized>(value: &T) -> NonZeroUsize {
    let mut hasher = DefaultHasher::new();
    0x9e37_79b9_u32.hash(&mut hasher);
    value.hash(&mut hasher);
    step(fold(hasher.finish(), 97))
}

/// Adapts the output of one of the functions above to a double hashing step.
///
/// All of them return at least one; zero is mapped to one.
#[must_use]
pub fn step(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}
