//! # hashlab
//!
//! Four classic collision-resolution strategies behind one map contract, plus the
//! tooling to compare them on real user records.
//!
//! This crate provides:
//!
//! - `SeparateChainingMap`: every slot owns a linked list of colliding entries
//! - `LinearProbingMap`: open addressing, collisions try the next slot
//! - `QuadraticProbingMap`: open addressing, collisions jump by squares
//! - `DoubleHashingMap`: open addressing, collisions jump by a second hash of the key
//!
//! All four implement [`HashTable`], as does `std::collections::HashMap`, so the
//! [`measure`] module can time them side by side. Capacities are always prime, and
//! removals from the open addressing tables leave tombstones so later keys in a probe
//! sequence stay reachable.
//!
//! ## Basic Usage
//!
//! ```rust
//! use hashlab::{HashTable, LinearProbingMap};
//!
//! let mut map = LinearProbingMap::new();
//!
//! map.put("apple".to_string(), 1).unwrap();
//! map.put("banana".to_string(), 2).unwrap();
//! assert_eq!(map.get(&"apple".to_string()), Some(&1));
//!
//! // overwriting returns the previous value
//! assert_eq!(map.put("apple".to_string(), 10).unwrap(), Some(1));
//!
//! assert_eq!(map.remove(&"apple".to_string()), Some(10));
//! assert_eq!(map.get(&"apple".to_string()), None);
//! assert_eq!(map.size(), 1);
//! ```
//!
//! ## Custom Hash Functions
//!
//! ```rust
//! use hashlab::{HashTable, TableBuilder, hashers};
//!
//! let mut map = TableBuilder::new(11)
//!     .primary(|name: &String| hashers::djb2(name, 11))
//!     .build_chaining()
//!     .unwrap();
//!
//! map.put("ada".to_string(), 1815).unwrap();
//! assert!(map.contains_key(&"ada".to_string()));
//! println!("{}", map.stats());
//! ```

/// Separate chaining table
pub mod chaining;
/// Double hashing probe policy and table
pub mod double_hashing;
/// Error types
mod error;
/// Hash function family used by the comparison driver
pub mod hashers;
/// Linear probing policy and table
pub mod linear;
/// The map contract, the table builder and resize arithmetic
mod map;
/// Timed workloads over any table
pub mod measure;
/// Open addressing engine shared by the probing tables
pub mod open_addressing;
/// Prime numbers for table capacities
pub mod prime;
/// Probe sequences
pub mod probe;
/// Quadratic probing policy and table
pub mod quadratic;
/// User records and CSV ingestion
pub mod record;

pub use chaining::SeparateChainingMap;
pub use double_hashing::{DoubleHash, DoubleHashingMap};
pub use error::{RecordError, TableError};
pub use linear::{Linear, LinearProbingMap};
pub use map::{HashFn, HashTable, StepFn, TableBuilder, TableStats};
pub use open_addressing::{OpenAddressingMap, ProbeStrategy};
pub use quadratic::{Quadratic, QuadraticProbingMap};
