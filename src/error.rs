//! Error types for table construction and record ingestion

/// Failures reported by the hash tables.
///
/// A missing key is never an error: lookups and removals report it with `None`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A table was built without a hash function its strategy requires.
    #[error("the {which} hash function is required but was not provided")]
    MissingHashFn {
        /// Which function was missing (`"primary"` or `"step"`)
        which: &'static str,
    },

    /// Growing the table would need a capacity that does not fit in a `usize`.
    #[error("cannot grow the table: no prime capacity for a requested size of {requested} fits in usize")]
    CapacityOverflow {
        /// The size that was asked for before rounding up to a prime
        requested: usize,
    },
}

/// Failures while reading user records from delimited input.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// The underlying reader failed.
    #[error("failed to read records")]
    Io(#[from] std::io::Error),

    /// A row has fewer columns than the format requires.
    #[error("line {line}: missing field `{field}`")]
    MissingField {
        /// 1-based line number in the input
        line: usize,
        /// Column name
        field: &'static str,
    },

    /// A numeric column could not be parsed.
    #[error("line {line}: invalid number `{value}` in field `{field}`")]
    InvalidNumber {
        /// 1-based line number in the input
        line: usize,
        /// Column name
        field: &'static str,
        /// The raw text that failed to parse
        value: String,
    },

    /// The creation timestamp is not in the `Www Mmm dd HH:MM:SS +0000 YYYY` form.
    #[error("line {line}: invalid timestamp `{value}`")]
    InvalidTimestamp {
        /// 1-based line number in the input
        line: usize,
        /// The raw text that failed to parse
        value: String,
    },
}
