//! Timed put / get / remove workloads over any [`HashTable`].
//!
//! A run inserts every entry, reads every entry back, removes every entry, then reads every
//! entry again. Each operation is timed on its own and the times are summed per batch of
//! entries, giving one [`Timing`] row per batch and operation.

use std::{
    collections::BTreeMap,
    fmt,
    hint::black_box,
    io::{self, Write},
    path::PathBuf,
    str::FromStr,
    time::Instant,
};

use clap::{Parser, builder::RangedU64ValueParser};
use log::warn;

use crate::{
    error::TableError,
    map::{HashTable, TableStats},
};

/// The timed operations, in the order a run performs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Insert every entry
    Put,
    /// Look up keys that are present
    GetHit,
    /// Remove every entry
    Remove,
    /// Look up keys after their removal
    GetMiss,
}

impl Operation {
    /// Every operation, in run order
    pub const ALL: [Self; 4] = [Self::Put, Self::GetHit, Self::Remove, Self::GetMiss];

    /// Name used in the `op` column
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::GetHit => "get_(hit)",
            Self::Remove => "remove",
            Self::GetMiss => "get_(miss)",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|op| op.label() == s).ok_or_else(|| s.to_owned())
    }
}

/// Time spent on one batch of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Entries processed so far in this phase, including this batch
    pub users: usize,
    /// The operation timed
    pub op: Operation,
    /// Tag of the table (`sc`, `lp`, `qp`, `dh` or `stl`)
    pub map: &'static str,
    /// Sum of the per-operation times of the batch
    pub nanos: u64,
}

/// Output of a single run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One row per batch and operation
    pub timings: Vec<Timing>,
    /// Diagnostics taken once every entry was inserted
    pub stats: TableStats,
}

/// Runs one put / get(hit) / remove / get(miss) cycle over `entries`.
///
/// `batch_size` of zero is treated as one. The table is empty again when this returns,
/// so it can be reused for the next run.
///
/// # Errors
///
/// Returns the [`TableError`] of the first failed insert.
pub fn run_workload<K, V, T>(
    table: &mut T,
    map: &'static str,
    entries: &[(K, V)],
    batch_size: usize,
) -> Result<RunReport, TableError>
where
    K: Clone,
    V: Clone,
    T: HashTable<K, V> + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut timings = Vec::with_capacity(entries.len().div_ceil(batch_size).saturating_mul(4));

    run_phase(table, Operation::Put, map, entries, batch_size, &mut timings)?;
    let stats = table.stats();
    for op in [Operation::GetHit, Operation::Remove, Operation::GetMiss] {
        run_phase(table, op, map, entries, batch_size, &mut timings)?;
    }

    Ok(RunReport { timings, stats })
}

/// Times `op` over every entry, one [`Timing`] per batch
fn run_phase<K, V, T>(
    table: &mut T,
    op: Operation,
    map: &'static str,
    entries: &[(K, V)],
    batch_size: usize,
    timings: &mut Vec<Timing>,
) -> Result<(), TableError>
where
    K: Clone,
    V: Clone,
    T: HashTable<K, V> + ?Sized,
{
    let mut users: usize = 0;
    let mut unexpected: usize = 0;

    for batch in entries.chunks(batch_size) {
        let mut nanos: u64 = 0;
        for (key, value) in batch {
            let (found, elapsed) = match op {
                Operation::Put => {
                    let (key, value) = (key.clone(), value.clone());
                    let (result, elapsed) = timed(|| table.put(key, value));
                    (result?.is_none(), elapsed)
                }
                Operation::GetHit | Operation::GetMiss => timed(|| table.get(key).is_some()),
                Operation::Remove => timed(|| table.remove(key).is_some()),
            };
            if found == (op == Operation::GetMiss) {
                unexpected = unexpected.saturating_add(1);
            }
            nanos = nanos.saturating_add(elapsed);
        }
        users = users.saturating_add(batch.len());
        timings.push(Timing { users, op, map, nanos });
    }

    if unexpected > 0 {
        warn!("[{map}] {unexpected} unexpected results during {op}");
    }
    Ok(())
}

/// Runs `f` and returns its result with the elapsed nanoseconds
fn timed<R>(f: impl FnOnce() -> R) -> (R, u64) {
    let started = Instant::now();
    let result = black_box(f());
    let elapsed = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
    (result, elapsed)
}

/// Writes timings as CSV with the header `users,op,map,time`.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_timings_csv(mut out: impl Write, timings: &[Timing]) -> io::Result<()> {
    writeln!(out, "users,op,map,time")?;
    for timing in timings {
        writeln!(out, "{},{},{},{}", timing.users, timing.op, timing.map, timing.nanos)?;
    }
    out.flush()
}

/// Mean nanoseconds per operation for one table and operation, by users processed.
///
/// Batch times are averaged over the runs and then divided by the batch length, so a
/// short final batch is not skewed.
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
pub fn mean_nanos_per_op(timings: &[Timing], op: Operation, map: &str) -> Vec<(usize, f64)> {
    let mut by_users: BTreeMap<usize, (u128, usize)> = BTreeMap::new();
    for timing in timings.iter().filter(|t| t.op == op && t.map == map) {
        let (sum, count) = by_users.entry(timing.users).or_insert((0, 0));
        *sum += u128::from(timing.nanos);
        *count += 1;
    }

    let mut previous = 0;
    by_users
        .into_iter()
        .map(|(users, (sum, count))| {
            let batch = users.saturating_sub(previous).max(1);
            previous = users;
            (users, sum as f64 / count as f64 / batch as f64)
        })
        .collect()
}

/// Mean of [`mean_nanos_per_op`] over every batch, or `None` when `map` has no timing
/// for `op`
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
pub fn overall_mean_nanos(timings: &[Timing], op: Operation, map: &str) -> Option<f64> {
    let points = mean_nanos_per_op(timings, op, map);
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|&(_, time)| time).sum::<f64>() / points.len() as f64)
}

/// Settings of the comparison driver
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "compare_tables", about = "Times the hash tables on user records", version)]
pub struct BenchConfig {
    /// Runs per dataset
    #[arg(default_value_t = 100, value_parser = at_least_one())]
    pub runs: usize,
    /// Entries per timing row
    #[arg(long = "batch", default_value_t = 100, value_parser = at_least_one())]
    pub batch_size: usize,
    /// Initial capacity of the chaining table, also the modulus of its hash functions
    #[arg(long, default_value_t = 20_011)]
    pub chaining_capacity: usize,
    /// Initial capacity of the open addressing tables, also the modulus of their hash
    /// functions
    #[arg(long, default_value_t = 27_367)]
    pub open_capacity: usize,
    /// Modulus of the double hashing step function
    #[arg(long, default_value_t = 27_361)]
    pub step_modulus: usize,
    /// Where the timing CSV files go
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
    /// Where the charts go
    #[arg(long, default_value = "graphs")]
    pub graphs_dir: PathBuf,
    /// CSV of users; synthetic users are generated when absent
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Number of synthetic users
    #[arg(long, default_value_t = 10_000)]
    pub users: usize,
}

/// Accepts any positive count
fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}
