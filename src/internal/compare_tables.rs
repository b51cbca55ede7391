#![allow(clippy::arithmetic_side_effects)]

//! Times the four tables and the std map on user records and charts the results.
//!
//! ```text
//! compare_tables [RUNS] [--input users.csv] [--users N] [--batch N]
//!                [--data-dir DIR] [--graphs-dir DIR]
//! ```
//!
//! Writes `<data-dir>/<dataset>.csv`, then a line chart `<graphs-dir>/<dataset>_<op>.png`
//! and a bar chart `<graphs-dir>/<dataset>_<op>_bar.png` per operation. Set
//! `RUST_LOG=debug` to see every resize.

use std::{
    collections::HashMap,
    error::Error,
    fs::{self, File},
    hash::Hash,
    io::{BufReader, BufWriter},
    rc::Rc,
    time::Instant,
};

use hashlab::{
    HashTable, TableBuilder, hashers,
    measure::{
        BenchConfig, Operation, Timing, mean_nanos_per_op, overall_mean_nanos, run_workload,
        write_timings_csv,
    },
    record::{User, read_users, synthetic_users},
};
use clap::Parser;
use log::{info, warn};
use plotters::prelude::*;

/// Tags of the compared tables, in chart order
const MAPS: [&str; 5] = ["sc", "lp", "qp", "dh", "stl"];

/// Line color of each table, same order as `MAPS`
const COLORS: [RGBColor; 5] = [
    RGBColor(220, 50, 50),
    RGBColor(50, 90, 220),
    RGBColor(50, 180, 50),
    RGBColor(180, 50, 180),
    RGBColor(90, 90, 90),
];

/// Font of captions and axis descriptions
const FONT: &str = "sans-serif";

/// A boxed table holding users
type Table<K> = Box<dyn HashTable<K, Rc<User>>>;

/// How one dataset keys and hashes the users
struct Dataset<K> {
    /// File name stem of the outputs
    name: &'static str,
    /// Key of a user
    key: fn(&User) -> K,
    /// Primary hash, reduced by the given modulus
    hash: fn(&K, usize) -> usize,
    /// Double hashing step, reduced by the given modulus
    step: fn(&K, usize) -> usize,
}

/// Runs every dataset and writes its CSV and charts
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BenchConfig::parse();
    let users = load_users(&config)?;
    info!("{} users, {} runs per dataset", users.len(), config.runs);

    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(&config.graphs_dir)?;

    let started = Instant::now();

    let by_id: [Dataset<u64>; 2] = [
        Dataset {
            name: "id_mod",
            key: |user| user.id,
            hash: |id, m| hashers::mod_hash(*id, m),
            step: |id, m| hashers::mod_hash(*id, m),
        },
        Dataset {
            name: "id_folding",
            key: |user| user.id,
            hash: |id, m| hashers::folding_hash(*id, m),
            step: |id, m| hashers::mod_hash(*id, m),
        },
    ];
    for dataset in &by_id {
        run_dataset(&config, &users, dataset)?;
    }

    let by_username: [Dataset<String>; 4] = [
        Dataset {
            name: "username_djb2",
            key: |user| user.username.clone(),
            hash: |name, m| hashers::djb2(name, m),
            step: |name, m| hashers::std_hash(name, m),
        },
        Dataset {
            name: "username_sdbm",
            key: |user| user.username.clone(),
            hash: |name, m| hashers::sdbm(name, m),
            step: |name, m| hashers::std_hash(name, m),
        },
        Dataset {
            name: "username_shifting",
            key: |user| user.username.clone(),
            hash: |name, m| hashers::shifting(name, m),
            step: |name, m| hashers::std_hash(name, m),
        },
        Dataset {
            name: "username_seeded",
            key: |user| user.username.clone(),
            hash: |name, m| hashers::seeded(name, m),
            step: |name, m| hashers::std_hash(name, m),
        },
    ];
    for dataset in &by_username {
        run_dataset(&config, &users, dataset)?;
    }

    info!("total time: {:.3} s", started.elapsed().as_secs_f64());
    Ok(())
}

/// Reads the input CSV, or generates users when none was given
fn load_users(config: &BenchConfig) -> Result<Vec<Rc<User>>, Box<dyn Error>> {
    let users = if let Some(path) = &config.input {
        info!("reading {}", path.display());
        read_users(BufReader::new(File::open(path)?))?
    } else {
        info!("no input file, generating {} users", config.users);
        synthetic_users(config.users, &mut rand::rng())
    };
    Ok(users.into_iter().map(Rc::new).collect())
}

/// The five compared tables, keyed the way `dataset` says
fn build_tables<K>(
    config: &BenchConfig,
    dataset: &Dataset<K>,
) -> Result<Vec<(&'static str, Table<K>)>, Box<dyn Error>>
where
    K: Eq + Hash + 'static,
{
    let (hash, step) = (dataset.hash, dataset.step);
    let sc_m = config.chaining_capacity;
    let open_m = config.open_capacity;
    let step_m = config.step_modulus;

    let creation = Instant::now();
    let sc: Table<K> = Box::new(
        TableBuilder::new(sc_m).primary(move |k: &K| hash(k, sc_m)).build_chaining::<Rc<User>>()?,
    );
    let lp: Table<K> = Box::new(
        TableBuilder::new(open_m)
            .primary(move |k: &K| hash(k, open_m))
            .build_linear::<Rc<User>>()?,
    );
    let qp: Table<K> = Box::new(
        TableBuilder::new(open_m)
            .primary(move |k: &K| hash(k, open_m))
            .build_quadratic::<Rc<User>>()?,
    );
    let dh: Table<K> = Box::new(
        TableBuilder::new(open_m)
            .primary(move |k: &K| hash(k, open_m))
            .step(move |k: &K| hashers::step(step(k, step_m)))
            .build_double_hashing::<Rc<User>>()?,
    );
    let stl: Table<K> = Box::new(HashMap::<K, Rc<User>>::with_capacity(sc_m));
    info!("tables created in {} μs", creation.elapsed().as_micros());

    Ok(vec![("sc", sc), ("lp", lp), ("qp", qp), ("dh", dh), ("stl", stl)])
}

/// Runs every table over one dataset, then saves its CSV and charts
fn run_dataset<K>(
    config: &BenchConfig,
    users: &[Rc<User>],
    dataset: &Dataset<K>,
) -> Result<(), Box<dyn Error>>
where
    K: Eq + Hash + Clone + 'static,
{
    info!("running {}x {} tests...", config.runs, dataset.name);
    let started = Instant::now();

    let entries: Vec<(K, Rc<User>)> =
        users.iter().map(|user| ((dataset.key)(user), Rc::clone(user))).collect();
    let mut tables = build_tables(config, dataset)?;
    let mut timings = Vec::new();

    for run in 0..config.runs {
        for (map, table) in &mut tables {
            let report = run_workload(table.as_mut(), *map, &entries, config.batch_size)?;
            if run == 0 {
                info!("{}", report.stats);
            }
            timings.extend(report.timings);
        }
    }
    info!("{} done in {:.3} s", dataset.name, started.elapsed().as_secs_f64());

    let path = config.data_dir.join(format!("{}.csv", dataset.name));
    write_timings_csv(BufWriter::new(File::create(&path)?), &timings)?;
    info!("saved {}", path.display());

    if entries.is_empty() {
        warn!("no users, skipping {} charts", dataset.name);
        return Ok(());
    }
    for op in Operation::ALL {
        draw_chart(config, dataset.name, op, &timings)?;
        draw_bar_chart(config, dataset.name, op, &timings)?;
    }
    Ok(())
}

/// Line chart of mean nanoseconds per operation against users processed
fn draw_chart(
    config: &BenchConfig,
    dataset: &str,
    op: Operation,
    timings: &[Timing],
) -> Result<(), Box<dyn Error>> {
    let series: Vec<(&str, Vec<(usize, f64)>)> =
        MAPS.iter().map(|&map| (map, mean_nanos_per_op(timings, op, map))).collect();

    let max_users = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|&(users, _)| users))
        .max()
        .unwrap_or(0)
        .max(1);
    let max_time = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|&(_, time)| time))
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.1;

    let file = config
        .graphs_dir
        .join(format!("{dataset}_{}.png", file_label(op)));
    let root = BitMapBackend::new(&file, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!(
        "Average time of map.{} for \"{}\"",
        op.label().replace('_', " "),
        dataset.replace('_', " ")
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0..max_users, 0.0..max_time)?;

    chart
        .configure_mesh()
        .x_desc("Users inserted")
        .y_desc("Nanoseconds per op.")
        .axis_desc_style((FONT, 16))
        .draw()?;

    for ((map, points), color) in series.into_iter().zip(COLORS) {
        let style = ShapeStyle::from(&color).stroke_width(2);
        chart
            .draw_series(LineSeries::new(points, style))?
            .label(map)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    info!("saved {}", file.display());
    Ok(())
}

/// Bar chart of each table's mean nanoseconds per operation over the whole phase
fn draw_bar_chart(
    config: &BenchConfig,
    dataset: &str,
    op: Operation,
    timings: &[Timing],
) -> Result<(), Box<dyn Error>> {
    let means: Vec<f64> = MAPS
        .iter()
        .map(|&map| overall_mean_nanos(timings, op, map).unwrap_or(0.0))
        .collect();
    let max_time = means.iter().copied().fold(0.0, f64::max).max(1.0) * 1.1;

    let file = config.graphs_dir.join(format!("{dataset}_{}_bar.png", file_label(op)));
    let root = BitMapBackend::new(&file, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let title = format!(
        "Mean time of map.{} for \"{}\"",
        op.label().replace('_', " "),
        dataset.replace('_', " ")
    );
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..MAPS.len()).into_segmented(), 0.0..max_time)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Map")
        .y_desc("Nanoseconds per op.")
        .axis_desc_style((FONT, 16))
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                MAPS.get(*i).copied().unwrap_or_default().to_owned()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .margin(40)
            .style_func(|segment, _| {
                let i = match segment {
                    SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i,
                    SegmentValue::Last => MAPS.len(),
                };
                COLORS.get(i).unwrap_or(&BLACK).filled()
            })
            .data(means.into_iter().enumerate()),
    )?;

    root.present()?;
    info!("saved {}", file.display());
    Ok(())
}

/// Operation label usable in a file name
fn file_label(op: Operation) -> String {
    op.label().replace(['(', ')'], "")
}
