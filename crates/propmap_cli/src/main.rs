//! Command-line runner over `propmap_core`.
//!
//! # Responsibility
//! - Drive save/delete/list/sweep against a local SQLite file.
//! - Keep output line-oriented for quick local checks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use propmap_core::{
    default_log_level, init_logging, load_config, EngineConfig, ExpirySweeper, InMemoryMap,
    Position, PropertyMap, SelectedLocation, SqliteKvStorage, StaticGeocoder, SystemClock,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Engine = PropertyMap<SqliteKvStorage, InMemoryMap, SystemClock>;

#[derive(Parser)]
#[command(name = "propmap")]
#[command(about = "Annotate map locations and track which notes are still fresh", long_about = None)]
struct Cli {
    /// SQLite file holding the record document.
    #[arg(long, default_value = "propmap.sqlite3")]
    db: PathBuf,

    /// Optional JSON engine config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files. Logging is off when omitted.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save or replace the note for a location.
    Save {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Address label. Defaults to a coordinate label.
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        memo: String,
    },
    /// Delete the note for a location.
    Delete {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        address: Option<String>,
    },
    /// Show the note saved for a location.
    Show {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        address: Option<String>,
    },
    /// List every record with its highlight state.
    List,
    /// Run one expiry sweep.
    Sweep,
    /// Run the periodic sweeper for a number of intervals.
    Watch {
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        /// Overrides the configured sweep interval.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(default_log_level(), log_dir)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    let config = match cli.config.as_ref() {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => EngineConfig::default(),
    };
    let storage = SqliteKvStorage::open(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let mut engine: Engine = PropertyMap::open(config, storage, InMemoryMap::new(), SystemClock);

    match cli.command {
        Commands::Save {
            lat,
            lng,
            address,
            memo,
        } => {
            let location = select(&engine, lat, lng, address)?;
            let record = engine.save(&location, &memo)?;
            println!("saved key={} created_at={}", record.key, record.created_at);
        }
        Commands::Delete { lat, lng, address } => {
            let location = select(&engine, lat, lng, address)?;
            if engine.delete(&location)? {
                println!("deleted");
            } else {
                println!("no record");
            }
        }
        Commands::Show { lat, lng, address } => {
            let location = select(&engine, lat, lng, address)?;
            match engine.lookup(&location)? {
                Some(record) => println!(
                    "key={} address={} memo={} created_at={} highlighted={}",
                    record.key,
                    record.address,
                    record.memo,
                    record.created_at,
                    engine.is_highlighted(&record.key)
                ),
                None => println!("no record"),
            }
        }
        Commands::List => {
            let mut records = engine.records();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            for record in records {
                let state = if engine.is_highlighted(&record.key) {
                    "fresh"
                } else {
                    "stale"
                };
                println!("{state}\t{}\t{}\t{}", record.key, record.created_at, record.memo);
            }
        }
        Commands::Sweep => {
            let removed = engine.sweep();
            println!("hidden={removed} visible={}", engine.highlight_count());
        }
        Commands::Watch {
            ticks,
            interval_secs,
        } => watch(engine, ticks, interval_secs)?,
    }

    Ok(())
}

fn select(engine: &Engine, lat: f64, lng: f64, address: Option<String>) -> Result<SelectedLocation> {
    let position = Position::new(lat, lng);
    if !position.is_valid() {
        bail!("invalid coordinate {lat}, {lng}");
    }
    Ok(match address {
        Some(address) => SelectedLocation::new(position, address),
        None => engine.select_point(&StaticGeocoder::new(), position),
    })
}

fn watch(engine: Engine, ticks: u32, interval_secs: Option<u64>) -> Result<()> {
    let interval = match interval_secs {
        Some(0) => bail!("--interval-secs must be positive"),
        Some(secs) => Duration::from_secs(secs),
        None => engine.config().sweep_interval(),
    };
    let run_for = watch_duration(interval, ticks)?;
    let shared = Arc::new(Mutex::new(engine));
    let sweeper = ExpirySweeper::spawn(Arc::clone(&shared), interval);
    info!("event=cli_watch module=cli status=start ticks={ticks}");

    std::thread::sleep(run_for);
    sweeper.stop();

    let engine = shared
        .lock()
        .map_err(|_| anyhow::anyhow!("property map lock poisoned"))?;
    println!(
        "visible={} records={}",
        engine.highlight_count(),
        engine.records().len()
    );
    Ok(())
}

/// Total wait for `ticks` sweeps plus half an interval of slack.
fn watch_duration(interval: Duration, ticks: u32) -> Result<Duration> {
    match interval
        .checked_mul(ticks)
        .and_then(|total| total.checked_add(interval / 2))
    {
        Some(total) => Ok(total),
        None => bail!(
            "--ticks {ticks} with a {}s interval is too long to wait for",
            interval.as_secs()
        ),
    }
}
