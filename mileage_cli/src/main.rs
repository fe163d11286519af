use std::{fs::OpenOptions, path::PathBuf, time::Duration};

use chrono::Local;
use clap::{Parser, Subcommand};
use mileage_tracker::{
    api::{ApiClient, MileageApi},
    config::Configuration,
    location::{ChannelLocationProvider, GpxReplayProvider, LocationProvider},
    submission::TripSubmission,
    MileageTracker,
};
use mileage_tracker_lib::{
    mileage_record::NewMileageRecord,
    position_fix::PositionFix,
    trip::{format_elapsed, TripSummary},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SUBMIT_ATTEMPTS: u32 = 3;

#[derive(Parser)]
#[command(name = "mileage")]
#[command(about = "Track trips and manage mileage entries", long_about = None)]
struct Cli {
    /// Config file to use instead of mileage.conf in the project root
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all mileage entries
    List,
    /// Show the miles driven this week
    Weekly,
    /// Add an entry by hand
    Add {
        miles: f64,
        seconds: f64,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Change the purpose of an entry
    Edit { id: String, purpose: String },
    /// Delete an entry
    Delete { id: String },
    /// Track a recorded gpx file as if it was driven now, and save it
    Replay {
        gpx_file: PathBuf,
        #[arg(long)]
        purpose: Option<String>,
        /// Print the entry instead of saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Track a trip from `lat,lon` lines on stdin. Stops at end of input or Ctrl-C
    Track {
        #[arg(long)]
        purpose: Option<String>,
        /// Print the entry instead of saving it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::load_default()?,
    };

    init_logging(&config)?;

    let api = ApiClient::new(&config)?;
    tracing::debug!("Using backend at {}", api.base_url());

    match cli.command {
        Commands::List => {
            let entries = api.list_entries().await?;
            for entry in &entries {
                println!(
                    "{}\t{}\t{:.2} mi\t{}\t{}",
                    entry.id,
                    entry.date.as_deref().unwrap_or("-"),
                    entry.distance,
                    entry.duration_seconds.map(|s| format_elapsed(s as u64)).unwrap_or_else(|| "-".into()),
                    entry.purpose.as_deref().unwrap_or("")
                );
            }
            println!("{} entries", entries.len());
        }
        Commands::Weekly => {
            println!("{:.2} miles this week", api.weekly_mileage().await?);
        }
        Commands::Add { miles, seconds, purpose, notes, job_id } => {
            if !(miles > 0.) {
                anyhow::bail!("Miles must be positive");
            }
            let record = NewMileageRecord::new(
                miles,
                seconds,
                Local::now().date_naive(),
                purpose.unwrap_or_else(|| config.default_purpose.clone()),
            )
            .with_notes(notes)
            .with_job_id(job_id);
            record.validate().map_err(|e| anyhow::anyhow!(e))?;

            let ack = api.add_entry(&record).await?;
            println!("Saved mileage entry {}", ack.id.as_deref().unwrap_or("-"));
        }
        Commands::Edit { id, purpose } => {
            api.update_purpose(&id, &purpose).await?;
            println!("Updated entry {id}");
        }
        Commands::Delete { id } => {
            api.delete_entry(&id).await?;
            println!("Deleted entry {id}");
        }
        Commands::Replay { gpx_file, purpose, dry_run } => {
            let provider = GpxReplayProvider::from_file(&gpx_file)?;
            let clock = provider.clock();
            println!("Replaying '{}' ({} points)", provider.title(), provider.fixes().len());

            let mut tracker = MileageTracker::new(provider, &config).with_clock(clock);
            tracker.start().await?;
            tracker.source_closed().await;

            let purpose = purpose.unwrap_or_else(|| config.default_purpose.clone());
            finish_trip(tracker.stop().await, purpose, dry_run, &api).await?;
        }
        Commands::Track { purpose, dry_run } => {
            let provider = ChannelLocationProvider::granted();
            let mut tracker = MileageTracker::new(provider.clone(), &config);
            tracker.start().await?;
            tokio::spawn(read_fixes(provider));

            follow(&tracker).await;

            let purpose = purpose.unwrap_or_else(|| config.default_purpose.clone());
            finish_trip(tracker.stop().await, purpose, dry_run, &api).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &Configuration) -> anyhow::Result<()> {
    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {:?}: {e}", path))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace,mileage_tracker=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Pushes `lat,lon` lines from stdin into the provider until end of input.
async fn read_fixes(provider: ChannelLocationProvider) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_fix(line) {
                    Some(fix) => {
                        provider.push(fix);
                    }
                    None => tracing::warn!("Ignoring line '{}', expected lat,lon", line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read stdin: {e}");
                break;
            }
        }
    }

    provider.close();
}

fn parse_fix(line: &str) -> Option<PositionFix> {
    let (lat, lon) = line.split_once(',')?;
    Some(PositionFix::now(lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

/// Prints the running totals until the input ends or Ctrl-C is pressed.
async fn follow<P: LocationProvider>(tracker: &MileageTracker<P>) {
    let mut snapshots = tracker.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    let closed = tracker.source_closed();
    tokio::pin!(ctrl_c, closed);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = &mut closed => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *snapshots.borrow_and_update();
                eprint!("\r{}  {:.2} mi", format_elapsed(snapshot.elapsed_seconds), snapshot.distance_miles);
            }
        }
    }
    eprintln!();
}

async fn finish_trip(summary: Option<TripSummary>, purpose: String, dry_run: bool, api: &ApiClient) -> anyhow::Result<()> {
    let Some(summary) = summary else {
        anyhow::bail!("No trip was tracked");
    };

    println!(
        "Trip: {:.2} miles in {}",
        summary.distance_miles,
        format_elapsed(summary.duration_seconds as u64)
    );

    let mut submission = TripSubmission::new(summary, purpose);
    if dry_run {
        println!("{}", serde_json::to_string_pretty(submission.record())?);
        return Ok(());
    }

    loop {
        match submission.submit(api).await {
            Ok(ack) => {
                println!("Saved mileage entry {}", ack.id.as_deref().unwrap_or("-"));
                return Ok(());
            }
            Err(e) if submission.attempts() < SUBMIT_ATTEMPTS => {
                eprintln!("Saving failed ({e}), retrying");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                eprintln!("Trip not saved: {}", serde_json::to_string(submission.record())?);
                return Err(e.into());
            }
        }
    }
}
