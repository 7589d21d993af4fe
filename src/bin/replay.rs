use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;
use survey_trail::export::SessionExport;
use survey_trail::{tracker, FilterVerdict, RawFix, RecordingSession, RejectReason, TrailConfig};

/// Replay a recorded fix log through the trail filter
#[derive(Parser, Debug)]
struct Args {
    /// Path to fixes.json[.gz] log
    #[arg(long)]
    log: PathBuf,

    /// JSON config file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reconstruct the walked route to this trail index
    #[arg(long)]
    target: Option<usize>,

    /// Write the session export JSON here
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write the trail as GPX here
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Override the speed gate (m/s)
    #[arg(long)]
    max_speed: Option<f64>,
}

/// Either a bare array of fixes or an object wrapping one
#[derive(Deserialize)]
#[serde(untagged)]
enum FixLog {
    Bare(Vec<RawFix>),
    Wrapped { fixes: Vec<RawFix> },
}

impl FixLog {
    fn into_fixes(self) -> Vec<RawFix> {
        match self {
            FixLog::Bare(fixes) | FixLog::Wrapped { fixes } => fixes,
        }
    }
}

fn load_log(path: &Path) -> anyhow::Result<Vec<RawFix>> {
    let file = File::open(path)?;
    let log: FixLog = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        serde_json::from_reader(BufReader::new(gz))?
    } else {
        serde_json::from_reader(BufReader::new(file))?
    };
    Ok(log.into_fixes())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => TrailConfig::from_json_file(path)?,
        None => TrailConfig::default(),
    };
    if let Some(speed) = args.max_speed {
        config.filter = config.filter.with_max_speed(speed);
    }

    let fixes = load_log(&args.log)?;
    let Some(first) = fixes.first() else {
        anyhow::bail!("{} contains no fixes", args.log.display());
    };
    let start_ms = first.timestamp;

    let (handle, task) = tracker::spawn(RecordingSession::new(config)?);
    handle.start(start_ms).await?;
    for fix in &fixes {
        if let FilterVerdict::Accepted(point) = handle.ingest(*fix).await? {
            log::trace!("trail point t={}", point.timestamp);
        }
    }

    let metadata = handle.metadata().await?;
    println!("Replayed {} fixes from {}", metadata.fixes_received, args.log.display());
    println!("  {:<14} {:>8}", "accepted", metadata.verdicts.accepted);
    for reason in RejectReason::ALL {
        let count = metadata.verdicts.count(reason);
        if count > 0 {
            println!("  {:<14} {:>8}", reason.as_str(), count);
        }
    }
    println!("  distance       {:>8.1} m", metadata.distance_meters);

    if let Some(target) = args.target {
        let route = handle.reconstruct(target).await?;
        println!(
            "Route to {}: {} points, {:.1} m ({:?})",
            target,
            route.len(),
            route.length_meters,
            route.source
        );
        println!("{}", serde_json::to_string(&route.indices)?);
    }

    handle.stop().await?;
    drop(handle);
    let session = task.await?;

    let export = SessionExport::from_session(&session);
    if let Some(path) = args.export.as_ref() {
        std::fs::write(path, export.to_json()?)?;
        println!("Wrote export to {}", path.display());
    }
    if let Some(path) = args.gpx.as_ref() {
        std::fs::write(path, export.to_gpx())?;
        println!("Wrote GPX to {}", path.display());
    }

    Ok(())
}
