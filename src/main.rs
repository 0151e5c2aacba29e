//! Calorix CLI
//!
//! Usage:
//!   calorix --data export.txt --notes notes.txt     # Preprocess one session
//!   calorix --batch ids.csv --field upload          # Pull + preprocess records
//!   calorix --extract sleep --occurrence 2 --folder processed/
//!   calorix --data export.txt --json                # JSON summary

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Parser;
use colored::Colorize;
use serde::Serialize;

use calorix::core::{
    extract_from_folder, preprocess_batch, preprocess_file, CombineMethod, PreprocessOptions,
    PreprocessOutput, RemoteClient, RemoteConfig,
};
use calorix::types::{CodeMode, PipelineError, Result};
use calorix::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "calorix",
    version = VERSION,
    about = "Preprocess two-chamber respirometry sessions",
    long_about = "Calorix turns a chamber software export and its operator note log\n\
                  into per-room, protocol-annotated measurement series.\n\n\
                  Modes:\n  \
                  --data     Preprocess a single export (optionally with --notes)\n  \
                  --batch    Pull records from the remote store and preprocess each\n  \
                  --extract  Crop one protocol span out of saved *_data.csv files\n\n\
                  Protocol codes:\n  \
                  0 normal, 1 sleeping, 2 eating, 3 active, 4 REE measurement"
)]
struct Args {
    /// Chamber export .txt to preprocess (single-file mode)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Operator note log .txt; enables occupancy detection and annotation
    #[arg(short, long)]
    notes: Option<PathBuf>,

    /// Batch mode: CSV whose first column lists record ids
    #[arg(short, long)]
    batch: Option<PathBuf>,

    /// Record store field holding the raw export (batch mode)
    #[arg(long, default_value = "upload")]
    field: String,

    /// Extract mode: protocol name (normal, sleep, eat, active, ree)
    #[arg(short, long)]
    extract: Option<String>,

    /// Folder of *_data.csv files to extract from
    #[arg(long)]
    folder: Option<PathBuf>,

    /// 1-based occurrence of the protocol span
    #[arg(long, default_value_t = 1)]
    occurrence: usize,

    /// Minutes of padding before the span
    #[arg(long, default_value_t = 0.0)]
    pad_before: f64,

    /// Minutes of padding after the span
    #[arg(long, default_value_t = 0.0)]
    pad_after: f64,

    /// Subject code mode: id, id+comment or manual
    #[arg(long, default_value = "id")]
    code: String,

    /// Manual subject codes, room 1 then room 2
    #[arg(long, num_args = 2, value_names = ["ROOM1", "ROOM2"])]
    manual: Option<Vec<String>>,

    /// Output directory (default: working directory)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Skip writing CSV outputs
    #[arg(long)]
    no_save: bool,

    /// Keep both sensor sets instead of collapsing them
    #[arg(long)]
    no_combine: bool,

    /// Sensor set combination method (mean, median, s1, s2, min, max)
    #[arg(long, default_value = "mean")]
    method: String,

    /// Report how far the two sensor sets disagree before combining
    #[arg(long)]
    check_discrepancies: bool,

    /// Window start, e.g. "2023-11-13 11:43:00"
    #[arg(long)]
    start: Option<String>,

    /// Window end
    #[arg(long)]
    end: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }
    let _logger = flexi_logger::Logger::try_with_env_or_str(&args.log_level)
        .and_then(|logger| logger.start())
        .ok();

    let result = if let Some(protocol) = args.extract.clone() {
        run_extract(&args, &protocol)
    } else if let Some(ids_csv) = args.batch.clone() {
        run_batch(&args, &ids_csv).await
    } else if let Some(data) = args.data.clone() {
        run_single(&args, &data)
    } else {
        Err(PipelineError::Configuration(
            "nothing to do; pass --data, --batch or --extract (see --help)".to_string(),
        ))
    };

    if let Err(err) = result {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn build_options(args: &Args) -> Result<PreprocessOptions> {
    let manual = match &args.manual {
        Some(pair) if pair.len() == 2 => Some((pair[0].clone(), pair[1].clone())),
        Some(_) => {
            return Err(PipelineError::Configuration(
                "--manual takes exactly two codes, room 1 then room 2".to_string(),
            ))
        }
        None => None,
    };
    Ok(PreprocessOptions {
        code_mode: args.code.parse::<CodeMode>()?,
        manual,
        save_csv: !args.no_save,
        out_dir: args.out.clone(),
        combine: !args.no_combine,
        method: args.method.parse::<CombineMethod>()?,
        start: args.start.as_deref().map(parse_cli_datetime).transpose()?,
        end: args.end.as_deref().map(parse_cli_datetime).transpose()?,
        note_path: args.notes.clone(),
        check_discrepancies: args.check_discrepancies,
    })
}

fn parse_cli_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        PipelineError::Configuration(format!(
            "cannot parse `{value}`; expected YYYY-MM-DD HH:MM:SS"
        ))
    })
}

/// Preprocess a single export
fn run_single(args: &Args, data: &Path) -> Result<()> {
    let opts = build_options(args)?;
    let output = preprocess_file(data, &opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summarize(&output))?);
    } else {
        print_run_summary(&output);
    }
    Ok(())
}

/// Pull every record in the id list and preprocess each
async fn run_batch(args: &Args, ids_csv: &Path) -> Result<()> {
    let opts = build_options(args)?;
    let client = RemoteClient::new(RemoteConfig::from_env()?);

    let summary = preprocess_batch(ids_csv, &args.field, &client, &opts).await?;

    if args.json {
        #[derive(Serialize)]
        struct BatchJson<'a> {
            processed: &'a [String],
            failed: &'a [(String, String)],
        }
        let json = BatchJson {
            processed: &summary.processed,
            failed: &summary.failed,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!(
        "{} {} record(s) processed, {} failed",
        "batch:".bold(),
        summary.processed.len(),
        summary.failed.len()
    );
    for (record_id, reason) in &summary.failed {
        println!("  {} {record_id}: {reason}", "✗".red());
    }
    Ok(())
}

/// Crop one protocol span out of every saved stream in a folder
fn run_extract(args: &Args, protocol: &str) -> Result<()> {
    let folder = args.folder.as_ref().ok_or_else(|| {
        PipelineError::Configuration("--extract needs --folder with *_data.csv files".to_string())
    })?;

    let summary = extract_from_folder(
        folder,
        protocol,
        args.occurrence,
        args.pad_before,
        args.pad_after,
        args.out.as_deref(),
    )?;

    if args.json {
        #[derive(Serialize)]
        struct ExtractJson<'a> {
            extracted: &'a [String],
            failed: &'a [(String, String)],
        }
        let json = ExtractJson {
            extracted: &summary.extracted,
            failed: &summary.failed,
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!(
        "{} {} file(s) extracted for {protocol} #{}, {} failed",
        "extract:".bold(),
        summary.extracted.len(),
        args.occurrence,
        summary.failed.len()
    );
    for name in &summary.extracted {
        println!("  {} {name}", "✓".green());
    }
    for (name, reason) in &summary.failed {
        println!("  {} {name}: {reason}", "✗".red());
    }
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================

#[derive(Serialize)]
struct RunSummary {
    code_1: String,
    code_2: String,
    rows_room1: usize,
    rows_room2: usize,
    channels_room1: usize,
    channels_room2: usize,
    drift: Option<String>,
    occupancy: Option<calorix::types::ChamberOccupancy>,
}

fn summarize(output: &PreprocessOutput) -> RunSummary {
    RunSummary {
        code_1: output.code_1.clone(),
        code_2: output.code_2.clone(),
        rows_room1: output.room1.len(),
        rows_room2: output.room2.len(),
        channels_room1: output.room1.channels.len(),
        channels_room2: output.room2.channels.len(),
        drift: output.drift.map(|d| d.to_string()),
        occupancy: output.occupancy,
    }
}

fn print_run_summary(output: &PreprocessOutput) {
    println!(
        "{} {} / {}",
        "processed".green().bold(),
        output.code_1,
        output.code_2
    );
    for (label, stream) in [("room 1", &output.room1), ("room 2", &output.room2)] {
        match (stream.min_timestamp(), stream.max_timestamp()) {
            (Some(min), Some(max)) => println!(
                "  {label}: {} rows, {} .. {}",
                stream.len(),
                min,
                max
            ),
            _ => println!("  {label}: empty after windowing"),
        }
    }
    match output.drift {
        Some(drift) => println!("  clock drift corrected: {drift}"),
        None => println!("  no clock drift marker"),
    }
}
