//! Pipeline orchestration
//!
//! Single-file preprocessing: parse the export, window the streams (explicit
//! bounds or detected occupancy), add relative time, collapse sensor sets,
//! annotate from the note log and persist. Batch mode runs the same per
//! record pulled from the remote store, isolating each record's failure.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::core::{combine, device, notes, occupancy, persist, segment};
use crate::core::classifier::{self, Classification};
use crate::core::drift;
use crate::core::remote::RemoteClient;
use crate::core::timeline::{apply_timeline, build_timeline};
use crate::types::{
    subject_codes, ChamberOccupancy, CodeMode, DriftOffset, MeasurementStream, NoteEvent,
    Participant, Result, SubjectMetadata,
};
use crate::DISCREPANCY_THRESHOLD_PCT;

/// Settings for one preprocessing run
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub code_mode: CodeMode,
    /// Explicit (room 1, room 2) subject codes; overrides `code_mode`
    pub manual: Option<(String, String)>,
    pub save_csv: bool,
    /// Output directory; the working directory when absent
    pub out_dir: Option<PathBuf>,
    pub combine: bool,
    pub method: combine::CombineMethod,
    /// Explicit window bounds; missing sides fall back to detected occupancy
    /// or the stream itself
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Note log path; enables occupancy detection and protocol annotation
    pub note_path: Option<PathBuf>,
    /// Log how far the two sensor sets disagree before collapsing them
    pub check_discrepancies: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            code_mode: CodeMode::Id,
            manual: None,
            save_csv: true,
            out_dir: None,
            combine: true,
            method: combine::CombineMethod::Mean,
            start: None,
            end: None,
            note_path: None,
            check_discrepancies: false,
        }
    }
}

/// Everything one preprocessing run produces
#[derive(Debug)]
pub struct PreprocessOutput {
    pub code_1: String,
    pub code_2: String,
    pub r1_metadata: SubjectMetadata,
    pub r2_metadata: SubjectMetadata,
    pub room1: MeasurementStream,
    pub room2: MeasurementStream,
    pub occupancy: Option<ChamberOccupancy>,
    pub drift: Option<DriftOffset>,
}

/// Preprocess one chamber export
pub fn preprocess_file(data_path: &Path, opts: &PreprocessOptions) -> Result<PreprocessOutput> {
    let lines = device::read_export_lines(data_path)?;
    let device::DeviceExport {
        r1_metadata,
        r2_metadata,
        mut room1,
        mut room2,
    } = device::parse_export(&lines)?;

    let (code_1, code_2) = subject_codes(
        opts.code_mode,
        opts.manual.as_ref(),
        &r1_metadata,
        &r2_metadata,
    )?;

    if opts.save_csv {
        let dir = ensure_out_dir(opts)?;
        persist::write_metadata_csv(&r1_metadata, &dir.join(format!("{code_1}_metadata.csv")))?;
        persist::write_metadata_csv(&r2_metadata, &dir.join(format!("{code_2}_metadata.csv")))?;
    }

    let note_events: Option<Vec<NoteEvent>> = match &opts.note_path {
        Some(path) => Some(notes::parse_note_log(&device::read_export_lines(path)?)?),
        None => None,
    };

    // Window before relative time, combination and annotation
    let mut detected = None;
    if opts.start.is_some() && opts.end.is_some() {
        room1.crop(opts.start, opts.end);
        room2.crop(opts.start, opts.end);
    } else if let Some(events) = &note_events {
        let windows = occupancy::detect_occupancy(events);
        let w1 = windows.get(Participant::One);
        let w2 = windows.get(Participant::Two);
        let (start_1, end_1) = (opts.start.or(w1.start), opts.end.or(w1.end));
        let (start_2, end_2) = (opts.start.or(w2.start), opts.end.or(w2.end));
        log::info!(
            "room 1 window {} .. {}, room 2 window {} .. {}",
            bound(start_1),
            bound(end_1),
            bound(start_2),
            bound(end_2),
        );
        room1.crop(start_1, end_1);
        room2.crop(start_2, end_2);
        detected = Some(windows);
    } else {
        room1.crop(opts.start, opts.end);
        room2.crop(opts.start, opts.end);
    }

    room1.add_relative_time(None);
    room2.add_relative_time(None);

    if opts.check_discrepancies {
        combine::check_discrepancies(&room1, DISCREPANCY_THRESHOLD_PCT, false);
        combine::check_discrepancies(&room2, DISCREPANCY_THRESHOLD_PCT, false);
    }

    if opts.combine {
        room1 = combine::combine_sets(&room1, opts.method);
        room2 = combine::combine_sets(&room2, opts.method);
    }

    let drift_offset = match &note_events {
        Some(events) => annotate_streams(events, &mut room1, &mut room2),
        None => None,
    };

    if opts.save_csv {
        let dir = ensure_out_dir(opts)?;
        persist::write_stream_csv(&room1, &dir.join(format!("{code_1}_data.csv")))?;
        persist::write_stream_csv(&room2, &dir.join(format!("{code_2}_data.csv")))?;
    }

    Ok(PreprocessOutput {
        code_1,
        code_2,
        r1_metadata,
        r2_metadata,
        room1,
        room2,
        occupancy: detected,
        drift: drift_offset,
    })
}

/// Classify the notes, correct drift on facts and both streams, merge each
/// participant's timeline onto their stream
pub fn annotate_streams(
    events: &[NoteEvent],
    room1: &mut MeasurementStream,
    room2: &mut MeasurementStream,
) -> Option<DriftOffset> {
    let Classification { mut facts, drift } = classifier::classify(events);
    drift::apply_drift(drift, &mut facts, &mut [&mut *room1, &mut *room2]);

    apply_timeline(&build_timeline(&facts, Participant::One), room1);
    apply_timeline(&build_timeline(&facts, Participant::Two), room2);
    drift
}

fn ensure_out_dir(opts: &PreprocessOptions) -> Result<PathBuf> {
    let dir = opts
        .out_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn bound(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(|| "stream edge".to_string(), |v| v.to_string())
}

// =============================================================================
// BATCH MODE
// =============================================================================

/// Outcome of a batch run: one entry per record, failures isolated
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Preprocess every record listed in the first column of `ids_csv`
pub async fn preprocess_batch(
    ids_csv: &Path,
    field: &str,
    client: &RemoteClient,
    opts: &PreprocessOptions,
) -> Result<BatchSummary> {
    let content = fs::read_to_string(ids_csv)?;
    let record_ids: Vec<String> = content
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();

    let work_dir = ensure_out_dir(opts)?;
    let mut summary = BatchSummary::default();
    for record_id in record_ids {
        match process_record(&record_id, field, client, opts, &work_dir).await {
            Ok(()) => summary.processed.push(record_id),
            Err(err) => {
                log::error!("record {record_id} failed: {err}");
                summary.failed.push((record_id, err.to_string()));
            }
        }
    }
    Ok(summary)
}

async fn process_record(
    record_id: &str,
    field: &str,
    client: &RemoteClient,
    opts: &PreprocessOptions,
    work_dir: &Path,
) -> Result<()> {
    let bytes = client.export_record(record_id, field).await?;
    // Scratch copy of the raw export; overwritten on the next record
    let raw_path = work_dir.join("export.raw.txt");
    fs::write(&raw_path, &bytes)?;
    preprocess_file(&raw_path, opts)?;
    Ok(())
}

// =============================================================================
// SEGMENT EXTRACTION OVER SAVED OUTPUTS
// =============================================================================

/// Outcome of a folder extraction run
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Extract one protocol segment from every `*_data.csv` in `folder`
///
/// Crops land in `save_path`, or `<folder>/<protocol>_<occurrence>` when
/// absent. A file without a protocol column or with too few occurrences is
/// reported and skipped; the rest of the folder still processes.
pub fn extract_from_folder(
    folder: &Path,
    protocol: &str,
    occurrence: usize,
    pad_before_min: f64,
    pad_after_min: f64,
    save_path: Option<&Path>,
) -> Result<ExtractSummary> {
    let code = segment::protocol_code(protocol)?;
    let out_dir = save_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| folder.join(format!("{protocol}_{occurrence}")));
    fs::create_dir_all(&out_dir)?;

    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with("_data.csv"))
        })
        .collect();
    files.sort();

    let mut summary = ExtractSummary::default();
    for path in files {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match extract_one(&path, code, occurrence, pad_before_min, pad_after_min, &out_dir, protocol)
        {
            Ok(()) => summary.extracted.push(name),
            Err(err) => {
                log::error!("{}: {err}", path.display());
                summary.failed.push((name, err.to_string()));
            }
        }
    }
    Ok(summary)
}

fn extract_one(
    path: &Path,
    code: i64,
    occurrence: usize,
    pad_before_min: f64,
    pad_after_min: f64,
    out_dir: &Path,
    protocol: &str,
) -> Result<()> {
    let stream = persist::read_stream_csv(path)?;
    let extract =
        segment::extract_segment(&stream, code, occurrence, pad_before_min, pad_after_min)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    persist::write_stream_csv(
        &extract.stream,
        &out_dir.join(format!("{stem}_{protocol}_{occurrence}.csv")),
    )?;
    Ok(())
}
