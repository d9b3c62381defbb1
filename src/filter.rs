//! Continuity filter pipeline
//!
//! Reads a directory of per-frame YOLO label files, decides which frames
//! belong to a long enough run of detections and writes one output file per
//! frame: the original labels for kept frames, an empty file otherwise.

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::config::{DuplicatePolicy, FilterArgs};
use crate::continuity::{segments, ContinuityAnalyzer};
use crate::error::{Error, Result};
use crate::frame_index::frame_index_of;
use crate::io::{copy_label, has_detection, list_label_files, write_empty};
use crate::types::{FilterStats, FrameIndex, Sequence};
use crate::utils::{backup_dir_for, backup_files, create_progress_bar, ensure_output_directory};

/// Label files keyed by the frame number found in their names
#[derive(Debug, Default)]
pub struct ResolvedFrames {
    pub frames: BTreeMap<FrameIndex, PathBuf>,
    pub unresolved: Vec<PathBuf>,
    pub duplicates: usize,
}

/// Map every file to its frame number, applying `policy` to collisions.
///
/// `files` must be sorted so that first/last-wins is deterministic.
pub fn resolve_frames(files: &[PathBuf], policy: DuplicatePolicy) -> Result<ResolvedFrames> {
    let mut resolved = ResolvedFrames::default();

    for path in files {
        let Some(index) = frame_index_of(path) else {
            warn!("Cannot extract a frame number from {}", path.display());
            resolved.unresolved.push(path.clone());
            continue;
        };

        match resolved.frames.get(&index) {
            None => {
                resolved.frames.insert(index, path.clone());
            }
            Some(existing) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateFrame {
                        index,
                        first: existing.clone(),
                        second: path.clone(),
                    });
                }
                DuplicatePolicy::First => {
                    warn!(
                        "Frame {} already taken by {}, ignoring {}",
                        index,
                        existing.display(),
                        path.display()
                    );
                    resolved.duplicates += 1;
                }
                DuplicatePolicy::Last => {
                    warn!(
                        "Frame {} now taken by {}, ignoring {}",
                        index,
                        path.display(),
                        existing.display()
                    );
                    resolved.frames.insert(index, path.clone());
                    resolved.duplicates += 1;
                }
            },
        }
    }

    Ok(resolved)
}

/// Evaluate detection presence once per frame
pub fn build_sequence(frames: &BTreeMap<FrameIndex, PathBuf>) -> Sequence {
    frames
        .par_iter()
        .map(|(&index, path)| (index, has_detection(path)))
        .collect()
}

/// Write one output file per frame: a copy of the labels when the frame is
/// valid, an empty file otherwise.
fn write_filtered_frames(
    frames: &BTreeMap<FrameIndex, PathBuf>,
    sequence: &Sequence,
    valid: &BTreeSet<FrameIndex>,
    output_dir: &Path,
    stats: &mut FilterStats,
) {
    let kept = AtomicUsize::new(0);
    let removed = AtomicUsize::new(0);
    let empty = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let pb = create_progress_bar(frames.len() as u64, "Filter");
    frames.par_iter().for_each(|(index, path)| {
        let Some(name) = path.file_name() else {
            pb.inc(1);
            return;
        };
        let output_path = output_dir.join(name);
        let had_detection = sequence.get(index).copied().unwrap_or(false);

        let result = if valid.contains(index) {
            copy_label(path, &output_path).map(|_| {
                debug!("Keep: {} (frame {})", path.display(), index);
                kept.fetch_add(1, Relaxed);
            })
        } else {
            write_empty(&output_path).map(|_| {
                if had_detection {
                    debug!("Remove: {} (frame {})", path.display(), index);
                    removed.fetch_add(1, Relaxed);
                } else {
                    empty.fetch_add(1, Relaxed);
                }
            })
        };

        if let Err(e) = result {
            error!("Failed to write {}: {}", output_path.display(), e);
            failed.fetch_add(1, Relaxed);
        }
        pb.inc(1);
    });
    pb.finish_with_message("Filtering complete");

    stats.kept = kept.into_inner();
    stats.removed = removed.into_inner();
    stats.empty = empty.into_inner();
    stats.failed_writes = failed.into_inner();
}

/// Run the continuity filter over `args.input_dir`
pub fn process_continuity_filter(args: &FilterArgs) -> Result<FilterStats> {
    args.validate()?;

    let mut stats = FilterStats::default();
    let files = list_label_files(&args.input_dir)?;
    stats.total_files = files.len();
    if files.is_empty() {
        warn!("No label files found in {}", args.input_dir.display());
        return Ok(stats);
    }
    info!("Found {} label files.", files.len());

    ensure_output_directory(&args.output_dir)?;
    if !args.no_backup {
        let backup_dir = backup_dir_for(&args.output_dir);
        let copied = backup_files(&files, &backup_dir)?;
        info!("Backed up {} files to {}", copied, backup_dir.display());
    }

    let resolved = resolve_frames(&files, args.on_duplicate)?;
    stats.unresolved_files = resolved.unresolved;
    stats.duplicate_frames = resolved.duplicates;
    stats.resolved_frames = resolved.frames.len();

    let (Some(first), Some(last)) = (
        resolved.frames.keys().next(),
        resolved.frames.keys().next_back(),
    ) else {
        warn!("No file carries a frame number, nothing to filter");
        return Ok(stats);
    };
    info!(
        "Resolved {} frames, range {} - {}",
        resolved.frames.len(),
        first,
        last
    );

    let sequence = build_sequence(&resolved.frames);
    stats.frames_with_detections = sequence.values().filter(|&&v| v).count();
    info!("Frames with detections: {}", stats.frames_with_detections);

    let analyzer = ContinuityAnalyzer::new(args.threshold);
    if stats.frames_with_detections < args.threshold.get() {
        info!(
            "Only {} frames have detections, fewer than the threshold of {}; no frame will be kept",
            stats.frames_with_detections, args.threshold
        );
    }
    info!(
        "Analyzing continuity (threshold: {} frames)...",
        analyzer.threshold()
    );
    let valid = analyzer.valid_frames(&sequence);
    stats.valid_frames = valid.len();
    stats.segments = segments(&valid);

    write_filtered_frames(
        &resolved.frames,
        &sequence,
        &valid,
        &args.output_dir,
        &mut stats,
    );

    stats.print_summary();
    if let Some(report) = &args.report {
        write_report(report, &stats)?;
        info!("Report written to {}", report.display());
    }

    Ok(stats)
}

/// Write a run report as pretty-printed JSON
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|e| Error::io(path, e))
}
