use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::config::BestBoxArgs;
use crate::error::Result;
use crate::io::{list_label_files, read_boxes, write_boxes, write_empty};
use crate::types::{PostprocessStats, YoloBox};
use crate::utils::{backup_dir_for, backup_files, create_progress_bar, ensure_output_directory};

/// The box with the highest confidence; the earliest one wins a tie
pub fn best_box(boxes: &[YoloBox]) -> Option<YoloBox> {
    boxes.iter().copied().fold(None, |best, candidate| match best {
        Some(current) if current.score() >= candidate.score() => Some(current),
        _ => Some(candidate),
    })
}

/// Reduce one label file to its best box. Returns the original box count.
pub fn process_label_file(label_file: &Path, output_path: &Path) -> Result<usize> {
    let boxes = match read_boxes(label_file) {
        Ok(boxes) => boxes,
        Err(e) => {
            warn!("Failed to read predictions ({}): {}", label_file.display(), e);
            Vec::new()
        }
    };

    match best_box(&boxes) {
        Some(best) => write_boxes(output_path, &[best])?,
        None => write_empty(output_path)?,
    }
    Ok(boxes.len())
}

/// Keep only the highest-confidence box of every label file
pub fn process_best_box(args: &BestBoxArgs) -> Result<PostprocessStats> {
    args.validate()?;

    let mut stats = PostprocessStats::default();
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

    let multiple = AtomicUsize::new(0);
    let without = AtomicUsize::new(0);
    let original = AtomicUsize::new(0);
    let kept = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let pb = create_progress_bar(files.len() as u64, "Best box");
    files.par_iter().for_each(|label_file| {
        let Some(name) = label_file.file_name() else {
            pb.inc(1);
            return;
        };
        match process_label_file(label_file, &args.output_dir.join(name)) {
            Ok(0) => {
                without.fetch_add(1, Relaxed);
            }
            Ok(count) => {
                if count > 1 {
                    debug!(
                        "{}: {} boxes -> 1 box",
                        label_file.display(),
                        count
                    );
                    multiple.fetch_add(1, Relaxed);
                }
                original.fetch_add(count, Relaxed);
                kept.fetch_add(1, Relaxed);
            }
            Err(e) => {
                error!("Failed to process {}: {}", label_file.display(), e);
                failed.fetch_add(1, Relaxed);
            }
        }
        pb.inc(1);
    });
    pb.finish_with_message("Best box selection complete");

    stats.files_with_multiple_boxes = multiple.into_inner();
    stats.files_without_boxes = without.into_inner();
    stats.original_boxes = original.into_inner();
    stats.kept_boxes = kept.into_inner();
    stats.failed_files = failed.into_inner();
    stats.print_summary();

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> YoloBox {
        line.parse().unwrap()
    }

    #[test]
    fn test_best_box_picks_highest_confidence() {
        let boxes = vec![
            parse("0 0.1 0.1 0.1 0.1 0.4"),
            parse("1 0.2 0.2 0.1 0.1 0.9"),
            parse("2 0.3 0.3 0.1 0.1 0.7"),
        ];
        assert_eq!(best_box(&boxes).unwrap().class_id, 1);
    }

    #[test]
    fn test_best_box_tie_keeps_first() {
        let boxes = vec![
            parse("0 0.1 0.1 0.1 0.1 0.8"),
            parse("1 0.2 0.2 0.1 0.1 0.8"),
        ];
        assert_eq!(best_box(&boxes).unwrap().class_id, 0);
    }

    #[test]
    fn test_best_box_without_confidence_counts_as_certain() {
        let boxes = vec![
            parse("0 0.1 0.1 0.1 0.1 0.95"),
            parse("1 0.2 0.2 0.1 0.1"),
        ];
        assert_eq!(best_box(&boxes).unwrap().class_id, 1);
        assert!(best_box(&[]).is_none());
    }

    #[test]
    fn test_non_finite_confidence_fails_the_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("0001.txt");
        let output = temp_dir.path().join("out.txt");
        std::fs::write(&input, "0 0.1 0.1 0.1 0.1 0.9\n1 0.2 0.2 0.1 0.1 nan\n").unwrap();

        assert_eq!(process_label_file(&input, &output).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }
}
