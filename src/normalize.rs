use log::{error, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::config::NormalizeArgs;
use crate::error::{Error, Result};
use crate::io::{list_label_files, write_boxes};
use crate::types::{NormalizeStats, YoloBox};
use crate::utils::{create_progress_bar, ensure_output_directory};

const MIN_SIZE: f64 = 0.001;

/// Clamp a box so that it lies inside the unit square.
///
/// Width and height end up in `[0.001, 1]`, and the center is pulled in
/// far enough that no edge crosses the image border.
pub fn normalize_box(yolo_box: YoloBox) -> YoloBox {
    let width = yolo_box.width.clamp(MIN_SIZE, 1.0);
    let height = yolo_box.height.clamp(MIN_SIZE, 1.0);
    let (half_w, half_h) = (width / 2.0, height / 2.0);

    YoloBox {
        x_center: yolo_box.x_center.clamp(0.0, 1.0).clamp(half_w, 1.0 - half_w),
        y_center: yolo_box.y_center.clamp(0.0, 1.0).clamp(half_h, 1.0 - half_h),
        width,
        height,
        ..yolo_box
    }
}

/// Parse a plain five-field annotation line. Negative class ids become 0;
/// anything else that does not parse yields `None`.
pub fn parse_annotation_line(line: &str) -> Option<YoloBox> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return None;
    }

    let class_id = parts[0].parse::<i64>().ok()?.clamp(0, u32::MAX as i64) as u32;
    let mut values = [0.0f64; 4];
    for (value, field) in values.iter_mut().zip(&parts[1..]) {
        *value = field.parse::<f64>().ok().filter(|v| v.is_finite())?;
    }

    Some(YoloBox {
        class_id,
        x_center: values[0],
        y_center: values[1],
        width: values[2],
        height: values[3],
        confidence: None,
    })
}

/// Normalize one label file. Returns `(boxes written, lines dropped)`.
pub fn normalize_label_file(label_file: &Path, output_path: &Path) -> Result<(usize, usize)> {
    let content = fs::read_to_string(label_file).map_err(|e| Error::io(label_file, e))?;

    let mut boxes = Vec::new();
    let mut dropped = 0;
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        match parse_annotation_line(line) {
            Some(yolo_box) => boxes.push(normalize_box(yolo_box)),
            None => dropped += 1,
        }
    }

    write_boxes(output_path, &boxes)?;
    Ok((boxes.len(), dropped))
}

/// Clamp every box of every label file in `args.input_dir`
pub fn process_normalize(args: &NormalizeArgs) -> Result<NormalizeStats> {
    args.validate()?;

    let mut stats = NormalizeStats::default();
    let files = list_label_files(&args.input_dir)?;
    stats.total_files = files.len();
    if files.is_empty() {
        warn!("No label files found in {}", args.input_dir.display());
        return Ok(stats);
    }
    info!("Found {} label files.", files.len());

    let output_dir = match &args.output_dir {
        Some(dir) => ensure_output_directory(dir)?,
        None => args.input_dir.clone(),
    };

    let kept = AtomicUsize::new(0);
    let dropped = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let pb = create_progress_bar(files.len() as u64, "Normalize");
    files.par_iter().for_each(|label_file| {
        let Some(name) = label_file.file_name() else {
            pb.inc(1);
            return;
        };
        match normalize_label_file(label_file, &output_dir.join(name)) {
            Ok((written, skipped)) => {
                kept.fetch_add(written, Relaxed);
                dropped.fetch_add(skipped, Relaxed);
            }
            Err(e) => {
                error!("Failed to normalize {}: {}", label_file.display(), e);
                failed.fetch_add(1, Relaxed);
            }
        }
        pb.inc(1);
    });
    pb.finish_with_message("Normalization complete");

    stats.kept_boxes = kept.into_inner();
    stats.dropped_lines = dropped.into_inner();
    stats.failed_files = failed.into_inner();
    stats.print_summary();

    Ok(stats)
}
