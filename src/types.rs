use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Ordering key of a frame, recovered from its label file name
pub type FrameIndex = u64;

/// Detection presence per frame index for one directory
pub type Sequence = BTreeMap<FrameIndex, bool>;

/// Minimum run length a run of detections needs before its frames are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(NonZeroUsize);

impl Threshold {
    pub fn new(value: usize) -> Result<Self> {
        NonZeroUsize::new(value)
            .map(Threshold)
            .ok_or_else(|| Error::InvalidThreshold(value.to_string()))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl FromStr for Threshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidThreshold(s.to_string()))?;
        Threshold::new(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One YOLO box: `class x_center y_center width height [confidence]`.
///
/// Geometry is normalized to the image size, so every coordinate is expected
/// in `0.0..=1.0`. `confidence` is only present for prediction output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YoloBox {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: Option<f64>,
}

impl YoloBox {
    /// Confidence used for ranking; plain annotations count as certain
    pub fn score(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }
}

fn parse_field<T: FromStr>(line: &str, field: &str, name: &str) -> Result<T> {
    field.parse::<T>().map_err(|_| Error::Parse {
        line: line.to_string(),
        reason: format!("invalid {}: {:?}", name, field),
    })
}

fn parse_finite(line: &str, field: &str, name: &str) -> Result<f64> {
    let value: f64 = parse_field(line, field, name)?;
    if !value.is_finite() {
        return Err(Error::Parse {
            line: line.to_string(),
            reason: format!("{} is not finite: {:?}", name, field),
        });
    }
    Ok(value)
}

impl FromStr for YoloBox {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            return Err(Error::Parse {
                line: line.to_string(),
                reason: format!("expected at least 5 fields, found {}", parts.len()),
            });
        }

        let confidence = match parts.get(5) {
            Some(field) => Some(parse_finite(line, field, "confidence")?),
            None => None,
        };

        Ok(YoloBox {
            class_id: parse_field(line, parts[0], "class id")?,
            x_center: parse_finite(line, parts[1], "x center")?,
            y_center: parse_finite(line, parts[2], "y center")?,
            width: parse_finite(line, parts[3], "width")?,
            height: parse_finite(line, parts[4], "height")?,
            confidence,
        })
    }
}

impl fmt::Display for YoloBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )?;
        if let Some(confidence) = self.confidence {
            write!(f, " {:.6}", confidence)?;
        }
        Ok(())
    }
}

/// A maximal stride-1 stretch of kept frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: FrameIndex,
    pub end: FrameIndex,
    pub len: usize,
}

// Statistics for one continuity filter run
#[derive(Debug, Default, Clone, Serialize)]
pub struct FilterStats {
    pub total_files: usize,
    pub resolved_frames: usize,
    pub unresolved_files: Vec<PathBuf>,
    pub duplicate_frames: usize,
    pub frames_with_detections: usize,
    pub valid_frames: usize,
    pub kept: usize,
    pub removed: usize,
    pub empty: usize,
    pub failed_writes: usize,
    pub segments: Vec<Segment>,
}

impl FilterStats {
    pub fn print_summary(&self) {
        log::info!("=== Continuity Filter Summary ===");
        log::info!("Total label files: {}", self.total_files);
        log::info!("Frames with a resolved index: {}", self.resolved_frames);
        log::info!("Frames with detections: {}", self.frames_with_detections);
        log::info!("Frames passing continuity: {}", self.valid_frames);
        log::info!("Kept predictions: {}", self.kept);
        log::info!("Removed predictions: {}", self.removed);
        log::info!("Files without predictions: {}", self.empty);

        if !self.unresolved_files.is_empty() {
            log::warn!(
                "Skipped {} file(s) without a frame number",
                self.unresolved_files.len()
            );
        }
        if self.duplicate_frames > 0 {
            log::warn!(
                "Dropped {} file(s) sharing a frame number with another file",
                self.duplicate_frames
            );
        }
        if self.failed_writes > 0 {
            log::warn!("Failed to write {} output file(s)", self.failed_writes);
        }

        for (i, segment) in self.segments.iter().enumerate() {
            log::info!(
                "Segment {}: frames {}-{} ({} frames)",
                i + 1,
                segment.start,
                segment.end,
                segment.len
            );
        }
    }
}

// Statistics for one best-box pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct PostprocessStats {
    pub total_files: usize,
    pub files_with_multiple_boxes: usize,
    pub files_without_boxes: usize,
    pub original_boxes: usize,
    pub kept_boxes: usize,
    pub failed_files: usize,
}

impl PostprocessStats {
    pub fn print_summary(&self) {
        log::info!("=== Best Box Summary ===");
        log::info!("Total label files: {}", self.total_files);
        log::info!("Files with multiple boxes: {}", self.files_with_multiple_boxes);
        log::info!("Files without boxes: {}", self.files_without_boxes);
        log::info!("Original boxes: {}", self.original_boxes);
        log::info!("Kept boxes: {}", self.kept_boxes);
        log::info!(
            "Removed boxes: {}",
            self.original_boxes.saturating_sub(self.kept_boxes)
        );
        if self.failed_files > 0 {
            log::warn!("Failed to process {} file(s)", self.failed_files);
        }
    }
}

// Statistics for one normalization pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct NormalizeStats {
    pub total_files: usize,
    pub kept_boxes: usize,
    pub dropped_lines: usize,
    pub failed_files: usize,
}

impl NormalizeStats {
    pub fn print_summary(&self) {
        log::info!("=== Normalize Summary ===");
        log::info!("Total label files: {}", self.total_files);
        log::info!("Boxes written: {}", self.kept_boxes);
        if self.dropped_lines > 0 {
            log::warn!("Dropped {} malformed line(s)", self.dropped_lines);
        }
        if self.failed_files > 0 {
            log::warn!("Failed to process {} file(s)", self.failed_files);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_rejects_zero() {
        assert!(Threshold::new(0).is_err());
        assert!("0".parse::<Threshold>().is_err());
        assert!("-3".parse::<Threshold>().is_err());
        assert!("abc".parse::<Threshold>().is_err());
        assert_eq!("30".parse::<Threshold>().unwrap().get(), 30);
    }

    #[test]
    fn test_parse_yolo_box() {
        let plain: YoloBox = "0 0.5 0.5 0.2 0.1".parse().unwrap();
        assert_eq!(plain.class_id, 0);
        assert_eq!(plain.confidence, None);
        assert_eq!(plain.score(), 1.0);

        let predicted: YoloBox = "3 0.1 0.2 0.3 0.4 0.87".parse().unwrap();
        assert_eq!(predicted.class_id, 3);
        assert_eq!(predicted.confidence, Some(0.87));

        assert!("0 0.5 0.5 0.2".parse::<YoloBox>().is_err());
        assert!("x 0.5 0.5 0.2 0.1".parse::<YoloBox>().is_err());
        assert!("0 0.5 0.5 0.2 0.1 nan".parse::<YoloBox>().is_err());
        assert!("0 0.5 inf 0.2 0.1 0.9".parse::<YoloBox>().is_err());
    }

    #[test]
    fn test_display_yolo_box() {
        let plain: YoloBox = "1 0.5 0.25 0.1 0.2".parse().unwrap();
        assert_eq!(plain.to_string(), "1 0.500000 0.250000 0.100000 0.200000");

        let predicted: YoloBox = "1 0.5 0.25 0.1 0.2 0.9".parse().unwrap();
        assert_eq!(
            predicted.to_string(),
            "1 0.500000 0.250000 0.100000 0.200000 0.900000"
        );
    }
}
