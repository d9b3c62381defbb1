use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Threshold;
use crate::utils::backup_dir_for;

/// Offline post-processing for YOLO label files.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Keep only detections that persist over a run of consecutive frames
    Filter(FilterArgs),
    /// Keep only the highest-confidence box of every label file
    BestBox(BestBoxArgs),
    /// Clamp every box into the normalized unit square
    Normalize(NormalizeArgs),
}

/// Parameters of the temporal continuity filter
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Directory containing one YOLO label file per video frame
    #[arg(short = 'i', long = "input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving the filtered label files
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: PathBuf,

    /// Minimum number of consecutive frames with detections to keep them
    #[arg(short = 'n', long = "threshold", default_value = "30", value_parser = validate_threshold)]
    pub threshold: Threshold,

    /// Skip copying the original label files to `<output_dir>_backup`
    #[arg(long = "no_backup")]
    pub no_backup: bool,

    /// What to do when two files resolve to the same frame number
    #[arg(long = "on_duplicate", value_enum, default_value = "reject")]
    pub on_duplicate: DuplicatePolicy,

    /// Optional path for a JSON report of the run
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
}

impl FilterArgs {
    pub fn validate(&self) -> Result<()> {
        validate_dirs(&self.input_dir, Some(self.output_dir.as_path()))?;
        if !self.no_backup {
            validate_backup_dir(&self.input_dir, &self.output_dir)?;
        }
        Ok(())
    }
}

/// Parameters of the best-box pass
#[derive(Args, Debug, Clone)]
pub struct BestBoxArgs {
    /// Directory containing YOLO prediction label files
    #[arg(short = 'i', long = "input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving the reduced label files
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: PathBuf,

    /// Skip copying the original label files to `<output_dir>_backup`
    #[arg(long = "no_backup")]
    pub no_backup: bool,
}

impl BestBoxArgs {
    pub fn validate(&self) -> Result<()> {
        validate_dirs(&self.input_dir, Some(self.output_dir.as_path()))?;
        if !self.no_backup {
            validate_backup_dir(&self.input_dir, &self.output_dir)?;
        }
        Ok(())
    }
}

/// Parameters of the normalization pass
#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Directory containing YOLO label files
    #[arg(short = 'i', long = "input_dir")]
    pub input_dir: PathBuf,

    /// Output directory; files are rewritten in place when omitted
    #[arg(short = 'o', long = "output_dir")]
    pub output_dir: Option<PathBuf>,
}

impl NormalizeArgs {
    pub fn validate(&self) -> Result<()> {
        validate_dirs(&self.input_dir, None)
    }
}

// Policy for two label files that resolve to the same frame number
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum DuplicatePolicy {
    /// Abort the run and name both files
    #[default]
    Reject,
    /// Keep the file whose name sorts first
    First,
    /// Keep the file whose name sorts last
    Last,
}

// Validate that the threshold is a positive integer
fn validate_threshold(s: &str) -> std::result::Result<Threshold, String> {
    s.parse::<Threshold>()
        .map_err(|_| "THRESHOLD must be a positive integer".to_string())
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// Copying into the input directory would truncate every original before it is read
fn validate_backup_dir(input_dir: &Path, output_dir: &Path) -> Result<()> {
    let input = canonical_or_raw(input_dir);
    let candidates = [
        backup_dir_for(output_dir),
        backup_dir_for(&canonical_or_raw(output_dir)),
    ];
    for backup_dir in candidates {
        if canonical_or_raw(&backup_dir) == input {
            return Err(Error::BackupOverlapsInput(backup_dir));
        }
    }
    Ok(())
}

fn validate_dirs(input_dir: &Path, output_dir: Option<&Path>) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(Error::MissingInputDir(input_dir.to_path_buf()));
    }

    if let Some(output_dir) = output_dir {
        let input = input_dir
            .canonicalize()
            .map_err(|e| Error::io(input_dir, e))?;
        let output = canonical_or_raw(output_dir);
        if input == output {
            return Err(Error::SameInputOutput(output_dir.to_path_buf()));
        }
    }

    Ok(())
}
