use std::path::PathBuf;
use thiserror::Error;

use crate::types::FrameIndex;

/// Errors produced by the label tools
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("threshold must be a positive integer, got {0}")]
    InvalidThreshold(String),
    #[error("input directory does not exist: {}", .0.display())]
    MissingInputDir(PathBuf),
    #[error("output directory must differ from the input directory: {}", .0.display())]
    SameInputOutput(PathBuf),
    #[error("backup directory would overwrite the input directory: {}", .0.display())]
    BackupOverlapsInput(PathBuf),
    #[error("frame {index} is claimed by both {} and {}", .first.display(), .second.display())]
    DuplicateFrame {
        index: FrameIndex,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("malformed label line {line}: {reason}")]
    Parse { line: String, reason: String },
    #[error("failed to write report: {0}")]
    Report(#[from] serde_json::Error),
}

impl Error {
    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
