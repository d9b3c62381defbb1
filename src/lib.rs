//! YOLO label post-processing tools
//!
//! This library filters per-frame YOLO detection labels by temporal
//! continuity, reduces prediction files to their best box and clamps boxes
//! into normalized image coordinates.

pub mod config;
pub mod continuity;
pub mod error;
pub mod filter;
pub mod frame_index;
pub mod io;
pub mod normalize;
pub mod postprocess;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{BestBoxArgs, Cli, Command, DuplicatePolicy, FilterArgs, NormalizeArgs};
pub use continuity::{compute_valid_frames, segments, ContinuityAnalyzer};
pub use error::{Error, Result};
pub use filter::process_continuity_filter;
pub use frame_index::extract_frame_index;
pub use normalize::process_normalize;
pub use postprocess::process_best_box;
pub use types::{FilterStats, FrameIndex, Segment, Sequence, Threshold, YoloBox};
