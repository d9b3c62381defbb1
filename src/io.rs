use glob::{glob, Pattern};
use log::warn;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::YoloBox;

/// List the `*.txt` label files directly inside `dir`, sorted by path
pub fn list_label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.txt", Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// A label file carries a detection when it exists and is not blank
pub fn has_detection(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::read_to_string(path) {
        Ok(content) => !content.trim().is_empty(),
        Err(e) => {
            warn!("Failed to read label file ({}): {}", path.display(), e);
            false
        }
    }
}

/// Read all boxes of a label file. Lines with fewer than five fields are
/// ignored; a line that has enough fields but does not parse fails the file.
pub fn read_boxes(path: &Path) -> Result<Vec<YoloBox>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.split_whitespace().count() >= 5)
        .map(str::parse::<YoloBox>)
        .collect()
}

/// Write boxes to a label file, one per line
pub fn write_boxes(path: &Path, boxes: &[YoloBox]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for yolo_box in boxes {
        writeln!(writer, "{}", yolo_box).map_err(|e| Error::io(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Create (or truncate) an empty label file
pub fn write_empty(path: &Path) -> Result<()> {
    File::create(path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Copy a label file unchanged
pub fn copy_label(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| Error::io(from, e))?;
    Ok(())
}
