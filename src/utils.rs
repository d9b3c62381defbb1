use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::error::{Error, Result};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Create a directory (and its parents) if missing; existing content is kept
pub fn ensure_output_directory(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    Ok(path.to_path_buf())
}

/// Backup location that sits next to the output directory: `<output>_backup`
pub fn backup_dir_for(output_dir: &Path) -> PathBuf {
    match output_dir.file_name() {
        Some(name) => {
            let mut backup_name = name.to_os_string();
            backup_name.push("_backup");
            output_dir.with_file_name(backup_name)
        }
        None => output_dir.join("backup"),
    }
}

/// Copy every file into `backup_dir`, keeping file names. Returns the number
/// of files copied.
pub fn backup_files(files: &[PathBuf], backup_dir: &Path) -> Result<usize> {
    ensure_output_directory(backup_dir)?;

    let pb = create_progress_bar(files.len() as u64, "Backup");
    let failed = AtomicUsize::new(0);
    files.par_iter().for_each(|file| {
        if let Some(name) = file.file_name() {
            if let Err(e) = fs::copy(file, backup_dir.join(name)) {
                error!("Failed to back up {}: {}", file.display(), e);
                failed.fetch_add(1, Relaxed);
            }
        }
        pb.inc(1);
    });
    pb.finish_with_message("Backup complete");

    let failed = failed.into_inner();
    if failed > 0 {
        return Err(Error::io(
            backup_dir,
            std::io::Error::other(format!("{} file(s) could not be backed up", failed)),
        ));
    }
    Ok(files.len())
}
