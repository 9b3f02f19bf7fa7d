use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(path.as_ref())
        .with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

/// Resolve an input location (a file or a directory tree) to its file list.
pub fn list_files_recursive(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

pub fn read_lines(path: impl AsRef<Path>) -> Result<impl Iterator<Item = Result<String>>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("open {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    Ok(reader.lines().map(|l| l.map_err(anyhow::Error::from)))
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(&path)
        .with_context(|| format!("create {}", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}
