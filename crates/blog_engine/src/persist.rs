use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {path}: {message}")]
    OutputDir { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PersistError {
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            PersistError::Io(err) => Some(err),
            PersistError::OutputDir { .. } => None,
        }
    }
}

/// Ensure `dir` exists as a directory, creating it and its parents if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let failure = |message: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        message,
    };
    if dir.exists() {
        if !dir.is_dir() {
            return Err(failure("path is not a directory".into()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| failure(e.to_string()))
}

/// Path of the Markdown file a post with `filename` is stored under.
pub fn markdown_path(posts_dir: &Path, filename: &str) -> PathBuf {
    posts_dir.join(format!("{filename}.md"))
}

/// Writes whole files into one directory via temp file + rename, so a
/// reader never observes a partially written document.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
