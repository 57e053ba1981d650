//! Writing and Checking Generated Files
//!
//! Each service gets `<dir>/<service>/<file_name>`. A service that no longer
//! produces a document has its previously generated file removed, but only
//! when the file carries the generated-file header.

use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::OutputConfig;
use crate::error::Result;
use crate::gen::{GeneratedDocument, HEADER_MARKER};

/// What happened to a service's file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
    Removed,
    /// No document and nothing generated on disk
    Skipped,
}

/// A file whose contents differ from what generation produces
#[derive(Debug, Clone, PartialEq)]
pub struct StaleFile {
    pub path: PathBuf,
    /// Unified diff from the file on disk to the expected contents
    pub diff: String,
}

/// Writes service documents below the configured output directory
pub struct OutputWriter<'a> {
    config: &'a OutputConfig,
}

impl<'a> OutputWriter<'a> {
    pub fn new(config: &'a OutputConfig) -> Self {
        Self { config }
    }

    pub fn path_for(&self, service: &str) -> PathBuf {
        self.config.dir.join(service).join(&self.config.file_name)
    }

    /// Bring the service's file in line with `doc`
    pub fn write(&self, service: &str, doc: Option<&GeneratedDocument>) -> Result<WriteOutcome> {
        let path = self.path_for(service);
        let existing = read_if_exists(&path)?;

        let Some(doc) = doc else {
            return match existing {
                Some(contents) if is_generated(&contents) => {
                    fs::remove_file(&path)?;
                    info!(path = %path.display(), "removed stale generated file");
                    Ok(WriteOutcome::Removed)
                }
                _ => Ok(WriteOutcome::Skipped),
            };
        };

        let outcome = match existing {
            Some(contents) if contents == doc.contents => {
                debug!(path = %path.display(), "up to date");
                return Ok(WriteOutcome::Unchanged);
            }
            Some(_) => WriteOutcome::Updated,
            None => WriteOutcome::Created,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &doc.contents)?;
        info!(path = %path.display(), outcome = ?outcome, "wrote config document");
        Ok(outcome)
    }

    /// Compare the file on disk with `doc` without touching it
    pub fn check(&self, service: &str, doc: Option<&GeneratedDocument>) -> Result<Option<StaleFile>> {
        let path = self.path_for(service);
        let existing = read_if_exists(&path)?;

        let (old, new) = match (existing, doc) {
            (Some(old), Some(doc)) if old == doc.contents => return Ok(None),
            (Some(old), Some(doc)) => (old, doc.contents.clone()),
            (None, Some(doc)) => (String::new(), doc.contents.clone()),
            (Some(old), None) if is_generated(&old) => (old, String::new()),
            _ => return Ok(None),
        };

        let label = path.display().to_string();
        let diff = TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&label, &label)
            .to_string();
        Ok(Some(StaleFile { path, diff }))
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_generated(contents: &str) -> bool {
    contents.starts_with(HEADER_MARKER)
}
