//! Download sinks and output file naming

use crate::{Error, Result};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives the finished export. This is the last and only side effect of
/// an export call.
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<()>;
}

impl<T: DownloadSink + ?Sized> DownloadSink for Arc<T> {
    fn save(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<()> {
        (**self).save(filename, mime, bytes)
    }
}

/// Conventional export name: `biodata-<full name or "document">.<ext>`.
pub fn suggested_filename(full_name: Option<&str>, extension: &str) -> String {
    let name = full_name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("document");
    format!("biodata-{}.{}", name, extension)
}

/// Fallback name when the caller does not pass one.
pub fn default_filename(extension: &str) -> String {
    format!("bio-data.{}", extension)
}

/// Replace characters that cannot appear in a single path component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes downloads into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(sanitize_filename(filename))
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(filename);
        std::fs::write(&path, bytes).map_err(Error::Io)?;
        info!("Saved {} ({} bytes, {})", path.display(), bytes.len(), mime);
        Ok(())
    }
}

/// A download captured in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Keeps downloads in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> Vec<Download> {
        self.downloads.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Download> {
        self.downloads.lock().unwrap_or_else(|p| p.into_inner()).last().cloned()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, filename: &str, mime: &str, bytes: &[u8]) -> Result<()> {
        self.downloads.lock().unwrap_or_else(|p| p.into_inner()).push(Download {
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}
