use std::path::{Path, PathBuf};

use crate::error::IoError;
use crate::runlog::{self, RunLogEntry};

/// Where feeds come from and where upload files go.
///
/// Remote transports implement this against their own protocol; `DirStore`
/// implements it over local directories.
pub trait FeedStore {
    /// Copy the inbox file `name` to the local path `dest`.
    fn fetch(&self, name: &str, dest: &Path) -> Result<(), IoError>;

    /// Copy the local file `src` to the outbox as `name`.
    fn publish(&self, src: &Path, name: &str) -> Result<(), IoError>;

    /// Append one entry to the log file `name`.
    fn append_log(&self, name: &str, entry: &RunLogEntry) -> Result<(), IoError>;
}

/// Directory-backed store with separate inbox, outbox and log directories.
#[derive(Debug, Clone)]
pub struct DirStore {
    pub inbox: PathBuf,
    pub outbox: PathBuf,
    pub logs: PathBuf,
}

impl DirStore {
    pub fn new(inbox: impl Into<PathBuf>, outbox: impl Into<PathBuf>, logs: impl Into<PathBuf>) -> Self {
        Self {
            inbox: inbox.into(),
            outbox: outbox.into(),
            logs: logs.into(),
        }
    }

    fn entry(dir: &Path, name: &str) -> Result<PathBuf, IoError> {
        let bare = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if name.is_empty() || !bare || name == "." || name == ".." {
            return Err(IoError::InvalidName(name.to_string()));
        }
        Ok(dir.join(name))
    }

    fn ensure_dir(dir: &Path) -> Result<(), IoError> {
        std::fs::create_dir_all(dir).map_err(|e| IoError::io(dir, e))
    }
}

impl FeedStore for DirStore {
    fn fetch(&self, name: &str, dest: &Path) -> Result<(), IoError> {
        let src = Self::entry(&self.inbox, name)?;
        std::fs::copy(&src, dest).map_err(|e| IoError::io(&src, e))?;
        log::info!("fetched {} -> {}", src.display(), dest.display());
        Ok(())
    }

    fn publish(&self, src: &Path, name: &str) -> Result<(), IoError> {
        let dest = Self::entry(&self.outbox, name)?;
        Self::ensure_dir(&self.outbox)?;
        std::fs::copy(src, &dest).map_err(|e| IoError::io(src, e))?;
        log::info!("published {} -> {}", src.display(), dest.display());
        Ok(())
    }

    fn append_log(&self, name: &str, entry: &RunLogEntry) -> Result<(), IoError> {
        let path = Self::entry(&self.logs, name)?;
        Self::ensure_dir(&self.logs)?;
        runlog::append(&path, entry)
    }
}
