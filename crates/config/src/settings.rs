// User settings
// Loaded from ~/.config/feedsync/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("error parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Store layout
    #[serde(rename = "store.root")]
    pub store_root: String,

    #[serde(rename = "store.inbox")]
    pub inbox: String,

    #[serde(rename = "store.outbox")]
    pub outbox: String,

    #[serde(rename = "store.logs")]
    pub logs: String,

    /// Local working directory for fetched and generated files.
    /// None = system temp dir.
    #[serde(rename = "store.staging")]
    pub staging: Option<String>,

    // Files
    #[serde(rename = "files.incoming")]
    pub incoming_file: String,

    #[serde(rename = "files.master")]
    pub master_file: String,

    #[serde(rename = "files.runLog")]
    pub run_log_file: String,

    // Sync
    /// Path to a sync config TOML. None = built-in views.
    #[serde(rename = "sync.config")]
    pub sync_config: Option<String>,

    // Logging
    #[serde(rename = "log.filter")]
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_root: ".".into(),
            inbox: "In/Plytix".into(),
            outbox: "In/Plytix/Upload".into(),
            logs: "In/Plytix/Logs".into(),
            staging: None,
            incoming_file: "plytix_feed.csv".into(),
            master_file: "MASTER_plytix_feed.csv".into(),
            run_log_file: "sync_log.csv".into(),
            sync_config: None,
            log_filter: "info".into(),
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Store layout (directories are relative to store.root)
    "store.root": ".",
    "store.inbox": "In/Plytix",
    "store.outbox": "In/Plytix/Upload",
    "store.logs": "In/Plytix/Logs",
    // Local working directory, null = system temp dir
    "store.staging": null,

    // Feed and log file names
    "files.incoming": "plytix_feed.csv",
    "files.master": "MASTER_plytix_feed.csv",
    "files.runLog": "sync_log.csv",

    // Sync config TOML (views, schema, metafields), null = built-in
    "sync.config": null,

    // Log filter, overridden by RUST_LOG
    "log.filter": "info"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedsync");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> (Self, Option<SettingsError>) {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file is created with commented defaults;
    /// an unreadable or invalid one yields defaults. The second value is
    /// the reason defaults were used, for the caller to report once
    /// logging is up.
    pub fn load_from(path: &Path) -> (Self, Option<SettingsError>) {
        if !path.exists() {
            let err = Self::create_default_file(path).err();
            return (Self::default(), err);
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) => {
                let err = SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                };
                return (Self::default(), Some(err));
            }
        };

        match Self::parse(&contents) {
            Ok(settings) => (settings, None),
            Err(SettingsError::Json(source)) => {
                let err = SettingsError::Parse {
                    path: path.to_path_buf(),
                    source,
                };
                (Self::default(), Some(err))
            }
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, SettingsError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }

    /// Save current settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        ensure_parent(path)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the commented default settings file
    pub fn create_default_file(path: &Path) -> Result<(), SettingsError> {
        ensure_parent(path)?;
        fs::write(path, DEFAULT_FILE).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn store_dir(&self, dir: &str) -> PathBuf {
        Path::new(&self.store_root).join(dir)
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.store_dir(&self.inbox)
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.store_dir(&self.outbox)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.store_dir(&self.logs)
    }

    pub fn staging_dir(&self) -> PathBuf {
        match &self.staging {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("feedsync"),
        }
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

fn ensure_parent(path: &Path) -> Result<(), SettingsError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
