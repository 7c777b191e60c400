//! Configuration management for obs-recorder

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// How to reach and initialize the OBS engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Recording output settings
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Log file location and verbosity
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Locale passed to the engine's API init
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Application version reported to the engine
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix of the IPC endpoint name; a per-session UUID is appended
    #[serde(default = "default_ipc_prefix")]
    pub ipc_prefix: String,

    /// Directory holding the engine binaries (defaults to the current directory)
    pub working_directory: Option<PathBuf>,

    /// Where the engine keeps its own configs and logs
    pub data_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Container format, e.g. "mkv" or "mp4"
    #[serde(default = "default_format")]
    pub format: String,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling log files (defaults to the per-user log dir)
    pub directory: Option<PathBuf>,

    /// Filter used when `RUST_LOG` is unset, e.g. "info" or "obs_recorder=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log files older than this many days are removed at startup
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

// Default value functions
fn default_locale() -> String {
    "en-US".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_ipc_prefix() -> String {
    "obs-recorder".to_string()
}

fn default_format() -> String {
    // Matroska survives crashes mid-recording
    "mkv".to_string()
}

fn default_fps() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retention_days() -> u64 {
    7
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            version: default_version(),
            ipc_prefix: default_ipc_prefix(),
            working_directory: None,
            data_directory: None,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            fps: default_fps(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            retention_days: default_retention_days(),
        }
    }
}

impl RecorderConfig {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = RecorderConfig::default();
            config.config_path = Some(config_path);
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: RecorderConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Use `path` for subsequent saves
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Engine data directory, falling back to the per-user data dir
    pub fn data_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.engine.data_directory {
            return Ok(dir.clone());
        }

        Ok(project_dirs()?.data_dir().join("osn-data"))
    }

    /// Log directory, falling back to `logs/` in the per-user local data dir
    pub fn log_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.logging.directory {
            return Ok(dir.clone());
        }

        let proj_dirs = project_dirs()?;
        let base = proj_dirs.state_dir().unwrap_or_else(|| proj_dirs.data_local_dir());
        Ok(base.join("logs"))
    }

    /// Engine working directory, falling back to the current directory
    pub fn working_directory(&self) -> Result<PathBuf> {
        match &self.engine.working_directory {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to determine working directory"),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }
}

/// Per-user directories shared by the config file, engine data and logs
fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "obs-recorder", "recorder")
        .context("Failed to determine project directories")
}
