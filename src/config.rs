//! Layered configuration: defaults, `.worklog.toml`, environment, CLI.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Name of the optional per-workspace config file.
pub const CONFIG_FILE_NAME: &str = ".worklog.toml";

/// Default commit interval (1 minute).
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default shadow repository directory, relative to the workspace root.
pub const DEFAULT_SHADOW_DIR: &str = ".code-tracking";

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const INTERVAL_ENV_VAR: &str = "WORKLOG_INTERVAL_SECS";
const API_KEY_ENV_VAR: &str = "WORKLOG_API_KEY";
const GEMINI_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const MODEL_ENV_VAR: &str = "WORKLOG_MODEL";
const API_BASE_ENV_VAR: &str = "WORKLOG_API_BASE";
const TIMEOUT_ENV_VAR: &str = "WORKLOG_TIMEOUT_SECS";

/// How changed files are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackingMode {
    /// Filesystem watcher events.
    Watch,
    /// Repository status query before each cycle.
    Status,
}

impl FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "watch" => Ok(Self::Watch),
            "status" => Ok(Self::Status),
            _ => Err(format!("Unknown tracking mode: {}", s)),
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Watch => write!(f, "watch"),
            TrackingMode::Status => write!(f, "status"),
        }
    }
}

/// Where journal commits are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitTarget {
    /// Copy changed files into a separate shadow repository.
    Shadow,
    /// Commit directly into the workspace repository.
    InPlace,
}

impl FromStr for CommitTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shadow" => Ok(Self::Shadow),
            "in-place" | "inplace" => Ok(Self::InPlace),
            _ => Err(format!("Unknown commit target: {}", s)),
        }
    }
}

impl fmt::Display for CommitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitTarget::Shadow => write!(f, "shadow"),
            CommitTarget::InPlace => write!(f, "in-place"),
        }
    }
}

/// Settings for the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolved configuration for one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub interval_secs: u64,
    pub tracking: TrackingMode,
    pub target: CommitTarget,
    pub shadow_dir: String,
    pub use_diffs: bool,
    pub include_previous_message: bool,
    pub debounce_ms: u64,
    /// Extra gitignore-style patterns, merged with the defaults and `.gitignore`.
    pub ignore: Vec<String>,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            tracking: TrackingMode::Watch,
            target: CommitTarget::Shadow,
            shadow_dir: DEFAULT_SHADOW_DIR.to_string(),
            use_diffs: false,
            include_previous_message: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ignore: Vec::new(),
            generator: GeneratorConfig::default(),
        }
    }
}

/// Command-line overrides, applied after file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interval_secs: Option<u64>,
    pub tracking: Option<TrackingMode>,
    pub target: Option<CommitTarget>,
    pub use_diffs: bool,
}

impl Config {
    /// Load the configuration for a workspace root.
    ///
    /// Reads `<root>/.worklog.toml` when present, then applies environment
    /// variables and finally `overrides`.
    pub fn load(root: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match Self::from_file(&root.join(CONFIG_FILE_NAME))? {
            Some(config) => config,
            None => Self::default(),
        };
        config.apply_env();
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file, returning `Ok(None)` if it does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Apply `WORKLOG_*` environment variables.
    pub fn apply_env(&mut self) {
        self.interval_secs = env_u64(INTERVAL_ENV_VAR, self.interval_secs);
        self.generator.timeout_secs = env_u64(TIMEOUT_ENV_VAR, self.generator.timeout_secs);

        if let Some(key) = env_string(API_KEY_ENV_VAR).or_else(|| env_string(GEMINI_KEY_ENV_VAR)) {
            self.generator.api_key = Some(key);
        }
        if let Some(model) = env_string(MODEL_ENV_VAR) {
            self.generator.model = model;
        }
        if let Some(base) = env_string(API_BASE_ENV_VAR) {
            self.generator.api_base = base;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(secs) = overrides.interval_secs {
            self.interval_secs = secs;
        }
        if let Some(tracking) = overrides.tracking {
            self.tracking = tracking;
        }
        if let Some(target) = overrides.target {
            self.target = target;
        }
        if overrides.use_diffs {
            self.use_diffs = true;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generator.timeout_secs must be at least 1".to_string(),
            ));
        }
        let shadow = Path::new(&self.shadow_dir);
        if self.shadow_dir.trim().is_empty() || shadow.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "shadow_dir must be a relative directory name, got '{}'",
                self.shadow_dir
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Absolute path of the shadow repository for `root`.
    pub fn shadow_root(&self, root: &Path) -> PathBuf {
        root.join(&self.shadow_dir)
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

/// Read a numeric environment variable.
///
/// Logs a warning and keeps `current` if the value is set but invalid.
fn env_u64(name: &str, current: u64) -> u64 {
    match env::var(name) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {} value '{}', using {}", name, v, current);
                current
            }
        },
        _ => current,
    }
}
