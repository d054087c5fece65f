//! Engine configuration.
//!
//! Settings come from an optional JSON file, then environment overrides.
//! Environment lookups go through [`EnvSource`] so tests can supply a map
//! instead of touching the process environment.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::task::domain::{AgentName, TaskDomainError};

/// Overrides the snapshot path.
pub const PERSIST_PATH_VAR: &str = "TASKFORGE_PERSIST_PATH";
/// Enables snapshot persistence after every terminal transition.
pub const PERSIST_VAR: &str = "TASKFORGE_PERSIST";
/// Overrides the shutdown retry bound.
pub const MAX_SHUTDOWN_RETRIES_VAR: &str = "TASKFORGE_MAX_SHUTDOWN_RETRIES";
/// Names the default agent.
pub const DEFAULT_AGENT_VAR: &str = "TASKFORGE_DEFAULT_AGENT";

const DEFAULT_PERSIST_PATH: &str = "./storage/taskstore.json";
const DEFAULT_MAX_SHUTDOWN_RETRIES: u32 = 3;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`EngineConfig`].
    #[error("invalid configuration {path}: {source}")]
    Json {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The default agent name is blank.
    #[error(transparent)]
    Agent(#[from] TaskDomainError),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Source of environment variables.
pub trait EnvSource {
    /// Returns the value of `name`, if set.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Settings shared by the task managers of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshot location.
    pub persist_path: Utf8PathBuf,
    /// Whether managers write a snapshot after every terminal transition.
    pub persist: bool,
    /// Rejected shutdowns tolerated before the task ends in an issue.
    pub max_shutdown_retries: u32,
    /// Agent assigned to tasks without an agent relation.
    pub default_agent: Option<AgentName>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persist_path: Utf8PathBuf::from(DEFAULT_PERSIST_PATH),
            persist: false,
            max_shutdown_retries: DEFAULT_MAX_SHUTDOWN_RETRIES,
            default_agent: None,
        }
    }
}

impl EngineConfig {
    /// Loads `path`, falling back to defaults when the file is absent, then
    /// applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or decoded, or
    /// an override is invalid.
    pub fn load(path: &Utf8Path) -> ConfigResult<Self> {
        Self::load_with_env(path, &ProcessEnv)
    }

    /// Like [`Self::load`], reading overrides from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or decoded, or
    /// an override is invalid.
    pub fn load_with_env(path: &Utf8Path, env: &impl EnvSource) -> ConfigResult<Self> {
        Self::read_file(path)?.unwrap_or_default().with_env(env)
    }

    /// Applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values and
    /// [`ConfigError::Agent`] for a blank agent name.
    pub fn with_env(mut self, env: &impl EnvSource) -> ConfigResult<Self> {
        if let Some(path) = env.var(PERSIST_PATH_VAR) {
            self.persist_path = Utf8PathBuf::from(path);
        }
        if let Some(raw) = env.var(PERSIST_VAR) {
            self.persist = parse_flag(&raw).ok_or(ConfigError::InvalidEnv {
                name: PERSIST_VAR,
                value: raw,
            })?;
        }
        if let Some(raw) = env.var(MAX_SHUTDOWN_RETRIES_VAR) {
            self.max_shutdown_retries =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: MAX_SHUTDOWN_RETRIES_VAR,
                    value: raw.clone(),
                })?;
        }
        if let Some(agent) = env.var(DEFAULT_AGENT_VAR) {
            self.default_agent = Some(AgentName::new(agent)?);
        }
        Ok(self)
    }

    /// Snapshot path when persistence is enabled.
    #[must_use]
    pub fn snapshot_path(&self) -> Option<&Utf8Path> {
        self.persist.then_some(self.persist_path.as_path())
    }

    fn read_file(path: &Utf8Path) -> ConfigResult<Option<Self>> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_owned(),
            source,
        };
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(err)),
        };
        let contents = match dir.read_to_string(file_name) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(err)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Json {
                path: path.to_owned(),
                source,
            })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
