//! Map configuration via `cachet.toml`
//!
//! A functional map is created from a [`FunctionalConfig`]. The config can
//! be built in code, parsed from a TOML string, or read from a file; a
//! commented default file can be written on first start and edited
//! afterwards.
//!
//! Mode strings are validated eagerly when a config is parsed, so a typo
//! surfaces as [`Error::InvalidConfig`] instead of a silently ignored
//! setting.

use serde::{Deserialize, Serialize};
use std::path::Path;

use cachet_core::{
    Error, ExecutionMode, LockingMode, Param, Params, PersistenceMode, ReplicationMode, Result,
    StatisticsMode,
};

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "cachet.toml";

/// Default `Params` applied to every operation of a map, as mode strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamsConfig {
    /// `"load_persist"`, `"skip_persist"`, `"skip_load"` or `"skip"`
    #[serde(default = "default_persistence")]
    pub persistence: String,
    /// `"lock"`, `"skip"` or `"try_lock"`
    #[serde(default = "default_locking")]
    pub locking: String,
    /// `"all"`, `"local"` or `"local_site"`
    #[serde(default = "default_execution")]
    pub execution: String,
    /// `"gather"` or `"skip"`
    #[serde(default = "default_statistics_mode")]
    pub statistics: String,
    /// `"sync"` or `"async"`
    #[serde(default = "default_replication")]
    pub replication: String,
}

fn default_persistence() -> String {
    "load_persist".to_string()
}

fn default_locking() -> String {
    "lock".to_string()
}

fn default_execution() -> String {
    "all".to_string()
}

fn default_statistics_mode() -> String {
    "gather".to_string()
}

fn default_replication() -> String {
    "sync".to_string()
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            persistence: default_persistence(),
            locking: default_locking(),
            execution: default_execution(),
            statistics: default_statistics_mode(),
            replication: default_replication(),
        }
    }
}

/// Functional map configuration.
///
/// # Example
///
/// ```toml
/// name = "users"
/// worker_threads = 4
/// lock_timeout_ms = 10000
///
/// [params]
/// locking = "try_lock"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionalConfig {
    /// Map name, used in logs and authorization checks.
    #[serde(default = "default_name")]
    pub name: String,
    /// Number of worker threads running functions.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Maximum number of queued functions before new ones are rejected.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// How long a locking operation waits for a key's lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Master switch for statistics; `false` ignores `StatisticsMode::Gather`.
    #[serde(default = "default_statistics")]
    pub statistics: bool,
    /// Default per-operation params.
    #[serde(default)]
    pub params: ParamsConfig,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_worker_threads() -> usize {
    4
}

fn default_max_queue_depth() -> usize {
    65_536
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_statistics() -> bool {
    true
}

impl Default for FunctionalConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            worker_threads: default_worker_threads(),
            max_queue_depth: default_max_queue_depth(),
            lock_timeout_ms: default_lock_timeout_ms(),
            statistics: default_statistics(),
            params: ParamsConfig::default(),
        }
    }
}

impl FunctionalConfig {
    /// Default config with the given map name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse the `[params]` strings into a `Params` table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first unknown mode.
    pub fn default_params(&self) -> Result<Params> {
        let p = &self.params;
        let persistence = match p.persistence.as_str() {
            "load_persist" => PersistenceMode::LoadPersist,
            "skip_persist" => PersistenceMode::SkipPersist,
            "skip_load" => PersistenceMode::SkipLoad,
            "skip" => PersistenceMode::Skip,
            other => return Err(invalid_mode("persistence", other)),
        };
        let locking = match p.locking.as_str() {
            "lock" => LockingMode::Lock,
            "skip" => LockingMode::Skip,
            "try_lock" => LockingMode::TryLock,
            other => return Err(invalid_mode("locking", other)),
        };
        let execution = match p.execution.as_str() {
            "all" => ExecutionMode::All,
            "local" => ExecutionMode::Local,
            "local_site" => ExecutionMode::LocalSite,
            other => return Err(invalid_mode("execution", other)),
        };
        let statistics = match p.statistics.as_str() {
            "gather" => StatisticsMode::Gather,
            "skip" => StatisticsMode::Skip,
            other => return Err(invalid_mode("statistics", other)),
        };
        let replication = match p.replication.as_str() {
            "sync" => ReplicationMode::Sync,
            "async" => ReplicationMode::Async,
            other => return Err(invalid_mode("replication", other)),
        };
        Ok(Params::from_params(&[
            Param::from(persistence),
            Param::from(locking),
            Param::from(execution),
            Param::from(statistics),
            Param::from(replication),
        ]))
    }

    /// Check numeric limits and mode strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.max_queue_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_queue_depth must be at least 1".to_string(),
            ));
        }
        self.default_params().map(|_| ())
    }

    /// Parse and validate a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the text is not valid TOML for
    /// this config or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FunctionalConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Cachet functional map configuration
#
# Map name, used in logs and authorization checks
name = "default"

# Worker threads executing functions (default: 4)
worker_threads = 4

# Queued functions beyond this depth are rejected (default: 65536)
max_queue_depth = 65536

# How long a locking write waits for its key, in milliseconds (default: 10000)
lock_timeout_ms = 10000

# Gather hit / miss / store / remove statistics (default: true)
statistics = true

# Default per-operation params; a call can still override them.
[params]
persistence = "load_persist"   # load_persist | skip_persist | skip_load | skip
locking = "lock"               # lock | skip | try_lock
execution = "all"              # all | local | local_site
statistics = "gather"          # gather | skip
replication = "sync"           # sync | async
"#
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn invalid_mode(setting: &str, value: &str) -> Error {
    Error::InvalidConfig(format!("Invalid {} mode '{}'", setting, value))
}
