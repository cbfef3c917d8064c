//! Configuration loading using Figment
//!
//! Configuration is layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (usually `config/stm_automator.toml`)
//! 3. Environment variables prefixed with `STM_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! STM_APPLICATION__LOG_LEVEL=debug
//! STM_SIMULATION__ITEM_TIME_MS=10
//! STM_SIMULATION__FAIL_AT_ITEM=3
//! ```
//!
//! # Example
//!
//! ```toml
//! [application]
//! name = "Night run"
//! log_level = "info"
//!
//! [[tasks]]
//! name = "Bias series"
//! sweep_parameter = "bias"
//! sweep_start = -1.0
//! sweep_stop = 1.0
//! sweep_step = 0.5
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::StmError;
use crate::plan::SweepSpecification;
use crate::task_list::TaskList;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/stm_automator.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment could not be parsed
    #[error("Configuration load error: {0}")]
    LoadError(#[from] figment::Error),
    /// Values parsed but are not acceptable
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
    /// A configured task specification is invalid
    #[error("Invalid task '{name}': {source}")]
    InvalidTask {
        /// Task name from the file
        name: String,
        /// Underlying planning error
        #[source]
        source: StmError,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomatorConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Mock executor settings
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Task specifications queued at startup
    #[serde(default)]
    pub tasks: Vec<SweepSpecification>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Mock executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated time per work item in milliseconds
    #[serde(default = "default_item_time_ms")]
    pub item_time_ms: u64,
    /// Work item index at which the executor reports a failure
    #[serde(default)]
    pub fail_at_item: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            item_time_ms: default_item_time_ms(),
            fail_at_item: None,
        }
    }
}

impl SimulationConfig {
    /// Simulated time per work item
    pub fn item_time(&self) -> Duration {
        Duration::from_millis(self.item_time_ms)
    }
}

fn default_name() -> String {
    "STM Automator".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_item_time_ms() -> u64 {
    50
}

impl AutomatorConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file cannot be parsed or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("STM_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Every task specification passes its own validation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        for task in &self.tasks {
            task.validate().map_err(|source| ConfigError::InvalidTask {
                name: task.name.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Expand every configured task into a fresh task list.
    pub fn task_list(&self) -> Result<TaskList, ConfigError> {
        let mut list = TaskList::new();
        for task in &self.tasks {
            list.add(task.clone())
                .map_err(|source| ConfigError::InvalidTask {
                    name: task.name.clone(),
                    source,
                })?;
        }
        Ok(list)
    }
}
