//! Configuration types for rewind

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::appender::DEFAULT_HIGH_WATER_MARK;
use crate::error::{Result, RewindError};
use crate::recorder::RecorderMode;

/// Main configuration for a rewind-instrumented job
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RewindConfig {
    /// Reduce input recorder configuration
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Performance trace configuration
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Reduce input recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Passthrough, record or replay
    #[serde(default)]
    pub mode: RecorderMode,

    /// Binary replay log. Required in record and replay modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl RecorderConfig {
    /// Passthrough configuration (no log)
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Record every reduce group to `path`
    pub fn record(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: RecorderMode::Record,
            log_path: Some(path.into()),
        }
    }

    /// Serve reduce groups from the log at `path`
    pub fn replay(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: RecorderMode::Replay,
            log_path: Some(path.into()),
        }
    }

    /// Log path, or a configuration error if the mode needs one and none is set.
    pub fn require_log_path(&self) -> Result<&PathBuf> {
        self.log_path.as_ref().ok_or_else(|| {
            RewindError::Configuration(format!(
                "recorder mode '{}' requires recorder.log_path",
                self.mode
            ))
        })
    }
}

/// Performance trace configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceConfig {
    /// Emit trace lines at all
    #[serde(default = "default_trace_enabled")]
    pub enabled: bool,

    /// Trace output file
    #[serde(default = "default_trace_path")]
    pub path: PathBuf,

    /// Buffered bytes that trigger a flush to the trace file
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,
}

fn default_trace_enabled() -> bool {
    true
}

fn default_trace_path() -> PathBuf {
    PathBuf::from("performance.trace")
}

fn default_high_water_mark() -> usize {
    DEFAULT_HIGH_WATER_MARK
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: default_trace_enabled(),
            path: default_trace_path(),
            high_water_mark: default_high_water_mark(),
        }
    }
}

impl TraceConfig {
    /// A configuration with tracing switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Builder for RewindConfig
pub struct ConfigBuilder {
    config: RewindConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: RewindConfig::default(),
        }
    }

    /// Set recorder configuration
    pub fn recorder(mut self, config: RecorderConfig) -> Self {
        self.config.recorder = config;
        self
    }

    /// Set trace configuration
    pub fn trace(mut self, config: TraceConfig) -> Self {
        self.config.trace = config;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RewindConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RewindConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `rewind.toml` in the working directory
    /// 3. The file named by `REWIND_CONFIG_PATH`, if set
    /// 4. `REWIND_`-prefixed environment variables, nested with `__`
    ///    (e.g. `REWIND_RECORDER__MODE=replay`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid or the merged
    /// configuration fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(RewindConfig::default()))
            .merge(Toml::file("rewind.toml"));

        if let Ok(path) = std::env::var("REWIND_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: RewindConfig = figment
            .merge(Env::prefixed("REWIND_").ignore(&["CONFIG_PATH"]).split("__"))
            .extract()
            .map_err(|e| {
                RewindError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: RewindConfig = Figment::from(Serialized::defaults(RewindConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                RewindError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Record and replay modes need a log path; the trace high water mark
    /// must be non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.recorder.mode != RecorderMode::Passthrough {
            self.recorder.require_log_path()?;
        }
        if self.trace.high_water_mark == 0 {
            return Err(RewindError::Configuration(
                "trace.high_water_mark must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
