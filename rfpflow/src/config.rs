//! Runtime configuration for the proposal workflow.

use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `RFPFLOW_RETRIEVAL_TOP_K`.
pub const ENV_PREFIX: &str = "RFPFLOW_";

/// Stage invocations of a proposal run outside the optimize/check loop,
/// plus the first optimize and check pass.
const BASE_PROPOSAL_STEPS: usize = 8;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Configuration for the executor, status board, and run registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Minimum interval between accepted non-forced status updates.
    #[serde(default = "default_status_cooldown_ms")]
    pub status_cooldown_ms: u64,
    /// Tone optimization passes allowed before scoring a failing draft.
    #[serde(default = "default_max_optimize_attempts")]
    pub max_optimize_attempts: u32,
    /// Number of references to retrieve.
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,
    /// Tone requested from the optimizer.
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Upper bound on stage invocations in one run.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Interval used by client-side polling helpers.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_status_cooldown_ms() -> u64 {
    1000
}

fn default_max_optimize_attempts() -> u32 {
    2
}

fn default_retrieval_top_k() -> usize {
    3
}

fn default_tone() -> String {
    "persuasive".to_string()
}

fn default_max_steps() -> usize {
    64
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            status_cooldown_ms: default_status_cooldown_ms(),
            max_optimize_attempts: default_max_optimize_attempts(),
            retrieval_top_k: default_retrieval_top_k(),
            tone: default_tone(),
            max_steps: default_max_steps(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl FlowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, FlowError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FlowError::Config(format!("invalid JSON configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from defaults plus `RFPFLOW_*` environment
    /// variables.
    pub fn from_env() -> Result<Self, FlowError> {
        Self::default().with_env_overrides(std::env::vars())
    }

    /// Applies `RFPFLOW_*` overrides from an iterator of variables.
    ///
    /// Variables without the prefix are ignored; unknown keys and unparsable
    /// values are rejected.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self, FlowError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match name {
                "STATUS_COOLDOWN_MS" => self.status_cooldown_ms = parse_env(name, value)?,
                "MAX_OPTIMIZE_ATTEMPTS" => self.max_optimize_attempts = parse_env(name, value)?,
                "RETRIEVAL_TOP_K" => self.retrieval_top_k = parse_env(name, value)?,
                "TONE" => self.tone = value.to_string(),
                "MAX_STEPS" => self.max_steps = parse_env(name, value)?,
                "POLL_INTERVAL_MS" => self.poll_interval_ms = parse_env(name, value)?,
                "LOG_LEVEL" => self.log_level = value.to_string(),
                "LOG_FORMAT" => {
                    self.log_format = match value.to_ascii_lowercase().as_str() {
                        "pretty" => LogFormat::Pretty,
                        "json" => LogFormat::Json,
                        other => {
                            return Err(FlowError::Config(format!(
                                "{ENV_PREFIX}LOG_FORMAT must be 'pretty' or 'json', got '{other}'"
                            )))
                        }
                    }
                }
                other => {
                    return Err(FlowError::Config(format!(
                        "unknown setting {ENV_PREFIX}{other}"
                    )))
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Sets the status cooldown.
    #[must_use]
    pub fn with_status_cooldown(mut self, cooldown: Duration) -> Self {
        self.status_cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the maximum number of tone optimization passes.
    #[must_use]
    pub fn with_max_optimize_attempts(mut self, attempts: u32) -> Self {
        self.max_optimize_attempts = attempts;
        self
    }

    /// Sets the number of references to retrieve.
    #[must_use]
    pub fn with_retrieval_top_k(mut self, k: usize) -> Self {
        self.retrieval_top_k = k;
        self
    }

    /// Sets the requested tone.
    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    /// Sets the stage invocation limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Returns the status cooldown as a Duration.
    #[must_use]
    pub fn status_cooldown(&self) -> Duration {
        Duration::from_millis(self.status_cooldown_ms)
    }

    /// Returns the polling interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the stage invocations a proposal run needs when every
    /// compliance check fails and all optimize passes are used.
    #[must_use]
    pub fn required_steps(&self) -> usize {
        let extra_passes = usize::try_from(self.max_optimize_attempts)
            .unwrap_or(usize::MAX)
            .saturating_sub(1);
        BASE_PROPOSAL_STEPS.saturating_add(extra_passes.saturating_mul(2))
    }

    /// Validates the configuration.
    ///
    /// `max_steps` must leave room for the whole compliance loop, so running
    /// out of optimize passes always ends in scoring rather than in
    /// [`FlowError::StepLimitExceeded`].
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.max_steps == 0 {
            return Err(FlowError::Config("max_steps must be >= 1".to_string()));
        }
        let required = self.required_steps();
        if self.max_steps < required {
            return Err(FlowError::Config(format!(
                "max_steps is {} but {} optimize attempts need at least {required}",
                self.max_steps, self.max_optimize_attempts
            )));
        }
        if self.tone.trim().is_empty() {
            return Err(FlowError::Config("tone cannot be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(FlowError::Config("poll_interval_ms must be >= 1".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, FlowError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| FlowError::Config(format!("{ENV_PREFIX}{name}='{value}': {e}")))
}
