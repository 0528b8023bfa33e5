//! Engine configuration.
//!
//! Every bound here caps traversal or inference cost on realistic windows
//! (thousands of events); none is correctness-critical. Values are read from
//! `.causeway/config.toml` when present and default otherwise:
//!
//! ```toml
//! [temporal]
//! window_secs = 600
//! decay_rate = 0.001
//! min_strength = 0.1
//! max_strength = 0.9
//!
//! [pattern]
//! lookahead = 4
//! candidate_rate = 0.3
//! materialize_rate = 0.6
//!
//! [query]
//! max_depth = 3
//! influential_limit = 10
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalConfig {
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Temporal proximity inference parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Forward scan window from each user message, in seconds (inclusive).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Exponential decay per elapsed second.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_min_strength")]
    pub min_strength: f64,
    #[serde(default = "default_max_strength")]
    pub max_strength: f64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            decay_rate: default_decay_rate(),
            min_strength: default_min_strength(),
            max_strength: default_max_strength(),
        }
    }
}

/// Pattern frequency inference parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// How many following nodes count as "soon after".
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    /// Rates strictly above this are reported as candidates.
    #[serde(default = "default_candidate_rate")]
    pub candidate_rate: f64,
    /// Rates strictly above this are materialized as edges.
    #[serde(default = "default_materialize_rate")]
    pub materialize_rate: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            candidate_rate: default_candidate_rate(),
            materialize_rate: default_materialize_rate(),
        }
    }
}

/// Query defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_influential_limit")]
    pub influential_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            influential_limit: default_influential_limit(),
        }
    }
}

const fn default_window_secs() -> u64 {
    600
}

const fn default_decay_rate() -> f64 {
    0.001
}

const fn default_min_strength() -> f64 {
    0.1
}

const fn default_max_strength() -> f64 {
    0.9
}

const fn default_lookahead() -> usize {
    4
}

const fn default_candidate_rate() -> f64 {
    0.3
}

const fn default_materialize_rate() -> f64 {
    0.6
}

const fn default_max_depth() -> usize {
    3
}

const fn default_influential_limit() -> usize {
    10
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError {
            field,
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

impl CausalConfig {
    /// Reject values that would make inference produce out-of-range
    /// strengths or degenerate scans.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.temporal;
        unit_interval("temporal.min_strength", t.min_strength)?;
        unit_interval("temporal.max_strength", t.max_strength)?;
        if t.min_strength > t.max_strength {
            return Err(ConfigError {
                field: "temporal.min_strength",
                reason: format!(
                    "{} is greater than temporal.max_strength {}",
                    t.min_strength, t.max_strength
                ),
            });
        }
        if !t.decay_rate.is_finite() || t.decay_rate < 0.0 {
            return Err(ConfigError {
                field: "temporal.decay_rate",
                reason: format!("{} must be a non-negative number", t.decay_rate),
            });
        }

        let p = &self.pattern;
        if p.lookahead == 0 {
            return Err(ConfigError {
                field: "pattern.lookahead",
                reason: "must be at least 1".to_string(),
            });
        }
        unit_interval("pattern.candidate_rate", p.candidate_rate)?;
        unit_interval("pattern.materialize_rate", p.materialize_rate)?;
        if p.candidate_rate > p.materialize_rate {
            return Err(ConfigError {
                field: "pattern.candidate_rate",
                reason: format!(
                    "{} is greater than pattern.materialize_rate {}",
                    p.candidate_rate, p.materialize_rate
                ),
            });
        }
        Ok(())
    }
}

/// Load configuration from `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or
/// validated.
pub fn load_config(path: &Path) -> Result<CausalConfig> {
    if !path.exists() {
        return Ok(CausalConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<CausalConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}

/// Load `<project_root>/.causeway/config.toml`, or defaults if absent.
///
/// # Errors
///
/// See [`load_config`].
pub fn discover_config(project_root: &Path) -> Result<CausalConfig> {
    load_config(&project_root.join(".causeway/config.toml"))
}
