//! Classifier configuration: defaults, JSON file, environment overrides.
//!
//! Precedence (lowest to highest):
//! 1) built-in defaults
//! 2) a JSON config file (`ClassifierConfig::load`)
//! 3) `TAXOFILE_*` environment variables (`ClassifierConfig::apply_env`)

use crate::decision::DecisionPolicy;
use crate::sampler::SamplerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TAXOFILE_TARGET_SAMPLES_ENV: &str = "TAXOFILE_TARGET_SAMPLES";
pub const TAXOFILE_MAX_ATTEMPTS_ENV: &str = "TAXOFILE_MAX_ATTEMPTS";
pub const TAXOFILE_MIN_TOP_CONFIDENCE_ENV: &str = "TAXOFILE_MIN_TOP_CONFIDENCE";
pub const TAXOFILE_DOMINANCE_RATIO_ENV: &str = "TAXOFILE_DOMINANCE_RATIO";

pub const DEFAULT_TARGET_SAMPLES: usize = 3;
pub const DEFAULT_MAX_ATTEMPTS: usize = 6;
pub const DEFAULT_MAX_SUGGESTIONS_PER_SAMPLE: usize = 5;
pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 4000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {name}={value:?} (expected {expected})")]
    Env {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Usable samples to collect before stopping.
    pub target_samples: usize,
    /// Oracle invocations allowed per classification, failures included.
    pub max_attempts: usize,
    pub max_suggestions_per_sample: usize,
    /// Upper bound on the item excerpt sent to the oracle.
    pub max_excerpt_chars: usize,
    pub policy: DecisionPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            target_samples: DEFAULT_TARGET_SAMPLES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_suggestions_per_sample: DEFAULT_MAX_SUGGESTIONS_PER_SAMPLE,
            max_excerpt_chars: DEFAULT_MAX_EXCERPT_CHARS,
            policy: DecisionPolicy::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production, a map in tests). Empty values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, TAXOFILE_TARGET_SAMPLES_ENV, "positive integer")? {
            self.target_samples = v;
        }
        if let Some(v) = parse_var(&lookup, TAXOFILE_MAX_ATTEMPTS_ENV, "positive integer")? {
            self.max_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, TAXOFILE_MIN_TOP_CONFIDENCE_ENV, "percentage")? {
            self.policy.min_top_confidence = v;
        }
        if let Some(v) = parse_var(&lookup, TAXOFILE_DOMINANCE_RATIO_ENV, "ratio >= 1")? {
            self.policy.dominance_ratio = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampler().validate()?;
        let min_top = self.policy.min_top_confidence;
        if !(0.0..=100.0).contains(&min_top) {
            return Err(ConfigError::Invalid(format!(
                "min_top_confidence {min_top} is outside [0, 100]"
            )));
        }
        let ratio = self.policy.dominance_ratio;
        if !ratio.is_finite() || ratio < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "dominance_ratio {ratio} must be a finite value >= 1"
            )));
        }
        Ok(())
    }

    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            target_samples: self.target_samples,
            max_attempts: self.max_attempts,
            max_suggestions_per_sample: self.max_suggestions_per_sample,
        }
    }
}

fn parse_var<T, F>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse::<T>().map(Some).map_err(|_| ConfigError::Env {
        name,
        value: value.to_string(),
        expected,
    })
}
