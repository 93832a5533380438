//! Bounded sampling against an unreliable oracle.
//!
//! The oracle is invoked sequentially until `target_samples` usable samples
//! exist or `max_attempts` invocations have been spent. Failed or malformed
//! invocations consume an attempt but never count toward the target, and
//! are not reported individually.

use crate::config::ConfigError;
use crate::error::{ClassifyError, OracleError};
use crate::suggestion::{Sample, Suggestion};
use crate::taxonomy::TaxonomyNode;
use crate::usage::{Usage, UsageAccounting};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the oracle is asked about.
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    /// Bounded text describing the item.
    pub item: &'a str,
    pub taxonomy: &'a TaxonomyNode,
    /// 1-based attempt number within the current classification.
    pub attempt: usize,
}

/// Parsed oracle output for one invocation.
#[derive(Debug, Clone, Default)]
pub struct OracleResponse {
    pub suggestions: Vec<Suggestion>,
    pub raw: String,
    pub usage: Option<Usage>,
}

/// Source of placement suggestions (usually an LLM).
#[async_trait]
pub trait SuggestionOracle: Send + Sync {
    async fn invoke(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleError>;

    fn name(&self) -> String {
        "oracle".to_string()
    }
}

#[async_trait]
impl<T: SuggestionOracle + ?Sized> SuggestionOracle for Box<T> {
    async fn invoke(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        (**self).invoke(request).await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub target_samples: usize,
    pub max_attempts: usize,
    pub max_suggestions_per_sample: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        crate::config::ClassifierConfig::default().sampler()
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_samples == 0 {
            return Err(ConfigError::Invalid(
                "target_samples must be at least 1".to_string(),
            ));
        }
        if self.max_attempts < self.target_samples {
            return Err(ConfigError::Invalid(format!(
                "max_attempts ({}) must be >= target_samples ({})",
                self.max_attempts, self.target_samples
            )));
        }
        if self.max_suggestions_per_sample == 0 {
            return Err(ConfigError::Invalid(
                "max_suggestions_per_sample must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Usable samples plus the number of oracle invocations spent on them.
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    pub samples: Vec<Sample>,
    pub attempts: usize,
}

/// Collect up to `target_samples` usable samples within `max_attempts`
/// oracle invocations.
///
/// Usage is reported for every invocation that returned a response, whether
/// or not the response turned out to be usable. An invalid `config` fails
/// with [`ClassifyError::InvalidConfig`] before the oracle is called.
pub async fn collect_samples<O>(
    oracle: &O,
    item: &str,
    taxonomy: &TaxonomyNode,
    config: &SamplerConfig,
    accounting: &dyn UsageAccounting,
) -> Result<SamplingOutcome, ClassifyError>
where
    O: SuggestionOracle + ?Sized,
{
    config.validate()?;

    let mut samples = Vec::with_capacity(config.target_samples);
    let mut attempts = 0usize;

    while samples.len() < config.target_samples && attempts < config.max_attempts {
        attempts += 1;
        let request = OracleRequest {
            item,
            taxonomy,
            attempt: attempts,
        };

        let response = match oracle.invoke(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(attempt = attempts, error = %err, "oracle attempt failed");
                continue;
            }
        };
        accounting.record(&response.usage.unwrap_or_default());

        match Sample::from_response(
            samples.len(),
            attempts,
            response.suggestions,
            response.raw,
            taxonomy,
            config.max_suggestions_per_sample,
        ) {
            Ok(sample) => {
                tracing::debug!(
                    attempt = attempts,
                    suggestions = sample.len(),
                    "collected sample"
                );
                samples.push(sample);
            }
            Err(err) => {
                tracing::debug!(attempt = attempts, error = %err, "discarding unusable sample");
            }
        }
    }

    if samples.is_empty() {
        return Err(ClassifyError::NoUsableSamples { attempts });
    }

    tracing::debug!(
        oracle = %oracle.name(),
        usable = samples.len(),
        attempts,
        "sampling finished"
    );
    Ok(SamplingOutcome { samples, attempts })
}
