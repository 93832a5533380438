//! Errors raised by the classification core.

use crate::config::ConfigError;

/// Terminal failures of a single classification request.
///
/// Malformed individual samples never show up here; they are dropped inside
/// the sampler and only their cumulative effect (no usable samples) is
/// reported.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("no usable samples after {attempts} oracle attempts")]
    NoUsableSamples { attempts: usize },
    #[error("no valid suggestions: samples carried no confidence mass")]
    EmptyAggregate,
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Failure of one oracle invocation. Counted as a spent attempt by the
/// sampler, never surfaced on its own.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parsing error: {0}")]
    Parse(String),
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}
