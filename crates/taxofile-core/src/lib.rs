//! Taxofile Core: Multi-Sample Taxonomy Placement
//!
//! Places an unstructured item (a document) into a hierarchical taxonomy by
//! asking a noisy suggestion oracle several times, merging the answers, and
//! deciding whether the merged answer is strong enough to act on unattended.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      CLASSIFICATION PIPELINE                         │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌──────────┐   invoke ×N    ┌─────────┐   samples   ┌────────────┐  │
//! │  │  Oracle  │◄───────────────│ Sampler │────────────►│ Aggregator │  │
//! │  │  (LLM)   │───────────────►│         │             └─────┬──────┘  │
//! │  └──────────┘   suggestions  └────┬────┘                   │         │
//! │                                   │ usage           candidate map    │
//! │                              ┌────▼─────┐                  │         │
//! │                              │  Usage   │            ┌─────▼──────┐  │
//! │                              │  Ledger  │            │ Normalizer │  │
//! │                              └──────────┘            └─────┬──────┘  │
//! │                                                            │ ranked  │
//! │                                                     ┌──────▼──────┐  │
//! │                                                     │  Decision   │  │
//! │                                                     │   Engine    │  │
//! │                                                     └──────┬──────┘  │
//! │                                                            ▼         │
//! │                                             ClassificationResult     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sampling is the only effectful stage. Aggregation, normalization and the
//! decision are pure functions over their inputs.
//!
//! ## Decision rules
//! - The top candidate must hold at least 50% of the normalized mass.
//! - It must hold at least twice the mass of the runner-up.
//! - A brand-new folder must be proposed by every sample.
//! - Any new folder proposed by a single sample forces review.

pub mod aggregate;
pub mod candidate;
pub mod classify;
pub mod config;
pub mod decision;
pub mod error;
pub mod llm;
pub mod normalize;
pub mod sampler;
pub mod suggestion;
pub mod taxonomy;
pub mod usage;

pub use aggregate::{aggregate, AggregatedCandidate, CandidateMap};
pub use candidate::CandidateKey;
pub use classify::{evaluate_samples, ClassificationResult, Classifier, Evaluation};
pub use config::{ClassifierConfig, ConfigError};
pub use decision::{decide, DecisionPolicy, ReasonCode, Verdict};
pub use error::{ClassifyError, OracleError};
pub use normalize::{normalize, RankedCandidate};
pub use sampler::{
    collect_samples, OracleRequest, OracleResponse, SamplerConfig, SamplingOutcome,
    SuggestionOracle,
};
pub use suggestion::{Sample, Suggestion, SuggestionError};
pub use taxonomy::{scan_directory, ScanOptions, TaxonomyError, TaxonomyNode};
pub use usage::{NoopAccounting, Usage, UsageAccounting, UsageLedger};
