//! End-to-end classification: sample, aggregate, normalize, decide.

use crate::aggregate::aggregate;
use crate::config::ClassifierConfig;
use crate::decision::{decide, DecisionPolicy, Verdict};
use crate::error::ClassifyError;
use crate::normalize::{normalize, RankedCandidate};
use crate::sampler::{collect_samples, SuggestionOracle};
use crate::suggestion::Sample;
use crate::taxonomy::TaxonomyNode;
use crate::usage::{NoopAccounting, UsageAccounting};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Final answer for one item. Pure data: nothing has been moved or created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: Uuid,
    pub classified_at: DateTime<Utc>,
    pub top_choice: RankedCandidate,
    /// Remaining candidates in rank order, excluding the top choice.
    pub alternatives: Vec<RankedCandidate>,
    pub verdict: Verdict,
    /// Usable samples, kept for audit.
    pub raw_samples: Vec<Sample>,
    /// Oracle invocations spent, failed ones included.
    pub attempts: usize,
}

impl ClassificationResult {
    /// Every candidate in rank order, top choice first.
    pub fn ranked(&self) -> impl Iterator<Item = &RankedCandidate> {
        std::iter::once(&self.top_choice).chain(self.alternatives.iter())
    }
}

/// Ranking and verdict computed from a set of samples.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub ranked: Vec<RankedCandidate>,
    pub verdict: Verdict,
    /// Samples that carried at least one well-formed suggestion.
    pub sample_count: usize,
}

impl Evaluation {
    pub fn top(&self) -> &RankedCandidate {
        &self.ranked[0]
    }
}

/// Aggregate, normalize and decide over already-collected samples.
///
/// This is the pure half of classification; it also re-evaluates samples
/// recorded in an earlier [`ClassificationResult`]. Recorded input is not
/// trusted: malformed suggestions are ignored, and samples left with none do
/// not count toward the sample total.
pub fn evaluate_samples(
    samples: &[Sample],
    policy: &DecisionPolicy,
) -> Result<Evaluation, ClassifyError> {
    let usable: Vec<Sample> = samples.iter().filter_map(Sample::well_formed).collect();
    let ranked = normalize(aggregate(&usable))?;
    let verdict = decide(&ranked, usable.len(), policy);
    Ok(Evaluation {
        ranked,
        verdict,
        sample_count: usable.len(),
    })
}

/// Runs the full pipeline against one oracle.
pub struct Classifier<O> {
    oracle: O,
    config: ClassifierConfig,
    accounting: Arc<dyn UsageAccounting>,
}

impl<O: SuggestionOracle> Classifier<O> {
    pub fn new(oracle: O, config: ClassifierConfig) -> Result<Self, ClassifyError> {
        config.validate()?;
        Ok(Self {
            oracle,
            config,
            accounting: Arc::new(NoopAccounting),
        })
    }

    pub fn with_accounting(mut self, accounting: Arc<dyn UsageAccounting>) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Classify `item` (a bounded text description) against `taxonomy`.
    pub async fn classify(
        &self,
        item: &str,
        taxonomy: &TaxonomyNode,
    ) -> Result<ClassificationResult, ClassifyError> {
        let outcome = collect_samples(
            &self.oracle,
            item,
            taxonomy,
            &self.config.sampler(),
            self.accounting.as_ref(),
        )
        .await?;

        let Evaluation { ranked, verdict, .. } =
            evaluate_samples(&outcome.samples, &self.config.policy)?;
        let mut ranked = ranked.into_iter();
        let top_choice = ranked.next().ok_or(ClassifyError::EmptyAggregate)?;

        tracing::info!(
            top = %top_choice.key,
            confidence = top_choice.normalized_confidence,
            samples = outcome.samples.len(),
            attempts = outcome.attempts,
            needs_review = verdict.needs_review,
            "classified"
        );

        Ok(ClassificationResult {
            id: Uuid::new_v4(),
            classified_at: Utc::now(),
            top_choice,
            alternatives: ranked.collect(),
            verdict,
            raw_samples: outcome.samples,
            attempts: outcome.attempts,
        })
    }
}
