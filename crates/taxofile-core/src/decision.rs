//! Dominance decision over a normalized ranking.
//!
//! ```text
//! ranked ──┬──► top ≥ min_top_confidence ? ─────────────── LowAbsoluteConfidence
//!          ├──► top ≥ ratio × runner-up ? ──────────────── CloseAlternatives
//!          ├──► top is new ⇒ every sample agreed ? ─────── NewFolderUnverified
//!          └──► any new candidate seen once ? ──────────── NewFolderSingleTrial
//! ```
//!
//! Creating a folder is harder to undo than filing into an existing one, so
//! a new-folder winner needs unanimous agreement, not just majority mass.

use crate::normalize::RankedCandidate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_TOP_CONFIDENCE: f64 = 50.0;
pub const DEFAULT_DOMINANCE_RATIO: f64 = 2.0;

/// Thresholds for the dominance rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Minimum normalized confidence of the top choice, in percent.
    pub min_top_confidence: f64,
    /// Required ratio between the top choice and the runner-up.
    pub dominance_ratio: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_top_confidence: DEFAULT_MIN_TOP_CONFIDENCE,
            dominance_ratio: DEFAULT_DOMINANCE_RATIO,
        }
    }
}

/// Why a verdict needs human review. Declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    LowAbsoluteConfidence,
    CloseAlternatives,
    NewFolderUnverified,
    NewFolderSingleTrial,
}

impl ReasonCode {
    pub fn describe(&self) -> &'static str {
        match self {
            ReasonCode::LowAbsoluteConfidence => {
                "top choice holds less than the required share of confidence"
            }
            ReasonCode::CloseAlternatives => "runner-up is too close to the top choice",
            ReasonCode::NewFolderUnverified => {
                "top choice creates a folder that not every sample proposed"
            }
            ReasonCode::NewFolderSingleTrial => "a new folder was proposed by only one sample",
        }
    }
}

/// Whether the top choice is safe to act on without confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_dominant: bool,
    pub needs_review: bool,
    /// Failing rules in evaluation order; empty iff dominant.
    pub reasons: Vec<ReasonCode>,
}

impl Verdict {
    pub fn from_reasons(mut reasons: Vec<ReasonCode>) -> Self {
        reasons.sort();
        reasons.dedup();
        let is_dominant = reasons.is_empty();
        Self {
            is_dominant,
            needs_review: !is_dominant,
            reasons,
        }
    }

    pub fn dominant() -> Self {
        Self::from_reasons(Vec::new())
    }
}

/// Apply the dominance rules to a non-empty ranking.
///
/// `raw_sample_count` is the number of usable samples the ranking was built
/// from. An empty ranking cannot come out of the normalizer; it is treated
/// as failing the absolute threshold.
pub fn decide(
    ranked: &[RankedCandidate],
    raw_sample_count: usize,
    policy: &DecisionPolicy,
) -> Verdict {
    let Some((top, rest)) = ranked.split_first() else {
        return Verdict::from_reasons(vec![ReasonCode::LowAbsoluteConfidence]);
    };

    let mut reasons = Vec::new();
    let meets_threshold = top.normalized_confidence >= policy.min_top_confidence;

    if !meets_threshold {
        reasons.push(ReasonCode::LowAbsoluteConfidence);
    }

    if let Some(second) = rest.first() {
        if top.normalized_confidence < policy.dominance_ratio * second.normalized_confidence {
            reasons.push(ReasonCode::CloseAlternatives);
        }
    }

    if top.is_new_segment && !(top.occurrence_count == raw_sample_count && meets_threshold) {
        reasons.push(ReasonCode::NewFolderUnverified);
    }

    if ranked
        .iter()
        .any(|c| c.is_new_segment && c.occurrence_count == 1)
    {
        reasons.push(ReasonCode::NewFolderSingleTrial);
    }

    let verdict = Verdict::from_reasons(reasons);
    tracing::debug!(
        top = %top.key,
        top_confidence = top.normalized_confidence,
        candidates = ranked.len(),
        dominant = verdict.is_dominant,
        reasons = ?verdict.reasons,
        "decided"
    );
    verdict
}
