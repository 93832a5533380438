//! Rescale aggregated mass into a distribution summing to 100.

use crate::aggregate::{AggregatedCandidate, CandidateMap};
use crate::candidate::CandidateKey;
use crate::error::ClassifyError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An aggregated candidate with its share of the total mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub key: CandidateKey,
    pub path: Vec<String>,
    pub is_new_segment: bool,
    pub new_path: Vec<String>,
    pub total_confidence_sum: f64,
    pub occurrence_count: usize,
    /// `total_confidence_sum / grand_total * 100`.
    pub normalized_confidence: f64,
}

impl RankedCandidate {
    fn from_aggregate(candidate: AggregatedCandidate, grand_total: f64) -> Self {
        Self {
            normalized_confidence: candidate.total_confidence_sum / grand_total * 100.0,
            key: candidate.key,
            path: candidate.path,
            is_new_segment: candidate.is_new_segment,
            new_path: candidate.new_path,
            total_confidence_sum: candidate.total_confidence_sum,
            occurrence_count: candidate.occurrence_count,
        }
    }

    /// Full destination, existing part followed by any folders to create.
    pub fn full_path(&self) -> Vec<String> {
        self.path.iter().chain(self.new_path.iter()).cloned().collect()
    }

    /// Descending by normalized confidence, then ascending by key.
    pub fn rank_order(&self, other: &Self) -> Ordering {
        other
            .normalized_confidence
            .total_cmp(&self.normalized_confidence)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Normalize and rank. Fails with [`ClassifyError::EmptyAggregate`] when
/// there are no candidates or their total mass is zero.
pub fn normalize(aggregated: CandidateMap) -> Result<Vec<RankedCandidate>, ClassifyError> {
    // Key order, so the total does not depend on how samples were ordered.
    let grand_total: f64 = aggregated.values().map(|c| c.total_confidence_sum).sum();
    if aggregated.is_empty() || grand_total <= 0.0 {
        return Err(ClassifyError::EmptyAggregate);
    }

    let mut ranked: Vec<RankedCandidate> = aggregated
        .into_values()
        .map(|c| RankedCandidate::from_aggregate(c, grand_total))
        .collect();
    ranked.sort_by(RankedCandidate::rank_order);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::suggestion::{Sample, Suggestion};
    use approx::assert_relative_eq;

    fn samples(groups: Vec<Vec<Suggestion>>) -> Vec<Sample> {
        groups
            .into_iter()
            .enumerate()
            .map(|(i, suggestions)| Sample {
                index: i,
                attempt: i + 1,
                suggestions,
                raw_response: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_distribution_sums_to_100() {
        let ranked = normalize(aggregate(&samples(vec![
            vec![
                Suggestion::existing(["A"], 70.0),
                Suggestion::existing(["B"], 20.0),
            ],
            vec![Suggestion::existing(["A"], 50.0)],
        ])))
        .unwrap();

        let total: f64 = ranked.iter().map(|r| r.normalized_confidence).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);
        assert_eq!(ranked[0].path, vec!["A".to_string()]);
        assert_relative_eq!(ranked[0].normalized_confidence, 120.0 / 140.0 * 100.0);
    }

    #[test]
    fn test_agreement_beats_single_outlier() {
        let ranked = normalize(aggregate(&samples(vec![
            vec![
                Suggestion::existing(["Agreed"], 60.0),
                Suggestion::existing(["Outlier"], 95.0),
            ],
            vec![Suggestion::existing(["Agreed"], 60.0)],
            vec![Suggestion::existing(["Agreed"], 60.0)],
        ])))
        .unwrap();
        assert_eq!(ranked[0].path, vec!["Agreed".to_string()]);
        assert_eq!(ranked[0].total_confidence_sum, 180.0);
        assert_eq!(ranked[1].total_confidence_sum, 95.0);
    }

    #[test]
    fn test_ties_break_by_key() {
        let ranked = normalize(aggregate(&samples(vec![vec![
            Suggestion::existing(["Zeta"], 40.0),
            Suggestion::existing(["Alpha"], 40.0),
        ]])))
        .unwrap();
        assert_eq!(ranked[0].path, vec!["Alpha".to_string()]);
        assert_eq!(ranked[1].path, vec!["Zeta".to_string()]);
    }

    #[test]
    fn test_empty_and_zero_mass() {
        assert!(matches!(
            normalize(CandidateMap::new()),
            Err(ClassifyError::EmptyAggregate)
        ));
        assert!(matches!(
            normalize(aggregate(&samples(vec![vec![Suggestion::existing(["A"], 0.0)]]))),
            Err(ClassifyError::EmptyAggregate)
        ));
    }
}
