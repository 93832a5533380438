//! Merge suggestions across samples by candidate key.
//!
//! No normalization happens here: each candidate keeps the raw sum of the
//! confidences it received, so three samples agreeing at 60 (total 180)
//! outrank a single sample at 90.

use crate::candidate::CandidateKey;
use crate::suggestion::{Sample, Suggestion};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Accumulated evidence for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCandidate {
    pub key: CandidateKey,
    pub path: Vec<String>,
    pub is_new_segment: bool,
    pub new_path: Vec<String>,
    /// Sum of every contributing confidence.
    pub total_confidence_sum: f64,
    /// Number of samples that proposed this exact key.
    pub occurrence_count: usize,
}

/// Aggregated candidates, iterated in key order.
pub type CandidateMap = BTreeMap<CandidateKey, AggregatedCandidate>;

struct Accumulator {
    seed: Suggestion,
    confidences: Vec<f64>,
    /// Position in the input slice of the last sample that contributed.
    last_sample: usize,
}

/// Merge every suggestion of every sample into one entry per candidate key.
///
/// A key repeated within one sample counts once, with the confidence of its
/// first occurrence, so `occurrence_count` never exceeds the number of
/// samples. Confidences are summed in ascending order, so the totals are
/// identical (bit for bit) however the samples are ordered.
pub fn aggregate(samples: &[Sample]) -> CandidateMap {
    let mut acc: BTreeMap<CandidateKey, Accumulator> = BTreeMap::new();

    for (position, sample) in samples.iter().enumerate() {
        for suggestion in &sample.suggestions {
            match acc.entry(suggestion.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(Accumulator {
                        seed: suggestion.clone(),
                        confidences: vec![suggestion.confidence],
                        last_sample: position,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let entry = slot.get_mut();
                    if entry.last_sample == position {
                        continue;
                    }
                    entry.confidences.push(suggestion.confidence);
                    entry.last_sample = position;
                }
            }
        }
    }

    acc.into_iter()
        .map(|(key, mut entry)| {
            entry.confidences.sort_by(f64::total_cmp);
            let candidate = AggregatedCandidate {
                key: key.clone(),
                path: entry.seed.path,
                is_new_segment: entry.seed.is_new_segment,
                new_path: entry.seed.new_path,
                total_confidence_sum: entry.confidences.iter().sum(),
                occurrence_count: entry.confidences.len(),
            };
            (key, candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: usize, suggestions: Vec<Suggestion>) -> Sample {
        Sample {
            index,
            attempt: index + 1,
            suggestions,
            raw_response: String::new(),
        }
    }

    #[test]
    fn test_merges_by_key() {
        let samples = vec![
            sample(0, vec![Suggestion::existing(["Work"], 60.0)]),
            sample(
                1,
                vec![
                    Suggestion::existing(["Work"], 60.0),
                    Suggestion::existing(["Personal"], 30.0),
                ],
            ),
            sample(2, vec![Suggestion::existing(["Work"], 60.0)]),
        ];

        let map = aggregate(&samples);
        assert_eq!(map.len(), 2);

        let work = &map[&CandidateKey::of(&Suggestion::existing(["Work"], 0.0))];
        assert_eq!(work.total_confidence_sum, 180.0);
        assert_eq!(work.occurrence_count, 3);

        let personal = &map[&CandidateKey::of(&Suggestion::existing(["Personal"], 0.0))];
        assert_eq!(personal.total_confidence_sum, 30.0);
        assert_eq!(personal.occurrence_count, 1);
    }

    #[test]
    fn test_new_folder_is_separate_candidate() {
        let samples = vec![sample(
            0,
            vec![
                Suggestion::existing(["Work"], 50.0),
                Suggestion::new_folder(["Work"], ["Tax"], 30.0),
                Suggestion::new_folder(["Work"], ["Tax", "2024"], 20.0),
            ],
        )];
        let map = aggregate(&samples);
        assert_eq!(map.len(), 3);
        assert_eq!(map.values().filter(|c| c.is_new_segment).count(), 2);
    }

    #[test]
    fn test_repeated_key_in_one_sample_counts_once() {
        let tax = || Suggestion::new_folder(["Work"], ["Tax"], 90.0);
        let samples = vec![
            sample(0, vec![tax(), Suggestion::new_folder(["Work"], ["Tax"], 40.0)]),
            sample(1, vec![Suggestion::existing(["Work"], 10.0)]),
        ];

        let map = aggregate(&samples);
        let new_folder = &map[&tax().key()];
        assert_eq!(new_folder.occurrence_count, 1);
        assert_eq!(new_folder.total_confidence_sum, 90.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
