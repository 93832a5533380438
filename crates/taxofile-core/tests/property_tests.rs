//! Property-Based Tests for aggregation and decisions
//!
//! 1. Normalized confidences always sum to 100
//! 2. Ranking is independent of sample order
//! 3. Ranking is sorted and verdicts are internally consistent

use proptest::prelude::*;
use std::collections::BTreeSet;
use taxofile_core::*;

// ============================================================================
// Strategies
// ============================================================================

fn folder_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Work".to_string()),
        Just("Personal".to_string()),
        Just("Archive".to_string()),
    ]
}

fn suggestion_strategy() -> impl Strategy<Value = Suggestion> {
    (
        prop::collection::vec(folder_strategy(), 0..3),
        any::<bool>(),
        prop::collection::vec("[A-Z][a-z]{1,4}", 1..3),
        1.0f64..=100.0f64,
    )
        .prop_map(|(path, is_new, new_path, confidence)| {
            if is_new {
                Suggestion::new_folder(path, new_path, confidence)
            } else {
                Suggestion::existing(path, confidence)
            }
        })
}

fn samples_strategy() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec(prop::collection::vec(suggestion_strategy(), 1..=5), 1..=6).prop_map(
        |groups| {
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
        },
    )
}

fn shuffled_pair() -> impl Strategy<Value = (Vec<Sample>, Vec<Sample>)> {
    samples_strategy()
        .prop_flat_map(|samples| (Just(samples.clone()), Just(samples).prop_shuffle()))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn normalized_confidences_sum_to_100(samples in samples_strategy()) {
        let ranked = normalize(aggregate(&samples)).unwrap();
        let total: f64 = ranked.iter().map(|r| r.normalized_confidence).sum();
        prop_assert!((total - 100.0).abs() < 1e-6, "total was {}", total);
    }

    #[test]
    fn ranking_is_order_independent((original, shuffled) in shuffled_pair()) {
        let policy = DecisionPolicy::default();
        let a = evaluate_samples(&original, &policy).unwrap();
        let b = evaluate_samples(&shuffled, &policy).unwrap();
        prop_assert_eq!(a.ranked, b.ranked);
        prop_assert_eq!(a.verdict, b.verdict);
    }

    #[test]
    fn ranking_is_descending(samples in samples_strategy()) {
        let ranked = normalize(aggregate(&samples)).unwrap();
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].normalized_confidence >= pair[1].normalized_confidence);
            if pair[0].normalized_confidence == pair[1].normalized_confidence {
                prop_assert!(pair[0].key < pair[1].key);
            }
        }
    }

    #[test]
    fn verdict_is_consistent(samples in samples_strategy()) {
        let eval = evaluate_samples(&samples, &DecisionPolicy::default()).unwrap();
        prop_assert_ne!(eval.verdict.is_dominant, eval.verdict.needs_review);
        prop_assert_eq!(eval.verdict.reasons.is_empty(), eval.verdict.is_dominant);

        let mut sorted = eval.verdict.reasons.clone();
        sorted.sort();
        prop_assert_eq!(&sorted, &eval.verdict.reasons);

        if eval.verdict.is_dominant {
            prop_assert!(eval.top().normalized_confidence >= 50.0);
        }
    }

    #[test]
    fn total_mass_is_preserved(samples in samples_strategy()) {
        // First occurrence of each key within a sample carries its mass.
        let mut expected = 0.0;
        let mut distinct_per_sample = 0usize;
        for sample in &samples {
            let mut seen = BTreeSet::new();
            for suggestion in &sample.suggestions {
                if seen.insert(suggestion.key()) {
                    expected += suggestion.confidence;
                }
            }
            distinct_per_sample += seen.len();
        }

        let map = aggregate(&samples);
        let actual: f64 = map.values().map(|c| c.total_confidence_sum).sum();
        prop_assert!((expected - actual).abs() < 1e-6);

        let occurrences: usize = map.values().map(|c| c.occurrence_count).sum();
        prop_assert_eq!(distinct_per_sample, occurrences);
        prop_assert!(map.values().all(|c| c.occurrence_count <= samples.len()));
    }
}
