//! Suggestions and samples as produced by the oracle.

use crate::candidate::CandidateKey;
use crate::taxonomy::TaxonomyNode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const MIN_CONFIDENCE: f64 = 0.0;
pub const MAX_CONFIDENCE: f64 = 100.0;

/// One candidate destination proposed by a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Names from the root to an existing folder. For a new-folder
    /// suggestion this is the existing parent.
    pub path: Vec<String>,
    /// When set, `new_path` lists folders to create below `path`.
    #[serde(default, alias = "is_new_folder", alias = "isNewSegment")]
    pub is_new_segment: bool,
    #[serde(default, alias = "new_folder_path", alias = "newPath")]
    pub new_path: Vec<String>,
    /// Oracle-assigned score in [0, 100]. Not comparable across samples.
    pub confidence: f64,
}

impl Suggestion {
    pub fn existing<S: Into<String>>(path: impl IntoIterator<Item = S>, confidence: f64) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            is_new_segment: false,
            new_path: Vec::new(),
            confidence,
        }
    }

    pub fn new_folder<S: Into<String>, T: Into<String>>(
        parent: impl IntoIterator<Item = S>,
        new_path: impl IntoIterator<Item = T>,
        confidence: f64,
    ) -> Self {
        Self {
            path: parent.into_iter().map(Into::into).collect(),
            is_new_segment: true,
            new_path: new_path.into_iter().map(Into::into).collect(),
            confidence,
        }
    }

    pub fn key(&self) -> CandidateKey {
        CandidateKey::of(self)
    }

    /// Checks that need no taxonomy: finite confidence in range, a new path
    /// exactly when the suggestion creates folders, and no empty names.
    pub fn check_shape(&self) -> Result<(), SuggestionError> {
        if !self.confidence.is_finite()
            || self.confidence < MIN_CONFIDENCE
            || self.confidence > MAX_CONFIDENCE
        {
            return Err(SuggestionError::ConfidenceOutOfRange(self.confidence));
        }
        match (self.is_new_segment, self.new_path.is_empty()) {
            (true, true) => return Err(SuggestionError::MissingNewPath),
            (false, false) => return Err(SuggestionError::UnexpectedNewPath),
            _ => {}
        }
        if self
            .path
            .iter()
            .chain(self.new_path.iter())
            .any(|name| name.trim().is_empty())
        {
            return Err(SuggestionError::EmptySegment);
        }
        Ok(())
    }

    /// Check the suggestion's shape and that its existing part is a real
    /// folder in `taxonomy`.
    pub fn validate(&self, taxonomy: &TaxonomyNode) -> Result<(), SuggestionError> {
        self.check_shape()?;
        if !taxonomy.contains_path(&self.path) {
            return Err(SuggestionError::UnknownPath(self.path.join("/")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SuggestionError {
    #[error("confidence {0} is outside [0, 100]")]
    ConfidenceOutOfRange(f64),
    #[error("new-folder suggestion has no new path")]
    MissingNewPath,
    #[error("new path given on a suggestion that does not create folders")]
    UnexpectedNewPath,
    #[error("empty folder name in path")]
    EmptySegment,
    #[error("path does not exist in taxonomy: {0}")]
    UnknownPath(String),
    #[error("no usable suggestions ({rejected} rejected)")]
    NoUsableSuggestions { rejected: usize },
}

/// The usable output of one oracle invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Position among usable samples, starting at 0.
    pub index: usize,
    /// Oracle attempt that produced this sample, starting at 1.
    pub attempt: usize,
    pub suggestions: Vec<Suggestion>,
    /// Unparsed oracle output, kept for audit.
    #[serde(default)]
    pub raw_response: String,
}

impl Sample {
    /// Build a sample from parsed oracle output.
    ///
    /// Invalid suggestions are dropped, a repeated candidate within the same
    /// sample keeps only its first occurrence, and at most `max_suggestions`
    /// survive. Fails when nothing usable remains.
    pub fn from_response(
        index: usize,
        attempt: usize,
        suggestions: Vec<Suggestion>,
        raw_response: String,
        taxonomy: &TaxonomyNode,
        max_suggestions: usize,
    ) -> Result<Self, SuggestionError> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut rejected = 0usize;

        for suggestion in suggestions {
            if let Err(err) = suggestion.validate(taxonomy) {
                tracing::debug!(attempt, error = %err, "dropping invalid suggestion");
                rejected += 1;
                continue;
            }
            if !seen.insert(suggestion.key()) {
                tracing::debug!(attempt, key = %suggestion.key(), "dropping repeated suggestion");
                continue;
            }
            if kept.len() == max_suggestions {
                break;
            }
            kept.push(suggestion);
        }

        if kept.is_empty() {
            return Err(SuggestionError::NoUsableSuggestions { rejected });
        }

        Ok(Self {
            index,
            attempt,
            suggestions: kept,
            raw_response,
        })
    }

    /// Copy of a recorded sample keeping only well-shaped suggestions.
    /// `None` when nothing survives.
    pub fn well_formed(&self) -> Option<Sample> {
        let suggestions: Vec<Suggestion> = self
            .suggestions
            .iter()
            .filter(|suggestion| match suggestion.check_shape() {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        sample = self.index,
                        error = %err,
                        "ignoring malformed recorded suggestion"
                    );
                    false
                }
            })
            .cloned()
            .collect();
        (!suggestions.is_empty()).then(|| Sample {
            suggestions,
            ..self.clone()
        })
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> TaxonomyNode {
        TaxonomyNode::from_json_str(r#"{"Work": {"Invoices": {}}, "Personal": {}}"#).unwrap()
    }

    #[test]
    fn test_validate_rules() {
        let tax = taxonomy();
        assert!(Suggestion::existing(["Work", "Invoices"], 80.0)
            .validate(&tax)
            .is_ok());
        assert!(Suggestion::new_folder(["Work"], ["Tax"], 10.0)
            .validate(&tax)
            .is_ok());

        assert_eq!(
            Suggestion::existing(["Work"], 101.0).validate(&tax),
            Err(SuggestionError::ConfidenceOutOfRange(101.0))
        );
        assert!(matches!(
            Suggestion::existing(["Work"], f64::NAN).validate(&tax),
            Err(SuggestionError::ConfidenceOutOfRange(_))
        ));
        assert_eq!(
            Suggestion::new_folder(["Work"], Vec::<String>::new(), 50.0).validate(&tax),
            Err(SuggestionError::MissingNewPath)
        );
        assert_eq!(
            Suggestion::existing(["Work", "Receipts"], 50.0).validate(&tax),
            Err(SuggestionError::UnknownPath("Work/Receipts".to_string()))
        );
        assert_eq!(
            Suggestion::new_folder(["Nope"], ["Tax"], 50.0).validate(&tax),
            Err(SuggestionError::UnknownPath("Nope".to_string()))
        );
        assert_eq!(
            Suggestion::new_folder(["Work"], [" "], 50.0).validate(&tax),
            Err(SuggestionError::EmptySegment)
        );
    }

    #[test]
    fn test_new_path_without_flag_is_rejected() {
        let mut s = Suggestion::existing(["Work"], 40.0);
        s.new_path = vec!["Tax".to_string()];
        assert_eq!(
            s.validate(&taxonomy()),
            Err(SuggestionError::UnexpectedNewPath)
        );
    }

    #[test]
    fn test_sample_filters_and_dedupes() {
        let sample = Sample::from_response(
            0,
            1,
            vec![
                Suggestion::existing(["Work"], 70.0),
                Suggestion::existing(["Missing"], 90.0),
                Suggestion::existing(["Work"], 30.0),
                Suggestion::existing(["Personal"], 20.0),
            ],
            "raw".to_string(),
            &taxonomy(),
            5,
        )
        .unwrap();

        assert_eq!(sample.len(), 2);
        assert_eq!(sample.suggestions[0].confidence, 70.0);
        assert_eq!(sample.suggestions[1].path, vec!["Personal".to_string()]);
    }

    #[test]
    fn test_sample_truncates() {
        let tax = taxonomy();
        let suggestions = vec![
            Suggestion::existing(["Work"], 50.0),
            Suggestion::existing(["Work", "Invoices"], 20.0),
            Suggestion::existing(["Personal"], 10.0),
        ];
        let sample = Sample::from_response(0, 1, suggestions, String::new(), &tax, 2).unwrap();
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn test_sample_without_valid_suggestions() {
        let err = Sample::from_response(
            0,
            1,
            vec![Suggestion::existing(["Nope"], 50.0)],
            String::new(),
            &taxonomy(),
            5,
        )
        .unwrap_err();
        assert_eq!(err, SuggestionError::NoUsableSuggestions { rejected: 1 });

        let err =
            Sample::from_response(0, 1, vec![], String::new(), &taxonomy(), 5).unwrap_err();
        assert_eq!(err, SuggestionError::NoUsableSuggestions { rejected: 0 });
    }

    #[test]
    fn test_well_formed_drops_bad_recorded_suggestions() {
        let mut flagged_without_path = Suggestion::existing(["Work"], 30.0);
        flagged_without_path.is_new_segment = true;
        let sample = Sample {
            index: 0,
            attempt: 1,
            suggestions: vec![
                Suggestion::existing(["A"], 100.0),
                Suggestion::existing(["B"], -60.0),
                flagged_without_path,
            ],
            raw_response: "raw".to_string(),
        };

        let cleaned = sample.well_formed().unwrap();
        assert_eq!(cleaned.suggestions, vec![Suggestion::existing(["A"], 100.0)]);
        assert_eq!(cleaned.raw_response, "raw");

        let empty = Sample {
            suggestions: vec![Suggestion::existing(["B"], 140.0)],
            ..sample
        };
        assert!(empty.well_formed().is_none());
    }

    #[test]
    fn test_deserialize_aliases() {
        let s: Suggestion = serde_json::from_str(
            r#"{"path": ["Work"], "is_new_folder": true, "new_folder_path": ["Tax"], "confidence": 42}"#,
        )
        .unwrap();
        assert!(s.is_new_segment);
        assert_eq!(s.new_path, vec!["Tax".to_string()]);
        assert_eq!(s.confidence, 42.0);
    }
}
