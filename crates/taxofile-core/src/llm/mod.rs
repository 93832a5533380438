//! LLM-backed suggestion oracle.
//!
//! The model is untrusted: it proposes candidate folders as JSON, and the
//! sampler validates every suggestion against the taxonomy before it counts.
//!
//! ```text
//! OracleRequest ──► build_prompt ──► ChatBackend::complete ──► parse_response ──► OracleResponse
//! ```
//!
//! HTTP backends live in [`providers`] behind the `openai` / `anthropic`
//! features. [`ScriptedOracle`] replays canned replies for tests and dry runs.

use crate::error::OracleError;
use crate::sampler::{OracleRequest, OracleResponse, SuggestionOracle};
use crate::suggestion::Suggestion;
use crate::usage::Usage;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(any(feature = "openai", feature = "anthropic"))]
pub mod providers;

/// Folders listed in the prompt before the outline is cut off.
pub const DEFAULT_MAX_OUTLINE_LINES: usize = 400;

// ============================================================================
// Prompt construction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(
    request: &OracleRequest<'_>,
    max_excerpt_chars: usize,
    max_suggestions: usize,
) -> Prompt {
    let system = format!(
        r#"You file documents into an existing folder hierarchy.
Propose between 1 and {max_suggestions} destinations, best first.

Respond with JSON only, in exactly this shape:
{{"suggestions": [{{"path": ["Existing", "Folder"], "is_new_folder": false, "new_folder_path": [], "confidence": 85}}]}}

Rules:
- "path" lists folder names from the root and must name an existing folder.
- Only when no existing folder fits, set "is_new_folder": true and put the
  folders to create under "path" in "new_folder_path".
- "confidence" is a number from 0 to 100.
"#
    );

    let user = format!(
        "Folder hierarchy:\n{}\n\nDocument excerpt:\n{}",
        request.taxonomy.outline(DEFAULT_MAX_OUTLINE_LINES),
        truncate_for_prompt(request.item, max_excerpt_chars)
    );

    Prompt { system, user }
}

/// Cut `s` to at most `max_chars` characters, marking the cut.
pub fn truncate_for_prompt(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("\n[...truncated]");
    out
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestionsEnvelope {
    Wrapped { suggestions: Vec<Suggestion> },
    Bare(Vec<Suggestion>),
}

/// Parse model output into suggestions.
///
/// Accepts `{"suggestions": [...]}` or a bare array, optionally wrapped in a
/// code fence or surrounded by prose.
pub fn parse_response(raw: &str) -> Result<Vec<Suggestion>, OracleError> {
    let json = extract_json_block(raw)
        .ok_or_else(|| OracleError::Parse("no JSON found in response".to_string()))?;
    let envelope: SuggestionsEnvelope =
        serde_json::from_str(json).map_err(|e| OracleError::Parse(e.to_string()))?;
    Ok(match envelope {
        SuggestionsEnvelope::Wrapped { suggestions } => suggestions,
        SuggestionsEnvelope::Bare(suggestions) => suggestions,
    })
}

/// Slice from the first `{` or `[` to the matching last `}` or `]`.
fn extract_json_block(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let close = if raw[start..].starts_with('{') { '}' } else { ']' };
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}

// ============================================================================
// Chat backends
// ============================================================================

/// Text returned by a chat-completion call.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A chat-completion API.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatCompletion, OracleError>;

    fn model(&self) -> String;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Box<T> {
    async fn complete(&self, prompt: &Prompt) -> Result<ChatCompletion, OracleError> {
        (**self).complete(prompt).await
    }

    fn model(&self) -> String {
        (**self).model()
    }
}

/// Oracle that prompts a chat backend and parses its JSON reply.
pub struct LlmOracle<B> {
    backend: B,
    max_excerpt_chars: usize,
    max_suggestions: usize,
}

impl<B: ChatBackend> LlmOracle<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_excerpt_chars: crate::config::DEFAULT_MAX_EXCERPT_CHARS,
            max_suggestions: crate::config::DEFAULT_MAX_SUGGESTIONS_PER_SAMPLE,
        }
    }

    pub fn with_limits(mut self, max_excerpt_chars: usize, max_suggestions: usize) -> Self {
        self.max_excerpt_chars = max_excerpt_chars;
        self.max_suggestions = max_suggestions;
        self
    }
}

#[async_trait]
impl<B: ChatBackend> SuggestionOracle for LlmOracle<B> {
    async fn invoke(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        let prompt = build_prompt(request, self.max_excerpt_chars, self.max_suggestions);
        let completion = self.backend.complete(&prompt).await?;
        let suggestions = parse_response(&completion.content)?;
        Ok(OracleResponse {
            suggestions,
            raw: completion.content,
            usage: completion.usage,
        })
    }

    fn name(&self) -> String {
        self.backend.model()
    }
}

// ============================================================================
// Scripted oracle
// ============================================================================

/// One canned reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Raw model text, parsed like a real reply.
    Text(String),
    /// The invocation fails outright.
    Fail(String),
}

/// Replays a fixed script of replies, cycling once it runs out.
pub struct ScriptedOracle {
    replies: Vec<ScriptedReply>,
    usage: Option<Usage>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies,
            usage: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reply with the same suggestions every time.
    pub fn always(suggestions: Vec<Suggestion>) -> Self {
        Self::new(vec![ScriptedReply::suggestions(suggestions)])
    }

    pub fn always_failing(message: &str) -> Self {
        Self::new(vec![ScriptedReply::Fail(message.to_string())])
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Number of invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptedReply {
    pub fn suggestions(suggestions: Vec<Suggestion>) -> Self {
        let body = serde_json::json!({ "suggestions": suggestions });
        ScriptedReply::Text(body.to_string())
    }
}

#[async_trait]
impl SuggestionOracle for ScriptedOracle {
    async fn invoke(&self, _request: &OracleRequest<'_>) -> Result<OracleResponse, OracleError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.replies.is_empty() {
            return Err(OracleError::NotConfigured("empty script".to_string()));
        }
        match &self.replies[idx % self.replies.len()] {
            ScriptedReply::Fail(message) => Err(OracleError::Api(message.clone())),
            ScriptedReply::Text(text) => Ok(OracleResponse {
                suggestions: parse_response(text)?,
                raw: text.clone(),
                usage: self.usage,
            }),
        }
    }

    fn name(&self) -> String {
        "scripted".to_string()
    }
}
