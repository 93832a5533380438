//! `taxofile classify` and `taxofile decide`.

use crate::excerpt::describe_item;
use crate::report;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taxofile_core::llm::{ScriptedOracle, ScriptedReply};
use taxofile_core::{
    evaluate_samples, ClassificationResult, Classifier, ClassifierConfig, Sample,
    SuggestionOracle, TaxonomyNode, UsageLedger,
};

/// Exit status when `--fail-on-review` is set and the verdict needs review.
const NEEDS_REVIEW_EXIT_CODE: i32 = 2;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Document to classify (read as text, lossily)
    pub file: PathBuf,
    /// Taxonomy JSON (as written by `taxofile hierarchy`)
    #[arg(short, long)]
    pub taxonomy: PathBuf,
    /// LLM provider: openai | anthropic (default: first one configured in the environment)
    #[arg(long)]
    pub provider: Option<String>,
    /// Model override
    #[arg(long)]
    pub model: Option<String>,
    /// Replay raw model replies from a JSON array of strings instead of calling an LLM
    #[arg(long, value_name = "FILE", conflicts_with_all = ["provider", "model"])]
    pub replay: Option<PathBuf>,
    /// Classifier config JSON (environment and flags override it)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Usable samples to collect
    #[arg(long)]
    pub samples: Option<usize>,
    /// Oracle invocations allowed, failed ones included
    #[arg(long)]
    pub max_attempts: Option<usize>,
    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
    /// Also write the full result (with raw samples) to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Exit with status 2 when the verdict needs review
    #[arg(long)]
    pub fail_on_review: bool,
}

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Saved classification result, or a JSON array of samples
    pub input: PathBuf,
    /// Classifier config JSON supplying the decision thresholds
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub min_top_confidence: Option<f64>,
    #[arg(long)]
    pub dominance_ratio: Option<f64>,
    /// Print the ranking and verdict as JSON
    #[arg(long)]
    pub json: bool,
    /// Exit with status 2 when the verdict needs review
    #[arg(long)]
    pub fail_on_review: bool,
}

/// Config file (if any), then `TAXOFILE_*` variables, then flags.
fn resolve_config(path: Option<&Path>) -> Result<ClassifierConfig> {
    let mut config = match path {
        Some(path) => ClassifierConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClassifierConfig::default(),
    };
    config.apply_env().context("invalid TAXOFILE_* environment")?;
    Ok(config)
}

pub fn run_classify(args: ClassifyArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(samples) = args.samples {
        config.target_samples = samples;
    }
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
    config.validate()?;

    let taxonomy = TaxonomyNode::load(&args.taxonomy)
        .with_context(|| format!("failed to load taxonomy {}", args.taxonomy.display()))?;
    let item = describe_item(&args.file, config.max_excerpt_chars)?;

    let oracle = match &args.replay {
        Some(path) => replay_oracle(path)?,
        None => llm_oracle(&args, &config)?,
    };
    let oracle_name = oracle.name();

    let ledger = Arc::new(UsageLedger::new());
    let classifier = Classifier::new(oracle, config)?.with_accounting(ledger.clone());

    if !args.json {
        println!(
            "{} {} ({})",
            "Classifying".green().bold(),
            args.file.display(),
            oracle_name
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;
    let result = runtime.block_on(classifier.classify(&item, &taxonomy))?;

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report::print_ranking(result.ranked(), &result.verdict, result.raw_samples.len());
        let totals = ledger.totals();
        println!(
            "\n{} {} samples in {} attempts, {} tokens ({} prompt / {} completion)",
            "usage".dimmed(),
            result.raw_samples.len(),
            result.attempts,
            totals.total_tokens(),
            totals.prompt_tokens,
            totals.completion_tokens
        );
        if let Some(out) = &args.out {
            println!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
        }
    }

    exit_for_verdict(result.verdict.needs_review, args.fail_on_review);
    Ok(())
}

fn replay_oracle(path: &Path) -> Result<Box<dyn SuggestionOracle>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let replies: Vec<String> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))?;
    if replies.is_empty() {
        bail!("{} contains no replies", path.display());
    }
    Ok(Box::new(ScriptedOracle::new(
        replies.into_iter().map(ScriptedReply::Text).collect(),
    )))
}

#[cfg(any(feature = "llm-openai", feature = "llm-anthropic"))]
fn llm_oracle(args: &ClassifyArgs, config: &ClassifierConfig) -> Result<Box<dyn SuggestionOracle>> {
    use taxofile_core::llm::providers::{
        create_backend, LlmConfig, Provider, ANTHROPIC_API_KEY_ENV, OPENAI_API_KEY_ENV,
        OPENAI_BASE_URL_ENV,
    };
    use taxofile_core::llm::LlmOracle;

    let provider = match &args.provider {
        Some(name) => name.parse::<Provider>()?,
        None => {
            let is_set = |name: &str| std::env::var(name).is_ok_and(|v| !v.trim().is_empty());
            if is_set(OPENAI_API_KEY_ENV) || is_set(OPENAI_BASE_URL_ENV) {
                Provider::OpenAI
            } else if is_set(ANTHROPIC_API_KEY_ENV) {
                Provider::Anthropic
            } else {
                bail!(
                    "no LLM configured: set {OPENAI_API_KEY_ENV} or {ANTHROPIC_API_KEY_ENV}, or use --replay"
                );
            }
        }
    };

    let mut llm = LlmConfig::from_env(provider)?;
    if let Some(model) = &args.model {
        llm = llm.with_model(model);
    }
    tracing::info!(provider = ?llm.provider, model = %llm.model, "using LLM oracle");

    let oracle = LlmOracle::new(create_backend(llm)?)
        .with_limits(config.max_excerpt_chars, config.max_suggestions_per_sample);
    Ok(Box::new(oracle))
}

#[cfg(not(any(feature = "llm-openai", feature = "llm-anthropic")))]
fn llm_oracle(
    _args: &ClassifyArgs,
    _config: &ClassifierConfig,
) -> Result<Box<dyn SuggestionOracle>> {
    bail!("built without LLM providers; rebuild with `llm-openai` or `llm-anthropic`, or use --replay")
}

/// Input accepted by `decide`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordedSamples {
    Result(Box<ClassificationResult>),
    Samples(Vec<Sample>),
}

impl RecordedSamples {
    fn into_samples(self) -> Vec<Sample> {
        match self {
            RecordedSamples::Result(result) => result.raw_samples,
            RecordedSamples::Samples(samples) => samples,
        }
    }
}

fn load_samples(path: &Path) -> Result<Vec<Sample>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let recorded: RecordedSamples = serde_json::from_str(&text).with_context(|| {
        format!(
            "{} is neither a classification result nor a sample list",
            path.display()
        )
    })?;
    Ok(recorded.into_samples())
}

pub fn run_decide(args: DecideArgs) -> Result<()> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(v) = args.min_top_confidence {
        config.policy.min_top_confidence = v;
    }
    if let Some(v) = args.dominance_ratio {
        config.policy.dominance_ratio = v;
    }
    config.validate()?;

    let samples = load_samples(&args.input)?;
    let evaluation = evaluate_samples(&samples, &config.policy)?;

    if args.json {
        let ranked: Vec<serde_json::Value> = evaluation
            .ranked
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;
        let out = serde_json::json!({
            "ranked": ranked,
            "verdict": evaluation.verdict,
            "samples": evaluation.sample_count,
            "ignored_samples": samples.len() - evaluation.sample_count,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "{} {} ({} samples)",
            "Evaluating".green().bold(),
            args.input.display(),
            samples.len()
        );
        if evaluation.sample_count < samples.len() {
            println!(
                "{} ignored {} sample(s) without well-formed suggestions",
                "warning".yellow().bold(),
                samples.len() - evaluation.sample_count
            );
        }
        report::print_ranking(
            evaluation.ranked.iter(),
            &evaluation.verdict,
            evaluation.sample_count,
        );
    }

    exit_for_verdict(evaluation.verdict.needs_review, args.fail_on_review);
    Ok(())
}

fn exit_for_verdict(needs_review: bool, fail_on_review: bool) {
    if needs_review && fail_on_review {
        std::process::exit(NEEDS_REVIEW_EXIT_CODE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxofile_core::Suggestion;

    #[test]
    fn test_load_bare_sample_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        let samples = vec![Sample {
            index: 0,
            attempt: 1,
            suggestions: vec![Suggestion::existing(["Work"], 80.0)],
            raw_response: String::new(),
        }];
        std::fs::write(&path, serde_json::to_string(&samples).unwrap()).unwrap();

        let loaded = load_samples(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].suggestions[0].path, vec!["Work".to_string()]);
    }

    #[test]
    fn test_load_rejects_unrelated_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(load_samples(&path).is_err());
    }

    #[test]
    fn test_replay_requires_replies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(replay_oracle(&path).is_err());
    }
}
