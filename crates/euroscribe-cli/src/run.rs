//! Extraction run: load reports and prompts, dispatch, write the three row sets.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use clap::builder::RangedU64ValueParser;
use euroscribe_ai::backoff::{Backoff, DEFAULT_HTTP_ATTEMPTS};
use euroscribe_ai::dispatch::DEFAULT_WORKERS;
use euroscribe_ai::escalation::DEFAULT_MAX_ATTEMPTS;
use euroscribe_ai::ollama::{DEFAULT_BASE_URL, DEFAULT_NUM_CTX};
use euroscribe_ai::{Dispatcher, Escalation, FormatMode, OllamaClient, OllamaConfig};
use euroscribe_core::Aggregator;
use euroscribe_store::{DEFAULT_TEXT_COLUMN, RunFiles, load_prompt, load_reports, write_run};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Report table (.xlsx, .xlsm, .xls, .ods, .csv or .parquet)
    #[arg(long, env = "EUROSCRIBE_REPORTS")]
    pub reports: PathBuf,

    /// Column holding the report text
    #[arg(long, default_value = DEFAULT_TEXT_COLUMN)]
    pub text_column: String,

    /// Prompt template containing the {REPORT} placeholder
    #[arg(long, env = "EUROSCRIBE_PROMPT")]
    pub prompt: PathBuf,

    /// System instruction
    #[arg(long, env = "EUROSCRIBE_SYSTEM")]
    pub system: PathBuf,

    #[arg(long, env = "EUROSCRIBE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_BASE_URL)]
    pub ollama_url: String,

    /// Model tag, e.g. `medllm:8b`
    #[arg(long, env = "EUROSCRIBE_MODEL")]
    pub model: String,

    /// Concurrent workers
    #[arg(long, default_value_t = DEFAULT_WORKERS,
          value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub workers: usize,

    /// Attempts per report, the first one unconstrained
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    pub http_timeout: u64,

    /// HTTP attempts per request before the attempt counts as failed
    #[arg(long, default_value_t = DEFAULT_HTTP_ATTEMPTS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub http_retries: u32,

    /// Model context window
    #[arg(long, default_value_t = DEFAULT_NUM_CTX)]
    pub num_ctx: u32,

    /// Send the schema itself as `format` instead of `"json"` plus `schema`
    #[arg(long)]
    pub schema_in_format: bool,
}

impl RunArgs {
    pub fn ollama_config(&self) -> OllamaConfig {
        let mut config = OllamaConfig::new(&self.ollama_url, &self.model);
        config.num_ctx = self.num_ctx;
        config.timeout = Duration::from_secs(self.http_timeout);
        config.backoff = Backoff {
            max_attempts: self.http_retries,
            ..Backoff::default()
        };
        if self.schema_in_format {
            config.format_mode = FormatMode::Schema;
        }
        config
    }
}

pub struct RunSummary {
    pub total: usize,
    pub accepted: usize,
    pub attempts: usize,
    pub elapsed_secs: f64,
    pub files: RunFiles,
}

/// Run the full extraction: load → dispatch → export.
pub async fn run_extraction(args: &RunArgs) -> anyhow::Result<RunSummary> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let items = load_reports(&args.reports, &args.text_column)
        .with_context(|| format!("loading reports from {}", args.reports.display()))?;
    let prompt = load_prompt(&args.prompt, &args.system).context("loading prompt files")?;
    eprintln!("  Read {} reports from {}", items.len(), args.reports.display());

    let client = OllamaClient::new(args.ollama_config(), prompt).context("building HTTP client")?;
    eprintln!(
        "  Extracting with {} at {} ({} workers, up to {} attempts each)",
        client.model(),
        args.ollama_url,
        args.workers,
        args.max_attempts
    );

    let mut aggregator = Aggregator::new();
    let stats = Dispatcher::new(args.workers)
        .run(
            items,
            Escalation::new(args.max_attempts),
            Arc::new(client),
            &mut aggregator,
        )
        .await
        .context("dispatching reports")?;

    let files = write_run(&args.output_dir, &stamp, &args.model, &aggregator)
        .with_context(|| format!("writing results to {}", args.output_dir.display()))?;

    Ok(RunSummary {
        total: stats.items,
        accepted: stats.accepted,
        attempts: stats.attempts,
        elapsed_secs: stats.elapsed_secs,
        files,
    })
}
