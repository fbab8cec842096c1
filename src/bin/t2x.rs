//! CLI binary for t2-extractor.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and runs one stage (or the whole chain) per subcommand.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use t2_extractor::{
    DocumentPipeline, ExtractionProgress, LlmCredentials, OcrCredentials, PipelineConfig,
    Priority,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar over the pages of one extraction.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgress for CliProgress {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, line_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{line_count:>4} lines")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: String) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&error),
        ));
        self.bar.abandon();
    }

    fn on_extraction_complete(&self, _total_pages: usize, _total_chars: usize) {
        self.bar.finish_and_clear();
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

/// Extract document text with Textract, capture fields with an LLM, and send
/// the result to T2 Verification.
#[derive(Parser, Debug)]
#[command(name = "t2x", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// AWS access key id for Textract.
    #[arg(long, global = true, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: Option<String>,

    /// AWS secret access key for Textract.
    #[arg(long, global = true, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// AWS region.
    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    aws_region: String,

    /// Textract endpoint override (LocalStack, VPC endpoint).
    #[arg(long, global = true, env = "T2_TEXTRACT_ENDPOINT")]
    textract_endpoint: Option<String>,

    /// API key for the completion endpoint.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for field capture.
    #[arg(long, global = true, env = "T2_GPT_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Chat completions URL.
    #[arg(long, global = true, env = "T2_COMPLETION_URL")]
    completion_url: Option<String>,

    /// Review portal URL accepting task POSTs.
    #[arg(long, global = true, env = "T2_VERIFICATION_TASKS_URL")]
    review_tasks_url: Option<String>,

    /// Review portal URL prefix for project task listings.
    #[arg(long, global = true, env = "T2_VERIFICATION_LIST_URL")]
    review_list_url: Option<String>,

    /// Bearer token for the review portal.
    #[arg(long, global = true, env = "T2_VERIFICATION_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// PDF rendering DPI for the review payload (72–600).
    #[arg(long, global = true, env = "T2_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Retries on transient HTTP failures.
    #[arg(long, global = true, env = "T2_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// HTTP timeout in seconds.
    #[arg(long, global = true, env = "T2_HTTP_TIMEOUT", default_value_t = 120)]
    http_timeout: u64,

    /// Disable progress bar.
    #[arg(long, global = true, env = "T2_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "T2_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "T2_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR a document and print its text.
    Extract {
        /// PDF, JPG, JPEG, PNG or BMP file.
        input: PathBuf,
    },

    /// OCR a document and capture fields with the LLM.
    Capture {
        input: PathBuf,
        #[command(flatten)]
        prompt: PromptArgs,
        /// Print the result as JSON (completion + token usage).
        #[arg(long)]
        json: bool,
    },

    /// Submit a document and an existing completion for review.
    Submit {
        input: PathBuf,
        /// Completion text, or `@path` to read it from a file.
        #[arg(long)]
        completion: String,
        #[command(flatten)]
        task: TaskArgs,
    },

    /// Extract, capture and submit in one go.
    Run {
        input: PathBuf,
        #[command(flatten)]
        prompt: PromptArgs,
        #[command(flatten)]
        task: TaskArgs,
    },

    /// List the tasks of a review project as JSON.
    List {
        /// Project id in the review portal.
        #[arg(long)]
        project: String,
    },
}

impl Command {
    /// Whether the subcommand runs OCR, and so reports page progress.
    fn extracts(&self) -> bool {
        matches!(
            self,
            Command::Extract { .. } | Command::Capture { .. } | Command::Run { .. }
        )
    }
}

#[derive(Args, Debug)]
struct PromptArgs {
    /// Instruction for the model, or `@path` to read it from a file.
    #[arg(long)]
    prompt: String,

    /// Maximum completion tokens.
    #[arg(long, default_value_t = 350)]
    max_tokens: u32,
}

#[derive(Args, Debug)]
struct TaskArgs {
    /// Layout name in the review portal.
    #[arg(long)]
    layout: String,

    /// Project id in the review portal.
    #[arg(long)]
    project: String,

    /// Task priority: low, medium, high.
    #[arg(long, default_value = "high")]
    priority: Priority,

    /// Flatten nested JSON completions into key → first value.
    #[arg(long)]
    flatten: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !common.quiet && !common.no_progress;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let flatten = matches!(
        &cli.command,
        Command::Submit { task, .. } | Command::Run { task, .. } if task.flatten
    );
    let config = build_config(common, flatten)?;
    let mut pipeline = DocumentPipeline::new(config).context("Failed to build pipeline")?;
    let progress = (show_progress && cli.command.extracts()).then(CliProgress::new);
    if let Some(ref p) = progress {
        pipeline = pipeline.with_progress(p.clone());
    }
    let progress = progress.as_deref();

    match &cli.command {
        Command::Extract { input } => {
            let text = extract(&pipeline, input, progress).await?;
            write_stdout(&text)?;
        }
        Command::Capture {
            input,
            prompt,
            json,
        } => {
            let text = extract(&pipeline, input, progress).await?;
            let instruction = read_arg(&prompt.prompt).await?;
            let answer = pipeline
                .capture(&instruction, &text, prompt.max_tokens)
                .await
                .context("Field capture failed")?;
            if *json {
                let out = serde_json::to_string_pretty(&answer).context("Failed to serialise output")?;
                write_stdout(&out)?;
            } else {
                write_stdout(&answer.completion)?;
                if !common.quiet {
                    eprintln!(
                        "   {} tokens in  /  {} tokens out",
                        dim(&answer.prompt_tokens.to_string()),
                        dim(&answer.completion_tokens.to_string()),
                    );
                }
            }
        }
        Command::Submit {
            input,
            completion,
            task,
        } => {
            let completion = read_arg(completion).await?;
            submit(&pipeline, common, input, &completion, task).await?;
        }
        Command::Run {
            input,
            prompt,
            task,
        } => {
            let text = extract(&pipeline, input, progress).await?;
            let instruction = read_arg(&prompt.prompt).await?;
            let answer = pipeline
                .capture(&instruction, &text, prompt.max_tokens)
                .await
                .context("Field capture failed")?;
            submit(&pipeline, common, input, &answer.completion, task).await?;
        }
        Command::List { project } => {
            let token = require_token(common)?;
            let tasks = pipeline
                .list_reviewed_tasks(project, token)
                .await
                .context("Failed to list review tasks")?;
            let out = serde_json::to_string_pretty(&tasks).context("Failed to serialise tasks")?;
            write_stdout(&out)?;
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(common: &CommonArgs, flatten: bool) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .dpi(common.dpi)
        .max_retries(common.max_retries)
        .http_timeout_secs(common.http_timeout)
        .flatten_verification(flatten);

    if let (Some(id), Some(secret)) = (&common.aws_access_key_id, &common.aws_secret_access_key) {
        builder = builder.ocr(OcrCredentials::new(id, secret).region(&common.aws_region));
    }
    if let Some(ref endpoint) = common.textract_endpoint {
        builder = builder.ocr_endpoint(endpoint);
    }
    if let Some(ref key) = common.api_key {
        builder = builder.llm(LlmCredentials::new(key, &common.model));
    }
    if let Some(ref url) = common.completion_url {
        builder = builder.completion_url(url);
    }
    if let (Some(tasks), Some(list)) = (&common.review_tasks_url, &common.review_list_url) {
        builder = builder.review_endpoints(tasks, list);
    }

    builder.build().context("Invalid configuration")
}

async fn extract(
    pipeline: &DocumentPipeline,
    input: &Path,
    progress: Option<&CliProgress>,
) -> Result<String> {
    let result = pipeline.extract_text(input).await;
    if let (Err(_), Some(p)) = (&result, progress) {
        p.bar.abandon();
    }
    result.with_context(|| format!("Text extraction failed for {}", input.display()))
}

async fn submit(
    pipeline: &DocumentPipeline,
    common: &CommonArgs,
    input: &Path,
    completion: &str,
    task: &TaskArgs,
) -> Result<()> {
    let token = require_token(common)?;
    pipeline
        .submit_for_review(input, completion, &task.layout, token, &task.project, task.priority)
        .await
        .context("Review submission failed")?;
    if !common.quiet {
        eprintln!(
            "{} submitted {} to project {} ({})",
            green("✔"),
            input.display(),
            task.project,
            task.priority
        );
    }
    Ok(())
}

fn require_token(common: &CommonArgs) -> Result<&str> {
    common
        .token
        .as_deref()
        .context("Review portal token missing: pass --token or set T2_VERIFICATION_TOKEN")
}

/// Return `value`, or the contents of the file it names when prefixed with `@`.
async fn read_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {path}")),
        None => Ok(value.to_string()),
    }
}

fn write_stdout(s: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(s.as_bytes())
        .context("Failed to write to stdout")?;
    if !s.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn only_ocr_subcommands_report_progress() {
        assert!(parse(&["t2x", "extract", "a.pdf"]).command.extracts());
        assert!(parse(&["t2x", "capture", "a.pdf", "--prompt", "p"]).command.extracts());
        assert!(parse(&[
            "t2x", "run", "a.pdf", "--prompt", "p", "--layout", "l", "--project", "1"
        ])
        .command
        .extracts());
        assert!(!parse(&[
            "t2x", "submit", "a.pdf", "--completion", "c", "--layout", "l", "--project", "1"
        ])
        .command
        .extracts());
        assert!(!parse(&["t2x", "list", "--project", "1"]).command.extracts());
    }

    #[tokio::test]
    async fn failed_extraction_stops_the_progress_bar() {
        let progress = CliProgress::new();
        let pipeline = DocumentPipeline::new(PipelineConfig::default()).unwrap();

        let err = extract(&pipeline, Path::new("contract.docx"), Some(&*progress)).await;

        assert!(err.is_err());
        assert!(progress.bar.is_finished());
    }
}
