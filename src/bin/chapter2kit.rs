//! CLI binary for edgequake-chapter.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_chapter::{
    process_batch, render_from_json, BatchSummary, ChapterFailure, ChapterJob, ChapterOutcome,
    PipelineConfig, PipelineProgressCallback, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the chapters of the batch; the message shows the current
/// chapter and stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos}/{len} chapters  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Chapters");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_chapters: usize) {
        self.bar.set_length(total_chapters as u64);
    }

    fn on_chapter_start(&self, chapter: &str, index: usize, total_chapters: usize) {
        self.bar.println(format!(
            "{} {}",
            bold(&format!("[{index}/{total_chapters}]")),
            chapter
        ));
    }

    fn on_stage(&self, chapter: &str, stage: Stage) {
        self.bar.set_message(format!("{chapter}: {}", stage.label()));
    }

    fn on_chapter_complete(&self, chapter: &str, warnings: usize) {
        let line = if warnings == 0 {
            format!("  {} {}", green("✓"), chapter)
        } else {
            format!("  {} {}  {}", yellow("⚠"), chapter, dim(&format!("{warnings} warnings")))
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_chapter_error(&self, chapter: &str, error: &str) {
        let first = error.lines().next().unwrap_or(error);
        let msg = if first.chars().count() > 100 {
            format!("{}…", first.chars().take(99).collect::<String>())
        } else {
            first.to_string()
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), chapter, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_chapters: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # The four NCERT Class 8 science chapters
  chapter2kit --sample-batch

  # One chapter from a URL, one from disk
  chapter2kit Chapter_13_Sound=https://ncert.nic.in/textbook/pdf/hesc113.pdf \
              Chapter_06_Combustion_and_Flame=pdfs/hesc106.pdf

  # Name derived from the file stem (hesc106)
  chapter2kit pdfs/hesc106.pdf

  # Re-render spreadsheet, graph and docs from a saved JSON, no AI calls
  chapter2kit --skip-planner \
    --from-json Chapter_13_Sound=data/extracted_json/Chapter_13_Sound_chapter-extract.json

  # Machine-readable summary
  chapter2kit --sample-batch --json > run.json

OUTPUT LAYOUT (under --data-dir, default ./data):
  downloaded_pdfs/   source PDFs and <stem>_extracted.txt
  extracted_json/    <chapter>_chapter-extract.json
  output_excel/      <chapter>_science-sample-output.xlsx
  output_kg/         <chapter>_knowledge-graph.txt
  output_planner/    <chapter>_study_planner.md
  documentation/     <chapter>_documentation.md

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred when set)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         libpdfium file, or the directory containing it
"#;

/// Turn textbook chapter PDFs into JSON, spreadsheets, knowledge graphs and
/// study planners.
#[derive(Parser, Debug)]
#[command(
    name = "chapter2kit",
    version,
    about = "Turn textbook chapter PDFs into structured study material using an LLM",
    long_about = "Extract the text of each chapter PDF, have an LLM structure it into a JSON \
content tree, then write a spreadsheet, a text knowledge graph, a study planner and a \
documentation file per chapter.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Chapters as NAME=SOURCE (SOURCE is a path or HTTP/HTTPS URL), or a bare path.
    chapters: Vec<String>,

    /// Add the four NCERT Class 8 science sample chapters to the batch.
    #[arg(long)]
    sample_batch: bool,

    /// Re-render from saved JSON instead of processing PDFs (NAME=JSON_PATH).
    #[arg(long, value_name = "NAME=JSON")]
    from_json: Vec<String>,

    /// Root directory for downloads and artifacts.
    #[arg(long, env = "CHAPTER2KIT_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// LLM model ID (default for named providers: gemini-2.0-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Total attempts per AI call or download.
    #[arg(long, env = "CHAPTER2KIT_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Wait after the first failed attempt, in milliseconds.
    #[arg(long, env = "CHAPTER2KIT_RETRY_DELAY_MS", default_value_t = 10_000)]
    retry_delay_ms: u64,

    /// Growth factor between retry waits.
    #[arg(long, env = "CHAPTER2KIT_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    backoff_multiplier: f64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CHAPTER2KIT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "CHAPTER2KIT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Text file replacing the built-in extraction prompt.
    #[arg(long, env = "CHAPTER2KIT_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Text file replacing the built-in planner prompt.
    #[arg(long, env = "CHAPTER2KIT_PLANNER_PROMPT")]
    planner_prompt: Option<PathBuf>,

    /// Do not generate study planners.
    #[arg(long, env = "CHAPTER2KIT_SKIP_PLANNER")]
    skip_planner: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CHAPTER2KIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "CHAPTER2KIT_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "CHAPTER2KIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CHAPTER2KIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CHAPTER2KIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CHAPTER2KIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = if cli.from_json.is_empty() {
        let jobs = collect_jobs(&cli)?;
        process_batch(&jobs, &config).await
    } else {
        let jobs = parse_jobs(&cli.from_json)?;
        rerender_batch(&jobs, &config).await
    };

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary);
    }

    let failed = summary.failed();
    if failed > 0 {
        anyhow::bail!("{failed} of {} chapters failed", summary.outcomes.len());
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .data_dir(&cli.data_dir)
        .max_attempts(cli.max_attempts)
        .retry_base_delay_ms(cli.retry_delay_ms)
        .retry_multiplier(cli.backoff_multiplier)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .skip_planner(cli.skip_planner)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.extraction_prompt {
        builder = builder.extraction_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.planner_prompt {
        builder = builder.planner_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

fn collect_jobs(cli: &Cli) -> Result<Vec<ChapterJob>> {
    let mut jobs = parse_jobs(&cli.chapters)?;
    if cli.sample_batch {
        jobs.extend(ChapterJob::sample_batch());
    }
    if jobs.is_empty() {
        anyhow::bail!("No chapters given. Pass NAME=SOURCE arguments or --sample-batch.");
    }
    Ok(jobs)
}

fn parse_jobs(specs: &[String]) -> Result<Vec<ChapterJob>> {
    specs
        .iter()
        .map(|s| {
            ChapterJob::parse(s)
                .with_context(|| format!("Invalid chapter '{s}': expected NAME=SOURCE or a path"))
        })
        .collect()
}

/// `--from-json` mode: same progress events and summary as a normal batch.
async fn rerender_batch(jobs: &[ChapterJob], config: &PipelineConfig) -> BatchSummary {
    let start = Instant::now();
    let total = jobs.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    let mut outcomes = Vec::with_capacity(total);
    for (i, job) in jobs.iter().enumerate() {
        if let Some(cb) = cb {
            cb.on_chapter_start(&job.name, i + 1, total);
        }
        let outcome = match render_from_json(&job.name, Path::new(&job.source), config).await {
            Ok(report) => {
                if let Some(cb) = cb {
                    cb.on_chapter_complete(&job.name, report.warnings.len());
                }
                ChapterOutcome::Completed(report)
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_chapter_error(&job.name, &e.to_string());
                }
                ChapterOutcome::Failed(ChapterFailure {
                    chapter: job.name.clone(),
                    source: job.source.clone(),
                    category: e.category(),
                    error: e.to_string(),
                })
            }
        };
        outcomes.push(outcome);
    }

    let summary = BatchSummary {
        outcomes,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    if let Some(cb) = cb {
        cb.on_batch_complete(total, summary.succeeded());
    }
    summary
}

fn print_summary(summary: &BatchSummary) {
    for outcome in &summary.outcomes {
        match outcome {
            ChapterOutcome::Completed(report) => {
                let mark = if report.is_complete() {
                    green("✔")
                } else {
                    yellow("⚠")
                };
                eprintln!(
                    "{} {}  {} artifacts  {}",
                    mark,
                    bold(&report.chapter),
                    report.artifacts.written(),
                    dim(&format!("{}ms", report.stats.total_duration_ms)),
                );
                for w in &report.warnings {
                    eprintln!("    {}", yellow(&w.to_string()));
                }
            }
            ChapterOutcome::Failed(f) => {
                eprintln!("{} {}  [{}]", red("✘"), bold(&f.chapter), f.category);
                for line in f.error.lines() {
                    eprintln!("    {}", red(line));
                }
            }
        }
    }

    let (tokens_in, tokens_out) = summary.total_tokens();
    eprintln!(
        "{}/{} chapters  {}ms  {} tokens in / {} tokens out",
        summary.succeeded(),
        summary.outcomes.len(),
        summary.total_duration_ms,
        dim(&tokens_in.to_string()),
        dim(&tokens_out.to_string()),
    );
}
