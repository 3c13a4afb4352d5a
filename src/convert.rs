//! Chapter processing entry points.
//!
//! [`process_chapter`] runs the whole pipeline for one chapter and returns a
//! [`ChapterReport`]; [`process_batch`] runs a list of chapters in order and
//! never lets one chapter's failure stop the rest. Use
//! [`crate::stream::process_batch_stream`] to receive each outcome as soon as
//! its chapter finishes.
//!
//! ## Failure model
//!
//! Acquisition, text extraction and AI structure extraction are fatal for the
//! chapter: without a content tree there is nothing to render. Everything
//! after that point is per artifact. A failed write or a failed planner call
//! becomes an [`ArtifactError`] in the report and the remaining artifacts are
//! still produced.

use crate::config::{ChapterJob, PipelineConfig, DEFAULT_MODEL};
use crate::error::{ArtifactError, ChapterError};
use crate::output::{BatchSummary, ChapterFailure, ChapterOutcome, ChapterReport};
use crate::pipeline::artifacts::{self, ArtifactLayout};
use crate::pipeline::{input, llm, text};
use crate::progress::Stage;
use crate::render::{graph, table};
use crate::schema::ContentTree;
use crate::xlsx;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Run the full pipeline for one chapter.
///
/// # Arguments
/// * `job`: chapter name (artifact prefix) and PDF source (path or URL)
/// * `config`: pipeline configuration
///
/// # Returns
/// `Ok(ChapterReport)` once a content tree exists, even if some artifacts
/// could not be written (check `report.warnings`).
///
/// # Errors
/// Returns `Err(ChapterError)` only for fatal errors:
/// - PDF not found, not a PDF, download failed
/// - no text extracted
/// - no provider, or AI extraction failed / unusable after every retry
pub async fn process_chapter(
    job: &ChapterJob,
    config: &PipelineConfig,
) -> Result<ChapterReport, ChapterError> {
    let start = Instant::now();
    let chapter = job.name.as_str();
    info!("Starting chapter {} from {}", chapter, job.source);

    let layout = ArtifactLayout::new(&config.data_dir);
    layout.ensure()?;
    let mut report = ChapterReport::new(chapter);

    // ── Step 1: Resolve source ───────────────────────────────────────────
    notify_stage(config, chapter, Stage::Acquire);
    let resolved = input::resolve_source(
        &job.source,
        &layout.downloads_dir(),
        config.download_timeout_secs,
        &config.retry,
    )
    .await?;
    let pdf_path = resolved.path().to_path_buf();
    report.pdf_path = Some(pdf_path.clone());

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config)?;

    // ── Step 3: Extract raw text ─────────────────────────────────────────
    notify_stage(config, chapter, Stage::ExtractText);
    let extracted = text::extract_text(&pdf_path).await?;
    report.stats.page_count = extracted.page_count;
    report.stats.text_chars = extracted.text.chars().count();
    if extracted.empty_pages > 0 {
        debug!(
            "{}: {}/{} pages had no text",
            chapter, extracted.empty_pages, extracted.page_count
        );
    }

    let raw_path = layout.raw_text(&pdf_path);
    match artifacts::write_text(&raw_path, &extracted.text) {
        Ok(()) => {
            info!("Raw extracted text saved to {}", raw_path.display());
            report.artifacts.raw_text = Some(raw_path);
        }
        Err(e) => record_failure(&mut report, "raw text", &e),
    }

    // ── Step 4: Structure extraction ─────────────────────────────────────
    notify_stage(config, chapter, Stage::ExtractStructure);
    let (tree, usage) = llm::extract_structure(&provider, &extracted.text, config).await?;
    report.stats.extraction = Some(usage);

    let json_path = layout.json(chapter);
    match artifacts::write_text(&json_path, &tree.to_pretty_json()) {
        Ok(()) => {
            info!("Structured JSON saved to {}", json_path.display());
            report.artifacts.json = Some(json_path);
        }
        Err(e) => record_failure(&mut report, "structured JSON", &e),
    }

    // ── Step 5: Derived artifacts ────────────────────────────────────────
    let planner_provider = (!config.skip_planner).then_some(&provider);
    render_outputs(&mut report, &tree, &layout, planner_provider, config).await;

    report.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Chapter {} complete: {} artifacts, {} warnings, {}ms",
        chapter,
        report.artifacts.written(),
        report.warnings.len(),
        report.stats.total_duration_ms
    );
    Ok(report)
}

/// Rebuild the spreadsheet, knowledge graph, planner and documentation of a
/// chapter from a previously saved JSON artifact.
///
/// No PDF or text extraction is involved. A provider is only resolved when
/// the planner is enabled; if none is available the planner is recorded as a
/// warning and the other artifacts are still written.
pub async fn render_from_json(
    chapter: &str,
    json_path: &Path,
    config: &PipelineConfig,
) -> Result<ChapterReport, ChapterError> {
    let start = Instant::now();
    info!("Re-rendering chapter {} from {}", chapter, json_path.display());

    let raw = std::fs::read_to_string(json_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ChapterError::FileNotFound {
            path: json_path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ChapterError::PermissionDenied {
            path: json_path.to_path_buf(),
        },
        _ => ChapterError::Internal(format!("reading {}: {}", json_path.display(), e)),
    })?;
    let tree = ContentTree::from_json_str(&raw)?;

    let layout = ArtifactLayout::new(&config.data_dir);
    layout.ensure()?;

    let mut report = ChapterReport::new(chapter);
    report.artifacts.json = Some(json_path.to_path_buf());

    let provider = if config.skip_planner {
        None
    } else {
        match resolve_provider(config) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("{}: no provider for study planner: {}", chapter, e);
                report
                    .warnings
                    .push(ArtifactError::PlannerUnavailable {
                        detail: e.to_string(),
                    });
                None
            }
        }
    };

    render_outputs(&mut report, &tree, &layout, provider.as_ref(), config).await;
    report.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(report)
}

/// Process every job in order. A failing chapter is logged, reported to the
/// progress callback and recorded in the summary; the batch carries on.
pub async fn process_batch(jobs: &[ChapterJob], config: &PipelineConfig) -> BatchSummary {
    let start = Instant::now();
    let total = jobs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut outcomes = Vec::with_capacity(total);
    for (i, job) in jobs.iter().enumerate() {
        outcomes.push(run_job(job, i + 1, total, config).await);
    }

    let summary = BatchSummary {
        outcomes,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Batch complete: {}/{} chapters succeeded, {}ms",
        summary.succeeded(),
        total,
        summary.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, summary.succeeded());
    }
    summary
}

/// Synchronous wrapper around [`process_chapter`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_chapter_sync(
    job: &ChapterJob,
    config: &PipelineConfig,
) -> Result<ChapterReport, ChapterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ChapterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_chapter(job, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run one job of a batch, firing the per-chapter progress events.
pub(crate) async fn run_job(
    job: &ChapterJob,
    index: usize,
    total: usize,
    config: &PipelineConfig,
) -> ChapterOutcome {
    if let Some(ref cb) = config.progress_callback {
        cb.on_chapter_start(&job.name, index, total);
    }

    match process_chapter(job, config).await {
        Ok(report) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_chapter_complete(&job.name, report.warnings.len());
            }
            ChapterOutcome::Completed(report)
        }
        Err(e) => {
            error!("Chapter {} failed ({}): {}", job.name, e.category(), e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_chapter_error(&job.name, &e.to_string());
            }
            ChapterOutcome::Failed(ChapterFailure {
                chapter: job.name.clone(),
                source: job.source.clone(),
                category: e.category(),
                error: e.to_string(),
            })
        }
    }
}

/// Write spreadsheet, knowledge graph, optional planner and documentation.
///
/// `planner_provider` is `None` when no planner should be requested.
async fn render_outputs(
    report: &mut ChapterReport,
    tree: &ContentTree,
    layout: &ArtifactLayout,
    planner_provider: Option<&Arc<dyn LLMProvider>>,
    config: &PipelineConfig,
) {
    let chapter = report.chapter.clone();
    report.chapter_title = tree.chapter_title.clone();
    report.stats.element_count = tree.element_count();

    // Spreadsheet
    notify_stage(config, &chapter, Stage::RenderTable);
    let sheet = table::render(tree);
    report.stats.table_rows = sheet.rows.len();
    let sheet_path = layout.spreadsheet(&chapter);
    match xlsx::save_workbook(&sheet, &sheet_path) {
        Ok(()) => {
            info!("Excel file saved to {}", sheet_path.display());
            report.artifacts.spreadsheet = Some(sheet_path);
        }
        Err(e) => record_failure(report, "spreadsheet", &e),
    }

    // Knowledge graph
    notify_stage(config, &chapter, Stage::RenderGraph);
    let graph_text = graph::render(tree);
    report.stats.graph_lines = graph_text.lines().count();
    let graph_path = layout.graph(&chapter);
    match artifacts::write_text(&graph_path, &graph_text) {
        Ok(()) => {
            info!("Knowledge graph saved to {}", graph_path.display());
            report.artifacts.graph = Some(graph_path);
        }
        Err(e) => record_failure(report, "knowledge graph", &e),
    }

    // Study planner
    if let Some(provider) = planner_provider {
        notify_stage(config, &chapter, Stage::Planner);
        match llm::generate_planner(provider, tree, config).await {
            Ok((planner, usage)) => {
                report.stats.planner = Some(usage);
                let planner_path = layout.planner(&chapter);
                match artifacts::write_text(&planner_path, &planner) {
                    Ok(()) => {
                        info!("Study planner saved to {}", planner_path.display());
                        report.artifacts.planner = Some(planner_path);
                    }
                    Err(e) => record_failure(report, "study planner", &e),
                }
            }
            Err(e) => {
                warn!("{}: study planner generation failed: {}", chapter, e);
                report.warnings.push(ArtifactError::PlannerUnavailable {
                    detail: e.to_string(),
                });
            }
        }
    } else {
        debug!("{}: study planner not requested", chapter);
    }

    // Documentation
    notify_stage(config, &chapter, Stage::Documentation);
    let doc = artifacts::documentation_markdown(
        &chapter,
        &artifacts::timestamp_now(),
        llm::extraction_prompt(config),
        llm::planner_prompt(config),
    );
    let doc_path = layout.documentation(&chapter);
    match artifacts::write_text(&doc_path, &doc) {
        Ok(()) => {
            info!("Documentation saved to {}", doc_path.display());
            report.artifacts.documentation = Some(doc_path);
        }
        Err(e) => record_failure(report, "documentation", &e),
    }
}

fn record_failure(report: &mut ChapterReport, artifact: &str, err: &ChapterError) {
    warn!("{}: {} not written: {}", report.chapter, artifact, err);
    report
        .warnings
        .push(ArtifactError::write_failed(artifact, err));
}

fn notify_stage(config: &PipelineConfig, chapter: &str, stage: Stage) {
    debug!("{}: {}", chapter, stage.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(chapter, stage);
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ChapterError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ChapterError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **`GEMINI_API_KEY`** present: Gemini with the configured model or
///    [`DEFAULT_MODEL`].
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub(crate) fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Arc<dyn LLMProvider>, ChapterError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    // 3) EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // 4) Gemini key present
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ChapterError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::PipelineProgressCallback;
    use std::sync::Mutex;

    const SAMPLE: &str = r#"{
        "chapter_title": "Sound",
        "content": [
            {"type": "topic", "name": "Vibration", "elements": [
                {"type": "paragraph", "text": "Sound is produced by vibrating objects."},
                {"type": "activity", "description": "Strike a bell", "steps": ["Strike", "Touch"]}
            ]}
        ]
    }"#;

    fn offline_config(dir: &Path) -> PipelineConfig {
        PipelineConfig::builder()
            .data_dir(dir)
            .skip_planner(true)
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct Stages(Mutex<Vec<Stage>>);

    impl PipelineProgressCallback for Stages {
        fn on_stage(&self, _chapter: &str, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    #[tokio::test]
    async fn render_from_json_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("sound.json");
        std::fs::write(&json_path, SAMPLE).unwrap();

        let report = render_from_json("Chapter_13_Sound", &json_path, &offline_config(dir.path()))
            .await
            .unwrap();

        assert!(report.is_complete(), "warnings: {:?}", report.warnings);
        assert_eq!(report.chapter_title.as_deref(), Some("Sound"));
        assert_eq!(report.stats.element_count, 3);
        assert_eq!(report.stats.table_rows, 5);
        assert!(report.artifacts.planner.is_none());

        let graph_path = report.artifacts.graph.unwrap();
        let graph = std::fs::read_to_string(graph_path).unwrap();
        assert!(graph.starts_with("Chapter: Sound\n"));
        assert!(graph.contains("- Topic: Vibration"));

        let doc = std::fs::read_to_string(report.artifacts.documentation.unwrap()).unwrap();
        assert!(doc.starts_with("# Documentation for Chapter_13_Sound"));
    }

    #[tokio::test]
    async fn render_from_json_reports_stages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("sound.json");
        std::fs::write(&json_path, SAMPLE).unwrap();

        let stages = Arc::new(Stages::default());
        let config = PipelineConfig::builder()
            .data_dir(dir.path())
            .skip_planner(true)
            .progress_callback(stages.clone())
            .build()
            .unwrap();
        render_from_json("Sound", &json_path, &config).await.unwrap();

        assert_eq!(
            *stages.0.lock().unwrap(),
            vec![Stage::RenderTable, Stage::RenderGraph, Stage::Documentation]
        );
    }

    #[tokio::test]
    async fn render_from_json_rejects_missing_content() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("bad.json");
        std::fs::write(&json_path, r#"{"chapter_title": "X"}"#).unwrap();

        let err = render_from_json("X", &json_path, &offline_config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChapterError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn render_from_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_from_json("X", &dir.path().join("nope.json"), &offline_config(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChapterError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn batch_continues_past_failed_chapter() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        let jobs = vec![
            ChapterJob::new("Missing", dir.path().join("missing.pdf").display().to_string()),
            ChapterJob::new("Bogus", "ftp://example.com/x.pdf"),
        ];

        let summary = process_batch(&jobs, &config).await;
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.outcomes[0].chapter(), "Missing");
        assert_eq!(summary.outcomes[1].chapter(), "Bogus");
        match &summary.outcomes[1] {
            ChapterOutcome::Failed(f) => {
                assert_eq!(f.category, crate::error::ErrorCategory::Acquisition)
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
