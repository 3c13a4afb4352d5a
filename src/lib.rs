//! # edgequake-chapter
//!
//! Turn textbook chapter PDFs into study material: a structured JSON content
//! tree, a spreadsheet, a text knowledge graph, an AI study planner and a
//! short documentation file per chapter.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (path or URL)
//!  │
//!  ├─ 1. Acquire   resolve local file or download into data/downloaded_pdfs
//!  ├─ 2. Text      page text via pdfium (spawn_blocking)
//!  ├─ 3. Structure AI call → JSON → validated ContentTree
//!  ├─ 4. Render    spreadsheet (.xlsx) + knowledge graph (.txt)
//!  ├─ 5. Planner   second AI call → Markdown study planner (optional)
//!  └─ 6. Document  prompts used + workflow summary
//! ```
//!
//! Steps 1-3 are fatal for a chapter; from step 4 on each artifact fails on
//! its own and is reported in [`ChapterReport::warnings`]. A batch never
//! stops because one chapter failed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_chapter::{process_batch, ChapterJob, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = PipelineConfig::builder().data_dir("data").build()?;
//!     let summary = process_batch(&ChapterJob::sample_batch(), &config).await;
//!     eprintln!("{}/{} chapters", summary.succeeded(), summary.outcomes.len());
//!     Ok(())
//! }
//! ```
//!
//! The renderers are pure and usable on their own:
//!
//! ```rust
//! use edgequake_chapter::{render, ContentTree};
//!
//! let tree = ContentTree::from_json_str(
//!     r#"{"chapter_title": "Sound", "content": [{"type": "topic", "name": "Vibration"}]}"#,
//! ).unwrap();
//! assert_eq!(render::table::render(&tree).rows.len(), 3);
//! assert!(render::graph::render(&tree).contains("- Topic: Vibration"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `chapter2kit` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod schema;
pub mod stream;
pub mod xlsx;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ChapterJob, PipelineConfig, PipelineConfigBuilder, RetryPolicy, DEFAULT_MODEL};
pub use convert::{process_batch, process_chapter, process_chapter_sync, render_from_json};
pub use error::{
    AiStage, ArtifactError, ChapterError, ErrorCategory, SchemaError, ValidationError,
};
pub use output::{
    AiUsage, ArtifactPaths, BatchSummary, ChapterFailure, ChapterOutcome, ChapterReport,
    ChapterStats,
};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use schema::{validate, ContentElement, ContentTree};
pub use stream::{process_batch_stream, ChapterStream};
