//! Progress-callback trait for batch and per-stage events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to follow a
//! batch as it runs. The CLI drives an `indicatif` bar from it; library
//! callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_chapter::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PipelineProgressCallback for Printer {
//!     fn on_stage(&self, chapter: &str, stage: Stage) {
//!         eprintln!("{chapter}: {}", stage.label());
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// The steps of one chapter run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquire,
    ExtractText,
    ExtractStructure,
    RenderTable,
    RenderGraph,
    Planner,
    Documentation,
}

impl Stage {
    /// Every stage, in order.
    pub const ALL: [Stage; 7] = [
        Stage::Acquire,
        Stage::ExtractText,
        Stage::ExtractStructure,
        Stage::RenderTable,
        Stage::RenderGraph,
        Stage::Planner,
        Stage::Documentation,
    ];

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Acquire => "acquiring PDF",
            Stage::ExtractText => "extracting text",
            Stage::ExtractStructure => "structuring content (AI)",
            Stage::RenderTable => "writing spreadsheet",
            Stage::RenderGraph => "writing knowledge graph",
            Stage::Planner => "generating study planner (AI)",
            Stage::Documentation => "writing documentation",
        }
    }
}

/// Called by the pipeline as it processes a batch.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chapters run sequentially, but implementations must
/// still be `Send + Sync` because the pipeline is async.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first chapter.
    fn on_batch_start(&self, total_chapters: usize) {
        let _ = total_chapters;
    }

    /// Called when a chapter begins.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    fn on_chapter_start(&self, chapter: &str, index: usize, total_chapters: usize) {
        let _ = (chapter, index, total_chapters);
    }

    /// Called when a chapter enters a new stage.
    fn on_stage(&self, chapter: &str, stage: Stage) {
        let _ = (chapter, stage);
    }

    /// Called when a chapter finishes. `warnings` counts artifacts that
    /// could not be produced.
    fn on_chapter_complete(&self, chapter: &str, warnings: usize) {
        let _ = (chapter, warnings);
    }

    /// Called when a chapter is abandoned.
    fn on_chapter_error(&self, chapter: &str, error: &str) {
        let _ = (chapter, error);
    }

    /// Called once after every chapter has been attempted.
    fn on_batch_complete(&self, total_chapters: usize, succeeded: usize) {
        let _ = (total_chapters, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
