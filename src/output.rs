//! Result types returned by the chapter pipeline.
//!
//! Everything here is `Serialize` so the CLI can print a run as JSON and
//! library callers can persist reports next to the artifacts.

use crate::error::{ArtifactError, ErrorCategory};
use serde::Serialize;
use std::path::PathBuf;

/// Token and timing figures for one AI call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AiUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Attempt that succeeded (1 = first try).
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Where each artifact of a chapter ended up. `None` means not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub raw_text: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub spreadsheet: Option<PathBuf>,
    pub graph: Option<PathBuf>,
    pub planner: Option<PathBuf>,
    pub documentation: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Number of artifacts written.
    pub fn written(&self) -> usize {
        [
            &self.raw_text,
            &self.json,
            &self.spreadsheet,
            &self.graph,
            &self.planner,
            &self.documentation,
        ]
        .iter()
        .filter(|p| p.is_some())
        .count()
    }
}

/// Counters for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChapterStats {
    /// Pages in the PDF (0 for re-renders from JSON).
    pub page_count: usize,
    /// Characters of cleaned raw text.
    pub text_chars: usize,
    /// Elements across the whole content tree.
    pub element_count: usize,
    /// Spreadsheet rows, header and title rows included.
    pub table_rows: usize,
    /// Lines of knowledge-graph text.
    pub graph_lines: usize,
    pub extraction: Option<AiUsage>,
    pub planner: Option<AiUsage>,
    pub total_duration_ms: u64,
}

/// Outcome of a chapter that got at least as far as a content tree.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub chapter: String,
    /// Local PDF the chapter was read from, if any.
    pub pdf_path: Option<PathBuf>,
    pub chapter_title: Option<String>,
    pub artifacts: ArtifactPaths,
    /// Artifacts that could not be produced.
    pub warnings: Vec<ArtifactError>,
    pub stats: ChapterStats,
}

impl ChapterReport {
    pub(crate) fn new(chapter: impl Into<String>) -> Self {
        Self {
            chapter: chapter.into(),
            pdf_path: None,
            chapter_title: None,
            artifacts: ArtifactPaths::default(),
            warnings: Vec::new(),
            stats: ChapterStats::default(),
        }
    }

    /// True when every artifact attempted was written.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// A chapter that was abandoned.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterFailure {
    pub chapter: String,
    pub source: String,
    pub category: ErrorCategory,
    pub error: String,
}

/// What happened to one chapter of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChapterOutcome {
    Completed(ChapterReport),
    Failed(ChapterFailure),
}

impl ChapterOutcome {
    pub fn chapter(&self) -> &str {
        match self {
            ChapterOutcome::Completed(r) => &r.chapter,
            ChapterOutcome::Failed(f) => &f.chapter,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChapterOutcome::Completed(_))
    }
}

/// Result of a whole batch, in submission order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub outcomes: Vec<ChapterOutcome>,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Chapters that completed with at least one missing artifact.
    pub fn with_warnings(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChapterOutcome::Completed(r) if !r.is_complete()))
            .count()
    }

    pub fn total_tokens(&self) -> (u64, u64) {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ChapterOutcome::Completed(r) => Some(&r.stats),
                ChapterOutcome::Failed(_) => None,
            })
            .flat_map(|s| s.extraction.iter().chain(s.planner.iter()))
            .fold((0, 0), |(i, o), u| (i + u.input_tokens, o + u.output_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(name: &str, warnings: Vec<ArtifactError>) -> ChapterOutcome {
        let mut r = ChapterReport::new(name);
        r.warnings = warnings;
        r.stats.extraction = Some(AiUsage {
            input_tokens: 100,
            output_tokens: 40,
            attempts: 1,
            duration_ms: 5,
        });
        ChapterOutcome::Completed(r)
    }

    #[test]
    fn summary_counts() {
        let summary = BatchSummary {
            outcomes: vec![
                completed("a", vec![]),
                ChapterOutcome::Failed(ChapterFailure {
                    chapter: "b".into(),
                    source: "b.pdf".into(),
                    category: ErrorCategory::Acquisition,
                    error: "not found".into(),
                }),
                completed(
                    "c",
                    vec![ArtifactError::PlannerUnavailable {
                        detail: "quota".into(),
                    }],
                ),
            ],
            total_duration_ms: 10,
        };
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.with_warnings(), 1);
        assert_eq!(summary.total_tokens(), (200, 80));
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(completed("Sound", vec![])).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["chapter"], "Sound");
    }

    #[test]
    fn artifact_paths_count_written() {
        let paths = ArtifactPaths {
            json: Some(PathBuf::from("a.json")),
            graph: Some(PathBuf::from("a.txt")),
            ..Default::default()
        };
        assert_eq!(paths.written(), 2);
    }
}
