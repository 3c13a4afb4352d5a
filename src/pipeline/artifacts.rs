//! On-disk layout of a run and the writers for its text artifacts.
//!
//! ```text
//! <data_dir>/
//!   downloaded_pdfs/   source PDFs and <stem>_extracted.txt
//!   extracted_json/    <chapter>_chapter-extract.json
//!   output_excel/      <chapter>_science-sample-output.xlsx
//!   output_kg/         <chapter>_knowledge-graph.txt
//!   output_planner/    <chapter>_study_planner.md
//!   documentation/     <chapter>_documentation.md
//! ```
//!
//! Every write goes through a temp file in the target directory and a rename,
//! so a crash mid-write never leaves a truncated artifact behind.

use crate::error::ChapterError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DOWNLOADS_DIR: &str = "downloaded_pdfs";
pub const JSON_DIR: &str = "extracted_json";
pub const EXCEL_DIR: &str = "output_excel";
pub const GRAPH_DIR: &str = "output_kg";
pub const PLANNER_DIR: &str = "output_planner";
pub const DOCS_DIR: &str = "documentation";

/// Format of the "Generated on" line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Paths of every artifact under one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create every output directory.
    pub fn ensure(&self) -> Result<(), ChapterError> {
        for dir in [
            DOWNLOADS_DIR,
            JSON_DIR,
            EXCEL_DIR,
            GRAPH_DIR,
            PLANNER_DIR,
            DOCS_DIR,
        ] {
            let path = self.root.join(dir);
            std::fs::create_dir_all(&path)
                .map_err(|source| ChapterError::ArtifactWriteFailed { path, source })?;
        }
        Ok(())
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    /// `downloaded_pdfs/<stem>_extracted.txt` for a PDF at `pdf_path`.
    pub fn raw_text(&self, pdf_path: &Path) -> PathBuf {
        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.downloads_dir()
            .join(format!("{}_extracted.txt", safe_file_stem(&stem)))
    }

    pub fn json(&self, chapter: &str) -> PathBuf {
        self.chapter_file(JSON_DIR, chapter, "_chapter-extract.json")
    }

    pub fn spreadsheet(&self, chapter: &str) -> PathBuf {
        self.chapter_file(EXCEL_DIR, chapter, "_science-sample-output.xlsx")
    }

    pub fn graph(&self, chapter: &str) -> PathBuf {
        self.chapter_file(GRAPH_DIR, chapter, "_knowledge-graph.txt")
    }

    pub fn planner(&self, chapter: &str) -> PathBuf {
        self.chapter_file(PLANNER_DIR, chapter, "_study_planner.md")
    }

    pub fn documentation(&self, chapter: &str) -> PathBuf {
        self.chapter_file(DOCS_DIR, chapter, "_documentation.md")
    }

    fn chapter_file(&self, dir: &str, chapter: &str, suffix: &str) -> PathBuf {
        self.root
            .join(dir)
            .join(format!("{}{}", safe_file_stem(chapter), suffix))
    }
}

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w.\-]+").unwrap());

/// Chapter names become file-name prefixes; anything outside word
/// characters, `.` and `-` is replaced by `_`.
pub fn safe_file_stem(name: &str) -> String {
    let s = RE_UNSAFE.replace_all(name.trim(), "_");
    let s = s.trim_matches('.');
    if s.is_empty() {
        "chapter".to_string()
    } else {
        s.to_string()
    }
}

/// Write `contents` to `path` atomically, creating the parent directory.
pub fn write_text(path: &Path, contents: &str) -> Result<(), ChapterError> {
    let fail = |source: std::io::Error| ChapterError::ArtifactWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(fail)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(contents.as_bytes()).map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Body of `<chapter>_documentation.md`.
pub fn documentation_markdown(
    chapter: &str,
    generated_on: &str,
    extraction_prompt: &str,
    planner_prompt: &str,
) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("# Documentation for {chapter}\n\n"));
    doc.push_str(&format!("**Generated on:** {generated_on}\n\n"));

    doc.push_str("## Prompts Used\n");
    doc.push_str(&format!(
        "### Extraction Prompt:\n```markdown\n{extraction_prompt}\n```\n"
    ));
    doc.push_str(&format!(
        "### Planner Prompt:\n```markdown\n{planner_prompt}\n```\n"
    ));

    doc.push_str("## Workflow\n");
    doc.push_str("1. Download or use local PDF.\n");
    doc.push_str("2. Extract text using pdfium.\n");
    doc.push_str("3. Use AI for JSON structuring.\n");
    doc.push_str("4. Create Excel & knowledge graph.\n");
    doc.push_str("5. Generate planner & documentation.\n");
    doc
}

/// Local time formatted with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_follow_naming_scheme() {
        let layout = ArtifactLayout::new("data");
        let ch = "Chapter_13_Sound";
        assert_eq!(
            layout.json(ch),
            PathBuf::from("data/extracted_json/Chapter_13_Sound_chapter-extract.json")
        );
        assert_eq!(
            layout.spreadsheet(ch),
            PathBuf::from("data/output_excel/Chapter_13_Sound_science-sample-output.xlsx")
        );
        assert_eq!(
            layout.graph(ch),
            PathBuf::from("data/output_kg/Chapter_13_Sound_knowledge-graph.txt")
        );
        assert_eq!(
            layout.planner(ch),
            PathBuf::from("data/output_planner/Chapter_13_Sound_study_planner.md")
        );
        assert_eq!(
            layout.documentation(ch),
            PathBuf::from("data/documentation/Chapter_13_Sound_documentation.md")
        );
        assert_eq!(
            layout.raw_text(Path::new("/tmp/hesc113.pdf")),
            PathBuf::from("data/downloaded_pdfs/hesc113_extracted.txt")
        );
    }

    #[test]
    fn unsafe_names_are_sanitised() {
        assert_eq!(safe_file_stem("Chapter 6: Fire/Flame"), "Chapter_6_Fire_Flame");
        assert_eq!(safe_file_stem("../etc"), "_etc");
        assert_eq!(safe_file_stem("  "), "chapter");
        assert_eq!(safe_file_stem("Chapter_06_Combustion_and_Flame"), "Chapter_06_Combustion_and_Flame");
    }

    #[test]
    fn ensure_creates_all_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("data"));
        layout.ensure().unwrap();
        for sub in [DOWNLOADS_DIR, JSON_DIR, EXCEL_DIR, GRAPH_DIR, PLANNER_DIR, DOCS_DIR] {
            assert!(layout.root().join(sub).is_dir(), "missing {sub}");
        }
    }

    #[test]
    fn write_text_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.txt");
        write_text(&path, "first").unwrap();
        write_text(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn documentation_has_prompts_and_workflow() {
        let doc = documentation_markdown("Chapter_13_Sound", "2024-05-01 10:00:00", "EX", "PL");
        assert!(doc.starts_with("# Documentation for Chapter_13_Sound\n\n"));
        assert!(doc.contains("**Generated on:** 2024-05-01 10:00:00\n\n"));
        assert!(doc.contains("### Extraction Prompt:\n```markdown\nEX\n```\n"));
        assert!(doc.contains("### Planner Prompt:\n```markdown\nPL\n```\n"));
        assert!(doc.ends_with("5. Generate planner & documentation.\n"));
        assert_eq!(doc.matches("\n1. ").count() + doc.matches("\n5. ").count(), 2);
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[13..14], ":");
    }
}
