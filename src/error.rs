//! Error types for the edgequake-chapter library.
//!
//! Three layers of failure, from widest to narrowest:
//!
//! * [`ChapterError`]: fatal for one chapter. The PDF could not be
//!   acquired, no text came out of it, or the AI extraction produced nothing
//!   usable. Returned as `Err(ChapterError)` from
//!   [`crate::convert::process_chapter`]; a batch logs it and moves on to the
//!   next chapter.
//!
//! * [`ArtifactError`]: non-fatal. One output file could not be
//!   produced (disk full, planner call failed) while the rest of the chapter
//!   is fine. Stored inside [`crate::output::ChapterReport`] so callers can see
//!   exactly which artifacts are missing.
//!
//! * [`SchemaError`] / [`ValidationError`]: the content tree handed to the
//!   renderers has no usable `content` sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Rejection reasons from [`crate::schema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The top-level `content` field is absent or not an array.
    #[error("structured content has no top-level 'content' array")]
    MissingContentField,

    /// The text handed to [`crate::schema::ContentTree::from_json_str`] is not JSON.
    #[error("structured content is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Refusals from the renderers when fed raw, unvalidated JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No `content` sequence to render.
    #[error("cannot render table: 'content' key missing or not a list")]
    MissingContent,
}

impl From<ValidationError> for SchemaError {
    fn from(_: ValidationError) -> Self {
        SchemaError::MissingContent
    }
}

/// Coarse grouping of [`ChapterError`] variants, used for logging and the
/// batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Acquisition,
    Extraction,
    Ai,
    Schema,
    Persistence,
    Config,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Acquisition => "acquisition",
            ErrorCategory::Extraction => "extraction",
            ErrorCategory::Ai => "ai",
            ErrorCategory::Schema => "schema",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Config => "config",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Pipeline stage an AI call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStage {
    Extraction,
    Planner,
}

impl fmt::Display for AiStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiStage::Extraction => f.write_str("structure extraction"),
            AiStage::Planner => f.write_str("study planner"),
        }
    }
}

/// All errors that abort processing of a single chapter.
#[derive(Debug, Error)]
pub enum ChapterError {
    // ── Acquisition ──────────────────────────────────────────────────────
    /// Local PDF path does not exist.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source string is neither an existing file nor an HTTP/HTTPS URL.
    #[error("Invalid PDF source '{source_str}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidSource { source_str: String },

    /// Download failed after every retry.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The server answered with a client error; retrying cannot help.
    #[error("Server refused '{url}' with HTTP {status}\nCheck the chapter URL.")]
    DownloadRejected { url: String, status: u16 },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction ───────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("PDF '{path}' is corrupt or unsupported: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// No pdfium shared library could be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to a libpdfium file (or the directory holding it),\n\
or install pdfium where the system loader can find it."
    )]
    PdfiumBindingFailed(String),

    /// Every page came back empty.
    #[error("No text could be extracted from '{path}'")]
    NoTextExtracted { path: PathBuf },

    // ── AI ───────────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The AI call failed on every attempt.
    #[error("AI {stage} failed after {attempts} attempts: {detail}")]
    AiFailure {
        stage: AiStage,
        attempts: u32,
        detail: String,
    },

    /// The AI replied, but not with something we can use.
    #[error("AI {stage} reply could not be used: {detail}")]
    UnparseableResponse { stage: AiStage, detail: String },

    // ── Schema ───────────────────────────────────────────────────────────
    /// Structured content failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A renderer refused the content tree.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    // ── Persistence ──────────────────────────────────────────────────────
    /// Could not create an output directory or write an artifact.
    #[error("Failed to write '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ───────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChapterError {
    /// Which part of the pipeline produced this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChapterError::FileNotFound { .. }
            | ChapterError::PermissionDenied { .. }
            | ChapterError::InvalidSource { .. }
            | ChapterError::DownloadFailed { .. }
            | ChapterError::DownloadRejected { .. }
            | ChapterError::DownloadTimeout { .. }
            | ChapterError::NotAPdf { .. } => ErrorCategory::Acquisition,
            ChapterError::CorruptPdf { .. }
            | ChapterError::PdfiumBindingFailed(_)
            | ChapterError::NoTextExtracted { .. } => ErrorCategory::Extraction,
            ChapterError::ProviderNotConfigured { .. }
            | ChapterError::AiFailure { .. }
            | ChapterError::UnparseableResponse { .. } => ErrorCategory::Ai,
            ChapterError::Validation(_) | ChapterError::Schema(_) => ErrorCategory::Schema,
            ChapterError::ArtifactWriteFailed { .. } => ErrorCategory::Persistence,
            ChapterError::InvalidConfig(_) => ErrorCategory::Config,
            ChapterError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// A non-fatal failure for one artifact of a chapter.
///
/// Stored in [`crate::output::ChapterReport::warnings`]. Artifacts written
/// before the failure are left in place.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ArtifactError {
    /// Writing the file failed.
    #[error("{artifact}: failed to write '{path}': {detail}")]
    WriteFailed {
        artifact: String,
        path: PathBuf,
        detail: String,
    },

    /// The spreadsheet renderer refused the tree.
    #[error("{artifact}: {detail}")]
    RenderFailed { artifact: String, detail: String },

    /// The planner call failed; no planner file was written.
    #[error("study planner skipped: {detail}")]
    PlannerUnavailable { detail: String },
}

impl ArtifactError {
    pub(crate) fn write_failed(artifact: &str, err: &ChapterError) -> Self {
        match err {
            ChapterError::ArtifactWriteFailed { path, source } => ArtifactError::WriteFailed {
                artifact: artifact.to_string(),
                path: path.clone(),
                detail: source.to_string(),
            },
            other => ArtifactError::RenderFailed {
                artifact: artifact.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_missing_content() {
        let e: SchemaError = ValidationError::MissingContentField.into();
        assert_eq!(e, SchemaError::MissingContent);
    }

    #[test]
    fn ai_failure_display() {
        let e = ChapterError::AiFailure {
            stage: AiStage::Extraction,
            attempts: 3,
            detail: "quota".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("structure extraction"), "got: {msg}");
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert_eq!(e.category(), ErrorCategory::Ai);
    }

    #[test]
    fn categories_cover_acquisition_and_extraction() {
        let e = ChapterError::InvalidSource {
            source_str: "ftp://x".into(),
        };
        assert_eq!(e.category(), ErrorCategory::Acquisition);
        let e = ChapterError::NoTextExtracted {
            path: PathBuf::from("a.pdf"),
        };
        assert_eq!(e.category(), ErrorCategory::Extraction);
        let e: ChapterError = SchemaError::MissingContent.into();
        assert_eq!(e.category(), ErrorCategory::Schema);
    }

    #[test]
    fn artifact_error_from_write_failure() {
        let err = ChapterError::ArtifactWriteFailed {
            path: PathBuf::from("/ro/out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        let a = ArtifactError::write_failed("knowledge graph", &err);
        let msg = a.to_string();
        assert!(msg.contains("knowledge graph"), "got: {msg}");
        assert!(msg.contains("read-only"), "got: {msg}");
    }
}
