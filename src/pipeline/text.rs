//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with process-global state; every call blocks. The
//! whole open-iterate-close sequence runs on tokio's blocking pool so worker
//! threads keep servicing downloads and AI calls meanwhile.
//!
//! ## Library binding
//!
//! `PDFIUM_LIB_PATH` may name the shared library itself or the directory
//! holding it. Without it, the working directory is tried first and then the
//! system loader path.

use crate::error::ChapterError;
use crate::pipeline::postprocess::clean_extracted_text;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Text pulled out of a PDF, pages joined in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Cleaned text, pages separated by a newline.
    pub text: String,
    /// Pages in the document.
    pub page_count: usize,
    /// Pages that yielded no text (scanned images, blank pages).
    pub empty_pages: usize,
}

/// Extract the text of every page of `pdf_path`.
///
/// Fails with [`ChapterError::NoTextExtracted`] when no page yields any text.
pub async fn extract_text(pdf_path: &Path) -> Result<ExtractedText, ChapterError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| ChapterError::Internal(format!("Text extraction task panicked: {}", e)))?
}

fn extract_text_blocking(pdf_path: &Path) -> Result<ExtractedText, ChapterError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ChapterError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let mut page_texts = Vec::with_capacity(page_count);
    let mut empty_pages = 0;
    for (idx, page) in pages.iter().enumerate() {
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                warn!("Page {}: text layer unreadable: {:?}", idx + 1, e);
                String::new()
            }
        };
        if text.trim().is_empty() {
            empty_pages += 1;
        }
        debug!("Page {}: {} chars", idx + 1, text.len());
        page_texts.push(text);
    }

    let text = join_pages(&page_texts);
    if text.is_empty() {
        return Err(ChapterError::NoTextExtracted {
            path: pdf_path.to_path_buf(),
        });
    }

    Ok(ExtractedText {
        text,
        page_count,
        empty_pages,
    })
}

/// Concatenate page texts in order and clean the result.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let joined = pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");
    clean_extracted_text(&joined)
}

fn bind_pdfium() -> Result<Pdfium, ChapterError> {
    let mut tried = Vec::new();

    for candidate in library_candidates() {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => tried.push(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            tried.push(format!("system library: {:?}", e));
            ChapterError::PdfiumBindingFailed(tried.join("; "))
        })
}

fn library_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            out.push(library_path_for(Path::new(&p)));
        }
    }
    out.push(Pdfium::pdfium_platform_library_name_at_path("./"));
    out
}

/// A directory resolves to the platform library name inside it.
fn library_path_for(p: &Path) -> PathBuf {
    if p.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(p)
    } else {
        p.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_join_in_order() {
        let text = join_pages(&["Combustion  ", "", "Flame\r\n"]);
        assert_eq!(text, "Combustion\n\nFlame");
    }

    #[test]
    fn blank_pages_join_to_empty() {
        assert_eq!(join_pages(&["  ", "\n\n"]), "");
        assert_eq!(join_pages::<&str>(&[]), "");
    }

    #[test]
    fn file_path_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("libpdfium.so");
        std::fs::write(&lib, b"").unwrap();
        assert_eq!(library_path_for(&lib), lib);
    }

    #[test]
    fn directory_resolves_inside() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = library_path_for(dir.path());
        assert_eq!(resolved.parent(), Some(dir.path()));
    }
}
