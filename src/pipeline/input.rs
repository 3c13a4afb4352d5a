//! Source resolution: turn a user-supplied path or URL into a local PDF.
//!
//! URL sources are downloaded into the run's `downloaded_pdfs/` directory and
//! kept there, so re-running a batch reuses the file instead of fetching it
//! again. The body is streamed into a temp file in the same directory and
//! renamed into place only once complete; an interrupted download never
//! leaves a truncated PDF that a later run would mistake for a cached one.
//! Magic bytes (`%PDF`) are checked before returning so callers get a
//! meaningful error rather than a pdfium failure.
//!
//! Only transient download failures are retried. A 4xx answer other than 408
//! or 429, or a body that is not a PDF, fails on the first attempt.

use crate::config::RetryPolicy;
use crate::error::ChapterError;
use crate::pipeline::retry::{retry_with_backoff_if, RetryError};
use futures::StreamExt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where a chapter's PDF came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// The source was a local file.
    Local(PathBuf),
    /// The source was a URL and the file was already in the download cache.
    Cached { url: String, path: PathBuf },
    /// The source was a URL and was fetched during this run.
    Downloaded { url: String, path: PathBuf },
}

impl ResolvedSource {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedSource::Local(p) => p,
            ResolvedSource::Cached { path, .. } | ResolvedSource::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the source string looks like a URL.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Resolve `source` to a local PDF path, downloading into `download_dir` if
/// it is a URL not already cached there.
pub async fn resolve_source(
    source: &str,
    download_dir: &Path,
    timeout_secs: u64,
    retry: &RetryPolicy,
) -> Result<ResolvedSource, ChapterError> {
    if is_url(source) {
        let filename = filename_from_url(source).ok_or_else(|| ChapterError::InvalidSource {
            source_str: source.to_string(),
        })?;
        let path = download_dir.join(filename);

        if path.exists() {
            info!("PDF already exists locally: {}. Skipping download.", path.display());
            check_pdf_magic(&path)?;
            return Ok(ResolvedSource::Cached {
                url: source.to_string(),
                path,
            });
        }

        download_with_retry(source, &path, timeout_secs, retry).await?;
        Ok(ResolvedSource::Downloaded {
            url: source.to_string(),
            path,
        })
    } else {
        resolve_local(source)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedSource, ChapterError> {
    if path_str.trim().is_empty() || path_str.contains("://") {
        return Err(ChapterError::InvalidSource {
            source_str: path_str.to_string(),
        });
    }

    let path = PathBuf::from(path_str);
    if !path.is_file() {
        return Err(ChapterError::FileNotFound { path });
    }

    check_pdf_magic(&path)?;
    debug!("Using local PDF file: {}", path.display());
    Ok(ResolvedSource::Local(path))
}

fn check_pdf_magic(path: &Path) -> Result<(), ChapterError> {
    match std::fs::File::open(path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(4);
            f.take(4).read_to_end(&mut head).map_err(|_| ChapterError::NotAPdf {
                path: path.to_path_buf(),
                magic: [0; 4],
            })?;
            check_magic_bytes(path, &head)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ChapterError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(ChapterError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// `head` is the first (up to) four bytes of the file; shorter is never a PDF.
fn check_magic_bytes(path: &Path, head: &[u8]) -> Result<(), ChapterError> {
    if head == b"%PDF" {
        return Ok(());
    }
    let n = head.len().min(4);
    let mut magic = [0u8; 4];
    magic[..n].copy_from_slice(&head[..n]);
    Err(ChapterError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

/// Transport errors, timeouts and server-side statuses may clear up.
fn is_transient(err: &ChapterError) -> bool {
    matches!(
        err,
        ChapterError::DownloadFailed { .. } | ChapterError::DownloadTimeout { .. }
    )
}

async fn download_with_retry(
    url: &str,
    dest: &Path,
    timeout_secs: u64,
    retry: &RetryPolicy,
) -> Result<(), ChapterError> {
    info!("Downloading {} from URL...", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ChapterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let label = format!("download {url}");
    let attempt = |_: u32| download_once(&client, url, dest, timeout_secs);
    match retry_with_backoff_if(retry, &label, is_transient, attempt).await {
        Ok(bytes) => {
            info!("Downloaded: {} ({} bytes)", dest.display(), bytes);
            Ok(())
        }
        Err(RetryError { last, .. }) => Err(last),
    }
}

async fn download_once(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout_secs: u64,
) -> Result<u64, ChapterError> {
    let failed = |reason: String| ChapterError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let from_reqwest = |e: reqwest::Error| {
        if e.is_timeout() {
            ChapterError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let response = client.get(url).send().await.map_err(from_reqwest)?;
    let status = response.status();
    if status.is_client_error()
        && status != reqwest::StatusCode::REQUEST_TIMEOUT
        && status != reqwest::StatusCode::TOO_MANY_REQUESTS
    {
        return Err(ChapterError::DownloadRejected {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(failed(format!("HTTP {status}")));
    }

    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| ChapterError::ArtifactWriteFailed {
        path: dest.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;

    let mut written = 0u64;
    let mut magic = Vec::with_capacity(4);
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(from_reqwest)?;
        if magic.len() < 4 {
            let take = (4 - magic.len()).min(chunk.len());
            magic.extend_from_slice(&chunk[..take]);
        }
        tmp.write_all(&chunk).map_err(write_err)?;
        written += chunk.len() as u64;
    }

    check_magic_bytes(dest, &magic)?;

    tmp.persist(dest).map_err(|e| write_err(e.error))?;
    Ok(written)
}

/// Last non-empty path segment of a URL (`…/pdf/hesc106.pdf` → `hesc106.pdf`).
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    if last.ends_with(".pdf") {
        Some(last.to_string())
    } else {
        Some(format!("{last}.pdf"))
    }
}
