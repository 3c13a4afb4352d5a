//! Configuration types for chapter processing.
//!
//! Every knob lives in [`PipelineConfig`], built via
//! [`PipelineConfigBuilder`]. One struct per run keeps batches reproducible:
//! log it at start-up and two runs can be diffed field by field.

use crate::error::ChapterError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Model used when a provider is named but no model is given.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Exponential backoff applied around a fallible external call.
///
/// Attempt `n` (1-based) that fails waits `base_delay * multiplier^(n-1)`
/// before attempt `n + 1`. No wait follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, first one included. Default: 3.
    pub max_attempts: u32,
    /// Wait after the first failure. Default: 10 s.
    pub base_delay: Duration,
    /// Growth factor between waits. Default: 2.0.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to sleep after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.multiplier.max(1.0).powi(exp))
    }
}

/// Configuration for a chapter batch.
///
/// # Example
/// ```rust
/// use edgequake_chapter::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir("out")
///     .model("gemini-2.0-flash")
///     .max_attempts(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_attempts, 5);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Root directory for downloads and artifacts. Default: `data`.
    pub data_dir: PathBuf,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`] for named
    /// providers and the provider default otherwise.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per AI reply. Default: 8192.
    ///
    /// A full chapter's JSON is long; too low a cap truncates it mid-object
    /// and the reply no longer parses.
    pub max_tokens: usize,

    /// Retry policy for AI calls and downloads.
    pub retry: RetryPolicy,

    /// Extraction prompt override. If None, uses the built-in prompt.
    pub extraction_prompt: Option<String>,

    /// Planner prompt override. If None, uses the built-in prompt.
    pub planner_prompt: Option<String>,

    /// Skip the study planner call. Default: false.
    pub skip_planner: bool,

    /// Download timeout for URL sources in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-AI-call timeout in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            retry: RetryPolicy::default(),
            extraction_prompt: None,
            planner_prompt: None,
            skip_planner: false,
            download_timeout_secs: 120,
            api_timeout_secs: 180,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("data_dir", &self.data_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry", &self.retry)
            .field("extraction_prompt", &self.extraction_prompt.as_ref().map(|p| p.len()))
            .field("planner_prompt", &self.planner_prompt.as_ref().map(|p| p.len()))
            .field("skip_planner", &self.skip_planner)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.base_delay = Duration::from_millis(ms);
        self
    }

    pub fn retry_multiplier(mut self, m: f64) -> Self {
        self.config.retry.multiplier = m;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn planner_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.planner_prompt = Some(prompt.into());
        self
    }

    pub fn skip_planner(mut self, v: bool) -> Self {
        self.config.skip_planner = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ChapterError> {
        let c = &self.config;
        if c.retry.max_attempts == 0 {
            return Err(ChapterError::InvalidConfig(
                "Retry policy needs at least 1 attempt".into(),
            ));
        }
        if !c.retry.multiplier.is_finite() || c.retry.multiplier < 1.0 {
            return Err(ChapterError::InvalidConfig(format!(
                "Backoff multiplier must be ≥ 1.0, got {}",
                c.retry.multiplier
            )));
        }
        if c.data_dir.as_os_str().is_empty() {
            return Err(ChapterError::InvalidConfig("Data directory must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// One unit of batch work: a chapter name and where its PDF lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterJob {
    /// Used as the prefix of every artifact file name.
    pub name: String,
    /// Local path or HTTP/HTTPS URL.
    pub source: String,
}

impl ChapterJob {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Parse a `NAME=SOURCE` pair. Without `=`, the name is derived from the
    /// source's file stem.
    pub fn parse(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        if arg.is_empty() {
            return None;
        }
        if let Some((name, source)) = arg.split_once('=').filter(|(n, _)| !n.contains("://")) {
            let (name, source) = (name.trim(), source.trim());
            if name.is_empty() || source.is_empty() {
                return None;
            }
            return Some(Self::new(name, source));
        }
        let stem = arg
            .rsplit('/')
            .next()
            .unwrap_or(arg)
            .trim_end_matches(".pdf")
            .to_string();
        if stem.is_empty() {
            return None;
        }
        Some(Self::new(stem, arg))
    }

    /// The four NCERT Class 8 science chapters used as the reference batch.
    pub fn sample_batch() -> Vec<Self> {
        SAMPLE_CHAPTERS
            .iter()
            .map(|(name, url)| Self::new(*name, *url))
            .collect()
    }
}

const SAMPLE_CHAPTERS: [(&str, &str); 4] = [
    (
        "Chapter_06_Combustion_and_Flame",
        "https://ncert.nic.in/textbook/pdf/hesc106.pdf",
    ),
    (
        "Chapter_07_Conservation_of_Plants_and_Animals",
        "https://ncert.nic.in/textbook/pdf/hesc107.pdf",
    ),
    (
        "Chapter_08_Cell_Structure_and_Functions",
        "https://ncert.nic.in/textbook/pdf/hesc108.pdf",
    ),
    ("Chapter_13_Sound", "https://ncert.nic.in/textbook/pdf/hesc113.pdf"),
];
