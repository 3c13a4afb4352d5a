//! AI interaction: structure extraction and study-planner generation.
//!
//! Both calls send one user message (prompt, marker line, payload) and retry
//! under [`crate::config::RetryPolicy`]. A reply with no text counts as a
//! failed attempt, the same as a transport error or a per-call timeout.
//!
//! Prompt text lives in [`crate::prompts`]; this module only owns the call,
//! the retry loop and turning the reply into something the pipeline can use.

use crate::config::PipelineConfig;
use crate::error::{AiStage, ChapterError};
use crate::output::AiUsage;
use crate::pipeline::postprocess::extract_json_object;
use crate::pipeline::retry::{retry_with_backoff, RetryError};
use crate::prompts::{
    extraction_request, planner_request, DEFAULT_EXTRACTION_PROMPT, DEFAULT_PLANNER_PROMPT,
};
use crate::schema::ContentTree;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The extraction prompt in effect for `config`.
pub fn extraction_prompt(config: &PipelineConfig) -> &str {
    config
        .extraction_prompt
        .as_deref()
        .unwrap_or(DEFAULT_EXTRACTION_PROMPT)
}

/// The planner prompt in effect for `config`.
pub fn planner_prompt(config: &PipelineConfig) -> &str {
    config
        .planner_prompt
        .as_deref()
        .unwrap_or(DEFAULT_PLANNER_PROMPT)
}

/// Ask the model to structure `raw_text` and validate its reply.
///
/// Fails with [`ChapterError::AiFailure`] when every attempt errored or came
/// back empty, [`ChapterError::UnparseableResponse`] when the reply holds no
/// JSON object, and [`ChapterError::Validation`] when the object has no
/// `content` array.
pub async fn extract_structure(
    provider: &Arc<dyn LLMProvider>,
    raw_text: &str,
    config: &PipelineConfig,
) -> Result<(ContentTree, AiUsage), ChapterError> {
    let request = extraction_request(extraction_prompt(config), raw_text);
    let (reply, usage) = call_with_retry(provider, AiStage::Extraction, &request, config).await?;
    let tree = parse_extraction_reply(&reply)?;
    info!(
        "Structured content: {} top-level elements, {} total",
        tree.content.len(),
        tree.element_count()
    );
    Ok((tree, usage))
}

/// Ask the model for a Markdown study planner built from `tree`.
pub async fn generate_planner(
    provider: &Arc<dyn LLMProvider>,
    tree: &ContentTree,
    config: &PipelineConfig,
) -> Result<(String, AiUsage), ChapterError> {
    let request = planner_request(planner_prompt(config), &tree.to_pretty_json());
    call_with_retry(provider, AiStage::Planner, &request, config).await
}

/// Turn an extraction reply into a validated [`ContentTree`].
///
/// Tolerates prose or Markdown fences around the object by keeping only the
/// span from the first `{` to the last `}`.
pub fn parse_extraction_reply(reply: &str) -> Result<ContentTree, ChapterError> {
    let json = extract_json_object(reply).ok_or_else(|| ChapterError::UnparseableResponse {
        stage: AiStage::Extraction,
        detail: "no JSON object found in reply".to_string(),
    })?;
    Ok(ContentTree::from_json_str(json)?)
}

async fn call_with_retry(
    provider: &Arc<dyn LLMProvider>,
    stage: AiStage,
    request: &str,
    config: &PipelineConfig,
) -> Result<(String, AiUsage), ChapterError> {
    let start = Instant::now();
    let messages = vec![ChatMessage::user(request)];
    let options = build_options(config);
    let timeout = Duration::from_secs(config.api_timeout_secs);
    let label = format!("AI {stage}");

    let result = retry_with_backoff(&config.retry, &label, |attempt| {
        let messages = &messages;
        let options = &options;
        async move {
            debug!("AI {}: attempt {}", stage, attempt);
            let response = tokio::time::timeout(timeout, provider.chat(messages, Some(options)))
                .await
                .map_err(|_| format!("timed out after {}s", timeout.as_secs()))?
                .map_err(|e| e.to_string())?;
            if response.content.trim().is_empty() {
                return Err("empty response".to_string());
            }
            Ok((response, attempt))
        }
    })
    .await;

    match result {
        Ok((response, attempts)) => {
            let usage = AiUsage {
                input_tokens: response.prompt_tokens as u64,
                output_tokens: response.completion_tokens as u64,
                attempts,
                duration_ms: start.elapsed().as_millis() as u64,
            };
            debug!(
                "AI {}: {} input tokens, {} output tokens, {}ms",
                stage, usage.input_tokens, usage.output_tokens, usage.duration_ms
            );
            Ok((response.content, usage))
        }
        Err(RetryError { attempts, last }) => Err(ChapterError::AiFailure {
            stage,
            attempts,
            detail: last,
        }),
    }
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::{ErrorCategory, ValidationError};
    use crate::render::graph;
    use edgequake_llm::MockProvider;

    /// A provider that answers with `replies` in order.
    async fn scripted(replies: &[&str]) -> Arc<dyn LLMProvider> {
        let mock = MockProvider::new();
        for reply in replies {
            mock.add_response(*reply).await;
        }
        Arc::new(mock)
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::builder()
            .retry(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                multiplier: 2.0,
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_extraction_reply_is_retried() {
        let provider = scripted(&[
            "",
            r#"ok: {"chapter_title":"S","content":[{"type":"question","text":" q "}]}"#,
        ])
        .await;

        let (tree, usage) = extract_structure(&provider, "raw text", &fast_config())
            .await
            .unwrap();
        assert_eq!(usage.attempts, 2);
        assert_eq!(tree.chapter_title.as_deref(), Some("S"));
        assert_eq!(graph::render(&tree), "Chapter: S\n\n  - Question: q");
    }

    #[tokio::test]
    async fn extraction_fails_once_every_reply_is_empty() {
        let provider = scripted(&["", " \n", ""]).await;

        let err = extract_structure(&provider, "raw text", &fast_config())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ChapterError::AiFailure {
                    stage: AiStage::Extraction,
                    attempts: 3,
                    ..
                }
            ),
            "got {err:?}"
        );
        assert_eq!(err.category(), ErrorCategory::Ai);
    }

    #[tokio::test]
    async fn unparseable_extraction_reply_is_not_retried() {
        let provider = scripted(&["I could not find any content.", "{\"content\": []}"]).await;

        let err = extract_structure(&provider, "raw text", &fast_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ChapterError::UnparseableResponse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn planner_reply_is_returned_verbatim() {
        let plan = "# Study Planner\n\n| Day | Topic |\n|---|---|\n| 1 | Sound  |\n\n";
        let provider = scripted(&[plan]).await;
        let tree = ContentTree::from_json_str(r#"{"chapter_title":"Sound","content":[]}"#).unwrap();

        let (text, usage) = generate_planner(&provider, &tree, &fast_config())
            .await
            .unwrap();
        assert_eq!(text, plan);
        assert_eq!(usage.attempts, 1);
    }

    #[tokio::test]
    async fn planner_fails_after_empty_replies() {
        let provider = scripted(&["", "", ""]).await;
        let tree = ContentTree::from_json_str(r#"{"content":[]}"#).unwrap();

        let err = generate_planner(&provider, &tree, &fast_config())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ChapterError::AiFailure {
                    stage: AiStage::Planner,
                    attempts: 3,
                    ..
                }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn build_options_defaults() {
        let config = PipelineConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn prompt_overrides_win() {
        let config = PipelineConfig::builder()
            .extraction_prompt("EXTRACT")
            .build()
            .unwrap();
        assert_eq!(extraction_prompt(&config), "EXTRACT");
        assert_eq!(planner_prompt(&config), DEFAULT_PLANNER_PROMPT);
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"chapter_title\": \"Sound\", \"content\": [{\"type\": \"topic\", \"name\": \"Vibration\", \"elements\": []}]}\n```";
        let tree = parse_extraction_reply(reply).unwrap();
        assert_eq!(tree.chapter_title.as_deref(), Some("Sound"));
        assert_eq!(tree.content.len(), 1);
    }

    #[test]
    fn reply_without_object_is_unparseable() {
        let err = parse_extraction_reply("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(
            err,
            ChapterError::UnparseableResponse {
                stage: AiStage::Extraction,
                ..
            }
        ));
    }

    #[test]
    fn reply_without_content_fails_validation() {
        let err = parse_extraction_reply("{\"chapter_title\": \"Sound\"}").unwrap_err();
        assert!(matches!(
            err,
            ChapterError::Validation(ValidationError::MissingContentField)
        ));
    }
}
