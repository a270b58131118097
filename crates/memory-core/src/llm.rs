//! LLM provider capability boundary (§6.1, §9 "Provider boundary").
//!
//! The core never owns a model or an HTTP client. It depends only on this
//! small trait; provider-specific quirks (key rotation, JSON-extraction
//! regex, reasoning-token accounting) live in whatever adapter the host
//! application wires up, never in here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Role of a message in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A tagged content block. Providers may return any mix of these in a single
/// reply; the core only ever reads `Text` blocks, but the union is modeled in
/// full so adapters have one honest place to put tool-use content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: String },
    Image { media_type: String, data: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Concatenate every `Text` block in a reply; used by call sites that
    /// only care about the prose content, not tool calls.
    pub fn join_text(blocks: &[ContentBlock]) -> String {
        blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Tool schemas, if the call site wants structured tool_use replies.
    /// The core never populates this for its own calls; kept for adapter
    /// fidelity with the full provider contract.
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

impl CompleteRequest {
    pub fn simple(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(user)],
            system: Some(system.into()),
            temperature: 0.2,
            max_tokens: 1024,
            tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
    pub model: String,
}

impl CompleteResponse {
    pub fn text(&self) -> String {
        ContentBlock::join_text(&self.content)
    }
}

/// The single capability the core needs from an LLM backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompleteRequest) -> Result<CompleteResponse, ProviderError>;

    /// Whether a call is currently worth attempting (e.g. an API key is
    /// configured). Background ticks use this to skip LLM-dependent
    /// sub-steps cleanly rather than retrying into failure.
    fn is_available(&self) -> bool {
        true
    }
}

/// Retries a provider call with exponential backoff, per §7. Stops retrying
/// on a non-retryable error and returns it immediately.
pub async fn complete_with_retry(
    provider: &dyn LlmProvider,
    request: CompleteRequest,
    max_attempts: u32,
) -> Result<CompleteResponse, ProviderError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match provider.complete(request.clone()).await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.retryable && attempt < max_attempts => {
                let backoff_ms = 200u64 * 2u64.pow(attempt.min(6) - 1);
                tracing::warn!(attempt, backoff_ms, error = %e, "llm call failed, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Optional sub-agent executor capability (§6.1), used by the scheduler for
/// `kind = task` items.
#[async_trait]
pub trait SubAgentExecutor: Send + Sync {
    async fn run(&self, goal: &str, tools: &[String]) -> Result<SubAgentResult, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct SubAgentResult {
    pub output: String,
    pub task_complete: bool,
    pub iterations_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn complete(
            &self,
            _request: CompleteRequest,
        ) -> Result<CompleteResponse, ProviderError> {
            if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(ProviderError::retryable("transient"));
            }
            Ok(CompleteResponse {
                content: vec![ContentBlock::text("ok")],
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
                model: "test".into(),
            })
        }
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let provider = FlakyProvider {
            failures_remaining: AtomicU32::new(2),
        };
        let req = CompleteRequest::simple("system", "hello");
        let resp = complete_with_retry(&provider, req, 5).await.unwrap();
        assert_eq!(resp.text(), "ok");
    }

    #[tokio::test]
    async fn fatal_error_is_not_retried() {
        struct AlwaysFatal;
        #[async_trait]
        impl LlmProvider for AlwaysFatal {
            async fn complete(
                &self,
                _request: CompleteRequest,
            ) -> Result<CompleteResponse, ProviderError> {
                Err(ProviderError::fatal("bad api key"))
            }
        }
        let req = CompleteRequest::simple("s", "u");
        let err = complete_with_retry(&AlwaysFatal, req, 5).await.unwrap_err();
        assert!(!err.retryable);
    }

    #[test]
    fn join_text_skips_non_text_blocks() {
        let blocks = vec![
            ContentBlock::text("hello"),
            ContentBlock::ToolUse {
                id: "1".into(),
                name: "x".into(),
                input: serde_json::json!({}),
            },
            ContentBlock::text("world"),
        ];
        assert_eq!(ContentBlock::join_text(&blocks), "hello\nworld");
    }
}
