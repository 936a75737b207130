//! The LLM port: a thin boundary used by conversation memory (summarization,
//! fact extraction) and the active retriever (rerank). Real providers live
//! outside this crate; `NullLlmProvider` is the always-unavailable
//! implementation that exercises every deterministic fallback path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// A single chat message in the `{role, content}` shape consumed by every
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

/// Options governing a single `chat` call.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub stream: bool,
    pub timeout: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            stream: false,
            timeout: Duration::from_secs(10),
        }
    }
}

/// The concatenated response to a `chat` call. Streaming deltas are
/// collapsed by the provider implementation; callers here only ever see the
/// final text.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
}

/// Outward-facing LLM capability. Every call site that uses this port must
/// have a deterministic fallback for when it returns `Err` or the caller's
/// timeout elapses — callers never propagate a provider failure as their
/// own error.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], opts: ChatOptions) -> Result<ChatResponse>;
}

/// The null provider: always unavailable. Used when no real backend is
/// configured, so every caller's fallback path is exercised the same way
/// whether or not a provider is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLlmProvider;

#[async_trait]
impl LlmProvider for NullLlmProvider {
    async fn chat(&self, _messages: &[ChatMessage], _opts: ChatOptions) -> Result<ChatResponse> {
        Err(Error::ProviderUnavailable)
    }
}

/// Runs `call` with the options' timeout, collapsing both a timeout and a
/// provider error into `None` so callers can write one fallback path.
pub async fn call_with_fallback<F>(timeout: Duration, call: F) -> Option<ChatResponse>
where
    F: std::future::Future<Output = Result<ChatResponse>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(resp)) => Some(resp),
        Ok(Err(_)) | Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_always_errs() {
        let provider = NullLlmProvider;
        let result = provider
            .chat(&[ChatMessage::user("hi")], ChatOptions::default())
            .await;
        assert!(matches!(result, Err(Error::ProviderUnavailable)));
    }

    #[tokio::test]
    async fn fallback_collapses_error_to_none() {
        let provider = NullLlmProvider;
        let out = call_with_fallback(
            Duration::from_millis(50),
            provider.chat(&[ChatMessage::user("hi")], ChatOptions::default()),
        )
        .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn fallback_collapses_timeout_to_none() {
        struct SlowProvider;
        #[async_trait]
        impl LlmProvider for SlowProvider {
            async fn chat(&self, _m: &[ChatMessage], _o: ChatOptions) -> Result<ChatResponse> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(ChatResponse { text: "late".into() })
            }
        }
        let out = call_with_fallback(
            Duration::from_millis(10),
            SlowProvider.chat(&[], ChatOptions::default()),
        )
        .await;
        assert!(out.is_none());
    }
}
