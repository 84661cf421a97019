//! Deterministic backend for tests
//!
//! Returns queued responses in order and records every invocation, so
//! pipeline tests can assert on call counts and prompt contents without a
//! network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

/// Queued-response backend.
///
/// When the queue is empty the fallback response is returned if one is set,
/// otherwise the call fails with `LlmError::Unsupported`.
#[derive(Default)]
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that answers every call with `text`.
    #[must_use]
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue a successful response.
    #[must_use]
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn fail(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    /// Sleep before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(&self, entry: Result<String, LlmError>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(entry);
        }
    }

    /// Every invocation received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<LlmInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The user prompt of every invocation received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|inv| inv.prompt().to_string())
            .collect()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(inv.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        let text = match next {
            Some(entry) => entry?,
            None => self.fallback.clone().ok_or_else(|| {
                LlmError::Unsupported(format!(
                    "scripted backend exhausted at {}.{}",
                    inv.pipeline, inv.stage
                ))
            })?,
        };

        Ok(LlmResult::new(text, "scripted", inv.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    fn inv(prompt: &str) -> LlmInvocation {
        LlmInvocation::new(
            "essay",
            "facts",
            "",
            Duration::from_secs(1),
            vec![Message::user(prompt)],
        )
    }

    #[tokio::test]
    async fn test_queue_then_exhaustion() {
        let backend = ScriptedBackend::new()
            .respond("one")
            .fail(LlmError::ProviderOutage("503".into()));

        assert_eq!(backend.invoke(inv("a")).await.unwrap().raw_response, "one");
        assert!(matches!(
            backend.invoke(inv("b")).await,
            Err(LlmError::ProviderOutage(_))
        ));
        assert!(matches!(
            backend.invoke(inv("c")).await,
            Err(LlmError::Unsupported(_))
        ));
        assert_eq!(backend.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_always_repeats() {
        let backend = ScriptedBackend::always("same");
        for _ in 0..3 {
            assert_eq!(backend.invoke(inv("x")).await.unwrap().raw_response, "same");
        }
        assert_eq!(backend.call_count(), 3);
    }
}
