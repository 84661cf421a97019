//! LLM backend abstraction for multi-provider support
//!
//! Every provider implements [`LlmBackend`]. Pipelines never see a backend
//! directly: they call [`Provider::generate`] on the provider bound to a
//! stage's role, looked up in the [`ProviderSet`] built by [`from_config`].
//!
//! | Role        | Backend                     | Wire format            |
//! |-------------|-----------------------------|------------------------|
//! | `search`    | [`OpenAiCompatibleBackend`] | Perplexity chat API    |
//! | `reasoning` | [`OpenAiCompatibleBackend`] | OpenAI chat completions|
//! | `synthesis` | [`GeminiBackend`]           | Gemini generateContent |
//! | `long-form` | [`AnthropicBackend`]        | Anthropic Messages     |

mod anthropic_backend;
mod gemini_backend;
pub(crate) mod http_client;
mod openai_backend;
mod provider;
mod types;

#[cfg(any(test, feature = "test-utils"))]
mod scripted_backend;

pub use anthropic_backend::{AnthropicBackend, AnthropicParams};
pub use gemini_backend::GeminiBackend;
pub use http_client::{DEFAULT_MAX_RETRIES, HttpClient};
pub use openai_backend::{ChatParams, OpenAiCompatibleBackend};
pub use provider::{Provider, ProviderSet, from_config, from_config_with};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
pub use quartet_utils::error::LlmError;

// Test seam; not part of public API stability guarantees.
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use scripted_backend::ScriptedBackend;
