//! quartet - multi-provider LLM orchestration for high-school assignment help
//!
//! Four assignment modes each run a fixed prompt-chaining pipeline over four
//! provider roles (search, reasoning, synthesis, long-form). The inquiry mode
//! is two-phase: a first request produces a plan that a later request turns
//! into a report.
//!
//! quartet can be used in two ways:
//! - **CLI**: `quartet serve` exposes `POST /chat`; `quartet ask` runs one
//!   request and prints the answer
//! - **Library**: build a [`Dispatcher`] from a [`Config`] and call
//!   [`Dispatcher::handle`], or mount [`router`] in your own axum app
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export OPENAI_API_KEY=... GEMINI_API_KEY=... ANTHROPIC_API_KEY=... PERPLEXITY_API_KEY=...
//!
//! quartet serve --bind 127.0.0.1:8000
//! quartet ask --mode essay "Should school uniforms be mandatory?"
//! quartet config --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use quartet::{ChatRequest, CliArgs, Config, Dispatcher, Mode};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::discover(&CliArgs::default())?;
//! let providers = quartet_llm::from_config(&config)?;
//! let dispatcher = Dispatcher::from_config(&config, providers);
//!
//! let answer = dispatcher
//!     .handle(&ChatRequest::new(Mode::Research, "How do tides work?"))
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub use quartet_config::{CliArgs, Config, ConfigBuilder};
pub use quartet_orchestrator::{ChatRequest, Dispatcher, OrchestrationError, SessionId};
pub use quartet_server::{router, serve};
pub use quartet_utils::error::{ConfigError, LlmError, UserFriendlyError};
pub use quartet_utils::exit_codes::ExitCode;
pub use quartet_utils::types::{Mode, ProviderRole};

pub mod cli;
