//! Orchestration core for quartet
//!
//! Wires the role-bound providers into the five prompt-chaining pipelines
//! and routes each request by mode.
//!
//! # Module Organization
//!
//! - `dispatcher.rs`: [`Dispatcher`], the entry point for every request
//! - `intent.rs`: finalize-vs-plan classification for inquiry mode
//! - `plan_store.rs`: per-session plan slots with TTL and capacity eviction
//! - `pipeline.rs`: linear stage runner with per-stage retry
//! - `pipelines.rs`: the five pipeline definitions and their modes
//!
//! ## Example
//!
//! ```rust,no_run
//! use quartet_config::{CliArgs, Config};
//! use quartet_orchestrator::{ChatRequest, Dispatcher};
//! use quartet_utils::types::Mode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover(&CliArgs::default())?;
//!     let providers = quartet_llm::from_config(&config)?;
//!     let dispatcher = Dispatcher::from_config(&config, providers);
//!
//!     let answer = dispatcher
//!         .handle(&ChatRequest::new(Mode::Research, "How do tides work?"))
//!         .await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

mod dispatcher;
mod intent;
mod pipeline;
mod pipelines;
mod plan_store;

pub use dispatcher::{ChatRequest, Dispatcher};
pub use intent::{FINALIZE_KEYWORDS, Intent, IntentClassifier, KeywordClassifier};
pub use pipeline::{Pipeline, Stage};
pub use pipelines::{ModePipelines, PipelineCatalog, PipelineId};
pub use plan_store::{PlanStore, SessionId};
pub use quartet_utils::error::OrchestrationError;
