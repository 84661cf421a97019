//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// quartet - multi-provider LLM orchestration for assignment help
#[derive(Parser)]
#[command(name = "quartet")]
#[command(about = "Run assignment-help pipelines across four LLM providers")]
#[command(long_about = r#"
quartet chains four LLM providers (search, reasoning, synthesis, long-form)
into fixed pipelines, one per assignment mode:

  inquiry  (A)  plan inquiry directions, then write the chosen report
  essay    (B)  facts, draft, logic check, polish
  ideas    (C)  brainstorm, curate, tidy
  research (D)  gather, restructure

EXAMPLES:
  # Serve POST /chat on the configured address
  quartet serve --bind 0.0.0.0:8000

  # Run one request and print the answer
  quartet ask --mode essay "Should school uniforms be mandatory?"

  # Continue an inquiry plan for a given session
  quartet ask --mode inquiry --session alice "Now write up the inquiry report for direction 2"

  # Show effective configuration and where each value came from
  quartet config --json

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for .quartet/config.toml,
  or named by QUARTET_CONFIG or --config.
  API keys are read from OPENAI_API_KEY, GEMINI_API_KEY, ANTHROPIC_API_KEY and
  PERPLEXITY_API_KEY unless [providers.*] api_key_env says otherwise.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Per-call provider timeout in seconds (default: 300, range: 5..=3600)
    #[arg(long, global = true)]
    pub stage_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the chat API until Ctrl-C
    ///
    /// EXAMPLES:
    ///   quartet serve
    ///   quartet serve --bind 0.0.0.0:8000
    Serve {
        /// Socket address to listen on (default: 127.0.0.1:8000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run a single request and print the answer to stdout
    ///
    /// EXAMPLES:
    ///   quartet ask --mode research "How do tides work?"
    ///   quartet ask --mode A --session alice "Design inquiry directions on microplastics"
    Ask {
        /// Assignment mode: inquiry, essay, ideas, research (or A-D)
        #[arg(long, short)]
        mode: String,

        /// Session that owns the inquiry plan
        #[arg(long, short)]
        session: Option<String>,

        /// Request text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the effective configuration with the source of each value
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Flags the config layer treats as CLI overrides.
    #[must_use]
    pub fn to_cli_args(&self) -> quartet_config::CliArgs {
        let bind = match &self.command {
            Commands::Serve { bind } => bind.clone(),
            _ => None,
        };
        quartet_config::CliArgs {
            config_path: self.config.clone(),
            verbose: self.verbose.then_some(true),
            bind,
            stage_timeout_secs: self.stage_timeout,
        }
    }
}
