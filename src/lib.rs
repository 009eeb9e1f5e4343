//! # wordbench
//!
//! wordbench measures how well Large Language Models play word puzzles. It ships two games,
//! a nested-clue puzzle ("Bracket City") and Wordle, and drives each through the same
//! turn loop:
//!
//! ```text
//! render puzzle ─▶ model call ─▶ parse reply ─▶ apply move ─▶ step += 1 ─▶ repeat
//!                                   │
//!                                   └─ unparseable ─▶ one healing call ─▶ parse again
//!                                                          │
//!                                                          └─ still nothing ─▶ archive reply
//! ```
//!
//! The crate provides layered pieces that can be used on their own:
//!
//! * **Move grammars** ([`parser`]): all-or-nothing extraction of structured moves from text
//! * **Model invocation** ([`invoker`], [`retry`]): one logical call with bounded exponential
//!   backoff over any [`ClientWrapper`]
//! * **Self-healing** ([`healing`]): a single corrective round trip when a reply does not parse,
//!   with unrecoverable replies kept in a [`archive::FailureArchive`]
//! * **Turn loop** ([`episode`]): the per-episode state machine and its step accounting
//! * **Records** ([`record`]) and **offline healing evaluation** ([`heal_eval`])
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wordbench::archive::FailureArchive;
//! use wordbench::clients::openrouter::OpenRouterClient;
//! use wordbench::games::bracket::BracketPuzzle;
//! use wordbench::healing::HealingCoordinator;
//! use wordbench::invoker::ModelInvoker;
//! use wordbench::parser::ClueAnswerGrammar;
//! use wordbench::prompts::PromptTemplate;
//! use wordbench::{TurnLoop, WordbenchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     wordbench::init_logger();
//!
//!     let config = WordbenchConfig::from_env();
//!     let client = Arc::new(OpenRouterClient::from_env()?);
//!     let invoker = Arc::new(ModelInvoker::new(client, config.retry.clone()));
//!     let coordinator = HealingCoordinator::new(
//!         ClueAnswerGrammar,
//!         invoker,
//!         FailureArchive::in_dir(&config.failure_dir),
//!     );
//!
//!     let puzzle = BracketPuzzle::load(std::path::Path::new("puzzles/2025-06-07.json"))?;
//!     let outcome = TurnLoop::new(
//!         puzzle,
//!         coordinator,
//!         "mistralai/mistral-small-3.2-24b-instruct",
//!         config.step_limit,
//!         PromptTemplate::bracket(),
//!     )
//!     .run()
//!     .await;
//!
//!     println!("won={} steps={}", outcome.record.won, outcome.record.step_count);
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding wordbench opt in to `RUST_LOG` driven diagnostics with this call.
///
/// ```rust
/// wordbench::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

/// Like [`init_logger`], but with `default_filter` when `RUST_LOG` is unset.
pub fn init_logger_with_level(default_filter: &str) {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .init();
    });
}

// Import the top-level `wordbench` module.
pub mod wordbench;

// Re-exporting key items for easier external access.
pub use wordbench::archive;
pub use wordbench::client_wrapper;
pub use wordbench::client_wrapper::{
    ClientWrapper, Completion, Message, Role, TokenUsage, TransportError,
};
pub use wordbench::clients;
pub use wordbench::config;
pub use wordbench::config::WordbenchConfig;
pub use wordbench::episode;
pub use wordbench::episode::{EpisodeState, TieBreak, TurnLoop};
pub use wordbench::event;
pub use wordbench::event::{EpisodeEvent, EpisodeEventHandler};
pub use wordbench::games;
pub use wordbench::heal_eval;
pub use wordbench::healing;
pub use wordbench::healing::{HealingCoordinator, Resolution};
pub use wordbench::invoker;
pub use wordbench::invoker::ModelInvoker;
pub use wordbench::parser;
pub use wordbench::parser::{ClueAnswerGrammar, ClueMove, GuessGrammar, MoveGrammar};
pub use wordbench::prompts;
pub use wordbench::puzzle;
pub use wordbench::puzzle::{EngineRejection, MoveVerdict, PuzzleEngine};
pub use wordbench::record;
pub use wordbench::retry;
pub use wordbench::retry::RetryPolicy;
