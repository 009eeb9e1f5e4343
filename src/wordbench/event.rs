//! Episode event system.
//!
//! Implement [`EpisodeEventHandler`] to follow an episode turn by turn: prompts, replies,
//! healed and rejected moves, archived failures, and the final outcome. The default method is
//! a no-op, so handlers only match what they care about.
//!
//! # Event Flow (one turn)
//!
//! ```text
//! PromptBuilt
//!   └─ ModelResponded            (empty content if the primary call failed)
//!   └─ MoveHealed                (only when healing recovered the move)
//!   └─ MoveApplied | MoveRejected | ParseFailed
//! StepCompleted
//! ...
//! Finished
//! ```
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use wordbench::event::{EpisodeEvent, EpisodeEventHandler};
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EpisodeEventHandler for Printer {
//!     async fn on_episode_event(&self, event: &EpisodeEvent) {
//!         if let EpisodeEvent::Finished { won, steps, .. } = event {
//!             println!("won={} after {} steps", won, steps);
//!         }
//!     }
//! }
//! ```

use crate::puzzle::MoveVerdict;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeEvent {
    /// The prompt for the coming turn.
    PromptBuilt {
        episode_id: String,
        step: usize,
        prompt: String,
    },
    /// Text of the primary model call. Empty when the call failed after retries.
    ModelResponded {
        episode_id: String,
        step: usize,
        response: String,
    },
    /// The reply did not parse but the healing call produced a usable move.
    MoveHealed {
        episode_id: String,
        step: usize,
        healed_text: String,
    },
    /// The engine accepted the move (`move_text` is its debug rendering).
    MoveApplied {
        episode_id: String,
        step: usize,
        move_text: String,
        verdict: MoveVerdict,
    },
    /// The engine refused a well-formed move.
    MoveRejected {
        episode_id: String,
        step: usize,
        move_text: String,
        reason: String,
    },
    /// No move could be recovered this turn.
    ParseFailed {
        episode_id: String,
        step: usize,
        reason: String,
        archive_key: Option<String>,
    },
    /// The step counter advanced; `step_count` is the new value.
    StepCompleted {
        episode_id: String,
        step_count: usize,
    },
    Finished {
        episode_id: String,
        won: bool,
        steps: usize,
    },
}

#[async_trait]
pub trait EpisodeEventHandler: Send + Sync {
    async fn on_episode_event(&self, _event: &EpisodeEvent) {}
}

/// Handler that forwards every event to the `log` facade at debug level.
pub struct LoggingEventHandler;

#[async_trait]
impl EpisodeEventHandler for LoggingEventHandler {
    async fn on_episode_event(&self, event: &EpisodeEvent) {
        match event {
            EpisodeEvent::Finished {
                episode_id,
                won,
                steps,
            } => log::info!("Episode {} finished: won={} steps={}", episode_id, won, steps),
            other => log::debug!("{:?}", other),
        }
    }
}
