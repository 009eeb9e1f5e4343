//! The per-episode turn loop.
//!
//! An episode is a small state machine with three states. At the start of every turn the
//! transition rule is evaluated, by default in this order:
//!
//! 1. `step_count >= step_limit` ⇒ [`EpisodeState::TerminalExhausted`] (a loss), whatever the
//!    puzzle looks like.
//! 2. the puzzle reports itself solved ⇒ [`EpisodeState::TerminalWon`].
//! 3. otherwise stay in [`EpisodeState::AwaitingMove`] and play one turn: render the prompt,
//!    call the model, resolve the reply through the [`HealingCoordinator`], apply the move if
//!    there is one, and advance `step_count` by exactly one.
//!
//! Every turn costs a step, whether the reply parsed, was healed, failed, or was refused by
//! the puzzle. A puzzle solved on the very last allowed step is therefore reported as a loss
//! under [`TieBreak::LimitFirst`]; [`TieBreak::SolvedFirst`] flips that ordering.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wordbench::archive::FailureArchive;
//! use wordbench::clients::openrouter::OpenRouterClient;
//! use wordbench::episode::TurnLoop;
//! use wordbench::games::wordle::WordlePuzzle;
//! use wordbench::healing::HealingCoordinator;
//! use wordbench::invoker::ModelInvoker;
//! use wordbench::parser::GuessGrammar;
//! use wordbench::prompts::PromptTemplate;
//! use wordbench::retry::RetryPolicy;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(OpenRouterClient::from_env()?);
//! let invoker = Arc::new(ModelInvoker::new(client, RetryPolicy::default()));
//! let coordinator =
//!     HealingCoordinator::new(GuessGrammar, invoker, FailureArchive::in_dir("parse-errors"));
//!
//! let outcome = TurnLoop::new(
//!     WordlePuzzle::new("apple", 6),
//!     coordinator,
//!     "openai/gpt-4.1-mini",
//!     6,
//!     PromptTemplate::wordle(),
//! )
//! .run()
//! .await;
//! println!("won: {}", outcome.record.won);
//! # Ok(())
//! # }
//! ```

use crate::event::{EpisodeEvent, EpisodeEventHandler};
use crate::healing::{HealingCoordinator, Resolution};
use crate::parser::MoveGrammar;
use crate::prompts::PromptTemplate;
use crate::puzzle::PuzzleEngine;
use crate::record::{EpisodeRecord, EpisodeStats};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    AwaitingMove,
    TerminalWon,
    TerminalExhausted,
}

impl EpisodeState {
    pub fn is_terminal(self) -> bool {
        self != EpisodeState::AwaitingMove
    }
}

/// Which terminal check runs first when the step limit is hit on a solved puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Exhaustion wins the tie: a solve on the final allowed step is a loss.
    #[default]
    LimitFirst,
    /// A solved puzzle always reports a win.
    SolvedFirst,
}

/// One attempt at one puzzle with one model.
#[derive(Debug)]
pub struct Episode<P> {
    id: String,
    puzzle: P,
    model: String,
    step_count: usize,
    step_limit: usize,
    game_over: bool,
    game_won: bool,
    stats: EpisodeStats,
}

impl<P: PuzzleEngine> Episode<P> {
    pub fn new(puzzle: P, model: impl Into<String>, step_limit: usize) -> Self {
        Episode {
            id: Uuid::new_v4().to_string(),
            puzzle,
            model: model.into(),
            step_count: 0,
            step_limit,
            game_over: false,
            game_won: false,
            stats: EpisodeStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn puzzle(&self) -> &P {
        &self.puzzle
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn game_won(&self) -> bool {
        self.game_won
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn state(&self) -> EpisodeState {
        match (self.game_over, self.game_won) {
            (false, _) => EpisodeState::AwaitingMove,
            (true, true) => EpisodeState::TerminalWon,
            (true, false) => EpisodeState::TerminalExhausted,
        }
    }
}

/// What a finished episode hands back: its record and the final puzzle.
#[derive(Debug)]
pub struct EpisodeOutcome<P> {
    pub record: EpisodeRecord,
    pub puzzle: P,
}

pub struct TurnLoop<P, G>
where
    P: PuzzleEngine,
    G: MoveGrammar<Move = P::Move>,
{
    episode: Episode<P>,
    coordinator: HealingCoordinator<G>,
    prompts: PromptTemplate,
    tie_break: TieBreak,
    pause: Option<watch::Receiver<bool>>,
    event_handler: Option<Arc<dyn EpisodeEventHandler>>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl<P, G> TurnLoop<P, G>
where
    P: PuzzleEngine,
    G: MoveGrammar<Move = P::Move>,
{
    pub fn new(
        puzzle: P,
        coordinator: HealingCoordinator<G>,
        model: impl Into<String>,
        step_limit: usize,
        prompts: PromptTemplate,
    ) -> Self {
        TurnLoop {
            episode: Episode::new(puzzle, model, step_limit),
            coordinator,
            prompts,
            tie_break: TieBreak::default(),
            pause: None,
            event_handler: None,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Hold the loop before each turn while the channel reads `true`.
    pub fn with_pause_control(mut self, pause: watch::Receiver<bool>) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EpisodeEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn episode(&self) -> &Episode<P> {
        &self.episode
    }

    async fn emit(&self, event: EpisodeEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_episode_event(&event).await;
        }
    }

    /// Apply the transition rule to the current episode without changing it.
    pub fn evaluate(&self) -> EpisodeState {
        if self.episode.game_over {
            return self.episode.state();
        }
        let exhausted = self.episode.step_count >= self.episode.step_limit;
        let solved = self.episode.puzzle.is_solved();
        match self.tie_break {
            TieBreak::LimitFirst if exhausted => EpisodeState::TerminalExhausted,
            TieBreak::LimitFirst if solved => EpisodeState::TerminalWon,
            TieBreak::SolvedFirst if solved => EpisodeState::TerminalWon,
            TieBreak::SolvedFirst if exhausted => EpisodeState::TerminalExhausted,
            _ => EpisodeState::AwaitingMove,
        }
    }

    /// Evaluate the transition rule and, if the episode goes on, play one turn.
    ///
    /// Returns the state the rule produced. Once terminal, further calls change nothing.
    pub async fn advance(&mut self) -> EpisodeState {
        if self.episode.game_over {
            return self.episode.state();
        }
        let state = self.evaluate();
        match state {
            EpisodeState::AwaitingMove => {
                self.wait_while_paused().await;
                self.take_turn().await;
            }
            EpisodeState::TerminalWon | EpisodeState::TerminalExhausted => {
                self.episode.game_over = true;
                self.episode.game_won = state == EpisodeState::TerminalWon;
                log::info!(
                    "Episode {} over after {} steps: {}",
                    self.episode.id,
                    self.episode.step_count,
                    if self.episode.game_won { "won" } else { "lost" }
                );
                self.emit(EpisodeEvent::Finished {
                    episode_id: self.episode.id.clone(),
                    won: self.episode.game_won,
                    steps: self.episode.step_count,
                })
                .await;
            }
        }
        state
    }

    /// Play until the episode reaches a terminal state.
    pub async fn run(mut self) -> EpisodeOutcome<P> {
        log::info!(
            "Starting episode {} ({} {}) with {} and {} steps",
            self.episode.id,
            self.episode.puzzle.game_name(),
            self.episode.puzzle.puzzle_id(),
            self.episode.model,
            self.episode.step_limit
        );
        while !self.advance().await.is_terminal() {}
        self.finish().await
    }

    async fn wait_while_paused(&mut self) {
        let Some(pause) = self.pause.as_mut() else {
            return;
        };
        loop {
            let paused = *pause.borrow_and_update();
            if !paused {
                break;
            }
            log::debug!("Episode {} paused", self.episode.id);
            if pause.changed().await.is_err() {
                // Controller dropped; nobody can unpause, so carry on.
                break;
            }
        }
    }

    async fn take_turn(&mut self) {
        let step = self.episode.step_count;
        let episode_id = self.episode.id.clone();
        let model = self.episode.model.clone();
        log::info!(
            "Episode {} step {}/{}",
            episode_id,
            step + 1,
            self.episode.step_limit
        );

        let prompt = self.prompts.render(&self.episode.puzzle);
        self.emit(EpisodeEvent::PromptBuilt {
            episode_id: episode_id.clone(),
            step,
            prompt: prompt.clone(),
        })
        .await;

        let response = match self.coordinator.invoker().invoke(&model, &prompt).await {
            Ok(text) => text,
            Err(err) => {
                log::error!("Model call failed after retries: {}", err);
                String::new()
            }
        };
        self.emit(EpisodeEvent::ModelResponded {
            episode_id: episode_id.clone(),
            step,
            response: response.clone(),
        })
        .await;

        let mv = match self.coordinator.resolve(&response, &model).await {
            Resolution::Parsed(mv) => {
                self.episode.stats.parsed_moves += 1;
                Some(mv)
            }
            Resolution::Healed { mv, healed_text } => {
                self.episode.stats.healed_moves += 1;
                self.emit(EpisodeEvent::MoveHealed {
                    episode_id: episode_id.clone(),
                    step,
                    healed_text,
                })
                .await;
                Some(mv)
            }
            Resolution::Failed(failure) => {
                self.episode.stats.parse_failures += 1;
                self.emit(EpisodeEvent::ParseFailed {
                    episode_id: episode_id.clone(),
                    step,
                    reason: failure.reason.to_string(),
                    archive_key: failure.archive_key,
                })
                .await;
                None
            }
        };

        if let Some(mv) = mv {
            let move_text = format!("{:?}", mv);
            match self.episode.puzzle.apply_move(&mv) {
                Ok(verdict) => {
                    log::info!("Applied {} -> {:?}", move_text, verdict);
                    self.emit(EpisodeEvent::MoveApplied {
                        episode_id: episode_id.clone(),
                        step,
                        move_text,
                        verdict,
                    })
                    .await;
                }
                Err(rejection) => {
                    log::warn!("Puzzle rejected {}: {}", move_text, rejection);
                    self.episode.stats.rejected_moves += 1;
                    self.emit(EpisodeEvent::MoveRejected {
                        episode_id: episode_id.clone(),
                        step,
                        move_text,
                        reason: rejection.to_string(),
                    })
                    .await;
                }
            }
        }

        self.episode.step_count += 1;
        self.emit(EpisodeEvent::StepCompleted {
            episode_id,
            step_count: self.episode.step_count,
        })
        .await;
    }

    async fn finish(self) -> EpisodeOutcome<P> {
        let token_usage = self.coordinator.invoker().token_usage().await;
        let episode = self.episode;
        let record = EpisodeRecord {
            episode_id: episode.id,
            game: episode.puzzle.game_name().to_string(),
            puzzle_id: episode.puzzle.puzzle_id(),
            model_name: episode.model,
            step_count: episode.step_count,
            step_limit: episode.step_limit,
            won: episode.game_won,
            started_at: self.started_at,
            duration_secs: self.clock.elapsed().as_secs_f64(),
            token_usage,
            stats: episode.stats,
        };
        EpisodeOutcome {
            record,
            puzzle: episode.puzzle,
        }
    }
}
