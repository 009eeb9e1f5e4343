//! The interface the turn loop uses to drive a puzzle.
//!
//! Engines decide correctness; the loop only renders, applies, and checks for a solve.
//! Rejections are ordinary gameplay and are never propagated out of a turn.

use std::fmt;

/// Result of applying an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    Correct,
    Incorrect,
}

/// A well-formed move the engine refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRejection {
    /// The move names a clue or slot the puzzle does not have.
    UnknownTarget(String),
    /// The target exists but cannot be answered yet.
    NotActive(String),
    /// The guess is not acceptable (wrong length, non-alphabetic).
    InvalidGuess(String),
    /// The puzzle is already over.
    GameFinished,
}

impl fmt::Display for EngineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineRejection::UnknownTarget(id) => write!(f, "unknown target {}", id),
            EngineRejection::NotActive(id) => write!(f, "{} is not active yet", id),
            EngineRejection::InvalidGuess(reason) => write!(f, "invalid guess: {}", reason),
            EngineRejection::GameFinished => write!(f, "the game is already over"),
        }
    }
}

impl std::error::Error for EngineRejection {}

pub trait PuzzleEngine: Send {
    type Move: Clone + fmt::Debug + Send + Sync;

    /// Short label of the game ("bracket", "wordle"), used in records.
    fn game_name(&self) -> &'static str;

    /// Identifier of this puzzle instance (a date, a word id, ...).
    fn puzzle_id(&self) -> String;

    /// Current state as text for the prompt.
    fn render_text(&self) -> String;

    fn is_solved(&self) -> bool;

    fn apply_move(&mut self, mv: &Self::Move) -> Result<MoveVerdict, EngineRejection>;
}
