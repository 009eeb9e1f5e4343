//! Reference [`PuzzleEngine`](crate::puzzle::PuzzleEngine) implementations.

pub mod bracket;
pub mod wordle;
