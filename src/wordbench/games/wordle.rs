//! Word-guessing ("Wordle") puzzle engine.
//!
//! Feedback per letter: `G` right letter in the right spot, `Y` letter elsewhere in the word,
//! `X` letter not in the word (or already used up by other matches).

use crate::puzzle::{EngineRejection, MoveVerdict, PuzzleEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterColor {
    Green,
    Yellow,
    Gray,
}

impl LetterColor {
    pub fn as_char(self) -> char {
        match self {
            LetterColor::Green => 'G',
            LetterColor::Yellow => 'Y',
            LetterColor::Gray => 'X',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessFeedback {
    pub word: String,
    pub colors: Vec<LetterColor>,
}

impl GuessFeedback {
    /// `crane -> XGYXG`
    pub fn render(&self) -> String {
        let pattern: String = self.colors.iter().map(|c| c.as_char()).collect();
        format!("{} -> {}", self.word, pattern)
    }
}

/// Score `guess` against `secret`. Both must be lowercase and of equal length.
///
/// Greens are assigned first; yellows then consume the remaining letter counts left to right,
/// so a letter guessed twice is only yellow as often as it is still unmatched in the secret.
pub fn score_guess(secret: &str, guess: &str) -> Vec<LetterColor> {
    let secret: Vec<char> = secret.chars().collect();
    let guess: Vec<char> = guess.chars().collect();
    let mut colors = vec![LetterColor::Gray; guess.len()];
    let mut unmatched: Vec<char> = Vec::with_capacity(secret.len());

    for (i, &s) in secret.iter().enumerate() {
        if guess.get(i) == Some(&s) {
            colors[i] = LetterColor::Green;
        } else {
            unmatched.push(s);
        }
    }
    for (i, g) in guess.iter().enumerate() {
        if colors[i] == LetterColor::Green {
            continue;
        }
        if let Some(pos) = unmatched.iter().position(|s| s == g) {
            unmatched.swap_remove(pos);
            colors[i] = LetterColor::Yellow;
        }
    }
    colors
}

#[derive(Debug, Clone)]
pub struct WordlePuzzle {
    word: String,
    turns: usize,
    guesses: Vec<GuessFeedback>,
    puzzle_id: String,
}

impl WordlePuzzle {
    pub fn new(word: &str, turns: usize) -> Self {
        let word = word.trim().to_lowercase();
        WordlePuzzle {
            puzzle_id: word.clone(),
            word,
            turns,
            guesses: Vec::new(),
        }
    }

    /// Record the puzzle under an id other than the secret word.
    pub fn with_puzzle_id(mut self, id: impl Into<String>) -> Self {
        self.puzzle_id = id.into();
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn guesses(&self) -> &[GuessFeedback] {
        &self.guesses
    }

    pub fn turns_remaining(&self) -> usize {
        self.turns.saturating_sub(self.guesses.len())
    }

    pub fn is_over(&self) -> bool {
        self.is_solved() || self.turns_remaining() == 0
    }

    /// One `word -> pattern` line per guess.
    pub fn history(&self) -> String {
        self.guesses
            .iter()
            .map(GuessFeedback::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl PuzzleEngine for WordlePuzzle {
    type Move = String;

    fn game_name(&self) -> &'static str {
        "wordle"
    }

    fn puzzle_id(&self) -> String {
        self.puzzle_id.clone()
    }

    fn render_text(&self) -> String {
        let history = if self.guesses.is_empty() {
            "(no guesses yet)".to_string()
        } else {
            self.history()
        };
        format!(
            "Word length: {}\nGuesses remaining: {}\nGuess history:\n{}",
            self.word.chars().count(),
            self.turns_remaining(),
            history
        )
    }

    fn is_solved(&self) -> bool {
        self.guesses.last().map_or(false, |g| g.word == self.word)
    }

    fn apply_move(&mut self, guess: &String) -> Result<MoveVerdict, EngineRejection> {
        if self.is_over() {
            return Err(EngineRejection::GameFinished);
        }
        let guess = guess.trim().to_lowercase();
        if !guess.chars().all(|c| c.is_ascii_alphabetic()) || guess.is_empty() {
            return Err(EngineRejection::InvalidGuess(format!(
                "{:?} is not a single alphabetic word",
                guess
            )));
        }
        if guess.chars().count() != self.word.chars().count() {
            return Err(EngineRejection::InvalidGuess(format!(
                "{:?} does not have {} letters",
                guess,
                self.word.chars().count()
            )));
        }
        let colors = score_guess(&self.word, &guess);
        let correct = guess == self.word;
        let feedback = GuessFeedback {
            word: guess,
            colors,
        };
        log::info!("Guess: {}", feedback.render());
        self.guesses.push(feedback);
        Ok(if correct {
            MoveVerdict::Correct
        } else {
            MoveVerdict::Incorrect
        })
    }
}
