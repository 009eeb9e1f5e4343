//! Prompt text, passed into each episode rather than held globally.

use crate::puzzle::PuzzleEngine;

const BRACKET_PREAMBLE: &str = "You are an expert at the bracket city game tasked with solving a puzzle that is provided to you.
Start by reviewing the full text of the puzzle, then review the individual clues that are available.
All clue answers will be a single word.
Clues are nested, for example [exercise in a [game played with a cue ball]]. If you are unsure of an inner clue, \
the outer text often tells you what the inner answer has to complete.
Every incorrect guess hurts your score, so be careful!";

const BRACKET_CONCLUSION: &str = "Let me know which clue you want to answer and what your guess is. Please only answer one clue.
Your answer should be structured as
clue_id: [your_clue_id]
answer: [your_answer]";

const WORDLE_PREAMBLE: &str = "You are playing Wordle. Guess the secret word.
After each guess you get one letter of feedback per position:
G means the letter is in the word and in the right spot,
Y means the letter is in the word but in a different spot,
X means the letter is not in the word.";

const WORDLE_CONCLUSION: &str = "Reply with your next guess on its own line, structured as
guess: [your_word]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub preamble: String,
    pub conclusion: String,
}

impl PromptTemplate {
    pub fn new(preamble: impl Into<String>, conclusion: impl Into<String>) -> Self {
        PromptTemplate {
            preamble: preamble.into(),
            conclusion: conclusion.into(),
        }
    }

    pub fn bracket() -> Self {
        Self::new(BRACKET_PREAMBLE, BRACKET_CONCLUSION)
    }

    pub fn wordle() -> Self {
        Self::new(WORDLE_PREAMBLE, WORDLE_CONCLUSION)
    }

    /// Preamble, rendered puzzle state, then the answer template.
    pub fn render<P: PuzzleEngine + ?Sized>(&self, puzzle: &P) -> String {
        format!(
            "{}\n\n{}\n\n{}\n",
            self.preamble.trim_end(),
            puzzle.render_text().trim_end(),
            self.conclusion.trim_end()
        )
    }
}
