//! Extract structured moves from free-form model text.
//!
//! A [`MoveGrammar`] turns raw text into a move or reports that none could be found. Parsing
//! is all or nothing: a move missing any required field is reported as absent, never as a
//! partially filled value. Grammars never touch the network; repairing text that does not
//! parse is the job of [`HealingCoordinator`](crate::healing::HealingCoordinator).
//!
//! # Example
//!
//! ```rust
//! use wordbench::parser::{ClueAnswerGrammar, ClueMove, MoveGrammar};
//!
//! let grammar = ClueAnswerGrammar;
//! let text = "I think it is billiards.\nclue_id: c3\nanswer:  billiards \n";
//! assert_eq!(
//!     grammar.parse(text),
//!     Some(ClueMove { clue_id: "c3".into(), answer: "billiards".into() })
//! );
//! assert_eq!(grammar.parse("clue_id: c3"), None);
//! ```

use lazy_static::lazy_static;
use regex::Regex;

/// A textual move grammar for one puzzle type.
pub trait MoveGrammar: Send + Sync {
    type Move: Clone + std::fmt::Debug + Send + Sync;

    /// Parse `text`, returning `None` unless every required field is present and non-empty.
    fn parse(&self, text: &str) -> Option<Self::Move>;

    /// The exact template the model must answer with, quoted in correction prompts.
    fn template(&self) -> &str;
}

/// A move in the nested-clue puzzle: which clue to answer and the proposed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClueMove {
    pub clue_id: String,
    pub answer: String,
}

const CLUE_ID_KEY: &str = "clue_id";
const ANSWER_KEY: &str = "answer";

/// Line grammar for `clue_id: <id>` / `answer: <text>`.
///
/// Each line is split on its first colon. The key must start the line and match exactly, with
/// no padding before the colon. The value is the trimmed remainder, so answers may themselves
/// contain colons. When a key repeats, the last line wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClueAnswerGrammar;

impl MoveGrammar for ClueAnswerGrammar {
    type Move = ClueMove;

    fn parse(&self, text: &str) -> Option<ClueMove> {
        let mut clue_id = None;
        let mut answer = None;
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key {
                CLUE_ID_KEY => clue_id = Some(value.trim()),
                ANSWER_KEY => answer = Some(value.trim()),
                _ => {}
            }
        }
        match (clue_id, answer) {
            (Some(clue_id), Some(answer)) if !clue_id.is_empty() && !answer.is_empty() => {
                Some(ClueMove {
                    clue_id: clue_id.to_string(),
                    answer: answer.to_string(),
                })
            }
            _ => None,
        }
    }

    fn template(&self) -> &str {
        "clue_id: <clue id>\nanswer: <answer text>"
    }
}

lazy_static! {
    static ref GUESS_PATTERN: Regex =
        Regex::new(r"(?i)\bguess\s*:\s*([a-z]+)").expect("guess pattern compiles");
}

/// Labeled-token grammar for the word-guessing puzzle: `guess: <word>`.
///
/// The label is case-insensitive, the captured word is lower-cased, and the last labeled
/// token in the text wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessGrammar;

impl MoveGrammar for GuessGrammar {
    type Move = String;

    fn parse(&self, text: &str) -> Option<String> {
        GUESS_PATTERN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|word| word.as_str().to_lowercase())
            .filter(|word| !word.is_empty())
    }

    fn template(&self) -> &str {
        "guess: <word>"
    }
}
