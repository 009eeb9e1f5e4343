//! Nested-clue ("Bracket City") puzzle engine.
//!
//! A puzzle is a template sentence whose blanks are clues, and clues may themselves contain
//! clues. Placeholders are written `{clue_id}`. While a clue is open it renders as
//! `[its rendered text]`; once answered it renders as its answer. Only clues whose children
//! are all answered can be attempted.
//!
//! # Disk Format
//!
//! ```text
//! {
//!   "date": "2025-06-07",
//!   "template": "Chalk up before {c1}",
//!   "clues": {
//!     "c1": { "text": "exercise in a {c2}", "answer": "drill" },
//!     "c2": { "text": "game played with a cue ball", "answer": "billiards" }
//!   }
//! }
//! ```
//!
//! ```rust
//! use wordbench::games::bracket::BracketPuzzle;
//! use wordbench::parser::ClueMove;
//! use wordbench::puzzle::{MoveVerdict, PuzzleEngine};
//!
//! let json = r#"{"date":"2025-06-07","template":"Chalk up before {c1}",
//!   "clues":{"c1":{"text":"exercise in a {c2}","answer":"drill"},
//!            "c2":{"text":"game played with a cue ball","answer":"billiards"}}}"#;
//! let mut puzzle = BracketPuzzle::from_json_str(json).unwrap();
//! assert_eq!(puzzle.rendered_puzzle(), "Chalk up before [exercise in a [game played with a cue ball]]");
//! assert_eq!(puzzle.active_clues(), vec!["c2"]);
//!
//! let mv = ClueMove { clue_id: "c2".into(), answer: "Billiards".into() };
//! assert_eq!(puzzle.apply_move(&mv), Ok(MoveVerdict::Correct));
//! assert_eq!(puzzle.rendered_puzzle(), "Chalk up before [exercise in a billiards]");
//! ```

use crate::parser::ClueMove;
use crate::puzzle::{EngineRejection, MoveVerdict, PuzzleEngine};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{([A-Za-z0-9_\-]+)\}").expect("placeholder pattern compiles");
}

#[derive(Debug)]
pub enum PuzzleLoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// A placeholder names a clue that is not defined.
    UnknownClue { clue: String, referenced_by: String },
    /// Clues reference each other in a loop.
    Cycle(String),
    /// The puzzle has no clues.
    Empty,
}

impl fmt::Display for PuzzleLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PuzzleLoadError::Io(err) => write!(f, "Failed to read puzzle: {}", err),
            PuzzleLoadError::Json(err) => write!(f, "Malformed puzzle JSON: {}", err),
            PuzzleLoadError::UnknownClue {
                clue,
                referenced_by,
            } => write!(f, "Clue {} referenced by {} is not defined", clue, referenced_by),
            PuzzleLoadError::Cycle(id) => write!(f, "Clue {} is part of a reference cycle", id),
            PuzzleLoadError::Empty => write!(f, "Puzzle has no clues"),
        }
    }
}

impl std::error::Error for PuzzleLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PuzzleLoadError::Io(err) => Some(err),
            PuzzleLoadError::Json(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct PuzzleFile {
    date: String,
    template: String,
    clues: BTreeMap<String, ClueFile>,
}

#[derive(Deserialize)]
struct ClueFile {
    text: String,
    answer: String,
}

#[derive(Debug, Clone)]
pub struct BracketClue {
    pub id: String,
    pub text: String,
    answer: String,
    pub children: Vec<String>,
    pub completed: bool,
    pub previous_answers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BracketPuzzle {
    date: String,
    template: String,
    clues: BTreeMap<String, BracketClue>,
}

fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn normalise(answer: &str) -> String {
    answer.trim().to_lowercase()
}

impl BracketPuzzle {
    pub fn from_json_str(json: &str) -> Result<Self, PuzzleLoadError> {
        let file: PuzzleFile = serde_json::from_str(json).map_err(PuzzleLoadError::Json)?;
        Self::build(file)
    }

    pub fn load(path: &Path) -> Result<Self, PuzzleLoadError> {
        let json = std::fs::read_to_string(path).map_err(PuzzleLoadError::Io)?;
        Self::from_json_str(&json)
    }

    fn build(file: PuzzleFile) -> Result<Self, PuzzleLoadError> {
        if file.clues.is_empty() {
            return Err(PuzzleLoadError::Empty);
        }
        let mut clues = BTreeMap::new();
        for (id, clue) in file.clues {
            let children = placeholders(&clue.text);
            clues.insert(
                id.clone(),
                BracketClue {
                    id,
                    text: clue.text,
                    answer: clue.answer,
                    children,
                    completed: false,
                    previous_answers: Vec::new(),
                },
            );
        }

        for child in placeholders(&file.template) {
            if !clues.contains_key(&child) {
                return Err(PuzzleLoadError::UnknownClue {
                    clue: child,
                    referenced_by: "template".to_string(),
                });
            }
        }
        for clue in clues.values() {
            for child in &clue.children {
                if !clues.contains_key(child) {
                    return Err(PuzzleLoadError::UnknownClue {
                        clue: child.clone(),
                        referenced_by: clue.id.clone(),
                    });
                }
            }
        }

        let puzzle = BracketPuzzle {
            date: file.date,
            template: file.template,
            clues,
        };
        puzzle.check_acyclic()?;
        Ok(puzzle)
    }

    fn check_acyclic(&self) -> Result<(), PuzzleLoadError> {
        let mut done: HashSet<&str> = HashSet::new();
        for id in self.clues.keys() {
            let mut on_path = HashSet::new();
            self.visit(id, &mut on_path, &mut done)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        on_path: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), PuzzleLoadError> {
        if done.contains(id) {
            return Ok(());
        }
        if !on_path.insert(id) {
            return Err(PuzzleLoadError::Cycle(id.to_string()));
        }
        if let Some(clue) = self.clues.get(id) {
            for child in &clue.children {
                self.visit(child, on_path, done)?;
            }
        }
        on_path.remove(id);
        done.insert(id);
        Ok(())
    }

    pub fn clue(&self, id: &str) -> Option<&BracketClue> {
        self.clues.get(id)
    }

    pub fn clue_count(&self) -> usize {
        self.clues.len()
    }

    pub fn completed_count(&self) -> usize {
        self.clues.values().filter(|clue| clue.completed).count()
    }

    fn is_active(&self, clue: &BracketClue) -> bool {
        !clue.completed
            && clue
                .children
                .iter()
                .all(|child| self.clues.get(child).map_or(false, |c| c.completed))
    }

    /// Ids of clues that can be answered now, sorted.
    pub fn active_clues(&self) -> Vec<&str> {
        self.clues
            .values()
            .filter(|clue| self.is_active(clue))
            .map(|clue| clue.id.as_str())
            .collect()
    }

    fn render_fragment(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures| match self.clues.get(&caps[1]) {
                Some(clue) if clue.completed => clue.answer.clone(),
                Some(clue) => format!("[{}]", self.render_fragment(&clue.text)),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// The puzzle sentence with answered clues filled in.
    pub fn rendered_puzzle(&self) -> String {
        self.render_fragment(&self.template)
    }

    /// A clue's text with its answered children filled in.
    pub fn rendered_clue(&self, id: &str) -> Option<String> {
        self.clues.get(id).map(|clue| self.render_fragment(&clue.text))
    }
}

impl PuzzleEngine for BracketPuzzle {
    type Move = ClueMove;

    fn game_name(&self) -> &'static str {
        "bracket"
    }

    fn puzzle_id(&self) -> String {
        self.date.clone()
    }

    fn render_text(&self) -> String {
        let mut output = String::new();
        output.push_str("The game state is as follows:\n");
        output.push_str(&self.rendered_puzzle());
        output.push_str("\n\nThe available clues are:\n");
        for id in self.active_clues() {
            let Some(clue) = self.clues.get(id) else {
                continue;
            };
            output.push_str(&format!("clue_id: {}\n", id));
            output.push_str(&format!("- text: {}\n", self.render_fragment(&clue.text)));
            output.push_str(&format!(
                "- previous guesses: [{}]\n\n",
                clue.previous_answers.join(", ")
            ));
        }
        output
    }

    fn is_solved(&self) -> bool {
        self.clues.values().all(|clue| clue.completed)
    }

    fn apply_move(&mut self, mv: &ClueMove) -> Result<MoveVerdict, EngineRejection> {
        let active = match self.clues.get(&mv.clue_id) {
            Some(clue) => self.is_active(clue),
            None => return Err(EngineRejection::UnknownTarget(mv.clue_id.clone())),
        };
        if !active {
            return Err(EngineRejection::NotActive(mv.clue_id.clone()));
        }
        let Some(clue) = self.clues.get_mut(&mv.clue_id) else {
            return Err(EngineRejection::UnknownTarget(mv.clue_id.clone()));
        };
        clue.previous_answers.push(mv.answer.clone());
        if normalise(&mv.answer) == normalise(&clue.answer) {
            clue.completed = true;
            Ok(MoveVerdict::Correct)
        } else {
            Ok(MoveVerdict::Incorrect)
        }
    }
}
