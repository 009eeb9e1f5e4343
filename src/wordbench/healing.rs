//! Two-stage move resolution: parse, and if that fails, heal once and parse again.
//!
//! ```text
//! raw reply ──parse──▶ Move                       (no model call)
//!     │
//!     └─fail─▶ correction prompt ──invoke──▶ healed text ──parse──▶ Move
//!                                   │                        │
//!                                   └─error──┐          fail─┘
//!                                            ▼
//!                          archive original raw reply, report failure
//! ```
//!
//! At most one healing call is made per reply, so a turn costs at most two model calls. The
//! coordinator never returns an error: a failed repair call and an unparseable repair are the
//! same terminal outcome, and the caller still advances its step counter.

use crate::archive::FailureArchive;
use crate::client_wrapper::TransportError;
use crate::invoker::ModelInvoker;
use crate::parser::MoveGrammar;
use std::fmt;
use std::sync::Arc;

/// Build the prompt asking a model to reformat `broken_text` into `template`.
pub fn correction_prompt(template: &str, broken_text: &str) -> String {
    format!(
        "Your task is to correct the formatting of the text provided below.\n\
         The required output format is exactly:\n\
         {template}\n\n\
         Review the text and extract the values for that format. \
         Return only the corrected lines in the format above. \
         You MUST NOT include any extra text, conversation, explanations, or markdown formatting like ```.\n\
         If a value is ambiguous or cannot be recovered from the text, leave that field empty \
         instead of inventing one.\n\n\
         Here is the text to fix:\n\
         {broken_text}"
    )
}

/// Why a reply could not be turned into a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The reply did not parse and healing is switched off.
    HealingDisabled,
    /// The healing call itself failed after its retries.
    RepairCallFailed(TransportError),
    /// The healing call answered but its text still did not parse.
    StillUnparseable { healed_text: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::HealingDisabled => write!(f, "unparseable and healing is disabled"),
            FailureReason::RepairCallFailed(err) => write!(f, "healing call failed: {}", err),
            FailureReason::StillUnparseable { .. } => write!(f, "healed text still unparseable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealingFailure {
    pub reason: FailureReason,
    /// Archive key of the original reply, `None` if the archive write failed.
    pub archive_key: Option<String>,
}

/// Outcome of resolving one raw reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<M> {
    /// The reply parsed as is.
    Parsed(M),
    /// The reply parsed after one healing round trip.
    Healed { mv: M, healed_text: String },
    /// No move could be recovered; the original reply was archived.
    Failed(HealingFailure),
}

impl<M> Resolution<M> {
    pub fn into_move(self) -> Option<M> {
        match self {
            Resolution::Parsed(mv) | Resolution::Healed { mv, .. } => Some(mv),
            Resolution::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }
}

pub struct HealingCoordinator<G: MoveGrammar> {
    grammar: G,
    invoker: Arc<ModelInvoker>,
    archive: FailureArchive,
    heal_model: Option<String>,
    healing_enabled: bool,
}

impl<G: MoveGrammar> HealingCoordinator<G> {
    pub fn new(grammar: G, invoker: Arc<ModelInvoker>, archive: FailureArchive) -> Self {
        HealingCoordinator {
            grammar,
            invoker,
            archive,
            heal_model: None,
            healing_enabled: true,
        }
    }

    /// Heal with a fixed model instead of the episode's own model.
    pub fn with_heal_model(mut self, model: impl Into<String>) -> Self {
        self.heal_model = Some(model.into());
        self
    }

    /// Turn the healing call on or off. When off, unparseable replies fail straight away.
    pub fn with_healing(mut self, enabled: bool) -> Self {
        self.healing_enabled = enabled;
        self
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    pub fn invoker(&self) -> &Arc<ModelInvoker> {
        &self.invoker
    }

    /// Ask the model to reformat `broken_text`. No parsing, no archiving.
    pub async fn heal(&self, broken_text: &str, model: &str) -> Result<String, TransportError> {
        let model = self.heal_model.as_deref().unwrap_or(model);
        log::info!("Attempting to heal model output with {}", model);
        let prompt = correction_prompt(self.grammar.template(), broken_text);
        self.invoker.invoke(model, &prompt).await
    }

    /// Resolve a raw reply into a move, healing at most once.
    pub async fn resolve(&self, raw_response: &str, model: &str) -> Resolution<G::Move> {
        if let Some(mv) = self.grammar.parse(raw_response) {
            log::debug!("Parsed move without healing: {:?}", mv);
            return Resolution::Parsed(mv);
        }
        log::warn!("Could not parse model response, {} chars", raw_response.len());

        let reason = if !self.healing_enabled {
            FailureReason::HealingDisabled
        } else {
            match self.heal(raw_response, model).await {
                Ok(healed_text) => match self.grammar.parse(&healed_text) {
                    Some(mv) => {
                        log::info!("Healed move: {:?}", mv);
                        return Resolution::Healed { mv, healed_text };
                    }
                    None => FailureReason::StillUnparseable { healed_text },
                },
                Err(err) => {
                    log::error!("Healing call failed after retries: {}", err);
                    FailureReason::RepairCallFailed(err)
                }
            }
        };

        log::warn!("Giving up on response: {}", reason);
        let archive_key = self.archive.save(raw_response);
        Resolution::Failed(HealingFailure {
            reason,
            archive_key,
        })
    }
}
