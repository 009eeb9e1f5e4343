//! Offline measurement of how well healing recovers archived failures.
//!
//! Every sample in a [`FailureArchive`] is sent through one healing call and re-parsed. The
//! archive is only read; nothing is written back.

use crate::archive::FailureArchive;
use crate::healing::HealingCoordinator;
use crate::parser::MoveGrammar;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealStage {
    /// The sample could not be read back from storage.
    Read,
    /// The healing call failed.
    Healing,
    /// The healed text did not parse.
    Parsing,
}

impl fmt::Display for HealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealStage::Read => write!(f, "read"),
            HealStage::Healing => write!(f, "healing"),
            HealStage::Parsing => write!(f, "parsing"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealFailure {
    pub key: String,
    pub stage: HealStage,
    pub error: String,
    pub original: Option<String>,
    pub healed: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HealingReport {
    pub total: usize,
    pub fixed: usize,
    pub failures: Vec<HealFailure>,
}

impl HealingReport {
    /// Fraction of samples fixed, `0.0` for an empty archive.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.fixed as f64 / self.total as f64
        }
    }
}

/// Replay every archived sample through `coordinator`'s healing step using `model`.
pub async fn evaluate_healing<G: MoveGrammar>(
    archive: &FailureArchive,
    coordinator: &HealingCoordinator<G>,
    model: &str,
) -> Result<HealingReport, crate::archive::ArchiveError> {
    let keys = archive.keys()?;
    let mut report = HealingReport::default();
    log::info!("Evaluating healing on {} archived samples with {}", keys.len(), model);

    for key in keys {
        report.total += 1;
        let original = match archive.load(&key) {
            Ok(text) => text,
            Err(err) => {
                log::error!("Could not read sample {}: {}", key, err);
                report.failures.push(HealFailure {
                    key,
                    stage: HealStage::Read,
                    error: err.to_string(),
                    original: None,
                    healed: None,
                });
                continue;
            }
        };
        log::debug!("Original text of {}:\n{}", key, original);

        let healed = match coordinator.heal(&original, model).await {
            Ok(text) => text,
            Err(err) => {
                log::error!("Healing failed for {}: {}", key, err);
                report.failures.push(HealFailure {
                    key,
                    stage: HealStage::Healing,
                    error: err.to_string(),
                    original: Some(original),
                    healed: None,
                });
                continue;
            }
        };
        log::debug!("Healed text of {}:\n{}", key, healed);

        match coordinator.grammar().parse(&healed) {
            Some(mv) => {
                log::info!("Healed {} into {:?}", key, mv);
                report.fixed += 1;
            }
            None => {
                log::warn!("Healed text for {} still does not parse", key);
                report.failures.push(HealFailure {
                    key,
                    stage: HealStage::Parsing,
                    error: "healed text is missing a required field".to_string(),
                    original: Some(original),
                    healed: Some(healed),
                });
            }
        }
    }

    log::info!("Healing fixed {} / {} samples", report.fixed, report.total);
    Ok(report)
}
