//! Configuration for wordbench.
//!
//! Provides the [`WordbenchConfig`] struct: where failures and results go, which endpoint to
//! call, how many steps an episode gets, and how model calls are retried. Users construct it
//! manually or from the environment; no config-file parsing dependencies are required.
//!
//! # Example
//!
//! ```rust
//! use wordbench::WordbenchConfig;
//! use std::path::PathBuf;
//!
//! let config = WordbenchConfig {
//!     failure_dir: PathBuf::from("/tmp/parse-errors"),
//!     ..WordbenchConfig::default()
//! };
//! assert_eq!(config.step_limit, 50);
//! ```

use crate::clients::openrouter::{OPENROUTER_API_KEY_VAR, OPENROUTER_BASE_URL};
use crate::retry::RetryPolicy;
use std::path::PathBuf;

pub const API_BASE_VAR: &str = "WORDBENCH_API_BASE";
pub const FAILURE_DIR_VAR: &str = "WORDBENCH_FAILURE_DIR";
pub const RESULTS_DIR_VAR: &str = "WORDBENCH_RESULTS_DIR";

#[derive(Debug, Clone)]
pub struct WordbenchConfig {
    /// Root of the OpenAI compatible API.
    pub api_base_url: String,
    /// API key; `None` until read from the environment or set by hand.
    pub api_key: Option<String>,
    /// Where unparseable replies are archived.
    pub failure_dir: PathBuf,
    /// Where episode records are written.
    pub results_dir: PathBuf,
    /// Default step budget per episode.
    pub step_limit: usize,
    /// Retry policy for every model call.
    pub retry: RetryPolicy,
}

impl Default for WordbenchConfig {
    fn default() -> Self {
        Self {
            api_base_url: OPENROUTER_BASE_URL.to_string(),
            api_key: None,
            failure_dir: PathBuf::from("parse-errors"),
            results_dir: PathBuf::from("results"),
            step_limit: 50,
            retry: RetryPolicy::default(),
        }
    }
}

impl WordbenchConfig {
    /// Defaults overridden by `OPENROUTER_API_KEY`, `WORDBENCH_API_BASE`,
    /// `WORDBENCH_FAILURE_DIR` and `WORDBENCH_RESULTS_DIR` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`WordbenchConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();
        config.api_key = non_empty(OPENROUTER_API_KEY_VAR);
        if let Some(base) = non_empty(API_BASE_VAR) {
            config.api_base_url = base;
        }
        if let Some(dir) = non_empty(FAILURE_DIR_VAR) {
            config.failure_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(RESULTS_DIR_VAR) {
            config.results_dir = PathBuf::from(dir);
        }
        config
    }
}
