//! A ClientWrapper is a thin wrapper around a chat-completion provider.
//!
//! It does not keep any episode state: the model identifier is supplied on every call so one
//! wrapper can serve every model an evaluation run compares, from concurrent episodes too.
//! Token usage therefore travels with each reply ([`Completion::usage`]) rather than living
//! in the wrapper. Retrying is layered on top by [`ModelInvoker`](crate::invoker::ModelInvoker).
// src/wordbench/client_wrapper.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    // set by the harness to steer the model's responses
    User,
    // the model's reply
    Assistant,
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Fold another call's usage into this running total.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Represents a generic message sent to or received from an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: Arc<str>,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Message {
            role: Role::User,
            content: Arc::from(content),
        }
    }
}

/// The reply to one call together with the tokens that call was billed for.
#[derive(Clone, Debug)]
pub struct Completion {
    pub message: Message,
    /// `None` when the provider did not report usage.
    pub usage: Option<TokenUsage>,
}

/// Failure of a single model call.
///
/// Every variant is treated as transient by the invoker: it is retried until the attempt
/// budget runs out and then handed to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The provider (or the network in front of it) returned an error.
    Provider(String),
    /// The provider answered but the reply carried no choices. The call may still have been
    /// billed; `usage` carries what the provider reported.
    EmptyResponse { usage: Option<TokenUsage> },
    /// No API key was configured for the provider.
    MissingCredentials(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Provider(msg) => write!(f, "Provider error: {}", msg),
            TransportError::EmptyResponse { .. } => write!(f, "Provider returned no choices"),
            TransportError::MissingCredentials(var) => {
                write!(f, "Missing credentials: {} is not set", var)
            }
        }
    }
}

impl Error for TransportError {}

/// Trait defining the interface to a chat-completion service.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send `messages` to `model` and return the assistant's reply with its usage.
    async fn send_message(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<Completion, TransportError>;
}
