//! The `OpenRouterClient` struct implements `ClientWrapper` for any OpenAI compatible chat
//! endpoint, OpenRouter by default, returning the assistant response together with the token
//! usage of that call.
//!
//! Unlike a single-model client, the model identifier is passed per call, which is what the
//! evaluation harness needs: one client, many `provider/model` identifiers.
//!
//! # Example
//!
//! ```rust,no_run
//! use wordbench::clients::openrouter::OpenRouterClient;
//! use wordbench::client_wrapper::{ClientWrapper, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouterClient::from_env()?;
//!     let reply = client
//!         .send_message("openai/gpt-4.1-mini", &[Message::user("Say hi")])
//!         .await?;
//!     println!("{}", reply.message.content);
//!     if let Some(usage) = reply.usage {
//!         println!("tokens: {}", usage.total_tokens);
//!     }
//!     Ok(())
//! }
//! ```
use async_trait::async_trait;
use openai_rust::chat;
use openai_rust2 as openai_rust;

use crate::client_wrapper::{ClientWrapper, Completion, Message, Role, TransportError};
use crate::clients::common::{get_shared_http_client, send_and_track};

/// Default OpenRouter API root; the chat path is appended per request.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
/// Environment variable holding the API key.
pub const OPENROUTER_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Client wrapper for OpenAI compatible Chat Completions APIs.
pub struct OpenRouterClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
}

impl OpenRouterClient {
    /// Construct a client for the public OpenRouter endpoint.
    pub fn new(secret_key: &str) -> Self {
        Self::new_with_base_url(secret_key, OPENROUTER_BASE_URL)
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    pub fn new_with_base_url(secret_key: &str, base_url: &str) -> Self {
        OpenRouterClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_shared_http_client().clone(),
                base_url,
            ),
        }
    }

    /// Construct a client from `OPENROUTER_API_KEY`.
    pub fn from_env() -> Result<Self, TransportError> {
        match std::env::var(OPENROUTER_API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(TransportError::MissingCredentials(
                OPENROUTER_API_KEY_VAR.to_string(),
            )),
        }
    }
}

#[async_trait]
impl ClientWrapper for OpenRouterClient {
    async fn send_message(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<Completion, TransportError> {
        let mut formatted_messages = Vec::with_capacity(messages.len());
        for msg in messages {
            formatted_messages.push(chat::Message {
                role: match msg.role {
                    Role::System => "system".to_owned(),
                    Role::User => "user".to_owned(),
                    Role::Assistant => "assistant".to_owned(),
                },
                content: msg.content.to_string(),
            });
        }

        send_and_track(
            &self.client,
            model,
            formatted_messages,
            Some(CHAT_COMPLETIONS_PATH.to_string()),
        )
        .await
    }
}
