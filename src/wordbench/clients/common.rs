use crate::client_wrapper::{Completion, Message, Role, TokenUsage, TransportError};
use lazy_static::lazy_static;
use openai_rust::chat;
use openai_rust2 as openai_rust;
use std::sync::Arc;
use std::time::Duration;

lazy_static! {
    /// One pooled HTTP client shared by every provider wrapper so that concurrent episodes
    /// reuse connections instead of opening their own.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        // Wall-clock deadlines live here, not in the retry policy.
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
}

/// Return the process-wide pooled HTTP client.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Send a chat request and return the assistant's reply together with the usage the
/// provider reported for this request.
pub async fn send_and_track(
    api: &openai_rust::Client,
    model: &str,
    formatted_msgs: Vec<chat::Message>,
    url_path: Option<String>,
) -> Result<Completion, TransportError> {
    let chat_arguments = chat::ChatArguments::new(model, formatted_msgs);

    let response = api.create_chat(chat_arguments, url_path).await;

    match response {
        Ok(response) => {
            let usage = TokenUsage {
                input_tokens: response.usage.prompt_tokens as usize,
                output_tokens: response.usage.completion_tokens as usize,
                total_tokens: response.usage.total_tokens as usize,
            };

            match response.choices.first() {
                Some(choice) => Ok(Completion {
                    message: Message {
                        role: Role::Assistant,
                        content: Arc::from(choice.message.content.as_str()),
                    },
                    usage: Some(usage),
                }),
                // Billed even though nothing came back.
                None => Err(TransportError::EmptyResponse { usage: Some(usage) }),
            }
        }
        Err(err) => {
            log::error!(
                "wordbench::clients::common::send_and_track(...): provider error for model {}: {}",
                model,
                err
            );
            Err(TransportError::Provider(err.to_string()))
        }
    }
}
