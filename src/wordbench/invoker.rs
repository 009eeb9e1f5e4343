//! Single logical model call with bounded retries.
//!
//! [`ModelInvoker`] is used for both the primary "what is your move" call and the healing
//! call. It keeps no memory of failures between calls; the only thing it accumulates is the
//! token usage the provider reports, so an episode can record its cost.

use crate::client_wrapper::{ClientWrapper, Message, TokenUsage, TransportError};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ModelInvoker {
    client: Arc<dyn ClientWrapper>,
    policy: RetryPolicy,
    usage: Mutex<TokenUsage>,
}

impl ModelInvoker {
    pub fn new(client: Arc<dyn ClientWrapper>, policy: RetryPolicy) -> Self {
        ModelInvoker {
            client,
            policy,
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    /// Send `prompt` to `model` as a single user message and return the reply text.
    ///
    /// The last attempt's [`TransportError`] is returned unchanged once the policy gives up.
    /// Usage reported by any attempt, failed ones included, is added to [`token_usage`].
    ///
    /// [`token_usage`]: ModelInvoker::token_usage
    pub async fn invoke(&self, model: &str, prompt: &str) -> Result<String, TransportError> {
        log::info!("Calling model {} ({} prompt chars)", model, prompt.len());
        let messages = [Message::user(prompt)];
        let reply = self
            .policy
            .run(|attempt| {
                let messages = &messages;
                async move {
                    log::debug!("Model call attempt {} for {}", attempt, model);
                    let result = self.client.send_message(model, messages).await;
                    let billed = match &result {
                        Ok(completion) => completion.usage.as_ref(),
                        Err(TransportError::EmptyResponse { usage }) => usage.as_ref(),
                        Err(_) => None,
                    };
                    if let Some(usage) = billed {
                        self.usage.lock().await.accumulate(usage);
                    }
                    result
                }
            })
            .await?;

        let content = reply.message.content;
        log::info!("Model {} replied ({} chars)", model, content.len());
        Ok(content.to_string())
    }

    /// Token usage summed over every billed call made through this invoker.
    pub async fn token_usage(&self) -> TokenUsage {
        self.usage.lock().await.clone()
    }
}
