//! Token counter implementation
//!
//! Estimates the tokens in an LLM exchange with tiktoken-rs so callers can
//! feed a usage tracker when the provider does not report usage itself.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::error::{AppError, AppResult};

/// Encoder used when a model name is unknown to tiktoken
pub const FALLBACK_MODEL: &str = "gpt-4";

/// Tokens added around each chat message (`<|start|>{role}\n{content}<|end|>\n`)
const TOKENS_PER_MESSAGE: usize = 3;
/// Extra token when a message carries a name
const TOKENS_PER_NAME: usize = 1;
/// Every reply is primed with `<|start|>assistant<|message|>`
const REPLY_PRIMING_TOKENS: usize = 3;

/// One chat message in a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Token counter with one cached encoder per model
#[derive(Default)]
pub struct TokenCounter {
    encoders: HashMap<String, CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn encoder(&mut self, model: &str) -> AppResult<&CoreBPE> {
        if !self.encoders.contains_key(model) {
            let encoder = match get_bpe_from_model(model) {
                Ok(encoder) => encoder,
                Err(e) => {
                    tracing::warn!(
                        model = %model,
                        "Unknown model, falling back to {} encoder: {}",
                        FALLBACK_MODEL,
                        e
                    );
                    get_bpe_from_model(FALLBACK_MODEL)
                        .map_err(|e| AppError::Tokenizer(e.to_string()))?
                }
            };
            self.encoders.insert(model.to_string(), encoder);
        }

        self.encoders
            .get(model)
            .ok_or_else(|| AppError::Tokenizer(format!("no encoder cached for '{}'", model)))
    }

    /// Count tokens in plain text
    pub fn count_tokens(&mut self, model: &str, text: &str) -> AppResult<u64> {
        let encoder = self.encoder(model)?;
        Ok(encoder.encode_with_special_tokens(text).len() as u64)
    }

    /// Count tokens in one chat message, including per-message overhead
    pub fn count_message_tokens(&mut self, model: &str, message: &ChatMessage) -> AppResult<u64> {
        let encoder = self.encoder(model)?;

        let mut count = TOKENS_PER_MESSAGE;
        count += encoder.encode_with_special_tokens(&message.role).len();
        count += encoder.encode_with_special_tokens(&message.content).len();
        if let Some(name) = &message.name {
            count += encoder.encode_with_special_tokens(name).len();
            count += TOKENS_PER_NAME;
        }

        Ok(count as u64)
    }

    /// Count prompt tokens for a whole chat request
    pub fn count_chat_tokens(&mut self, model: &str, messages: &[ChatMessage]) -> AppResult<u64> {
        let mut total = REPLY_PRIMING_TOKENS as u64;
        for message in messages {
            total += self.count_message_tokens(model, message)?;
        }
        Ok(total)
    }
}

/// Thread-safe token counter wrapper
#[derive(Clone, Default)]
pub struct SharedTokenCounter {
    inner: Arc<RwLock<TokenCounter>>,
}

impl SharedTokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_counter<T>(&self, f: impl FnOnce(&mut TokenCounter) -> AppResult<T>) -> AppResult<T> {
        let mut counter = self
            .inner
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire token counter lock: {}", e))?;
        f(&mut *counter)
    }

    pub fn count_tokens(&self, model: &str, text: &str) -> AppResult<u64> {
        self.with_counter(|counter| counter.count_tokens(model, text))
    }

    pub fn count_message_tokens(&self, model: &str, message: &ChatMessage) -> AppResult<u64> {
        self.with_counter(|counter| counter.count_message_tokens(model, message))
    }

    pub fn count_chat_tokens(&self, model: &str, messages: &[ChatMessage]) -> AppResult<u64> {
        self.with_counter(|counter| counter.count_chat_tokens(model, messages))
    }
}
