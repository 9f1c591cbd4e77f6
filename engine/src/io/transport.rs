//! Model-completion transport: the seam between the loop and the model.
//!
//! The loop driver only sees [`ModelTransport`]; tests script it, and the
//! production implementation speaks to an OpenAI-compatible
//! chat-completions endpoint over blocking HTTP.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::types::{Message, Role};

/// Errors from the completion transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),
}

/// A capability that turns a system prompt plus ordered history into the
/// next assistant turn.
pub trait ModelTransport {
    fn complete(&self, system_prompt: &str, history: &[Message])
    -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible chat-completions API.
#[derive(Debug)]
pub struct OpenAiTransport {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// Upper bound on one completion request, well above typical latency.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

impl OpenAiTransport {
    pub fn new(api_key: String, model: String) -> Result<Self, TransportError> {
        Self::with_base_url(api_key, model, "https://api.openai.com".to_string())
    }

    /// Create a client with a custom base URL (for compatible providers and
    /// mock servers in tests).
    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
    ) -> Result<Self, TransportError> {
        if api_key.trim().is_empty() {
            return Err(TransportError::MissingApiKey(
                "an empty key cannot authenticate".to_string(),
            ));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    /// Check the key against the models endpoint before a session starts.
    ///
    /// A failure here is fatal to the caller: the loop must not begin with
    /// credentials that cannot complete a single turn.
    pub fn verify(&self) -> Result<(), TransportError> {
        let response = self
            .http
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()?;
        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(TransportError::Api { status, message });
        }
        Ok(())
    }
}

impl ModelTransport for OpenAiTransport {
    fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> Result<String, TransportError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|message| WireMessage {
            role: role_name(message.role),
            content: &message.content,
        }));

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.7,
            max_tokens: 1000,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(TransportError::Api { status, message });
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            TransportError::InvalidResponse(format!("failed to parse completion response: {err}"))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TransportError::InvalidResponse("completion had no content".to_string()))
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}
