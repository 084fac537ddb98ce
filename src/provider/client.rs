use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderSettings;
use crate::credential::CredentialVerifier;
use crate::error::{CredentialError, QuestionError};

// ---- OpenAI compatible API structures ----

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub n: Option<u32>,
}

// Everything is optional here: a missing field is a malformed reply, not a
// deserialization failure.
#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    content: Option<String>,
}

/// Thin client for the provider's chat-completion and model-listing endpoints.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(settings: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends one chat completion and returns `choices[0].message.content`.
    pub async fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, QuestionError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_message, "Chat completion failed");
            return Err(QuestionError::Transport(format!(
                "API request failed with status {status}"
            )));
        }

        let body = response.text().await?;
        let result: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| QuestionError::MalformedResponse(format!("reply is not JSON: {e}")))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                QuestionError::MalformedResponse("no choices[0].message.content".to_string())
            })?;
        debug!(chars = content.len(), "Chat completion received");
        Ok(content)
    }

    /// Lightweight authenticated call used to check that a key is live.
    pub async fn list_models(&self, api_key: &str) -> Result<(), String> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("model listing returned status {status}"))
        }
    }
}

impl CredentialVerifier for ChatClient {
    async fn verify(&self, token: &str) -> Result<(), CredentialError> {
        self.list_models(token)
            .await
            .map_err(CredentialError::InvalidCredential)
    }
}
