//! Question generation through an OpenAI compatible chat-completion API.

pub mod client;
pub mod decode;
pub mod prompt;

use tracing::{debug, info};

use crate::config::ProviderSettings;
use crate::credential::CredentialStore;
use crate::error::QuestionError;
use crate::models::{QuizConfig, Question};
use crate::runner::QuestionSource;

pub use client::{ChatClient, ChatCompletionRequest, ChatMessage};
pub use decode::decode_question;

/// Builds prompts, calls the provider and decodes its reply.
///
/// Every call is one request: no retry and no caching.
#[derive(Clone)]
pub struct QuestionProvider {
    client: ChatClient,
    credentials: CredentialStore,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl QuestionProvider {
    pub fn new(
        settings: &ProviderSettings,
        credentials: CredentialStore,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: ChatClient::new(settings)?,
            credentials,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    pub async fn generate_question(&self, config: &QuizConfig) -> Result<Question, QuestionError> {
        let api_key = self
            .credentials
            .credential()
            .ok_or(QuestionError::MissingCredential)?;

        let question_type = prompt::random_question_type(&mut rand::thread_rng());
        info!(
            scope = %config.scope(),
            difficulty = %config.difficulty,
            question_type,
            "Generating question"
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: prompt::build_messages(config, question_type),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            n: Some(1),
        };

        let content = self.client.chat_completion(&api_key, &request).await?;
        let question = decode_question(&content, &config.subject)?;
        debug!(correct = %question.correct_answer, "Question decoded");
        Ok(question)
    }
}

impl QuestionSource for QuestionProvider {
    async fn next_question(&self, config: &QuizConfig) -> Result<Question, QuestionError> {
        self.generate_question(config).await
    }
}
