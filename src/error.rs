//! Error types for medquiz.
//!
//! Each stage has its own enum so callers can tell a bad key apart from a
//! bad provider reply. None of them is fatal: every variant ends up as a
//! notice and the user may retry the action that caused it.

use thiserror::Error;

use crate::credential::{CREDENTIAL_LENGTH, CREDENTIAL_PREFIX};

/// Failures while accepting an API credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Please enter an API key")]
    EmptyInput,

    #[error(
        "API key must be `{}` followed by {} letters or digits",
        CREDENTIAL_PREFIX,
        CREDENTIAL_LENGTH
    )]
    Format,

    #[error("API key was rejected by the provider: {0}")]
    InvalidCredential(String),

    #[error("Could not save API key: {0}")]
    Storage(#[from] StoreError),
}

/// Failures while generating a question.
#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("Please enter your Groq API key first")]
    MissingCredential,

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider reply is missing the message content: {0}")]
    MalformedResponse(String),

    #[error("Could not read the generated question: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for QuestionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl QuestionError {
    /// Message shown to the user for this failure.
    pub fn notice_text(&self) -> String {
        match self {
            Self::MissingCredential => self.to_string(),
            _ => "Failed to generate question. Please check your API key and try again.".to_string(),
        }
    }
}

/// Failures reported by the auth backend. Messages are shown verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidLogin,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Auth backend task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failures of the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt store file: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Invalid quiz configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please choose a subject")]
    EmptySubject,

    #[error("A chapter cannot be chosen for the complete syllabus")]
    ChapterWithCompleteSyllabus,

    #[error("Question count must be a positive number or \"No Limit\"")]
    InvalidQuestionCount,

    #[error("Time limit must be a positive number of seconds or \"No Limit\"")]
    InvalidTimeLimit,

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),
}
