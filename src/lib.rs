//! medquiz - AI generated multiple-choice practice for medical exams.
//!
//! ## Flow
//!
//! Login → API key entry → quiz configuration → quiz → results.
//!
//! - **Credential store**: the provider API key, format-checked and verified
//!   before it is persisted in a local key-value store.
//! - **Question provider**: builds a prompt per question and decodes the
//!   model's JSON reply into a `Question`.
//! - **Quiz session**: the per-question state machine with score and countdown.
//! - **Gate**: maps auth events, key presence and quiz activity onto a view.

pub mod app;
pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod models;
pub mod notice;
pub mod provider;
pub mod runner;
pub mod session;
pub mod store;
pub mod web;

pub use app::App;
pub use config::{ProviderSettings, Settings};
pub use error::{AuthError, ConfigError, CredentialError, QuestionError, StoreError};
pub use models::{Difficulty, Letter, Limit, Question, QuizConfig, TimerScope};
pub use provider::QuestionProvider;
pub use session::{Phase, QuizSession};
pub use web::router;
