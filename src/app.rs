//! Application state shared by the HTTP handlers.
//!
//! Every user action lands on one method here. Failures are reported as a
//! notice and returned as a typed error; nothing here leaves the quiz in a
//! state the user cannot retry from.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthBackend, AuthEvent, AuthSession, LocalAuth, Profile, QuizRecord, SignUp};
use crate::config::ProviderSettings;
use crate::credential::CredentialStore;
use crate::error::{AuthError, ConfigError, CredentialError};
use crate::gate::{Gate, View};
use crate::models::{Letter, QuizConfig};
use crate::notice::Notices;
use crate::provider::QuestionProvider;
use crate::runner::{Load, QuizRunner};
use crate::session::{Advance, Selection, SessionView, Summary};
use crate::store::KeyValueStore;

type Runner = QuizRunner<QuestionProvider>;

/// Why a quiz action could not be carried out.
#[derive(Debug, Error)]
pub enum QuizActionError {
    #[error("Please log in first")]
    NotSignedIn,

    #[error("No quiz in progress")]
    NoQuiz,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub selection: Selection,
    pub session: SessionView,
}

pub struct App {
    auth: LocalAuth,
    credentials: CredentialStore,
    provider: Arc<QuestionProvider>,
    notices: Notices,
    gate: Gate,
    quiz: Mutex<Option<Arc<Runner>>>,
}

impl App {
    pub async fn new(
        store: Arc<dyn KeyValueStore>,
        provider: &ProviderSettings,
        bcrypt_cost: u32,
    ) -> Result<Self, reqwest::Error> {
        let credentials = CredentialStore::new(store);
        let provider = Arc::new(QuestionProvider::new(provider, credentials.clone())?);
        let auth = LocalAuth::new(bcrypt_cost);
        let gate = Gate::start(&auth, credentials.clone()).await;
        Ok(Self {
            auth,
            credentials,
            provider,
            notices: Notices::new(),
            gate,
            quiz: Mutex::new(None),
        })
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn auth(&self) -> &LocalAuth {
        &self.auth
    }

    pub fn view(&self) -> View {
        self.gate.view()
    }

    fn quiz_slot(&self) -> MutexGuard<'_, Option<Arc<Runner>>> {
        self.quiz.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn runner(&self) -> Result<Arc<Runner>, QuizActionError> {
        self.quiz_slot().clone().ok_or(QuizActionError::NoQuiz)
    }

    fn report<E: std::fmt::Display>(&self, err: E) -> E {
        self.notices.error(err.to_string());
        err
    }

    // ---- Auth ----

    pub async fn sign_up(&self, form: SignUp) -> Result<AuthSession, AuthError> {
        let session = self.auth.sign_up(form).await.map_err(|e| self.report(e))?;
        self.gate.apply(AuthEvent::SignedIn(session.clone()));
        self.notices.success("Account created successfully!");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .auth
            .sign_in(email, password)
            .await
            .map_err(|e| self.report(e))?;
        self.gate.apply(AuthEvent::SignedIn(session.clone()));
        self.notices.success("Successfully logged in!");
        Ok(session)
    }

    /// Signs out, dropping the quiz and the stored key before returning.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.discard_quiz();
        self.auth.sign_out().await.map_err(|e| self.report(e))?;
        self.gate.apply(AuthEvent::SignedOut);
        Ok(())
    }

    /// Renews the access token of the current session.
    pub async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let session = self
            .auth
            .refresh_session()
            .await
            .map_err(|e| self.report(e))?;
        self.gate.apply(AuthEvent::TokenRefreshed(session.clone()));
        self.notices.info("Session refreshed");
        Ok(session)
    }

    pub async fn profile(&self) -> Option<Profile> {
        let session = self.auth.current_session().await?;
        self.auth.profile(session.user_id).await
    }

    // ---- Credential ----

    pub async fn submit_credential(&self, raw_input: &str) -> Result<(), CredentialError> {
        self.credentials
            .submit(raw_input, self.provider.client())
            .await
            .map_err(|e| self.report(e))?;
        self.notices.success("API key saved successfully");
        self.gate.refresh();
        Ok(())
    }

    pub fn clear_credential(&self) {
        self.credentials.clear();
        self.gate.refresh();
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.has_credential()
    }

    // ---- Quiz ----

    /// Starts a new quiz, replacing any running one, and loads its first question.
    pub async fn start_quiz(&self, config: QuizConfig) -> Result<SessionView, QuizActionError> {
        if self.auth.current_session().await.is_none() {
            return Err(self.report(QuizActionError::NotSignedIn));
        }
        let config = config.validate().map_err(|e| self.report(QuizActionError::from(e)))?;

        let runner = Arc::new(QuizRunner::start(
            config,
            self.provider.clone(),
            self.notices.clone(),
        ));
        if let Some(previous) = self.quiz_slot().replace(runner.clone()) {
            previous.close();
        }
        self.gate.set_quiz_active(true);

        runner.load_question().await;
        Ok(runner.view())
    }

    pub fn quiz_view(&self) -> Result<SessionView, QuizActionError> {
        Ok(self.runner()?.view())
    }

    pub fn answer(&self, letter: Letter) -> Result<AnswerOutcome, QuizActionError> {
        let runner = self.runner()?;
        let selection = runner.select(letter);
        Ok(AnswerOutcome {
            selection,
            session: runner.view(),
        })
    }

    pub fn toggle_explanation(&self) -> Result<SessionView, QuizActionError> {
        let runner = self.runner()?;
        runner.toggle_explanation();
        Ok(runner.view())
    }

    pub async fn next_question(&self) -> Result<SessionView, QuizActionError> {
        let runner = self.runner()?;
        if let (Advance::Completed(summary), _) = runner.advance().await {
            self.record(&runner, summary).await;
        }
        Ok(runner.view())
    }

    /// Re-issues a failed question request.
    pub async fn retry_question(&self) -> Result<SessionView, QuizActionError> {
        let runner = self.runner()?;
        if runner.load_question().await == Load::Skipped {
            info!("Retry ignored, no question is pending");
        }
        Ok(runner.view())
    }

    /// Ends the quiz now and records the result.
    pub async fn finish_quiz(&self) -> Result<SessionView, QuizActionError> {
        let runner = self.runner()?;
        match runner.finish() {
            Some(summary) => self.record(&runner, summary).await,
            None => debug!("Quiz already completed, nothing to record"),
        }
        Ok(runner.view())
    }

    /// Starts over with the same configuration.
    pub async fn restart_quiz(&self) -> Result<SessionView, QuizActionError> {
        let config = self.runner()?.config().clone();
        self.start_quiz(config).await
    }

    /// Leaves the quiz and returns to configuration.
    pub fn exit_quiz(&self) -> Result<(), QuizActionError> {
        let runner = self.quiz_slot().take().ok_or(QuizActionError::NoQuiz)?;
        runner.close();
        self.gate.set_quiz_active(false);
        Ok(())
    }

    fn discard_quiz(&self) {
        if let Some(runner) = self.quiz_slot().take() {
            runner.close();
        }
    }

    async fn record(&self, runner: &Runner, summary: Summary) {
        let Some(session) = self.auth.current_session().await else {
            warn!("Quiz finished without a signed-in user, result not recorded");
            return;
        };
        let config = runner.config();
        let record = QuizRecord {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            subject: config.subject.clone(),
            difficulty: config.difficulty,
            score: summary.score,
            total_questions: summary.total_questions,
            finished_at: Utc::now(),
        };
        if let Err(e) = self.auth.record_result(record).await {
            warn!(error = %e, "Could not record quiz result");
        }
    }
}
