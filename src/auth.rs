//! Auth backend: accounts, the current auth session and its change events.
//!
//! `AuthBackend` is the seam to a hosted backend. `LocalAuth` keeps
//! everything in process and hashes passwords with bcrypt.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Difficulty;

const EVENT_CAPACITY: usize = 16;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    InitialCheck(Option<AuthSession>),
    SignedIn(AuthSession),
    SignedOut,
    TokenRefreshed(AuthSession),
}

impl AuthEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthEvent::InitialCheck(_) => "initial_check",
            AuthEvent::SignedIn(_) => "signed_in",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::TokenRefreshed(_) => "token_refreshed",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub college_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub college_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub total_questions: u32,
    pub finished_at: DateTime<Utc>,
}

pub trait AuthBackend: Send + Sync {
    fn sign_up(&self, form: SignUp) -> impl Future<Output = Result<AuthSession, AuthError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn refresh_session(&self) -> impl Future<Output = Result<AuthSession, AuthError>> + Send;

    fn current_session(&self) -> impl Future<Output = Option<AuthSession>> + Send;

    /// Change notifications from now on. Earlier events are not replayed.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    fn profile(&self, user_id: Uuid) -> impl Future<Output = Option<Profile>> + Send;

    fn record_result(&self, record: QuizRecord) -> impl Future<Output = Result<(), AuthError>> + Send;
}

#[derive(Debug)]
struct Account {
    user_id: Uuid,
    password_hash: String,
}

#[derive(Debug, Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    profiles: HashMap<Uuid, Profile>,
    results: Vec<QuizRecord>,
    session: Option<AuthSession>,
}

#[derive(Debug)]
pub struct LocalAuth {
    state: Mutex<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    bcrypt_cost: u32,
}

impl LocalAuth {
    pub fn new(bcrypt_cost: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(AuthState::default()),
            events,
            bcrypt_cost,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: AuthEvent) {
        debug!(event = event.kind(), "Auth event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn start_session(&self, user_id: Uuid, email: &str) -> AuthSession {
        let session = AuthSession {
            user_id,
            email: email.to_string(),
            access_token: Uuid::new_v4().simple().to_string(),
            issued_at: Utc::now(),
        };
        self.lock().session = Some(session.clone());
        self.emit(AuthEvent::SignedIn(session.clone()));
        session
    }

    /// Recorded quiz results for a user, oldest first.
    pub fn results_for(&self, user_id: Uuid) -> Vec<QuizRecord> {
        self.lock()
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AuthError::Validation(
            "Unable to validate email address: invalid format".to_string(),
        )),
    }
}

impl AuthBackend for LocalAuth {
    async fn sign_up(&self, form: SignUp) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&form.email)?;
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if form.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        if self.lock().accounts.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let cost = self.bcrypt_cost;
        let password = form.password;
        let password_hash =
            tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        let user_id = Uuid::new_v4();
        {
            let mut state = self.lock();
            if state.accounts.contains_key(&email) {
                return Err(AuthError::AlreadyRegistered);
            }
            state.accounts.insert(
                email.clone(),
                Account {
                    user_id,
                    password_hash,
                },
            );
            state.profiles.insert(
                user_id,
                Profile {
                    user_id,
                    name: form.name.trim().to_string(),
                    college_name: form.college_name.trim().to_string(),
                    avatar_url: form.avatar_url.filter(|url| !url.trim().is_empty()),
                },
            );
        }
        info!(%user_id, "Account created");
        Ok(self.start_session(user_id, &email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidLogin)?;
        let (user_id, password_hash) = {
            let state = self.lock();
            let account = state.accounts.get(&email).ok_or(AuthError::InvalidLogin)?;
            (account.user_id, account.password_hash.clone())
        };

        let password = password.to_string();
        let valid =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash)).await??;
        if !valid {
            return Err(AuthError::InvalidLogin);
        }
        info!(%user_id, "Signed in");
        Ok(self.start_session(user_id, &email))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.lock().session.take();
        if let Some(session) = previous {
            info!(user_id = %session.user_id, "Signed out");
            self.emit(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let refreshed = {
            let mut state = self.lock();
            let session = state.session.as_mut().ok_or(AuthError::NotSignedIn)?;
            session.access_token = Uuid::new_v4().simple().to_string();
            session.issued_at = Utc::now();
            session.clone()
        };
        self.emit(AuthEvent::TokenRefreshed(refreshed.clone()));
        Ok(refreshed)
    }

    async fn current_session(&self) -> Option<AuthSession> {
        self.lock().session.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.lock().profiles.get(&user_id).cloned()
    }

    async fn record_result(&self, record: QuizRecord) -> Result<(), AuthError> {
        let mut state = self.lock();
        if !state.profiles.contains_key(&record.user_id) {
            return Err(AuthError::NotSignedIn);
        }
        debug!(user_id = %record.user_id, score = record.score, "Quiz result recorded");
        state.results.push(record);
        Ok(())
    }
}
