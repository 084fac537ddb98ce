//! The provider API key, kept in the local key-value store.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use crate::error::CredentialError;
use crate::store::KeyValueStore;

/// Key under which the credential is persisted.
pub const CREDENTIAL_KEY: &str = "GROQ_API_KEY";
pub const CREDENTIAL_PREFIX: &str = "gsk_";
pub const CREDENTIAL_LENGTH: usize = 48;

static CREDENTIAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^{CREDENTIAL_PREFIX}[A-Za-z0-9]{{{CREDENTIAL_LENGTH}}}$"
    ))
    .expect("credential pattern is a valid regex")
});

/// Liveness check run against the provider before a key is accepted.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> impl Future<Output = Result<(), CredentialError>> + Send;
}

pub fn matches_format(token: &str) -> bool {
    CREDENTIAL_PATTERN.is_match(token)
}

#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Validates, checks and persists a user supplied key.
    ///
    /// Format problems are reported before any network call is made.
    pub async fn submit(
        &self,
        raw_input: &str,
        verifier: &impl CredentialVerifier,
    ) -> Result<(), CredentialError> {
        let token = raw_input.trim();
        if token.is_empty() {
            return Err(CredentialError::EmptyInput);
        }
        if !matches_format(token) {
            return Err(CredentialError::Format);
        }

        verifier.verify(token).await?;

        self.store.set(CREDENTIAL_KEY, token)?;
        info!("API key saved");
        Ok(())
    }

    pub fn credential(&self) -> Option<String> {
        match self.store.get(CREDENTIAL_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read stored API key");
                None
            }
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn clear(&self) {
        match self.store.clear(CREDENTIAL_KEY) {
            Ok(()) => info!("API key cleared"),
            Err(e) => warn!(error = %e, "Could not clear stored API key"),
        }
    }
}
