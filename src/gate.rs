//! Projects auth state, credential presence and quiz activity onto the view
//! the user should see.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{AuthBackend, AuthEvent};
use crate::credential::CredentialStore;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Landing,
    Login,
    CredentialEntry,
    Configure,
    Quiz,
}

pub fn route(authenticated: bool, has_credential: bool, quiz_active: bool) -> View {
    match (authenticated, has_credential, quiz_active) {
        (false, _, _) => View::Login,
        (true, false, _) => View::CredentialEntry,
        (true, true, false) => View::Configure,
        (true, true, true) => View::Quiz,
    }
}

#[derive(Debug, Default)]
struct GateState {
    authenticated: bool,
    quiz_active: bool,
    /// Set by a sign-out until the next sign-in.
    signed_out: bool,
}

struct GateInner {
    state: Mutex<GateState>,
    credentials: CredentialStore,
    view: watch::Sender<View>,
}

impl GateInner {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, event: AuthEvent) {
        debug!(event = event.kind(), "Gate received auth event");
        {
            let mut state = self.lock();
            match event {
                AuthEvent::InitialCheck(session) => state.authenticated = session.is_some(),
                AuthEvent::SignedIn(_) | AuthEvent::TokenRefreshed(_) => {
                    state.authenticated = true;
                    state.signed_out = false;
                }
                AuthEvent::SignedOut => {
                    state.authenticated = false;
                    state.quiz_active = false;
                    state.signed_out = true;
                    self.credentials.clear();
                }
            }
        }
        self.project();
    }

    fn project(&self) {
        let view = {
            let state = self.lock();
            if state.signed_out && !state.authenticated {
                View::Landing
            } else {
                route(
                    state.authenticated,
                    self.credentials.has_credential(),
                    state.quiz_active,
                )
            }
        };
        self.view.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            info!(from = ?*current, to = ?view, "View changed");
            *current = view;
            true
        });
    }
}

/// Session/auth gate. Subscribed to auth events until dropped.
pub struct Gate {
    inner: Arc<GateInner>,
    subscription: JoinHandle<()>,
}

impl Gate {
    /// Checks the current auth session once and subscribes to its changes.
    pub async fn start(auth: &impl AuthBackend, credentials: CredentialStore) -> Self {
        // Subscribe before the initial check so no change slips in between.
        let mut events = auth.subscribe();
        let initial = auth.current_session().await;

        let (view, _) = watch::channel(View::Login);
        let inner = Arc::new(GateInner {
            state: Mutex::new(GateState::default()),
            credentials,
            view,
        });
        inner.handle(AuthEvent::InitialCheck(initial));

        let listener = inner.clone();
        let subscription = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => listener.handle(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Gate missed auth events")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            inner,
            subscription,
        }
    }

    pub fn view(&self) -> View {
        *self.inner.view.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<View> {
        self.inner.view.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().authenticated
    }

    /// Applies an auth change the caller made itself, without waiting for
    /// the subscription to deliver it. Re-delivery of the same event is harmless.
    pub fn apply(&self, event: AuthEvent) {
        self.inner.handle(event);
    }

    pub fn set_quiz_active(&self, active: bool) {
        self.inner.lock().quiz_active = active;
        self.inner.project();
    }

    /// Re-projects after a local change such as a saved credential.
    pub fn refresh(&self) {
        self.inner.project();
    }
}

impl Drop for Gate {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::{LocalAuth, SignUp};
    use crate::credential::CREDENTIAL_KEY;
    use crate::store::{KeyValueStore, MemoryStore};

    async fn wait_for(gate: &Gate, expected: View) {
        let mut rx = gate.watch();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| *v == expected))
            .await
            .expect("view did not change in time")
            .expect("gate closed");
    }

    fn sign_up() -> SignUp {
        SignUp {
            email: "asha@example.com".to_string(),
            password: "hunter22".to_string(),
            name: "Asha".to_string(),
            college_name: String::new(),
            avatar_url: None,
        }
    }

    #[test]
    fn route_table() {
        assert_eq!(route(false, true, true), View::Login);
        assert_eq!(route(true, false, false), View::CredentialEntry);
        assert_eq!(route(true, false, true), View::CredentialEntry);
        assert_eq!(route(true, true, false), View::Configure);
        assert_eq!(route(true, true, true), View::Quiz);
    }

    #[tokio::test]
    async fn follows_auth_and_local_changes() {
        let auth = LocalAuth::new(4);
        let kv = Arc::new(MemoryStore::new());
        let credentials = CredentialStore::new(kv.clone());
        let gate = Gate::start(&auth, credentials.clone()).await;
        assert_eq!(gate.view(), View::Login);

        auth.sign_up(sign_up()).await.unwrap();
        wait_for(&gate, View::CredentialEntry).await;

        kv.set(CREDENTIAL_KEY, "gsk_stored").unwrap();
        gate.refresh();
        assert_eq!(gate.view(), View::Configure);

        gate.set_quiz_active(true);
        assert_eq!(gate.view(), View::Quiz);

        auth.sign_out().await.unwrap();
        wait_for(&gate, View::Landing).await;
        assert!(!credentials.has_credential());
        assert!(!gate.is_authenticated());

        auth.sign_in("asha@example.com", "hunter22").await.unwrap();
        wait_for(&gate, View::CredentialEntry).await;
    }

    #[tokio::test]
    async fn applied_sign_out_takes_effect_immediately() {
        let auth = LocalAuth::new(4);
        let session = auth.sign_up(sign_up()).await.unwrap();
        let kv = Arc::new(MemoryStore::new());
        kv.set(CREDENTIAL_KEY, "gsk_stored").unwrap();
        let credentials = CredentialStore::new(kv);
        let gate = Gate::start(&auth, credentials.clone()).await;
        gate.set_quiz_active(true);

        auth.sign_out().await.unwrap();
        gate.apply(AuthEvent::SignedOut);
        assert_eq!(gate.view(), View::Landing);
        assert!(!gate.is_authenticated());
        assert!(!credentials.has_credential());

        gate.apply(AuthEvent::SignedIn(session));
        assert!(gate.is_authenticated());
        assert_eq!(gate.view(), View::CredentialEntry);
    }

    #[tokio::test]
    async fn initial_check_sees_existing_session() {
        let auth = LocalAuth::new(4);
        auth.sign_up(sign_up()).await.unwrap();
        let kv = Arc::new(MemoryStore::new());
        kv.set(CREDENTIAL_KEY, "gsk_stored").unwrap();

        let gate = Gate::start(&auth, CredentialStore::new(kv)).await;
        assert_eq!(gate.view(), View::Configure);
    }

    #[tokio::test]
    async fn dropping_gate_unsubscribes() {
        let auth = LocalAuth::new(4);
        let gate = Gate::start(&auth, CredentialStore::new(Arc::new(MemoryStore::new()))).await;
        let subscription = gate.subscription.abort_handle();

        drop(gate);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert!(subscription.is_finished());
    }
}
