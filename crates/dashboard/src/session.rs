//! Authenticated session shared by every store and view.
//!
//! # Lifecycle
//!
//! 1. [`SessionStore::new`] starts in the loading state with no identity.
//! 2. [`SessionStore::init`] subscribes to the provider's auth events and
//!    spawns one listener task. The task first resolves any existing
//!    identity, then applies every auth event as it arrives.
//! 3. Views and stores read the current state or [`SessionStore::subscribe`]
//!    to changes.
//! 4. [`SessionStore::dispose`] (or dropping the last handle) stops the
//!    listener.
//!
//! The identity only ever changes in the listener. `sign_in`, `sign_up` and
//! `sign_out` call the provider and return; the resulting auth event is what
//! updates the state.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use restodash_core::{Email, UserId};
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::{AuthEvent, AuthProvider};
use crate::error::{DashboardError, Result};
use crate::models::{Identity, UserMetadata};

/// Snapshot of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Signed-in user, if any.
    pub identity: Option<Identity>,
    /// True until the initial identity has been resolved.
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            identity: None,
            is_loading: true,
        }
    }
}

/// Session service. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    auth: Arc<dyn AuthProvider>,
    state: watch::Sender<SessionState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl SessionStore {
    /// A session in the loading state. Call [`SessionStore::init`] next.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(SessionInner {
                auth,
                state,
                listener: Mutex::new(None),
            }),
        }
    }

    /// Start listening for auth events and resolve the initial identity.
    ///
    /// Calling it again while the listener runs does nothing, so there is
    /// never more than one subscription. Must be called inside a tokio
    /// runtime.
    pub fn init(&self) {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        // Subscribe before resolving so no event slips between the two
        let events = self.inner.auth.subscribe();
        let auth = Arc::clone(&self.inner.auth);
        let weak = Arc::downgrade(&self.inner);

        *listener = Some(tokio::spawn(listen(auth, events, weak)));
        debug!("Session listener started");
    }

    /// Stop the listener. The last state stays readable.
    pub fn dispose(&self) {
        if let Some(handle) = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            debug!("Session listener stopped");
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Signed-in user, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    /// ID of the signed-in user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.inner.state.borrow().identity.as_ref().map(|i| i.id)
    }

    /// True until the initial identity has been resolved.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Receive every future state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the state satisfies `predicate` and return that state.
    ///
    /// # Errors
    ///
    /// Never fails while this handle is alive; the sender lives in `self`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> Result<SessionState> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| DashboardError::Unauthenticated)?;
        Ok(state.clone())
    }

    /// Wait until the initial identity has been resolved.
    ///
    /// # Errors
    ///
    /// See [`SessionStore::wait_for`].
    pub async fn wait_until_resolved(&self) -> Result<SessionState> {
        self.wait_for(|s| !s.is_loading).await
    }

    /// The auth provider behind this session.
    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.inner.auth
    }

    /// Create an account. The identity is applied by the resulting auth event.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email, otherwise the
    /// provider's error. No retry.
    #[instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: UserMetadata,
    ) -> Result<Identity> {
        let email = Email::parse(email)?;
        let identity = self
            .inner
            .auth
            .sign_up(&email, password, metadata)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-up failed"))?;
        info!(user_id = %identity.id, "Signed up");
        Ok(identity)
    }

    /// Sign in. The identity is applied by the resulting auth event.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email, otherwise the
    /// provider's error. The current identity is left untouched.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity> {
        let email = Email::parse(email)?;
        let identity = self
            .inner
            .auth
            .sign_in(&email, password)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-in failed"))?;
        info!(user_id = %identity.id, "Signed in");
        Ok(identity)
    }

    /// Sign out. The identity is cleared by the resulting auth event.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the identity stays as it was.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.inner
            .auth
            .sign_out()
            .await
            .inspect_err(|e| warn!(error = %e, "Sign-out failed"))?;
        info!("Signed out");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Publish `identity` as the resolved state. Returns false once the store is
/// gone.
fn publish(weak: &Weak<SessionInner>, identity: Option<Identity>) -> bool {
    let Some(inner) = weak.upgrade() else {
        return false;
    };
    inner.state.send_replace(SessionState {
        identity,
        is_loading: false,
    });
    true
}

async fn resolve(auth: &Arc<dyn AuthProvider>) -> Option<Identity> {
    match auth.current_identity().await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Failed to resolve current identity");
            None
        }
    }
}

/// Listener task: resolve once, then apply auth events in arrival order.
///
/// Events raised while the initial resolution is in flight queue up in the
/// receiver and are applied after it, so the latest event always wins.
async fn listen(
    auth: Arc<dyn AuthProvider>,
    mut events: broadcast::Receiver<AuthEvent>,
    weak: Weak<SessionInner>,
) {
    let identity = resolve(&auth).await;
    debug!(signed_in = identity.is_some(), "Initial identity resolved");
    if !publish(&weak, identity) {
        return;
    }

    loop {
        let identity = match events.recv().await {
            Ok(event) => {
                debug!(?event, "Auth event");
                event.identity().cloned()
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed auth events; re-resolving identity");
                resolve(&auth).await
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if !publish(&weak, identity) {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryAuth;
    use crate::error::ValidationError;

    fn password(p: &str) -> SecretString {
        SecretString::from(p.to_string())
    }

    #[tokio::test]
    async fn test_loading_until_resolved() {
        let auth = MemoryAuth::new();
        let session = SessionStore::new(Arc::new(auth));
        assert!(session.is_loading());
        assert!(session.current_identity().is_none());

        session.init();
        let state = session.wait_until_resolved().await.unwrap();
        assert!(!state.is_loading);
        assert!(state.identity.is_none());
    }

    #[tokio::test]
    async fn test_resolves_existing_identity() {
        let auth = MemoryAuth::new();
        let email = Email::parse("owner@pizzaria.com").unwrap();
        auth.add_account(&email, "s3cret-pass").await;
        let existing = auth.sign_in(&email, &password("s3cret-pass")).await.unwrap();

        let session = SessionStore::new(Arc::new(auth));
        session.init();
        let state = session.wait_until_resolved().await.unwrap();
        assert_eq!(state.identity, Some(existing));
    }

    #[tokio::test]
    async fn test_resolution_failure_still_stops_loading() {
        let auth = MemoryAuth::new();
        auth.fail_next("offline").await;
        let session = SessionStore::new(Arc::new(auth));
        session.init();
        let state = session.wait_until_resolved().await.unwrap();
        assert!(state.identity.is_none());
    }

    #[tokio::test]
    async fn test_events_replace_identity() {
        let auth = MemoryAuth::new();
        let session = SessionStore::new(Arc::new(auth.clone()));
        session.init();
        session.wait_until_resolved().await.unwrap();

        let identity = session
            .sign_up("Owner@Pizzaria.com", &password("s3cret-pass"), UserMetadata::default())
            .await
            .unwrap();
        assert_eq!(identity.email, "owner@pizzaria.com");
        let state = session.wait_for(|s| s.identity.is_some()).await.unwrap();
        assert_eq!(state.identity.unwrap().id, identity.id);

        session.sign_out().await.unwrap();
        session.wait_for(|s| s.identity.is_none()).await.unwrap();
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_invalid_email_never_reaches_provider() {
        let session = SessionStore::new(Arc::new(MemoryAuth::new()));
        let err = session
            .sign_in("not-an-email", &password("whatever"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::Email(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_identity() {
        let auth = MemoryAuth::new();
        let session = SessionStore::new(Arc::new(auth.clone()));
        session.init();
        session
            .sign_up("owner@pizzaria.com", &password("s3cret-pass"), UserMetadata::default())
            .await
            .unwrap();
        session.wait_for(|s| s.identity.is_some()).await.unwrap();

        auth.fail_next("offline").await;
        assert!(session.sign_out().await.is_err());
        assert!(session.current_identity().is_some());
    }

    #[tokio::test]
    async fn test_init_is_idempotent_and_dispose_stops_updates() {
        let auth = MemoryAuth::new();
        let session = SessionStore::new(Arc::new(auth.clone()));
        session.init();
        session.init();
        session.wait_until_resolved().await.unwrap();

        session.dispose();
        let email = Email::parse("owner@pizzaria.com").unwrap();
        auth.add_account(&email, "s3cret-pass").await;
        auth.sign_in(&email, &password("s3cret-pass")).await.unwrap();
        tokio::task::yield_now().await;
        assert!(session.current_identity().is_none());
    }
}
