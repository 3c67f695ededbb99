//! # Session/Ownership Gate
//!
//! Tracks the signed-in user, refuses identity-requiring actions while
//! anonymous, and keeps the owner-scoped idea collection in step with the
//! session: reloaded on sign-in, cleared on sign-out.

use std::sync::{Arc, PoisonError, RwLock};

use ik_core::{AppError, AuthProvider, Credentials, Result, User};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::reconciler::{LoadReport, Reconciler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A gated action ran without a session; the UI should open sign-in.
    AuthRequired,
    SignedIn(User),
    SignedOut,
}

/// Result of a successful sign-in: the user and how the reload went.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub report: LoadReport,
}

pub struct SessionGate {
    auth: Arc<dyn AuthProvider>,
    reconciler: Arc<Reconciler>,
    current: RwLock<Option<User>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionGate {
    pub fn new(auth: Arc<dyn AuthProvider>, reconciler: Arc<Reconciler>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            auth,
            reconciler,
            current: RwLock::new(None),
            events,
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Runs `action` right away when signed in. Otherwise emits
    /// `AuthRequired` and returns `None` without running it.
    pub fn with_auth<R>(&self, action: impl FnOnce(&User) -> R) -> Option<R> {
        match self.current_user() {
            Some(user) => Some(action(&user)),
            None => {
                self.emit(SessionEvent::AuthRequired);
                None
            }
        }
    }

    /// `with_auth` for async flows: the user, or `AuthRequired`.
    pub fn require_user(&self) -> Result<User> {
        self.with_auth(User::clone).ok_or(AppError::AuthRequired)
    }

    /// Picks up a session persisted by the provider and loads its data.
    /// Public collections load either way.
    pub async fn restore(&self) -> Result<LoadReport> {
        match self.auth.current_user().await? {
            Some(user) => Ok(self.establish(user).await.report),
            None => Ok(self.reconciler.load_all(None).await),
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SignedIn> {
        let user = self.auth.sign_in(credentials).await?;
        Ok(self.establish(user).await)
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignedIn> {
        let user = self.auth.sign_up(credentials).await?;
        Ok(self.establish(user).await)
    }

    pub async fn sign_in_with_provider(&self, provider: &str) -> Result<SignedIn> {
        let user = self.auth.sign_in_with_provider(provider).await?;
        Ok(self.establish(user).await)
    }

    /// Clears owner-scoped ideas immediately, then ends the provider session.
    /// Showcase and forum collections are left alone.
    pub async fn sign_out(&self) -> Result<()> {
        self.reconciler.clear_local_ideas();
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.emit(SessionEvent::SignedOut);
        if let Some(user) = previous {
            info!(user_id = %user.id, "Signed out");
        }
        self.auth.sign_out().await.inspect_err(|e| {
            warn!(error = %e, "Provider sign-out failed; local session already cleared")
        })
    }

    async fn establish(&self, user: User) -> SignedIn {
        let switched = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let switched = current.as_ref().is_some_and(|u| u.id != user.id);
            *current = Some(user.clone());
            switched
        };
        if switched {
            // Another identity's ideas must not survive the switch.
            self.reconciler.clear_local_ideas();
        }
        info!(user_id = %user.id, "Signed in");
        self.emit(SessionEvent::SignedIn(user.clone()));
        let report = self.reconciler.load_all(Some(&user.id)).await;
        SignedIn { user, report }
    }

    fn emit(&self, event: SessionEvent) {
        // No receiver is not an error.
        let _ = self.events.send(event);
    }
}
