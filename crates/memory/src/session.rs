//! Per-user session store.
//!
//! The map itself sits behind a short-lived `RwLock`; each session sits behind
//! its own `tokio::sync::Mutex`, held for a whole conversation turn. Turns for
//! different users never wait on each other, while turns for the same user run
//! one at a time.

use crate::history::{ConversationHistory, DEFAULT_HISTORY_CAP};
use finguru_core::profile::UserProfile;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Everything remembered about one user.
#[derive(Debug)]
pub struct Session {
    pub history: ConversationHistory,
    pub profile: UserProfile,
    /// Set once the session has been removed by a reset. A holder that
    /// acquired the lock afterwards must not write into it.
    retired: bool,
}

impl Session {
    fn new(history_cap: usize) -> Self {
        Self {
            history: ConversationHistory::new(history_cap),
            profile: UserProfile::new(),
            retired: false,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

type SessionHandle = Arc<Mutex<Session>>;

/// Process-lifetime map of user id to session.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    history_cap: usize,
}

impl SessionStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_cap,
        }
    }

    async fn handle(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(user_id).cloned()
    }

    async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        if let Some(handle) = self.handle(user_id).await {
            return handle;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating session");
                Arc::new(Mutex::new(Session::new(self.history_cap)))
            })
            .clone()
    }

    /// Exclusively lock the session for `user_id`, creating it if needed.
    ///
    /// The returned guard owns the lock, so it can be held across awaits
    /// without borrowing the store.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<Session> {
        loop {
            let guard = self.get_or_create(user_id).await.lock_owned().await;
            if !guard.retired {
                return guard;
            }
            // Reset won the race while we waited; pick up the fresh entry.
        }
    }

    /// Lock an existing session without creating one.
    pub async fn lock_existing(&self, user_id: &str) -> Option<OwnedMutexGuard<Session>> {
        let guard = self.handle(user_id).await?.lock_owned().await;
        (!guard.retired).then_some(guard)
    }

    /// Remove the session for `user_id`. Absent ids are a no-op.
    ///
    /// Waits for any in-flight turn on that session to finish first.
    pub async fn reset(&self, user_id: &str) {
        let Some(handle) = self.handle(user_id).await else {
            return;
        };
        let mut session = handle.lock().await;
        if session.retired {
            return;
        }
        session.retired = true;
        session.history.clear();
        session.profile = UserProfile::new();

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(user_id)
            .is_some_and(|current| Arc::ptr_eq(current, &handle))
        {
            sessions.remove(user_id);
        }
        debug!(user_id, "Session reset");
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
