use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::quiz::{Session, UserKey};

/// Per-user session storage owned by the engine.
pub trait SessionStore: Send + Sync {
    /// Stores `session` for `user`, returning the one it replaced.
    fn insert(&self, user: UserKey, session: Session) -> Option<Session>;

    /// Runs `f` on the user's slot as one atomic step. Leaving the slot
    /// `None` removes the session.
    fn modify<R, F>(&self, user: UserKey, f: F) -> R
    where
        F: FnOnce(&mut Option<Session>) -> R;

    fn contains(&self, user: UserKey) -> bool;

    fn len(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserKey, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still guards consistent sessions.
    fn lock(&self) -> MutexGuard<'_, HashMap<UserKey, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, user: UserKey, session: Session) -> Option<Session> {
        self.lock().insert(user, session)
    }

    fn modify<R, F>(&self, user: UserKey, f: F) -> R
    where
        F: FnOnce(&mut Option<Session>) -> R,
    {
        let mut sessions = self.lock();
        let mut slot = sessions.remove(&user);
        let result = f(&mut slot);
        if let Some(session) = slot {
            sessions.insert(user, session);
        }
        result
    }

    fn contains(&self, user: UserKey) -> bool {
        self.lock().contains_key(&user)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
