//! In-memory sliding session store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionValidator};

/// Sessions kept in process memory.
///
/// A session stays valid while it is used at least once per `lifetime`; each
/// successful validation moves its last-active time forward.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    lifetime: Duration,
}

impl MemorySessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Open a session for `user` under a fresh random token.
    pub fn start(&self, user: impl Into<String>, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session::new(token, user, now)?;

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoreUnavailable)?;
        sessions.insert(session.token().to_string(), session.clone());

        tracing::debug!(user = session.user(), "session started");
        Ok(session)
    }

    /// Forget a session. Returns whether it existed.
    pub fn end(&self, token: &str) -> bool {
        match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(token).is_some(),
            Err(_) => false,
        }
    }

    /// Drop every session idle for longer than the lifetime.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let before = sessions.len();
        let lifetime = self.lifetime;
        sessions.retain(|_, s| !expired(s, now, lifetime));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expired(session: &Session, now: DateTime<Utc>, lifetime: Duration) -> bool {
    now - session.last_active() > lifetime
}

impl SessionValidator for MemorySessionStore {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = match self.sessions.write() {
            Ok(sessions) => sessions,
            Err(_) => {
                tracing::warn!("session store lock poisoned; rejecting token");
                return None;
            }
        };

        if expired(sessions.get(token)?, now, self.lifetime) {
            sessions.remove(token);
            return None;
        }

        let session = sessions.get_mut(token)?;
        session.touch(now);
        Some(session.clone())
    }
}
