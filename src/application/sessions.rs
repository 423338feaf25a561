use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{DomainError, Session};

pub type SessionHandle = Arc<Mutex<Session>>;

/// Process-local registry of live sessions.
///
/// Gather and answer both read-modify-write a session, so each session is
/// guarded by its own async mutex. The policy for a second gather/answer
/// arriving while one is in flight is rejection: `acquire` fails fast with
/// a concurrency violation instead of queueing silently. Calls against
/// different sessions never contend.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `id`, creating the session on first use.
    /// The question is only set at creation; later calls reuse whatever
    /// the session already holds.
    pub fn get_or_create(&self, id: Uuid, question: &str) -> SessionHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(id)
            .or_insert_with(|| {
                let mut session = Session::new(question);
                session.id = id;
                Arc::new(Mutex::new(session))
            })
            .clone()
    }

    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).cloned()
    }

    /// Exclusive access for one gather/answer call. Fails immediately when
    /// another call holds the session.
    pub fn acquire(&self, handle: &SessionHandle) -> Result<OwnedMutexGuard<Session>, DomainError> {
        handle.clone().try_lock_owned().map_err(|_| {
            DomainError::concurrency("another gather or answer call is running on this session")
        })
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
