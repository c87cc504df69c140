//! Per-session conversation memories.
//!
//! Each session gets its own [`ConversationMemory`] behind its own mutex, so
//! sessions never share state and a session's turns run one at a time.

use crate::window::ConversationMemory;
use paperchat_core::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Shared handle to one session's memory.
pub type SharedMemory = Arc<Mutex<ConversationMemory>>;

struct SessionEntry {
    memory: SharedMemory,
    last_used: Instant,
}

/// Sessions keyed by id, bounded at `max_sessions`.
///
/// When full, the least recently used session is dropped to make room.
pub struct SessionStore {
    max_messages: usize,
    max_sessions: usize,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionStore {
    pub fn new(max_messages: usize, max_sessions: usize) -> Self {
        Self {
            max_messages,
            max_sessions: max_sessions.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Capacity given to every new session's memory.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Return the session's memory, creating an empty one if needed.
    pub async fn get_or_create(&self, id: &SessionId) -> SharedMemory {
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = Instant::now();
            return entry.memory.clone();
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!(session = %oldest, "Evicted least recently used session");
            }
        }

        let memory = Arc::new(Mutex::new(ConversationMemory::new(self.max_messages)));
        sessions.insert(
            id.clone(),
            SessionEntry {
                memory: memory.clone(),
                last_used: Instant::now(),
            },
        );
        tracing::debug!(session = %id, "Created session");
        memory
    }

    /// Return an existing session's memory.
    pub async fn get(&self, id: &SessionId) -> Option<SharedMemory> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(|entry| {
            entry.last_used = Instant::now();
            entry.memory.clone()
        })
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
