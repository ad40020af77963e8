//! Cookie-keyed in-memory session store.
//!
//! Each session sits behind its own mutex; a request holds it for its whole
//! mutate-and-render cycle, so one session never sees concurrent mutation.
//! The outer map lock is only held for lookup and insert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, header};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::banking::Session;

pub const SESSION_COOKIE: &str = "banking_session";

/// How often the background sweep drops idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub type SharedSession = Arc<Mutex<Session>>;

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    history_window: usize,
    /// Sessions untouched for this long are dropped.
    idle_timeout: Duration,
}

/// A session looked up (or created) for one request.
pub struct ResolvedSession {
    pub id: Uuid,
    pub session: SharedSession,
    /// True when the cookie must be (re)issued.
    pub created: bool,
}

impl SessionStore {
    pub fn new(history_window: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_window,
            idle_timeout,
        }
    }

    /// Fetch a live session and mark it as seen. Expired sessions are removed.
    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.touch(id, Instant::now()).await
    }

    async fn touch(&self, id: Uuid, now: Instant) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        if now.saturating_duration_since(entry.last_seen) >= self.idle_timeout {
            sessions.remove(&id);
            debug!(session = %id, "Session expired");
            return None;
        }
        entry.last_seen = now;
        Some(Arc::clone(&entry.session))
    }

    /// Look up the session for `id`, creating a fresh one if it is unknown
    /// or has expired.
    pub async fn resolve(&self, id: Option<Uuid>) -> ResolvedSession {
        self.resolve_at(id, Instant::now()).await
    }

    async fn resolve_at(&self, id: Option<Uuid>, now: Instant) -> ResolvedSession {
        if let Some(id) = id {
            if let Some(session) = self.touch(id, now).await {
                return ResolvedSession {
                    id,
                    session,
                    created: false,
                };
            }
        }

        let session = Session::new(self.history_window);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        {
            let mut sessions = self.sessions.write().await;
            self.evict_idle(&mut sessions, now);
            sessions.insert(
                id,
                Entry {
                    session: Arc::clone(&shared),
                    last_seen: now,
                },
            );
        }
        debug!(session = %id, "Session created");
        ResolvedSession {
            id,
            session: shared,
            created: true,
        }
    }

    /// Drop every session idle for at least the timeout. Returns how many went.
    pub async fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now()).await
    }

    async fn prune_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now)
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Spawn the background task that prunes idle sessions every minute.
pub fn spawn_sweep_task(store: Arc<SessionStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            store.prune_idle().await;
        }
    })
}

/// Read the session id from the `Cookie` header(s).
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}
