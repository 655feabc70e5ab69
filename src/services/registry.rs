//! Session Registry
//!
//! Concurrent map of active sessions. Humans hold at most one primary
//! session; every bot registration creates a fresh session with its own
//! key. Deletion is idempotent and stops the session's scheduler.

use crate::services::{Catalog, Session, SessionOwner};
use crate::types::{SessionConfig, SessionSnapshot, BOT_COMMISSION_RATE, BOT_STARTING_CAPITAL};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

/// Sessions idle longer than this are reaped.
pub const IDLE_SESSION_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// A registered bot and its order credential.
#[derive(Debug, Clone, Serialize)]
pub struct BotRecord {
    pub bot_id: String,
    /// Secret presented with every bot order
    pub bot_key: String,
    pub session_id: String,
    pub name: String,
    #[serde(with = "crate::types::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A session plus its scheduler stop signal. All in-session state is
/// guarded by the single mutex here; critical sections are O(1) and never
/// held across await points.
pub struct SessionHandle {
    pub id: String,
    session: Mutex<Session>,
    stop_tx: broadcast::Sender<()>,
    last_activity: Mutex<Instant>,
}

impl SessionHandle {
    fn new(session: Session) -> Arc<Self> {
        let (stop_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            id: session.id.clone(),
            session: Mutex::new(session),
            stop_tx,
            last_activity: Mutex::new(Instant::now()),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("session lock poisoned")
    }

    /// Record owner activity; idle sessions are eventually reaped.
    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .expect("activity lock poisoned") = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .expect("activity lock poisoned")
            .elapsed()
    }

    /// Receiver resolving when the scheduler should stop.
    pub fn stop_signal(&self) -> broadcast::Receiver<()> {
        self.stop_tx.subscribe()
    }

    pub fn stop_scheduler(&self) {
        let _ = self.stop_tx.send(());
    }
}

/// Concurrent registry of all live sessions.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
    primary_by_user: DashMap<String, String>,
    bots: DashMap<String, BotRecord>,
    catalog: Arc<Catalog>,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<Catalog>) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            primary_by_user: DashMap::new(),
            bots: DashMap::new(),
            catalog,
        })
    }

    fn insert_session(&self, session: Session) -> Arc<SessionHandle> {
        let handle = SessionHandle::new(session);
        self.sessions.insert(handle.id.clone(), handle.clone());
        handle
    }

    /// Create the server-owned reference session that drives the shared
    /// market feed.
    pub fn create_system_session(&self) -> Arc<SessionHandle> {
        let session = Session::new(
            Uuid::new_v4().to_string(),
            SessionOwner::System,
            SessionConfig::default(),
            self.catalog.clone(),
            rand::thread_rng().gen(),
        );
        info!(session = %session.id, "reference session created");
        self.insert_session(session)
    }

    /// Create (or replace) a user's primary session. Any previous primary
    /// session is removed; its handle is returned so the caller can roll up
    /// stats.
    pub fn create_user_session(
        &self,
        user_id: &str,
        config: SessionConfig,
    ) -> (Arc<SessionHandle>, Option<Arc<SessionHandle>>) {
        let previous = self
            .primary_by_user
            .get(user_id)
            .map(|id| id.clone())
            .and_then(|id| self.delete(&id));

        let session = Session::new(
            Uuid::new_v4().to_string(),
            SessionOwner::User(user_id.to_string()),
            config,
            self.catalog.clone(),
            rand::thread_rng().gen(),
        );
        info!(session = %session.id, user = user_id, "user session created");
        let handle = self.insert_session(session);
        self.primary_by_user
            .insert(user_id.to_string(), handle.id.clone());
        (handle, previous)
    }

    /// Restore a user's primary session from a snapshot.
    pub fn restore_user_session(
        &self,
        user_id: &str,
        snapshot: SessionSnapshot,
    ) -> (Arc<SessionHandle>, Option<Arc<SessionHandle>>) {
        let previous = self
            .primary_by_user
            .get(user_id)
            .map(|id| id.clone())
            .and_then(|id| self.delete(&id));

        let session = Session::restore(
            Uuid::new_v4().to_string(),
            SessionOwner::User(user_id.to_string()),
            snapshot,
            self.catalog.clone(),
            rand::thread_rng().gen(),
        );
        info!(session = %session.id, user = user_id, "user session restored");
        let handle = self.insert_session(session);
        self.primary_by_user
            .insert(user_id.to_string(), handle.id.clone());
        (handle, previous)
    }

    /// Register a bot: fresh session, fresh credential, 100k starting cash,
    /// bot-path commission.
    pub fn create_bot(&self, name: &str) -> (BotRecord, Arc<SessionHandle>) {
        let bot_id = Uuid::new_v4().to_string();
        let config = SessionConfig {
            starting_capital: BOT_STARTING_CAPITAL,
            commission_rate: BOT_COMMISSION_RATE,
            ..SessionConfig::default()
        };
        let session = Session::new(
            Uuid::new_v4().to_string(),
            SessionOwner::Bot(bot_id.clone()),
            config,
            self.catalog.clone(),
            rand::thread_rng().gen(),
        );
        let handle = self.insert_session(session);

        let record = BotRecord {
            bot_id: bot_id.clone(),
            bot_key: Uuid::new_v4().to_string(),
            session_id: handle.id.clone(),
            name: name.to_string(),
            created_at: crate::types::timestamp::now(),
        };
        self.bots.insert(bot_id.clone(), record.clone());
        info!(bot = %bot_id, session = %handle.id, "bot registered");
        (record, handle)
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|h| h.clone())
    }

    pub fn primary_for_user(&self, user_id: &str) -> Option<Arc<SessionHandle>> {
        self.primary_by_user
            .get(user_id)
            .and_then(|id| self.get(&id))
    }

    pub fn bot(&self, bot_id: &str) -> Option<BotRecord> {
        self.bots.get(bot_id).map(|b| b.clone())
    }

    /// Resolve a bot's session after verifying its key.
    pub fn bot_session(&self, bot_id: &str, bot_key: &str) -> Option<Arc<SessionHandle>> {
        let record = self.bot(bot_id)?;
        if record.bot_key != bot_key {
            return None;
        }
        self.get(&record.session_id)
    }

    /// All registered bots.
    pub fn bots(&self) -> Vec<BotRecord> {
        self.bots.iter().map(|b| b.clone()).collect()
    }

    /// Remove a session, stopping its scheduler. Idempotent; returns the
    /// removed handle when there was one.
    pub fn delete(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let (_, handle) = self.sessions.remove(session_id)?;
        handle.stop_scheduler();

        self.primary_by_user
            .retain(|_, primary_id| primary_id != session_id);
        self.bots.retain(|_, bot| bot.session_id != session_id);
        info!(session = %session_id, "session deleted");
        Some(handle)
    }

    /// Consistent snapshot of all live handles for iteration.
    pub fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.iter().map(|h| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stop every scheduler; used at graceful shutdown.
    pub fn stop_all(&self) {
        for handle in self.sessions.iter() {
            handle.stop_scheduler();
        }
    }

    /// Remove sessions idle past `max_idle`. The system session never
    /// expires. Returns the reaped handles so callers can roll up stats.
    pub fn reap_idle(&self, max_idle: Duration) -> Vec<Arc<SessionHandle>> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|handle| {
                handle.idle_for() > max_idle
                    && !matches!(handle.lock().owner, SessionOwner::System)
            })
            .map(|handle| handle.id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| {
                info!(session = %id, "reaping idle session");
                self.delete(id)
            })
            .collect()
    }
}
