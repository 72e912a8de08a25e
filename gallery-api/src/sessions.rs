//! Server-side filter sessions
//!
//! Each session owns one `FilterSession` behind its own mutex, so toggles
//! against the same selection are applied one at a time and sessions never
//! share mutable state. The registry map itself is only write-locked to add
//! or remove sessions.

use chrono::{DateTime, Utc};
use gallery_common::{AssociationStore, CategoryVocabulary, FilterSession};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{ApiError, ApiResult};

/// One browsing session's filter state
#[derive(Debug)]
pub struct SessionEntry {
    pub filter: FilterSession,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionEntry {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            filter: FilterSession::new(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

pub type SessionHandle = Arc<Mutex<SessionEntry>>;

/// Registry of live filter sessions keyed by id
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Open a session and run its initial load.
    ///
    /// Categories and items are fetched in parallel and both must finish
    /// before the session is handed out. A failed load still yields a
    /// session; its frame carries the error.
    pub async fn create(&self, store: &dyn AssociationStore) -> (Uuid, SessionHandle) {
        self.prune_idle().await;

        let mut entry = SessionEntry::new();
        load(&mut entry.filter, store).await;

        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(entry));
        self.sessions.write().await.insert(id, handle.clone());
        info!(session = %id, "Opened filter session");
        (id, handle)
    }

    /// Look up a live session.
    ///
    /// A session idle past the timeout is expired on access: it is removed and
    /// reported as not found. A session whose lock is held is in use and
    /// counts as live.
    pub async fn get(&self, id: Uuid) -> ApiResult<SessionHandle> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound(id))?;

        let expired = match (handle.try_lock(), self.cutoff()) {
            (Ok(entry), Some(cutoff)) => entry.last_active < cutoff,
            _ => false,
        };
        if expired {
            self.sessions.write().await.remove(&id);
            info!(session = %id, "Expired idle filter session");
            return Err(ApiError::SessionNotFound(id));
        }
        Ok(handle)
    }

    pub async fn remove(&self, id: Uuid) -> ApiResult<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!(session = %id, "Closed filter session");
                Ok(())
            }
            None => Err(ApiError::SessionNotFound(id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle longer than the timeout; returns how many were removed.
    ///
    /// A session whose lock is held is in use and is never pruned.
    pub async fn prune_idle(&self) -> usize {
        let Some(cutoff) = self.cutoff() else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(entry) if entry.last_active < cutoff => {
                debug!(session = %id, "Expiring idle filter session");
                false
            }
            _ => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Pruned idle filter sessions");
        }
        removed
    }

    /// Prune idle sessions every `period` until the runtime shuts down
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.prune_idle().await;
            }
        })
    }

    /// Sessions last active before this instant are expired
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let idle = chrono::Duration::from_std(self.idle_timeout).ok()?;
        Utc::now().checked_sub_signed(idle)
    }
}

/// Fetch categories and items, applying them only if both succeed.
///
/// On failure the previous state stays in place and the error is recorded
/// on the session so the next frame can show it.
pub async fn load(filter: &mut FilterSession, store: &dyn AssociationStore) {
    let (categories, items) = tokio::join!(store.list_categories(), store.list_items(None));

    match (categories, items) {
        (Ok(categories), Ok(items)) => {
            debug!(
                categories = categories.len(),
                items = items.len(),
                "Loaded filter data"
            );
            filter.set_vocabulary(CategoryVocabulary::new(categories));
            filter.set_items(items);
            filter.set_error(None);
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(backend = store.backend_name(), error = %e, "Filter data load failed");
            filter.set_error(Some(e.to_string()));
        }
    }
}
