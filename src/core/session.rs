//! Shared session state: the logged-in credentials and the latest snapshot.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::core::models::credentials::Credentials;
use crate::core::models::snapshot::DashboardSnapshot;
use crate::core::store::{self, Store, StoreKey};

struct Inner {
    credentials: RwLock<Option<Credentials>>,
    snapshot: watch::Sender<Option<DashboardSnapshot>>,
}

/// Cloneable handle; clones share the same state.
#[derive(Clone)]
pub struct AppSession {
    inner: Arc<Inner>,
}

impl Default for AppSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AppSession {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                credentials: RwLock::new(None),
                snapshot,
            }),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match self.inner.credentials.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        match self.inner.credentials.write() {
            Ok(mut guard) => *guard = credentials,
            Err(poisoned) => *poisoned.into_inner() = credentials,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Replace the snapshot as a whole and notify subscribers.
    pub fn publish(&self, snapshot: Option<DashboardSnapshot>) {
        self.inner.snapshot.send_replace(snapshot);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardSnapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// Fill an empty session from persisted records. Fields that are already
    /// set are left alone.
    pub async fn bootstrap(&self, store: &dyn Store) {
        if self.credentials().is_none() {
            if let Some(credentials) = store::load_typed(store, StoreKey::Credentials).await {
                tracing::debug!("Restored credentials from store");
                self.set_credentials(Some(credentials));
            }
        }
        if self.snapshot().is_none() {
            if let Some(snapshot) = store::load_typed(store, StoreKey::Snapshot).await {
                tracing::debug!("Restored last snapshot from store");
                self.publish(Some(snapshot));
            }
        }
    }

    pub fn clear(&self) {
        self.set_credentials(None);
        self.publish(None);
    }
}
