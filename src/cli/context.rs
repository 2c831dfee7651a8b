use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::api::CursorClient;
use crate::core::config::AppConfig;
use crate::core::models::settings::AppSettings;
use crate::core::session::AppSession;
use crate::core::store::{self, FileStore, StoreKey};

/// Everything a command needs, wired from the config file.
pub struct AppContext {
    pub store: Arc<FileStore>,
    pub session: AppSession,
    pub api: Arc<CursorClient>,
}

impl AppContext {
    pub async fn load(config: &AppConfig) -> Result<Self> {
        let api = CursorClient::new(&config.api.base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.api.base_url))?;
        let store = Arc::new(FileStore::new(config.data_dir()));
        tracing::debug!("Using data directory {}", store.dir().display());
        let session = AppSession::new();
        session.bootstrap(store.as_ref()).await;
        Ok(Self {
            store,
            session,
            api: Arc::new(api),
        })
    }

    pub async fn settings(&self) -> AppSettings {
        store::load_typed(self.store.as_ref(), StoreKey::Settings)
            .await
            .unwrap_or_default()
    }

    pub fn require_login(&self) -> Result<()> {
        if !self.session.is_logged_in() {
            anyhow::bail!("Not logged in. Run `vv login --cookie <cookie>` first.");
        }
        Ok(())
    }
}
