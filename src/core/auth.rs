use anyhow::{Context, Result};

use crate::core::api::CursorApi;
use crate::core::mapper;
use crate::core::models::credentials::Credentials;
use crate::core::session::AppSession;
use crate::core::store::{self, Store, StoreKey};

const SESSION_COOKIE: &str = "WorkosCursorSessionToken";

/// Turn whatever the user pasted into a Cookie header value.
/// A bare token is wrapped as the session cookie; a full header is kept.
pub fn normalize_cookie(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("Cookie:")
        .or_else(|| trimmed.strip_prefix("cookie:"))
        .map(str::trim)
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        anyhow::bail!("Empty cookie");
    }
    if trimmed.contains('=') {
        return Ok(trimmed.to_string());
    }
    Ok(format!("{}={}", SESSION_COOKIE, trimmed))
}

/// Verify the cookie against who-am-I, then store and publish the
/// resulting credentials.
pub async fn login(
    api: &dyn CursorApi,
    store: &dyn Store,
    session: &AppSession,
    raw_cookie: &str,
) -> Result<Credentials> {
    let cookie = normalize_cookie(raw_cookie)?;
    let me = api
        .me(&cookie)
        .await
        .context("Could not verify the session cookie")?;
    let credentials = mapper::map_credentials(&me, &cookie)
        .context("Unexpected who-am-I response")?;

    store::save_typed(store, StoreKey::Credentials, &credentials)
        .await
        .context("Failed to save credentials")?;
    // A snapshot from another account must not show up under this one.
    if session.snapshot().is_some_and(|s| s.email != credentials.email) {
        session.publish(None);
        store.clear(StoreKey::Snapshot).await?;
    }
    session.set_credentials(Some(credentials.clone()));
    tracing::info!("Logged in as {}", credentials.email);
    Ok(credentials)
}

pub async fn logout(store: &dyn Store, session: &AppSession) -> Result<()> {
    session.clear();
    for key in [StoreKey::Credentials, StoreKey::Snapshot] {
        store
            .clear(key)
            .await
            .with_context(|| format!("Failed to clear {}", key.as_str()))?;
    }
    tracing::info!("Logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::ApiError;
    use crate::core::testing::{snapshot, MemoryStore, MockApi, USER_ID};

    #[test]
    fn bare_token_becomes_session_cookie() {
        assert_eq!(
            normalize_cookie("  abc123 ").unwrap(),
            "WorkosCursorSessionToken=abc123"
        );
    }

    #[test]
    fn full_header_is_kept() {
        assert_eq!(
            normalize_cookie("Cookie: a=1; WorkosCursorSessionToken=x").unwrap(),
            "a=1; WorkosCursorSessionToken=x"
        );
        assert!(normalize_cookie("   ").is_err());
    }

    #[tokio::test]
    async fn login_stores_and_publishes_credentials() {
        let api = MockApi::new("pro");
        let store = MemoryStore::new();
        let session = AppSession::new();

        let credentials = login(&api, &store, &session, "tok").await.unwrap();
        assert_eq!(credentials.user_id, USER_ID);
        assert_eq!(credentials.cookie_header, "WorkosCursorSessionToken=tok");
        assert_eq!(session.credentials(), Some(credentials.clone()));
        let stored: Option<Credentials> = store::load_typed(&store, StoreKey::Credentials).await;
        assert_eq!(stored, Some(credentials));
    }

    #[tokio::test]
    async fn login_drops_snapshot_of_another_account() {
        let api = MockApi::new("pro");
        let store = MemoryStore::new();
        let session = AppSession::new();
        session.publish(Some(snapshot("someone@else.io")));

        login(&api, &store, &session, "tok").await.unwrap();
        assert!(session.snapshot().is_none());
    }

    #[tokio::test]
    async fn expired_cookie_is_reported() {
        let api = MockApi::new("pro");
        api.expire_session();
        let store = MemoryStore::new();
        let session = AppSession::new();

        let err = login(&api, &store, &session, "tok").await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();
        assert!(api_err.is_session_expired());
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let api = MockApi::new("pro");
        let store = MemoryStore::new();
        let session = AppSession::new();
        login(&api, &store, &session, "tok").await.unwrap();

        logout(&store, &session).await.unwrap();
        assert!(!session.is_logged_in());
        assert!(store.load(StoreKey::Credentials).await.is_none());
    }
}
