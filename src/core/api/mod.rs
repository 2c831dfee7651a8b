//! Upstream dashboard API: the client contract the refresh engine consumes
//! and its reqwest implementation.

pub mod client;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use client::CursorClient;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403 from any endpoint. Callers that can prompt for a new login
    /// match on this variant.
    #[error("Session expired (HTTP {status}), please log in again")]
    SessionExpired { status: u16 },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Classify a non-success HTTP status.
    pub fn from_failure(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::SessionExpired { status },
            _ => Self::Http { status, body },
        }
    }
}

/// Body of the filtered usage events listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub team_id: i64,
    pub user_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedEventsQuery {
    pub team_id: i64,
    pub start_date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSpendQuery {
    pub team_id: i64,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_direction: String,
}

impl TeamSpendQuery {
    pub fn page(team_id: i64, page: u32) -> Self {
        Self {
            team_id,
            page,
            page_size: 100,
            sort_by: "name".to_string(),
            sort_direction: "asc".to_string(),
        }
    }
}

/// Calendar-day range (`YYYY-MM-DD`) for team analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    pub team_id: i64,
    pub start_date: String,
    pub end_date: String,
}

/// One async call per upstream endpoint. Every call replays the session
/// cookie and hands back the raw JSON payload for the response mapper.
#[async_trait]
pub trait CursorApi: Send + Sync {
    async fn me(&self, cookie: &str) -> Result<Value, ApiError>;
    async fn usage_summary(&self, cookie: &str) -> Result<Value, ApiError>;
    async fn filtered_usage_events(
        &self,
        cookie: &str,
        query: &EventsQuery,
    ) -> Result<Value, ApiError>;
    async fn aggregated_usage_events(
        &self,
        cookie: &str,
        query: &AggregatedEventsQuery,
    ) -> Result<Value, ApiError>;
    async fn current_billing_cycle(&self, cookie: &str) -> Result<Value, ApiError>;
    async fn team_spend(&self, cookie: &str, query: &TeamSpendQuery) -> Result<Value, ApiError>;
    async fn team_models_analytics(
        &self,
        cookie: &str,
        query: &AnalyticsQuery,
    ) -> Result<Value, ApiError>;
    /// Legacy usage map keyed by model name.
    async fn usage_by_model(&self, cookie: &str, workos_id: &str) -> Result<Value, ApiError>;
}
