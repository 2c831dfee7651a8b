use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::api::{
    AggregatedEventsQuery, AnalyticsQuery, ApiError, CursorApi, EventsQuery, TeamSpendQuery,
};

pub const DEFAULT_BASE_URL: &str = "https://cursor.com";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Validate that a base URL uses HTTPS before any cookie is sent to it.
/// Plain HTTP is only accepted for loopback hosts.
pub fn validate_endpoint(url: &str) -> anyhow::Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| anyhow::anyhow!("API base URL is not a valid URL ({}): {}", e, url))?;
    let loopback = matches!(
        parsed.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    );
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        _ => anyhow::bail!("API base URL must use HTTPS, got: {}", url),
    }
}

/// reqwest-backed [`CursorApi`].
pub struct CursorClient {
    http: reqwest::Client,
    base_url: String,
}

impl CursorClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        validate_endpoint(base_url)?;
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn decorate(&self, request: reqwest::RequestBuilder, cookie: &str) -> reqwest::RequestBuilder {
        request
            .header("Cookie", cookie)
            .header("Accept", "application/json")
            .header("Origin", self.base_url.as_str())
            .header("Referer", format!("{}/dashboard", self.base_url))
    }

    async fn finish(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("{} returned HTTP {}", endpoint, status);
            return Err(ApiError::from_failure(status, body));
        }
        response
            .json::<Value>()
            .await
            .map_err(|source| ApiError::Decode { endpoint, source })
    }

    async fn get(
        &self,
        endpoint: &'static str,
        path: &str,
        cookie: &str,
    ) -> Result<Value, ApiError> {
        let request = self.decorate(self.http.get(self.url(path)), cookie);
        self.finish(endpoint, request).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        endpoint: &'static str,
        path: &str,
        cookie: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let request = self
            .decorate(self.http.post(self.url(path)), cookie)
            .header("Content-Type", "application/json")
            .json(body);
        self.finish(endpoint, request).await
    }
}

#[async_trait]
impl CursorApi for CursorClient {
    async fn me(&self, cookie: &str) -> Result<Value, ApiError> {
        self.get("get-me", "/api/dashboard/get-me", cookie).await
    }

    async fn usage_summary(&self, cookie: &str) -> Result<Value, ApiError> {
        self.get("usage-summary", "/api/usage-summary", cookie)
            .await
    }

    async fn filtered_usage_events(
        &self,
        cookie: &str,
        query: &EventsQuery,
    ) -> Result<Value, ApiError> {
        self.post(
            "get-filtered-usage-events",
            "/api/dashboard/get-filtered-usage-events",
            cookie,
            query,
        )
        .await
    }

    async fn aggregated_usage_events(
        &self,
        cookie: &str,
        query: &AggregatedEventsQuery,
    ) -> Result<Value, ApiError> {
        self.post(
            "get-aggregated-usage-events",
            "/api/dashboard/get-aggregated-usage-events",
            cookie,
            query,
        )
        .await
    }

    async fn current_billing_cycle(&self, cookie: &str) -> Result<Value, ApiError> {
        self.post(
            "get-current-billing-cycle",
            "/api/dashboard/get-current-billing-cycle",
            cookie,
            &serde_json::json!({}),
        )
        .await
    }

    async fn team_spend(&self, cookie: &str, query: &TeamSpendQuery) -> Result<Value, ApiError> {
        self.post(
            "get-team-spend",
            "/api/dashboard/get-team-spend",
            cookie,
            query,
        )
        .await
    }

    async fn team_models_analytics(
        &self,
        cookie: &str,
        query: &AnalyticsQuery,
    ) -> Result<Value, ApiError> {
        let url = self.url("/api/v2/analytics/team/models");
        let request = self
            .decorate(self.http.get(url), cookie)
            .query(&[
                ("startDate", query.start_date.as_str()),
                ("endDate", query.end_date.as_str()),
                ("c", query.team_id.to_string().as_str()),
            ]);
        self.finish("team-models-analytics", request).await
    }

    async fn usage_by_model(&self, cookie: &str, workos_id: &str) -> Result<Value, ApiError> {
        let request = self
            .decorate(self.http.get(self.url("/api/usage")), cookie)
            .query(&[("user", workos_id)]);
        self.finish("usage", request).await
    }
}
