//! Test doubles shared by the core modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::core::api::{
    AggregatedEventsQuery, AnalyticsQuery, ApiError, CursorApi, EventsQuery, TeamSpendQuery,
};
use crate::core::mapper;
use crate::core::models::credentials::Credentials;
use crate::core::models::snapshot::DashboardSnapshot;
use crate::core::store::{Store, StoreError, StoreKey};

pub const USER_ID: i64 = 42;
pub const TEAM_ID: i64 = 9;

#[derive(Default)]
pub struct MemoryStore {
    records: tokio::sync::Mutex<HashMap<StoreKey, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.records.lock().await.insert(key, value);
        Ok(())
    }

    async fn load(&self, key: StoreKey) -> Option<Value> {
        self.records.lock().await.get(&key).cloned()
    }

    async fn clear(&self, key: StoreKey) -> Result<(), StoreError> {
        self.records.lock().await.remove(&key);
        Ok(())
    }
}

/// A latch that holds callers until it is opened once.
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub fn closed() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

pub fn credentials(is_enterprise_user: bool) -> Credentials {
    Credentials {
        user_id: USER_ID,
        workos_id: "user_01".to_string(),
        email: "me@example.com".to_string(),
        team_id: TEAM_ID,
        cookie_header: "WorkosCursorSessionToken=abc".to_string(),
        is_enterprise_user,
    }
}

pub fn summary_json(membership: &str) -> Value {
    json!({
        "billingCycleStart": "2025-06-01T00:00:00.000Z",
        "billingCycleEnd": "2025-07-01T00:00:00.000Z",
        "membershipType": membership,
        "limitType": "user",
        "individualUsage": {
            "plan": { "used": 1500, "limit": 2000, "remaining": 500,
                      "breakdown": { "included": 1500, "bonus": 0, "total": 1500 } },
            "onDemand": { "enabled": true, "used": 250, "limit": 10000, "remaining": 9750 }
        },
        "teamUsage": {
            "onDemand": { "enabled": true, "used": 0, "limit": 50000, "remaining": 50000 }
        }
    })
}

pub fn snapshot(email: &str) -> DashboardSnapshot {
    DashboardSnapshot {
        email: email.to_string(),
        total_requests_all_models: 0,
        spending_cents: 0,
        hard_limit_dollars: 0,
        usage_events: Vec::new(),
        request_today: 0,
        request_yesterday: 0,
        usage_summary: mapper::map_usage_summary(&summary_json("pro")).unwrap(),
        free_usage_cents: 0,
        models_usage_chart: None,
        models_usage_summary: None,
        billing_cycle_start_ms: None,
        billing_cycle_end_ms: None,
    }
}

fn raw_event(model: &str, cost: &str) -> Value {
    json!({
        "timestamp": Utc::now().timestamp_millis().to_string(),
        "model": model,
        "kind": "USAGE_EVENT_KIND_USAGE_BASED",
        "usageBasedCosts": cost,
        "isTokenBasedCall": true,
        "owningUser": "42",
        "cursorTokenFee": 0,
        "tokenUsage": { "inputTokens": "100", "outputTokens": 20, "totalCents": 4.2 }
    })
}

/// Scripted upstream. Records how often each endpoint is called.
pub struct MockApi {
    membership: String,
    calls: Mutex<HashMap<&'static str, usize>>,
    summary_gate: Option<Gate>,
    events_gate: Option<Gate>,
    expired: AtomicBool,
}

impl MockApi {
    pub fn new(membership: &str) -> Self {
        Self {
            membership: membership.to_string(),
            calls: Mutex::new(HashMap::new()),
            summary_gate: None,
            events_gate: None,
            expired: AtomicBool::new(false),
        }
    }

    /// Hold every usage-summary call until the gate opens.
    pub fn with_summary_gate(mut self, gate: Gate) -> Self {
        self.summary_gate = Some(gate);
        self
    }

    /// Hold every filtered-events call until the gate opens.
    pub fn with_events_gate(mut self, gate: Gate) -> Self {
        self.events_gate = Some(gate);
        self
    }

    pub fn open_gates(&self) {
        if let Some(gate) = &self.summary_gate {
            gate.open();
        }
        if let Some(gate) = &self.events_gate {
            gate.open();
        }
    }

    /// Make every endpoint answer 401 from now on.
    pub fn expire_session(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, endpoint: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        if self.expired.load(Ordering::SeqCst) {
            return Err(ApiError::SessionExpired { status: 401 });
        }
        Ok(())
    }
}

#[async_trait]
impl CursorApi for MockApi {
    async fn me(&self, _cookie: &str) -> Result<Value, ApiError> {
        self.record("me")?;
        Ok(json!({
            "userId": USER_ID,
            "workosId": "user_01",
            "email": "me@example.com",
            "teamId": TEAM_ID,
            "isEnterpriseUser": false
        }))
    }

    async fn usage_summary(&self, _cookie: &str) -> Result<Value, ApiError> {
        self.record("usage_summary")?;
        if let Some(gate) = &self.summary_gate {
            gate.wait().await;
        }
        Ok(summary_json(&self.membership))
    }

    async fn filtered_usage_events(
        &self,
        _cookie: &str,
        query: &EventsQuery,
    ) -> Result<Value, ApiError> {
        self.record("filtered_usage_events")?;
        if let Some(gate) = &self.events_gate {
            gate.wait().await;
        }
        if query.page != 1 {
            return Ok(json!({ "totalUsageEventsCount": 3, "usageEventsDisplay": [] }));
        }
        Ok(json!({
            "totalUsageEventsCount": 3,
            "usageEventsDisplay": [
                raw_event("claude-4-sonnet", "$0.04"),
                raw_event("gpt-5", "$0.10"),
                raw_event("claude-4-sonnet", "$0.02")
            ]
        }))
    }

    async fn aggregated_usage_events(
        &self,
        _cookie: &str,
        _query: &AggregatedEventsQuery,
    ) -> Result<Value, ApiError> {
        self.record("aggregated_usage_events")?;
        Ok(json!({
            "aggregations": [
                { "modelIntent": "claude-4-sonnet", "inputTokens": "1200", "outputTokens": "300",
                  "cacheWriteTokens": "0", "cacheReadTokens": "5000", "totalCents": 42.5 }
            ],
            "totalCostCents": 42.5
        }))
    }

    async fn current_billing_cycle(&self, _cookie: &str) -> Result<Value, ApiError> {
        self.record("current_billing_cycle")?;
        Ok(json!({
            "startDateEpochMillis": "1748736000000",
            "endDateEpochMillis": "1751328000000"
        }))
    }

    async fn team_spend(&self, _cookie: &str, query: &TeamSpendQuery) -> Result<Value, ApiError> {
        self.record("team_spend")?;
        let members = if query.page == 1 {
            json!([{ "userId": 7, "email": "other@example.com", "includedSpendCents": 900,
                     "hardLimitOverrideDollars": 0, "spendCents": 900 }])
        } else {
            json!([{ "userId": USER_ID, "email": "me@example.com", "includedSpendCents": 500,
                     "hardLimitOverrideDollars": 1, "spendCents": 700 }])
        };
        Ok(json!({ "teamMemberSpend": members, "totalPages": 2 }))
    }

    async fn team_models_analytics(
        &self,
        _cookie: &str,
        _query: &AnalyticsQuery,
    ) -> Result<Value, ApiError> {
        self.record("team_models_analytics")?;
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        Ok(json!({
            "data": [
                { "date": today, "model_breakdown": {
                    "claude-4-sonnet": { "requests": 5 },
                    "gpt-5": { "requests": 2 }
                } }
            ]
        }))
    }

    async fn usage_by_model(&self, _cookie: &str, _workos_id: &str) -> Result<Value, ApiError> {
        self.record("usage_by_model")?;
        Ok(json!({
            "gpt-4": { "numRequests": 3, "numRequestsTotal": 5, "numTokens": 100 },
            "claude-4-sonnet": { "numRequests": 4, "numTokens": 80 },
            "startOfMonth": "2025-06-01T00:00:00.000Z"
        }))
    }
}
