//! Periodic refresh of the dashboard snapshot.
//!
//! One background loop per [`RefreshOrchestrator`]. Each cycle fans out to
//! the upstream endpoints, publishes a fast intermediate snapshot once the
//! usage summary is in, then publishes the fully merged snapshot. Errors in
//! the background path are logged and dropped; the next tick retries.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::api::{
    AggregatedEventsQuery, AnalyticsQuery, ApiError, CursorApi, EventsQuery, TeamSpendQuery,
};
use crate::core::bucketer;
use crate::core::classifier::{self, AccountClass, ChartSource};
use crate::core::mapper::{self, MapError};
use crate::core::models::aggregation::{ModelsUsageSummary, UsageByModel};
use crate::core::models::chart::ModelsUsageChartData;
use crate::core::models::credentials::Credentials;
use crate::core::models::settings::AppSettings;
use crate::core::models::snapshot::DashboardSnapshot;
use crate::core::models::summary::{BillingCycle, UsageSummary};
use crate::core::models::usage::{UsageEvent, UsageEventsPage};
use crate::core::session::AppSession;
use crate::core::store::{self, Store, StoreKey};
use crate::core::time;

/// Pages of filtered events read for the individual chart.
const CHART_PAGES: u32 = 7;
const CHART_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Map(#[from] MapError),
}

impl FetchError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, FetchError::Api(e) if e.is_session_expired())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub paused_poll: Duration,
    pub analytics_days: u32,
    pub history_page_size: u32,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for RefreshSettings {
    fn from(settings: &AppSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.refresh_interval_secs.max(30)),
            paused_poll: Duration::from_secs(settings.paused_poll_secs.max(1)),
            analytics_days: settings.analytics_days.max(1),
            history_page_size: settings.usage_history_limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published,
    /// Another cycle was already running.
    Skipped,
    NotLoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStatus {
    pub running: bool,
    pub refreshing: bool,
    pub paused: bool,
}

/// Tracks when the last cycle started so the loop only fires once a full
/// interval has passed, whoever triggered the previous cycle.
struct RefreshSchedule {
    last_started: Option<Instant>,
}

impl RefreshSchedule {
    fn time_until_due(&self, interval: Duration) -> Duration {
        match self.last_started {
            Some(at) => interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn mark_started(&mut self) {
        self.last_started = Some(Instant::now());
    }
}

/// Releases the refreshing flag when a cycle ends, including on abort.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What the summary-driven half of a cycle produced.
struct FastPath {
    summary: UsageSummary,
    free_usage_cents: i64,
    chart: ModelsUsageChartData,
    models_summary: Option<ModelsUsageSummary>,
}

struct Shared {
    api: Arc<dyn CursorApi>,
    store: Arc<dyn Store>,
    session: AppSession,
    settings: RefreshSettings,
    refreshing: AtomicBool,
    paused: AtomicBool,
    generation: AtomicU64,
    schedule: Mutex<RefreshSchedule>,
}

async fn best_effort<T, F>(what: &str, fetch: F) -> Result<Option<T>, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match fetch.await {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Skipping {}: {}", what, e);
            Ok(None)
        }
    }
}

impl Shared {
    fn mark_started(&self) {
        if let Ok(mut schedule) = self.schedule.lock() {
            schedule.mark_started();
        }
    }

    fn time_until_due(&self) -> Duration {
        self.schedule
            .lock()
            .map(|s| s.time_until_due(self.settings.interval))
            .unwrap_or(self.settings.interval)
    }

    /// A cycle may only write while nobody stopped the orchestrator and the
    /// same user is still logged in.
    fn is_current(&self, generation: u64, credentials: &Credentials) -> bool {
        self.generation.load(Ordering::Acquire) == generation
            && self.session.credentials().as_ref() == Some(credentials)
    }

    async fn publish(
        &self,
        generation: u64,
        credentials: &Credentials,
        snapshot: DashboardSnapshot,
    ) {
        if !self.is_current(generation, credentials) {
            tracing::debug!("Discarding snapshot from a cancelled cycle");
            return;
        }
        self.session.publish(Some(snapshot.clone()));
        let saved = store::save_typed(self.store.as_ref(), StoreKey::Snapshot, &snapshot);
        if let Err(e) = saved.await {
            tracing::warn!("Failed to persist snapshot: {}", e);
        }
    }

    async fn refresh_passive(&self) {
        if self.paused.load(Ordering::Acquire) {
            tracing::debug!("Refresh skipped while paused");
            return;
        }
        match self.run_locked().await {
            Ok(RefreshOutcome::Published) => tracing::debug!("Background refresh finished"),
            Ok(outcome) => tracing::debug!("Background refresh: {:?}", outcome),
            Err(e) => tracing::warn!("Background refresh failed: {}", e),
        }
    }

    async fn run_locked(&self) -> Result<RefreshOutcome, FetchError> {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            tracing::debug!("Refresh already in progress");
            return Ok(RefreshOutcome::Skipped);
        };
        self.mark_started();
        let Some(credentials) = self.session.credentials() else {
            return Ok(RefreshOutcome::NotLoggedIn);
        };
        let generation = self.generation.load(Ordering::Acquire);
        self.cycle(&credentials, generation, Local::now()).await?;
        Ok(RefreshOutcome::Published)
    }

    async fn expire_session(&self) {
        tracing::info!("Session expired; clearing stored credentials");
        self.session.clear();
        for key in [StoreKey::Credentials, StoreKey::Snapshot] {
            if let Err(e) = self.store.clear(key).await {
                tracing::warn!("Failed to clear {}: {}", key.as_str(), e);
            }
        }
    }

    async fn cycle(
        &self,
        credentials: &Credentials,
        generation: u64,
        now: DateTime<Local>,
    ) -> Result<(), FetchError> {
        let cookie = credentials.cookie_header.as_str();
        let workos_id = credentials.workos_id.as_str();
        let (start_ms, end_ms) = time::days_ago_to_now_range_at(self.settings.analytics_days, now);
        tracing::debug!("Refreshing {} ({}..{})", credentials.email, start_ms, end_ms);

        let history = async {
            let query = EventsQuery {
                team_id: credentials.team_id,
                user_id: credentials.user_id,
                start_date: start_ms.to_string(),
                end_date: end_ms.to_string(),
                page: 1,
                page_size: self.settings.history_page_size,
            };
            let raw = self.api.filtered_usage_events(cookie, &query).await?;
            Ok::<UsageEventsPage, FetchError>(mapper::map_usage_events(&raw)?)
        };
        let billing = best_effort("current billing cycle", async {
            let raw = self.api.current_billing_cycle(cookie).await?;
            Ok::<_, FetchError>(mapper::map_billing_cycle(&raw)?)
        });
        let usage_map = best_effort("usage by model", async {
            let raw = self.api.usage_by_model(cookie, workos_id).await?;
            Ok::<_, FetchError>(mapper::map_usage_by_model(&raw)?)
        });
        let range = (start_ms, end_ms);
        let fast = self.fast_path(credentials, generation, now, range);

        let (fast, history, billing, usage_map) =
            tokio::try_join!(fast, history, billing, usage_map)?;

        let snapshot = merge_snapshot(credentials, fast, history, billing, usage_map, now);
        tracing::info!(
            "Snapshot refreshed: {} requests today, {} cents spent",
            snapshot.request_today,
            snapshot.spending_cents
        );
        self.publish(generation, credentials, snapshot).await;
        Ok(())
    }

    async fn fast_path(
        &self,
        credentials: &Credentials,
        generation: u64,
        now: DateTime<Local>,
        range: (i64, i64),
    ) -> Result<FastPath, FetchError> {
        let cookie = credentials.cookie_header.as_str();
        let raw = self.api.usage_summary(cookie).await?;
        let summary = mapper::map_usage_summary(&raw)?;
        let class = classifier::classify(summary.membership_type, credentials.is_enterprise_user);
        tracing::debug!("Account class: {:?}", class);

        let free_usage_cents = if class.fetches_team_free_usage() {
            self.team_free_usage(credentials).await?
        } else {
            0
        };

        let previous = self.session.snapshot();
        let intermediate =
            intermediate_snapshot(credentials, &summary, free_usage_cents, previous, now);
        self.publish(generation, credentials, intermediate).await;

        let chart = self.chart(credentials, class, now, range).await?;
        let models_summary = if class.fetches_model_aggregation() {
            best_effort("model aggregation", async {
                let query = AggregatedEventsQuery {
                    team_id: credentials.team_id,
                    start_date: summary.billing_cycle_start.timestamp_millis(),
                };
                let raw = self.api.aggregated_usage_events(cookie, &query).await?;
                Ok::<_, FetchError>(mapper::map_models_usage_summary(&raw)?)
            })
            .await?
        } else {
            None
        };

        Ok(FastPath {
            summary,
            free_usage_cents,
            chart,
            models_summary,
        })
    }

    /// Walk the team roster until the current user shows up.
    async fn team_free_usage(&self, credentials: &Credentials) -> Result<i64, FetchError> {
        let cookie = credentials.cookie_header.as_str();
        let user_id = credentials.user_id;
        let mut page = 1;
        loop {
            let raw = self
                .api
                .team_spend(cookie, &TeamSpendQuery::page(credentials.team_id, page))
                .await?;
            let roster = mapper::map_team_spend(&raw)?;
            if let Some(me) = roster.members.iter().find(|m| m.user_id == user_id) {
                return Ok(me.free_usage_cents());
            }
            if page >= roster.total_pages {
                tracing::debug!("User {} not on team roster", credentials.user_id);
                return Ok(0);
            }
            page += 1;
        }
    }

    async fn chart(
        &self,
        credentials: &Credentials,
        class: AccountClass,
        now: DateTime<Local>,
        (start_ms, end_ms): (i64, i64),
    ) -> Result<ModelsUsageChartData, FetchError> {
        let cookie = credentials.cookie_header.as_str();
        let today = now.date_naive();
        match class.chart_source() {
            ChartSource::TeamAnalytics => {
                let (start_date, end_date) =
                    time::days_ago_to_today_range_at(self.settings.analytics_days, now);
                let query = AnalyticsQuery {
                    team_id: credentials.team_id,
                    start_date,
                    end_date,
                };
                let raw = self.api.team_models_analytics(cookie, &query).await?;
                let daily = mapper::map_team_analytics(&raw)?;
                Ok(bucketer::build_chart(&daily, start_ms, end_ms, today))
            }
            ChartSource::FilteredEvents => {
                let pages = (1..=CHART_PAGES).map(move |page| async move {
                    let query = EventsQuery {
                        team_id: credentials.team_id,
                        user_id: credentials.user_id,
                        start_date: start_ms.to_string(),
                        end_date: end_ms.to_string(),
                        page,
                        page_size: CHART_PAGE_SIZE,
                    };
                    let raw = self.api.filtered_usage_events(cookie, &query).await?;
                    Ok::<_, FetchError>((page, mapper::map_usage_events(&raw)?.events))
                });
                let mut pages = futures::future::try_join_all(pages).await?;
                pages.sort_by_key(|(page, _)| *page);
                let events: Vec<UsageEvent> =
                    pages.into_iter().flat_map(|(_, events)| events).collect();
                Ok(bucketer::chart_from_events(&events, start_ms, end_ms, today))
            }
        }
    }
}

/// Billing totals are fresh; events and chart carry over from the previous
/// snapshot until the slower fetches land. Day counters are recounted from
/// the carried events so they follow the local calendar at `now`.
fn intermediate_snapshot(
    credentials: &Credentials,
    summary: &UsageSummary,
    free_usage_cents: i64,
    previous: Option<DashboardSnapshot>,
    now: DateTime<Local>,
) -> DashboardSnapshot {
    let previous = previous.filter(|p| p.email == credentials.email);
    let usage_events = previous
        .as_ref()
        .map(|p| p.usage_events.clone())
        .unwrap_or_default();
    let [request_today, request_yesterday] = day_counts(&usage_events, now);
    let (start_ms, end_ms) = summary_cycle_millis(summary);
    DashboardSnapshot {
        email: credentials.email.clone(),
        total_requests_all_models: previous
            .as_ref()
            .map_or(0, |p| p.total_requests_all_models),
        spending_cents: summary.spending_cents(),
        hard_limit_dollars: summary.hard_limit_dollars(),
        usage_events,
        request_today,
        request_yesterday,
        usage_summary: summary.clone(),
        free_usage_cents,
        models_usage_chart: previous.as_ref().and_then(|p| p.models_usage_chart.clone()),
        models_usage_summary: previous
            .as_ref()
            .and_then(|p| p.models_usage_summary.clone()),
        billing_cycle_start_ms: Some(start_ms),
        billing_cycle_end_ms: Some(end_ms),
    }
}

/// Requests on the local days of `now` and the day before.
fn day_counts(events: &[UsageEvent], now: DateTime<Local>) -> [i64; 2] {
    let today = now.date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);
    let counts = bucketer::requests_on_days(events, &[today, yesterday]);
    [counts[0], counts[1]]
}

fn summary_cycle_millis(summary: &UsageSummary) -> (String, String) {
    (
        time::milliseconds_string(&summary.billing_cycle_start),
        time::milliseconds_string(&summary.billing_cycle_end),
    )
}

fn merge_snapshot(
    credentials: &Credentials,
    fast: FastPath,
    history: UsageEventsPage,
    billing: Option<BillingCycle>,
    usage_map: Option<UsageByModel>,
    now: DateTime<Local>,
) -> DashboardSnapshot {
    let [request_today, request_yesterday] = day_counts(&history.events, now);
    let (billing_start, billing_end) = match billing {
        Some(cycle) => (cycle.start_ms, cycle.end_ms),
        None => summary_cycle_millis(&fast.summary),
    };
    DashboardSnapshot {
        email: credentials.email.clone(),
        total_requests_all_models: usage_map
            .map(|m| m.total_requests())
            .unwrap_or(history.total_count),
        spending_cents: fast.summary.spending_cents(),
        hard_limit_dollars: fast.summary.hard_limit_dollars(),
        usage_events: history.events,
        request_today,
        request_yesterday,
        usage_summary: fast.summary,
        free_usage_cents: fast.free_usage_cents,
        models_usage_chart: Some(fast.chart),
        models_usage_summary: fast.models_summary,
        billing_cycle_start_ms: Some(billing_start),
        billing_cycle_end_ms: Some(billing_end),
    }
}

pub struct RefreshOrchestrator {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshOrchestrator {
    pub fn new(
        api: Arc<dyn CursorApi>,
        store: Arc<dyn Store>,
        session: AppSession,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                session,
                settings,
                refreshing: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                schedule: Mutex::new(RefreshSchedule { last_started: None }),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &AppSession {
        &self.shared.session
    }

    /// Restore the session, refresh once, then keep refreshing in the
    /// background. Calling it again replaces the running loop.
    pub async fn start(&self) {
        self.stop();
        let persisted = self.shared.store.as_ref();
        self.shared.session.bootstrap(persisted).await;
        self.shared.refresh_passive().await;

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            loop {
                let wait = if shared.paused.load(Ordering::Acquire) {
                    shared.settings.paused_poll
                } else {
                    shared.time_until_due()
                };
                tokio::time::sleep(wait).await;
                if shared.paused.load(Ordering::Acquire) || !shared.time_until_due().is_zero() {
                    continue;
                }
                shared.refresh_passive().await;
            }
        });
        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
        tracing::info!("Refresh loop started (every {:?})", self.shared.settings.interval);
    }

    /// Cancel the loop. Cycles already in flight finish without publishing.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                tracing::info!("Refresh loop stopped");
            }
        }
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        tracing::info!("Refresh paused");
    }

    pub async fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        tracing::info!("Refresh resumed");
        self.shared.refresh_passive().await;
    }

    /// One background-style cycle. Does nothing while paused or while
    /// another cycle runs; failures are logged, never returned.
    pub async fn refresh_now(&self) {
        self.shared.refresh_passive().await;
    }

    /// A user-requested cycle. Runs even while paused and returns failures.
    /// An expired session clears the stored credentials and snapshot.
    pub async fn refresh_interactive(&self) -> Result<RefreshOutcome, FetchError> {
        match self.shared.run_locked().await {
            Err(e) if e.is_session_expired() => {
                self.shared.expire_session().await;
                Err(e)
            }
            other => other,
        }
    }

    pub fn status(&self) -> RefreshStatus {
        let running = self
            .task
            .lock()
            .map(|task| task.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false);
        RefreshStatus {
            running,
            refreshing: self.shared.refreshing.load(Ordering::Acquire),
            paused: self.shared.paused.load(Ordering::Acquire),
        }
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}
