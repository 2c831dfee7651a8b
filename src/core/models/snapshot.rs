use serde::{Deserialize, Serialize};

use crate::core::models::aggregation::ModelsUsageSummary;
use crate::core::models::chart::ModelsUsageChartData;
use crate::core::models::summary::UsageSummary;
use crate::core::models::usage::UsageEvent;

/// Everything the dashboard displays. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub email: String,
    pub total_requests_all_models: i64,
    pub spending_cents: i64,
    pub hard_limit_dollars: i64,
    #[serde(default)]
    pub usage_events: Vec<UsageEvent>,
    pub request_today: i64,
    pub request_yesterday: i64,
    pub usage_summary: UsageSummary,
    #[serde(default)]
    pub free_usage_cents: i64,
    pub models_usage_chart: Option<ModelsUsageChartData>,
    pub models_usage_summary: Option<ModelsUsageSummary>,
    pub billing_cycle_start_ms: Option<String>,
    pub billing_cycle_end_ms: Option<String>,
}
