use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsageCount {
    pub model_name: String,
    pub requests: i64,
}

/// One calendar day on the chart axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `MM/dd`
    pub date_label: String,
    pub model_usages: Vec<ModelUsageCount>,
    pub total_value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsUsageChartData {
    pub data_points: Vec<ChartDataPoint>,
}

impl ModelsUsageChartData {
    pub fn total_requests(&self) -> i64 {
        self.data_points.iter().map(|p| p.total_value).sum()
    }
}

/// Per-day, per-model request counts before they are laid on a chart axis.
pub type DailyModelRequests = BTreeMap<NaiveDate, BTreeMap<String, i64>>;
