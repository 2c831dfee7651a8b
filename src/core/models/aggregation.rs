use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token and cost totals for one model over a billing cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelAggregation {
    pub model_name: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_write_tokens: i64,
    pub cache_read_tokens: i64,
    pub total_cents: f64,
}

impl ModelAggregation {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens + self.cache_write_tokens + self.cache_read_tokens
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsUsageSummary {
    pub models: Vec<ModelAggregation>,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_cache_write_tokens: i64,
    pub total_cache_read_tokens: i64,
    pub total_cost_cents: f64,
}

impl ModelsUsageSummary {
    pub fn total_tokens(&self) -> i64 {
        self.total_input_tokens
            + self.total_output_tokens
            + self.total_cache_write_tokens
            + self.total_cache_read_tokens
    }

    /// Most expensive model first; ties keep name order.
    pub fn sorted_by_cost(&self) -> Vec<ModelAggregation> {
        let mut models = self.models.clone();
        models.sort_by(|a, b| {
            b.total_cents
                .total_cmp(&a.total_cents)
                .then_with(|| a.model_name.cmp(&b.model_name))
        });
        models
    }
}

/// Request counters of the legacy per-model usage map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequestUsage {
    pub model_name: String,
    pub num_requests: i64,
    pub num_requests_total: i64,
    pub num_tokens: i64,
    pub max_request_usage: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageByModel {
    pub models: Vec<ModelRequestUsage>,
    pub start_of_month: DateTime<Utc>,
}

impl UsageByModel {
    pub fn total_requests(&self) -> i64 {
        self.models
            .iter()
            .map(|m| {
                if m.num_requests_total > 0 {
                    m.num_requests_total
                } else {
                    m.num_requests
                }
            })
            .sum()
    }
}
