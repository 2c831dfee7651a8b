use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub cache_write_tokens: Option<i64>,
    pub cache_read_tokens: Option<i64>,
    #[serde(default)]
    pub total_cents: f64,
}

impl TokenUsage {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens.unwrap_or(0)
            + self.output_tokens.unwrap_or(0)
            + self.cache_write_tokens.unwrap_or(0)
            + self.cache_read_tokens.unwrap_or(0)
    }
}

/// A single billed request as listed by the filtered-events endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    /// Epoch milliseconds, kept as the string upstream sends.
    pub occurred_at_ms: String,
    pub model_name: String,
    pub kind: String,
    pub request_cost_count: i64,
    /// Display cost such as `"$0.04"`.
    pub usage_cost_display: String,
    pub usage_cost_cents: i64,
    pub is_token_based: bool,
    pub user_display_name: String,
    pub cursor_token_fee: f64,
    pub token_usage: TokenUsage,
}

impl UsageEvent {
    pub fn occurred_at_millis(&self) -> Option<i64> {
        crate::core::time::millis_from_string(&self.occurred_at_ms)
    }
}

/// One page of the filtered-events listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageEventsPage {
    pub total_count: i64,
    pub events: Vec<UsageEvent>,
}
