//! Translation of raw upstream JSON into the domain model.
//!
//! Upstream shapes drift: token counts arrive as numbers or numeric strings,
//! dates arrive as ISO-8601 or epoch milliseconds, and some objects are keyed
//! by model name. Optional fields degrade to defaults; only genuinely
//! required fields produce a [`MapError`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::core::models::aggregation::{
    ModelAggregation, ModelRequestUsage, ModelsUsageSummary, UsageByModel,
};
use crate::core::models::chart::DailyModelRequests;
use crate::core::models::credentials::Credentials;
use crate::core::models::summary::{
    BillingCycle, IndividualUsage, MembershipType, OnDemandUsage, PlanBreakdown, PlanUsage,
    TeamUsage, UsageSummary,
};
use crate::core::models::team::{TeamMemberSpend, TeamSpendPage};
use crate::core::models::usage::{TokenUsage, UsageEvent, UsageEventsPage};
use crate::core::time;

const START_OF_MONTH_KEY: &str = "startOfMonth";

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Data corrupted: {field} has unparsable value '{value}'")]
    DataCorrupted { field: &'static str, value: String },
    #[error("Malformed {what} payload: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn malformed(what: &'static str) -> impl FnOnce(serde_json::Error) -> MapError {
    move |source| MapError::Malformed { what, source }
}

// ── Lenient scalar decoding ───────────────────────────────────────────

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Some(n);
            }
            let f = s.parse::<f64>().ok()?;
            f.is_finite().then_some(f.round() as i64)
        }
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Number or numeric string; absent or unparsable becomes 0.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_i64).unwrap_or(0))
}

/// Absent or null stays `None`; a present but unparsable value becomes 0.
fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(value_to_i64(&v).unwrap_or(0)),
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64).unwrap_or(0.0))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Convert a display amount such as `"$0.04"` to integer cents.
///
/// Only the first run of digits and dots is considered. Anything that does
/// not parse yields 0.
pub fn dollars_to_cents(display: &str) -> i64 {
    let is_numeric = |c: &char| c.is_ascii_digit() || *c == '.';
    let number: String = display
        .chars()
        .skip_while(|c| !is_numeric(c))
        .take_while(is_numeric)
        .collect();
    match number.parse::<f64>() {
        Ok(dollars) if dollars.is_finite() => (dollars * 100.0).round() as i64,
        _ => 0,
    }
}

/// ISO-8601 with fractional seconds, retried without them.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    parse_iso8601_fractional(value).or_else(|| parse_iso8601_whole_seconds(value))
}

fn parse_iso8601_fractional(value: &str) -> Option<DateTime<Utc>> {
    if !value.contains('.') {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_iso8601_whole_seconds(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn required_date(field: &'static str, raw: Option<&str>) -> Result<DateTime<Utc>, MapError> {
    let raw = raw.unwrap_or_default();
    parse_iso8601(raw).ok_or_else(|| MapError::DataCorrupted {
        field,
        value: raw.to_string(),
    })
}

// ── who-am-I ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeRaw {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    workos_id: Option<String>,
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    team_id: i64,
    #[serde(default)]
    is_enterprise_user: bool,
}

pub fn map_credentials(value: &Value, cookie_header: &str) -> Result<Credentials, MapError> {
    let raw = MeRaw::deserialize(value).map_err(malformed("get-me"))?;
    let user_id = raw.user_id.ok_or_else(|| MapError::DataCorrupted {
        field: "userId",
        value: value
            .get("userId")
            .map(|v| v.to_string())
            .unwrap_or_default(),
    })?;
    Ok(Credentials {
        user_id,
        workos_id: raw.workos_id.unwrap_or_default(),
        email: raw.email.unwrap_or_default(),
        team_id: raw.team_id,
        cookie_header: cookie_header.to_string(),
        is_enterprise_user: raw.is_enterprise_user,
    })
}

// ── Usage summary ─────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BreakdownRaw {
    #[serde(default, deserialize_with = "lenient_i64")]
    included: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    bonus: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PlanRaw {
    #[serde(default, deserialize_with = "lenient_i64")]
    used: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    limit: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    remaining: i64,
    breakdown: Option<BreakdownRaw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnDemandRaw {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient_i64")]
    used: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    limit: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    remaining: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct IndividualRaw {
    plan: Option<PlanRaw>,
    on_demand: Option<OnDemandRaw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamRaw {
    on_demand: Option<OnDemandRaw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageSummaryRaw {
    billing_cycle_start: Option<String>,
    billing_cycle_end: Option<String>,
    membership_type: Option<String>,
    limit_type: Option<String>,
    individual_usage: Option<IndividualRaw>,
    team_usage: Option<TeamRaw>,
}

/// On-demand usage only exists when something was spent or a limit is set.
fn map_on_demand(raw: Option<OnDemandRaw>) -> Option<OnDemandUsage> {
    let raw = raw?;
    let limit = raw.limit.unwrap_or(0);
    if raw.used <= 0 && limit <= 0 {
        return None;
    }
    Some(OnDemandUsage {
        used: raw.used,
        limit: raw.limit,
        remaining: raw.remaining,
        enabled: raw.enabled.unwrap_or(false),
    })
}

pub fn map_usage_summary(value: &Value) -> Result<UsageSummary, MapError> {
    let raw = UsageSummaryRaw::deserialize(value)
        .map_err(malformed("usage-summary"))?;
    let billing_cycle_start =
        required_date("billingCycleStart", raw.billing_cycle_start.as_deref())?;
    let billing_cycle_end = required_date("billingCycleEnd", raw.billing_cycle_end.as_deref())?;

    let individual = raw.individual_usage.unwrap_or_default();
    let plan = individual.plan.unwrap_or_default();
    let breakdown = plan.breakdown.unwrap_or_default();

    Ok(UsageSummary {
        billing_cycle_start,
        billing_cycle_end,
        membership_type: raw
            .membership_type
            .as_deref()
            .map(MembershipType::from_upstream)
            .unwrap_or(MembershipType::Free),
        limit_type: raw.limit_type.unwrap_or_default(),
        individual_usage: IndividualUsage {
            plan: PlanUsage {
                used: plan.used,
                limit: plan.limit,
                remaining: plan.remaining,
                breakdown: PlanBreakdown {
                    included: breakdown.included,
                    bonus: breakdown.bonus,
                    total: breakdown.total,
                },
            },
            on_demand: map_on_demand(individual.on_demand),
        },
        team_usage: raw.team_usage.map(|team| TeamUsage {
            on_demand: map_on_demand(team.on_demand),
        }),
    })
}

// ── Filtered usage events ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenUsageRaw {
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    input_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    output_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    cache_write_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    cache_read_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_cents: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageEventRaw {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    timestamp: Option<String>,
    model: Option<String>,
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    usage_based_costs: Option<String>,
    is_token_based_call: Option<bool>,
    owning_user: Option<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    cursor_token_fee: f64,
    token_usage: Option<TokenUsageRaw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageEventsRaw {
    #[serde(default, deserialize_with = "lenient_i64")]
    total_usage_events_count: i64,
    #[serde(default)]
    usage_events_display: Vec<Value>,
}

// TODO: upstream never defined a token-weighted request count; every event
// counts as one until product confirms whether token-based calls weigh more.
fn request_cost_count(_tokens: &TokenUsage) -> i64 {
    1
}

fn map_event(raw: UsageEventRaw) -> Option<UsageEvent> {
    let occurred_at_ms = raw.timestamp?;
    time::millis_from_string(&occurred_at_ms)?;
    let token_usage = raw
        .token_usage
        .map(|t| TokenUsage {
            input_tokens: t.input_tokens,
            output_tokens: t.output_tokens,
            cache_write_tokens: t.cache_write_tokens,
            cache_read_tokens: t.cache_read_tokens,
            total_cents: t.total_cents,
        })
        .unwrap_or_default();
    let usage_cost_display = raw.usage_based_costs.unwrap_or_default();
    let user_display_name = match raw.owning_user {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Some(UsageEvent {
        occurred_at_ms,
        model_name: raw.model.unwrap_or_else(|| "unknown".to_string()),
        kind: raw.kind.unwrap_or_default(),
        request_cost_count: request_cost_count(&token_usage),
        usage_cost_cents: dollars_to_cents(&usage_cost_display),
        usage_cost_display,
        is_token_based: raw.is_token_based_call.unwrap_or(false),
        user_display_name,
        cursor_token_fee: raw.cursor_token_fee,
        token_usage,
    })
}

pub fn map_usage_events(value: &Value) -> Result<UsageEventsPage, MapError> {
    let raw = UsageEventsRaw::deserialize(value)
        .map_err(malformed("get-filtered-usage-events"))?;
    let events: Vec<UsageEvent> = raw
        .usage_events_display
        .iter()
        .filter_map(|entry| match UsageEventRaw::deserialize(entry) {
            Ok(event) => map_event(event),
            Err(e) => {
                tracing::debug!("Skipping undecodable usage event: {}", e);
                None
            }
        })
        .collect();
    let total_count = raw.total_usage_events_count.max(events.len() as i64);
    Ok(UsageEventsPage {
        total_count,
        events,
    })
}

// ── Aggregated usage events ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregationRaw {
    model_intent: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    input_tokens: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    output_tokens: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    cache_write_tokens: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    cache_read_tokens: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_cents: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedRaw {
    #[serde(default)]
    aggregations: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    total_input_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    total_output_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    total_cache_write_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    total_cache_read_tokens: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    total_cost_cents: Option<f64>,
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

pub fn map_models_usage_summary(value: &Value) -> Result<ModelsUsageSummary, MapError> {
    let raw = AggregatedRaw::deserialize(value)
        .map_err(malformed("get-aggregated-usage-events"))?;
    let models: Vec<ModelAggregation> = raw
        .aggregations
        .iter()
        .filter_map(|entry| AggregationRaw::deserialize(entry).ok())
        .map(|a| ModelAggregation {
            model_name: a.model_intent.unwrap_or_else(|| "unknown".to_string()),
            input_tokens: a.input_tokens,
            output_tokens: a.output_tokens,
            cache_write_tokens: a.cache_write_tokens,
            cache_read_tokens: a.cache_read_tokens,
            total_cents: a.total_cents,
        })
        .collect();

    let sum = |f: fn(&ModelAggregation) -> i64| models.iter().map(f).sum::<i64>();
    Ok(ModelsUsageSummary {
        total_input_tokens: raw
            .total_input_tokens
            .unwrap_or_else(|| sum(|m| m.input_tokens)),
        total_output_tokens: raw
            .total_output_tokens
            .unwrap_or_else(|| sum(|m| m.output_tokens)),
        total_cache_write_tokens: raw
            .total_cache_write_tokens
            .unwrap_or_else(|| sum(|m| m.cache_write_tokens)),
        total_cache_read_tokens: raw
            .total_cache_read_tokens
            .unwrap_or_else(|| sum(|m| m.cache_read_tokens)),
        total_cost_cents: raw
            .total_cost_cents
            .unwrap_or_else(|| models.iter().map(|m| m.total_cents).sum()),
        models,
    })
}

// ── Current billing cycle ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillingCycleRaw {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    start_date_epoch_millis: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    end_date_epoch_millis: Option<String>,
}

fn required_millis(field: &'static str, raw: Option<String>) -> Result<String, MapError> {
    match raw {
        Some(ms) if time::millis_from_string(&ms).is_some() => Ok(ms.trim().to_string()),
        other => Err(MapError::DataCorrupted {
            field,
            value: other.unwrap_or_default(),
        }),
    }
}

pub fn map_billing_cycle(value: &Value) -> Result<BillingCycle, MapError> {
    let raw = BillingCycleRaw::deserialize(value)
        .map_err(malformed("get-current-billing-cycle"))?;
    Ok(BillingCycle {
        start_ms: required_millis("startDateEpochMillis", raw.start_date_epoch_millis)?,
        end_ms: required_millis("endDateEpochMillis", raw.end_date_epoch_millis)?,
    })
}

// ── Team spend ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamMemberRaw {
    #[serde(default, deserialize_with = "lenient_i64")]
    user_id: i64,
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    included_spend_cents: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    hard_limit_override_dollars: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    spend_cents: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamSpendRaw {
    #[serde(default)]
    team_member_spend: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_pages: i64,
}

pub fn map_team_spend(value: &Value) -> Result<TeamSpendPage, MapError> {
    let raw = TeamSpendRaw::deserialize(value)
        .map_err(malformed("get-team-spend"))?;
    let members = raw
        .team_member_spend
        .iter()
        .filter_map(|entry| TeamMemberRaw::deserialize(entry).ok())
        .map(|m| TeamMemberSpend {
            user_id: m.user_id,
            email: m.email.unwrap_or_default(),
            included_spend_cents: m.included_spend_cents,
            hard_limit_override_dollars: m.hard_limit_override_dollars,
            spend_cents: m.spend_cents,
        })
        .collect();
    Ok(TeamSpendPage {
        members,
        total_pages: u32::try_from(raw.total_pages.max(1)).unwrap_or(1),
    })
}

// ── Dynamic-keyed objects ─────────────────────────────────────────────

/// Object entries in document order; anything but an object yields nothing.
fn entries(value: &Value) -> Vec<(&str, &Value)> {
    value
        .as_object()
        .map(|map| map.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelUsageRaw {
    #[serde(default, deserialize_with = "lenient_i64")]
    num_requests: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    num_requests_total: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    num_tokens: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    max_request_usage: Option<i64>,
}

/// Decode the legacy usage map: every key except `startOfMonth` is a model
/// name. Entries that fail to decode are dropped; a bad `startOfMonth` fails
/// the whole map.
pub fn map_usage_by_model(value: &Value) -> Result<UsageByModel, MapError> {
    let mut models = Vec::new();
    let mut start_of_month = None;

    for (key, raw) in entries(value) {
        if key == START_OF_MONTH_KEY {
            start_of_month = Some(raw.as_str().unwrap_or_default().to_string());
            continue;
        }
        match ModelUsageRaw::deserialize(raw) {
            Ok(usage) => models.push(ModelRequestUsage {
                model_name: key.to_string(),
                num_requests: usage.num_requests,
                num_requests_total: usage.num_requests_total,
                num_tokens: usage.num_tokens,
                max_request_usage: usage.max_request_usage,
            }),
            Err(e) => tracing::debug!("Skipping usage entry '{}': {}", key, e),
        }
    }

    let start_of_month = required_date(START_OF_MONTH_KEY, start_of_month.as_deref())?;
    Ok(UsageByModel {
        models,
        start_of_month,
    })
}

fn model_requests(value: &Value) -> Option<i64> {
    match value {
        Value::Object(map) => map.get("requests").and_then(value_to_i64),
        other => value_to_i64(other),
    }
}

/// `YYYY-MM-DD`, tolerating a time suffix.
fn analytics_date(day: &Value) -> Option<NaiveDate> {
    let raw = day.get("date")?.as_str()?;
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, time::DATE_FORMAT).ok()
}

/// Team analytics: a list of days, each with a model-keyed breakdown.
pub fn map_team_analytics(value: &Value) -> Result<DailyModelRequests, MapError> {
    let days = match value.get("data") {
        Some(Value::Array(days)) => days.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(MapError::DataCorrupted {
                field: "data",
                value: other.to_string(),
            });
        }
    };

    let mut daily: DailyModelRequests = BTreeMap::new();
    for day in days {
        let Some(date) = analytics_date(day) else {
            tracing::debug!("Skipping analytics day without a valid date");
            continue;
        };
        let breakdown = day
            .get("model_breakdown")
            .or_else(|| day.get("modelBreakdown"))
            .unwrap_or(&Value::Null);
        let models = daily.entry(date).or_default();
        for (model, raw) in entries(breakdown) {
            if let Some(requests) = model_requests(raw) {
                *models.entry(model.to_string()).or_insert(0) += requests;
            }
        }
    }
    Ok(daily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dollars_to_cents_table() {
        assert_eq!(dollars_to_cents("$0.04"), 4);
        assert_eq!(dollars_to_cents("$12.00"), 1200);
        assert_eq!(dollars_to_cents(""), 0);
        assert_eq!(dollars_to_cents("garbage"), 0);
        assert_eq!(dollars_to_cents("$-0.00"), 0);
        assert_eq!(dollars_to_cents("$1.25 (incl. fee)"), 125);
        assert_eq!(dollars_to_cents("."), 0);
    }

    #[test]
    fn iso8601_with_and_without_fraction() {
        let with = parse_iso8601("2025-05-01T10:20:30.123Z").unwrap();
        let without = parse_iso8601("2025-05-01T10:20:30Z").unwrap();
        assert_eq!(with.timestamp(), without.timestamp());
        let zoneless = parse_iso8601("2025-05-01T10:20:30").unwrap();
        assert_eq!(zoneless, without);
        assert!(parse_iso8601("May 1st").is_none());
    }

    #[test]
    fn usage_map_skips_bad_entries_and_reads_start_of_month() {
        let value = json!({
            "gpt-4": { "numRequests": 3, "numRequestsTotal": "5", "numTokens": 100 },
            "broken": "not an object",
            "claude-3.5-sonnet": { "numRequests": 2, "maxRequestUsage": 500 },
            "startOfMonth": "2025-05-01T00:00:00.000Z"
        });
        let usage = map_usage_by_model(&value).unwrap();
        let names: Vec<_> = usage.models.iter().map(|m| m.model_name.as_str()).collect();
        assert_eq!(names, vec!["gpt-4", "claude-3.5-sonnet"]);
        assert_eq!(usage.models[0].num_requests_total, 5);
        assert_eq!(usage.models[1].max_request_usage, Some(500));
        assert_eq!(
            usage.start_of_month,
            parse_iso8601("2025-05-01T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn usage_map_with_bad_start_of_month_names_the_value() {
        let value = json!({ "gpt-4": { "numRequests": 1 }, "startOfMonth": "yesterday-ish" });
        let err = map_usage_by_model(&value).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("startOfMonth"), "{message}");
        assert!(message.contains("yesterday-ish"), "{message}");
    }

    #[test]
    fn usage_summary_drops_idle_on_demand() {
        let value = json!({
            "billingCycleStart": "2025-05-01T00:00:00.000Z",
            "billingCycleEnd": "2025-06-01T00:00:00Z",
            "membershipType": "pro",
            "limitType": "user",
            "individualUsage": {
                "plan": { "used": 1500, "limit": 2000, "remaining": 500,
                          "breakdown": { "included": 1500, "bonus": 0, "total": 1500 } },
                "onDemand": { "enabled": true, "used": 0, "limit": 0, "remaining": null }
            },
            "teamUsage": { "onDemand": { "enabled": true, "used": 250, "limit": null } }
        });
        let summary = map_usage_summary(&value).unwrap();
        assert_eq!(summary.membership_type, MembershipType::Pro);
        assert_eq!(summary.individual_usage.plan.used, 1500);
        assert_eq!(summary.individual_usage.plan.breakdown.total, 1500);
        assert!(summary.individual_usage.on_demand.is_none());
        let team = summary.team_usage.unwrap().on_demand.unwrap();
        assert_eq!(team.used, 250);
        assert_eq!(team.limit, None);
    }

    #[test]
    fn usage_summary_keeps_on_demand_with_only_a_limit() {
        let value = json!({
            "billingCycleStart": "2025-05-01T00:00:00Z",
            "billingCycleEnd": "2025-06-01T00:00:00Z",
            "membershipType": "enterprise",
            "individualUsage": { "onDemand": { "used": 0, "limit": 5000 } }
        });
        let summary = map_usage_summary(&value).unwrap();
        let on_demand = summary.individual_usage.on_demand.clone().unwrap();
        assert_eq!(on_demand.limit, Some(5000));
        assert_eq!(summary.hard_limit_dollars(), 50);
    }

    #[test]
    fn usage_summary_requires_billing_cycle_dates() {
        let value = json!({
            "billingCycleStart": "soon",
            "billingCycleEnd": "2025-06-01T00:00:00Z"
        });
        match map_usage_summary(&value).unwrap_err() {
            MapError::DataCorrupted { field, value } => {
                assert_eq!(field, "billingCycleStart");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn events_parse_string_tokens_and_costs() {
        let value = json!({
            "totalUsageEventsCount": 3,
            "usageEventsDisplay": [
                {
                    "timestamp": "1746100000000",
                    "model": "claude-4-sonnet",
                    "kind": "USAGE_EVENT_KIND_INCLUDED_IN_PRO",
                    "usageBasedCosts": "$0.04",
                    "isTokenBasedCall": true,
                    "owningUser": "1234",
                    "cursorTokenFee": 0.5,
                    "tokenUsage": { "inputTokens": "123", "outputTokens": 45,
                                    "cacheReadTokens": "n/a", "totalCents": 4.2 }
                },
                { "timestamp": 1746100001000_i64, "model": "gpt-5" },
                { "model": "missing-timestamp" }
            ]
        });
        let page = map_usage_events(&value).unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.events.len(), 2);

        let first = &page.events[0];
        assert_eq!(first.usage_cost_cents, 4);
        assert_eq!(first.request_cost_count, 1);
        assert_eq!(first.token_usage.input_tokens, Some(123));
        assert_eq!(first.token_usage.output_tokens, Some(45));
        assert_eq!(first.token_usage.cache_read_tokens, Some(0));
        assert_eq!(first.token_usage.cache_write_tokens, None);
        assert_eq!(first.user_display_name, "1234");
        assert!(first.is_token_based);

        let second = &page.events[1];
        assert_eq!(second.occurred_at_ms, "1746100001000");
        assert_eq!(second.usage_cost_cents, 0);
        assert_eq!(second.request_cost_count, 1);
    }

    #[test]
    fn mapping_is_idempotent() {
        let value = json!({
            "totalUsageEventsCount": 1,
            "usageEventsDisplay": [
                { "timestamp": "1746100000000", "model": "gpt-5", "usageBasedCosts": "$0.10" }
            ]
        });
        let first = map_usage_events(&value).unwrap();
        let second = map_usage_events(&value).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn aggregated_events_parse_string_counts_and_compute_missing_totals() {
        let value = json!({
            "aggregations": [
                { "modelIntent": "claude-4-sonnet", "inputTokens": "1000", "outputTokens": "200",
                  "cacheWriteTokens": "0", "cacheReadTokens": "5000", "totalCents": 12.5 },
                { "modelIntent": "gpt-5", "inputTokens": "10", "totalCents": 1 }
            ],
            "totalCostCents": 13.5
        });
        let summary = map_models_usage_summary(&value).unwrap();
        assert_eq!(summary.models.len(), 2);
        assert_eq!(summary.models[0].cache_read_tokens, 5000);
        assert_eq!(summary.total_input_tokens, 1010);
        assert_eq!(summary.total_cache_read_tokens, 5000);
        assert!((summary.total_cost_cents - 13.5).abs() < 1e-10);
    }

    #[test]
    fn billing_cycle_accepts_string_or_number_millis() {
        let cycle = map_billing_cycle(&json!({
            "startDateEpochMillis": "1746057600000",
            "endDateEpochMillis": 1748736000000_i64
        }))
        .unwrap();
        assert_eq!(cycle.start_ms, "1746057600000");
        assert_eq!(cycle.end_ms, "1748736000000");

        let bad = json!({ "startDateEpochMillis": "abc" });
        let err = map_billing_cycle(&bad).unwrap_err();
        assert!(err.to_string().contains("startDateEpochMillis"));
    }

    #[test]
    fn team_spend_reads_roster() {
        let page = map_team_spend(&json!({
            "teamMemberSpend": [
                { "userId": 7, "email": "a@x.io",
                  "includedSpendCents": 2000, "hardLimitOverrideDollars": 5 },
                { "userId": "8", "email": "b@x.io" }
            ],
            "totalPages": 2
        }))
        .unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.members[0].free_usage_cents(), 1500);
        assert_eq!(page.members[1].user_id, 8);
    }

    #[test]
    fn team_analytics_sums_requests_and_skips_bad_entries() {
        let daily = map_team_analytics(&json!({
            "data": [
                { "date": "2025-05-01", "model_breakdown": {
                    "gpt-5": { "requests": 4, "users": 1 },
                    "claude-4-sonnet": { "requests": "2" },
                    "weird": { "users": 3 }
                } },
                { "date": "not-a-date", "model_breakdown": { "gpt-5": { "requests": 9 } } }
            ]
        }))
        .unwrap();
        assert_eq!(daily.len(), 1);
        let day = &daily[&NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()];
        assert_eq!(day["gpt-5"], 4);
        assert_eq!(day["claude-4-sonnet"], 2);
        assert!(!day.contains_key("weird"));
    }

    #[test]
    fn credentials_require_user_id() {
        let me = json!({
            "userId": 42,
            "workosId": "user_01",
            "email": "me@x.io",
            "teamId": 9,
            "isEnterpriseUser": false
        });
        let creds = map_credentials(&me, "WorkosCursorSessionToken=abc").unwrap();
        assert_eq!(creds.user_id, 42);
        assert_eq!(creds.team_id, 9);
        assert_eq!(creds.cookie_header, "WorkosCursorSessionToken=abc");

        assert!(map_credentials(&json!({ "email": "me@x.io" }), "c").is_err());
    }
}
