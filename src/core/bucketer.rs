//! Grouping of usage events into local-time hours and days.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::core::models::chart::{
    ChartDataPoint, DailyModelRequests, ModelUsageCount, ModelsUsageChartData,
};
use crate::core::models::usage::UsageEvent;
use crate::core::time;

/// Shortest axis the daily chart ever shows.
pub const MIN_CHART_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBucket {
    /// Local wall-clock start of the hour.
    pub hour_start: NaiveDateTime,
    pub events: Vec<UsageEvent>,
    pub total_requests: i64,
    pub total_cost_cents: i64,
    pub total_tokens: i64,
}

impl HourlyBucket {
    fn empty(hour_start: NaiveDateTime) -> Self {
        Self {
            hour_start,
            events: Vec::new(),
            total_requests: 0,
            total_cost_cents: 0,
            total_tokens: 0,
        }
    }

    fn push(&mut self, event: &UsageEvent) {
        self.total_requests += event.request_cost_count;
        self.total_cost_cents += event.usage_cost_cents;
        self.total_tokens += event.token_usage.total_tokens();
        self.events.push(event.clone());
    }
}

fn hour_of(event: &UsageEvent) -> Option<NaiveDateTime> {
    event
        .occurred_at_millis()
        .and_then(time::local_hour_start_of_millis)
}

fn into_descending(buckets: BTreeMap<NaiveDateTime, HourlyBucket>) -> Vec<HourlyBucket> {
    buckets.into_values().rev().collect()
}

/// Group events by local hour, most recent hour first.
pub fn group_by_hour(events: &[UsageEvent]) -> Vec<HourlyBucket> {
    let mut buckets: BTreeMap<NaiveDateTime, HourlyBucket> = BTreeMap::new();
    for event in events {
        let Some(hour) = hour_of(event) else {
            tracing::debug!("Dropping event with bad timestamp '{}'", event.occurred_at_ms);
            continue;
        };
        buckets
            .entry(hour)
            .or_insert_with(|| HourlyBucket::empty(hour))
            .push(event);
    }
    into_descending(buckets)
}

/// Like [`group_by_hour`] but restricted to `[start_ms, end_ms]`, with an
/// empty bucket for every hour in the range that saw no events.
pub fn group_by_hour_in_range(
    events: &[UsageEvent],
    start_ms: i64,
    end_ms: i64,
) -> Vec<HourlyBucket> {
    let (Some(first), Some(last)) = (
        time::local_hour_start_of_millis(start_ms),
        time::local_hour_start_of_millis(end_ms),
    ) else {
        return Vec::new();
    };

    let in_range: Vec<UsageEvent> = events
        .iter()
        .filter(|e| within(e, start_ms, end_ms))
        .cloned()
        .collect();
    let mut buckets: BTreeMap<NaiveDateTime, HourlyBucket> = group_by_hour(&in_range)
        .into_iter()
        .map(|bucket| (bucket.hour_start, bucket))
        .collect();

    let mut hour = first;
    while hour <= last {
        buckets
            .entry(hour)
            .or_insert_with(|| HourlyBucket::empty(hour));
        hour += Duration::hours(1);
    }
    into_descending(buckets)
}

fn within(event: &UsageEvent, start_ms: i64, end_ms: i64) -> bool {
    event
        .occurred_at_millis()
        .is_some_and(|ms| ms >= start_ms && ms <= end_ms)
}

/// Request totals for each of `days`, zero for days without events.
pub fn requests_on_days(events: &[UsageEvent], days: &[NaiveDate]) -> Vec<i64> {
    days.iter()
        .map(|day| {
            let (start_ms, end_ms) = time::day_range(*day);
            events
                .iter()
                .filter(|e| within(e, start_ms, end_ms))
                .map(|e| e.request_cost_count)
                .sum()
        })
        .collect()
}

/// Per-day, per-model request counts of the given events.
pub fn daily_model_requests(events: &[UsageEvent]) -> DailyModelRequests {
    let mut daily: DailyModelRequests = BTreeMap::new();
    for event in events {
        let date = event
            .occurred_at_millis()
            .and_then(time::local_date_of_millis);
        let Some(date) = date else {
            continue;
        };
        *daily
            .entry(date)
            .or_default()
            .entry(event.model_name.clone())
            .or_insert(0) += event.request_cost_count;
    }
    daily
}

/// Calendar days shown on the chart.
///
/// The end is clamped to today. A window shorter than [`MIN_CHART_DAYS`] is
/// replaced by the last seven days ending today.
pub fn chart_axis(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    let end = end.min(today);
    let span = (end - start).num_days() + 1;
    let first = if span < MIN_CHART_DAYS {
        today - Duration::days(MIN_CHART_DAYS - 1)
    } else {
        start
    };
    let last = if span < MIN_CHART_DAYS { today } else { end };

    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

fn data_point(date: NaiveDate, models: Option<&BTreeMap<String, i64>>) -> ChartDataPoint {
    let mut model_usages: Vec<ModelUsageCount> = models
        .map(|m| {
            m.iter()
                .map(|(name, requests)| ModelUsageCount {
                    model_name: name.clone(),
                    requests: *requests,
                })
                .collect()
        })
        .unwrap_or_default();
    model_usages.sort_by(|a, b| {
        b.requests
            .cmp(&a.requests)
            .then_with(|| a.model_name.cmp(&b.model_name))
    });
    let total_value = model_usages.iter().map(|m| m.requests).sum();
    ChartDataPoint {
        date: date.format(time::DATE_FORMAT).to_string(),
        date_label: date.format("%m/%d").to_string(),
        model_usages,
        total_value,
    }
}

/// Lay per-day counts on the axis for `[start_ms, end_ms]`, zero-filling
/// days without data.
pub fn build_chart(
    daily: &DailyModelRequests,
    start_ms: i64,
    end_ms: i64,
    today: NaiveDate,
) -> ModelsUsageChartData {
    let start = time::local_date_of_millis(start_ms).unwrap_or(today);
    let end = time::local_date_of_millis(end_ms).unwrap_or(today);
    let data_points = chart_axis(start, end, today)
        .into_iter()
        .map(|date| data_point(date, daily.get(&date)))
        .collect();
    ModelsUsageChartData { data_points }
}

pub fn chart_from_events(
    events: &[UsageEvent],
    start_ms: i64,
    end_ms: i64,
    today: NaiveDate,
) -> ModelsUsageChartData {
    build_chart(&daily_model_requests(events), start_ms, end_ms, today)
}
