use colored::{control, ColoredString, Colorize};

use crate::core::bucketer;
use crate::core::formatter::{
    format_cents, format_cents_f64, format_chart_bar, format_reset_countdown, format_tokens,
    format_usage_bar, format_used_percent,
};
use crate::core::models::snapshot::DashboardSnapshot;
use crate::core::refresh::RefreshStatus;
use crate::core::time;

const BAR_WIDTH: usize = 12;
const CHART_WIDTH: usize = 24;
const RECENT_HOURS: usize = 6;

/// Render the dashboard snapshot as a colored (or plain) string.
///
/// Layout:
/// ```text
///  me@example.com (Pro)
///   Plan      75% used [█████████░░░]
///             Resets in 12d 3h
///   Cycle     06/01 to 07/01
///   Spend     $17.50 of $100 limit
///   Requests  3 today, 5 yesterday, 120 this cycle
///   Models
///     claude-4-sonnet          $0.42    (1.2K in / 300 out)
///     total                    $0.42    (1.5K tokens)
///   Daily     12 requests
///     06/04  ▇▇▇▇▇▇          12
///   Recent
///     06/10 14:00   3 req  $0.16  1.5K tok
/// ```
pub fn render_snapshot(snapshot: &DashboardSnapshot, use_color: bool) -> String {
    control::set_override(use_color);

    let summary = &snapshot.usage_summary;
    let mut lines: Vec<String> = Vec::new();

    let header = format!(
        " {} ({})",
        snapshot.email,
        summary.membership_type.display_name()
    );
    lines.push(header.bold().to_string());

    let plan = &summary.individual_usage.plan;
    if plan.limit > 0 {
        let used_percent = plan.used_percent();
        lines.push(format!(
            "  {}  {} {}",
            format!("{:<8}", "Plan").cyan(),
            color_by_used(used_percent, &format_used_percent(used_percent)),
            format_usage_bar(used_percent, BAR_WIDTH).magenta()
        ));
        lines.push(format!(
            "            {}",
            format_reset_countdown(&summary.billing_cycle_end).dimmed()
        ));
    }

    if let Some(cycle) = cycle_label(snapshot) {
        lines.push(format!("  {}  {}", format!("{:<8}", "Cycle").cyan(), cycle));
    }

    let spend = if snapshot.hard_limit_dollars > 0 {
        format!(
            "{} of ${} limit",
            format_cents(snapshot.spending_cents),
            snapshot.hard_limit_dollars
        )
    } else {
        format_cents(snapshot.spending_cents)
    };
    lines.push(format!("  {}  {}", format!("{:<8}", "Spend").cyan(), spend));

    if snapshot.free_usage_cents > 0 {
        lines.push(format!(
            "  {}  {}",
            format!("{:<8}", "Free").cyan(),
            format_cents(snapshot.free_usage_cents)
        ));
    }

    lines.push(format!(
        "  {}  {} today, {} yesterday, {} this cycle",
        format!("{:<8}", "Requests").cyan(),
        snapshot.request_today,
        snapshot.request_yesterday,
        snapshot.total_requests_all_models
    ));

    if let Some(models) = &snapshot.models_usage_summary {
        if !models.models.is_empty() {
            lines.push(format!("  {}", "Models".cyan()));
            for model in models.sorted_by_cost() {
                lines.push(format!(
                    "    {:<24} {:<8} ({} in / {} out)",
                    model.model_name,
                    format_cents_f64(model.total_cents),
                    format_tokens(model.input_tokens),
                    format_tokens(model.output_tokens)
                ));
            }
            lines.push(format!(
                "    {} {:<8} ({} tokens)",
                format!("{:<24}", "total").dimmed(),
                format_cents_f64(models.total_cost_cents),
                format_tokens(models.total_tokens())
            ));
        }
    }

    if let Some(chart) = &snapshot.models_usage_chart {
        let max = chart
            .data_points
            .iter()
            .map(|p| p.total_value)
            .max()
            .unwrap_or(0);
        lines.push(format!(
            "  {}  {} requests",
            format!("{:<8}", "Daily").cyan(),
            chart.total_requests()
        ));
        for point in &chart.data_points {
            let top = point
                .model_usages
                .first()
                .map(|m| m.model_name.as_str())
                .unwrap_or("");
            lines.push(format!(
                "    {}  {:<width$} {:>4}  {}",
                point.date_label,
                format_chart_bar(point.total_value, max, CHART_WIDTH).green(),
                point.total_value,
                top.dimmed(),
                width = CHART_WIDTH
            ));
        }
    }

    if !snapshot.usage_events.is_empty() {
        let (start_ms, end_ms) = time::yesterday_to_now_range();
        let hours = bucketer::group_by_hour_in_range(&snapshot.usage_events, start_ms, end_ms);
        lines.push(format!("  {}", "Recent".cyan()));
        for bucket in hours.iter().take(RECENT_HOURS) {
            let line = format!(
                "    {}  {:>3} req  {}  {} tok",
                bucket.hour_start.format("%m/%d %H:%M"),
                bucket.total_requests,
                format_cents(bucket.total_cost_cents),
                format_tokens(bucket.total_tokens)
            );
            if bucket.events.is_empty() {
                lines.push(line.dimmed().to_string());
            } else {
                lines.push(line);
            }
        }
    }

    lines.join("\n")
}

/// `MM/dd to MM/dd` of the billing cycle stored in the snapshot.
fn cycle_label(snapshot: &DashboardSnapshot) -> Option<String> {
    let start = snapshot.billing_cycle_start_ms.as_deref()?;
    let end = snapshot.billing_cycle_end_ms.as_deref()?;
    let start = time::date_from_milliseconds_string(start)?;
    let end = time::date_from_milliseconds_string(end)?;
    Some(format!("{} to {}", start.format("%m/%d"), end.format("%m/%d")))
}

pub fn render_status(status: &RefreshStatus, use_color: bool) -> String {
    control::set_override(use_color);
    let state: ColoredString = if status.paused {
        "paused".yellow()
    } else if status.refreshing {
        "refreshing".cyan()
    } else if status.running {
        "live".green()
    } else {
        "stopped".dimmed()
    };
    format!(
        " [{}]  p pause · r resume · n refresh · f force refresh · q quit",
        state
    )
}

/// Color the percent string green/yellow/red based on how much is used.
fn color_by_used(used_percent: f64, text: &str) -> ColoredString {
    if used_percent < 75.0 {
        text.green()
    } else if used_percent < 90.0 {
        text.yellow()
    } else {
        text.red()
    }
}
