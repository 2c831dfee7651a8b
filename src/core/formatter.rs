use chrono::{DateTime, Utc};

/// Returns "$12.34" for 1234 cents.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Same as [`format_cents`] for fractional cent amounts.
pub fn format_cents_f64(cents: f64) -> String {
    format!("${:.2}", cents / 100.0)
}

/// Compact token count: 950, 12.3K, 4.5M.
pub fn format_tokens(tokens: i64) -> String {
    let value = tokens as f64;
    if tokens.abs() >= 1_000_000 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if tokens.abs() >= 1_000 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Returns "{used}% used", rounded to nearest integer.
pub fn format_used_percent(used_percent: f64) -> String {
    format!("{}% used", used_percent.clamp(0.0, 100.0).round() as u64)
}

/// Returns "Resets in Xh Ym" relative to now. If past, returns "Resets now".
/// If more than 24 hours away, includes days.
pub fn format_reset_countdown(resets_at: &DateTime<Utc>) -> String {
    format_reset_countdown_at(resets_at, Utc::now())
}

pub fn format_reset_countdown_at(resets_at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_seconds = (*resets_at - now).num_seconds();

    if total_seconds <= 0 {
        return "Resets now".to_string();
    }

    let total_minutes = total_seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 24 {
        let days = hours / 24;
        let remaining_hours = hours % 24;
        if remaining_hours == 0 {
            format!("Resets in {}d", days)
        } else {
            format!("Resets in {}d {}h", days, remaining_hours)
        }
    } else if hours > 0 {
        format!("Resets in {}h {}m", hours, minutes)
    } else {
        format!("Resets in {}m", total_minutes.max(1))
    }
}

/// Returns "[████████░░░░]" where █ = used portion, ░ = remaining portion.
pub fn format_usage_bar(used_percent: f64, width: usize) -> String {
    let used_percent = used_percent.clamp(0.0, 100.0);
    let used_blocks = ((used_percent / 100.0) * width as f64).round() as usize;
    let remaining_blocks = width.saturating_sub(used_blocks);

    format!("[{}{}]", "█".repeat(used_blocks), "░".repeat(remaining_blocks))
}

/// Horizontal bar scaled against `max`, for the daily chart.
pub fn format_chart_bar(value: i64, max: i64, width: usize) -> String {
    if max <= 0 || value <= 0 {
        return String::new();
    }
    let blocks = ((value as f64 / max as f64) * width as f64).ceil() as usize;
    "▇".repeat(blocks.min(width))
}
