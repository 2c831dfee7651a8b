use serde::{Deserialize, Serialize};

/// User preferences persisted in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub refresh_interval_secs: u64,
    pub paused_poll_secs: u64,
    pub analytics_days: u32,
    pub usage_history_limit: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            paused_poll_secs: 30,
            analytics_days: 7,
            usage_history_limit: 100,
        }
    }
}

impl AppSettings {
    pub const KEYS: &'static [&'static str] = &[
        "refresh_interval_secs",
        "paused_poll_secs",
        "analytics_days",
        "usage_history_limit",
    ];

    /// Set one field from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let parse_err = |_| format!("'{}' is not a valid number for {}", value, key);
        match key {
            "refresh_interval_secs" => {
                self.refresh_interval_secs = value.parse().map_err(parse_err)?
            }
            "paused_poll_secs" => self.paused_poll_secs = value.parse().map_err(parse_err)?,
            "analytics_days" => self.analytics_days = value.parse().map_err(parse_err)?,
            "usage_history_limit" => self.usage_history_limit = value.parse().map_err(parse_err)?,
            other => {
                return Err(format!(
                    "Unknown setting '{}' (expected one of: {})",
                    other,
                    Self::KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_five_minute_polling() {
        let settings = AppSettings::default();
        assert_eq!(settings.refresh_interval_secs, 300);
        assert_eq!(settings.paused_poll_secs, 30);
        assert_eq!(settings.analytics_days, 7);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: AppSettings =
            serde_json::from_value(serde_json::json!({ "analyticsDays": 14 })).unwrap();
        assert_eq!(settings.analytics_days, 14);
        assert_eq!(settings.refresh_interval_secs, 300);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_numbers() {
        let mut settings = AppSettings::default();
        assert!(settings.set("analytics_days", "30").is_ok());
        assert_eq!(settings.analytics_days, 30);
        assert!(settings.set("analytics_days", "many").is_err());
        let err = settings.set("theme", "dark").unwrap_err();
        assert!(err.contains("Unknown setting"));
    }
}
