//! Account classification: which upstream sources a given account reads.

use crate::core::models::summary::MembershipType;

/// Where the per-model usage chart comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSource {
    /// Team analytics endpoint, already bucketed by day upstream.
    TeamAnalytics,
    /// Filtered usage events, bucketed client-side.
    FilteredEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountClass {
    pub team_plan: bool,
    pub pro_series: bool,
}

impl AccountClass {
    pub fn chart_source(&self) -> ChartSource {
        if self.team_plan {
            ChartSource::TeamAnalytics
        } else {
            ChartSource::FilteredEvents
        }
    }

    /// Only Team Plan seats have a per-member free usage figure.
    pub fn fetches_team_free_usage(&self) -> bool {
        self.team_plan
    }

    /// Per-model cost/token totals are read for individual paid tiers only.
    pub fn fetches_model_aggregation(&self) -> bool {
        self.pro_series
    }
}

/// Upstream reports Team Plan seats as `enterprise`; `is_enterprise_user`
/// tells them apart from real Enterprise accounts.
pub fn is_team_plan(membership: MembershipType, is_enterprise_user: bool) -> bool {
    membership == MembershipType::Enterprise && !is_enterprise_user
}

pub fn is_pro_series(membership: MembershipType) -> bool {
    matches!(
        membership,
        MembershipType::Pro | MembershipType::ProPlus | MembershipType::Ultra
    )
}

pub fn classify(membership: MembershipType, is_enterprise_user: bool) -> AccountClass {
    AccountClass {
        team_plan: is_team_plan(membership, is_enterprise_user),
        pro_series: is_pro_series(membership),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enterprise_without_enterprise_user_is_team_plan() {
        assert!(is_team_plan(MembershipType::Enterprise, false));
        assert!(!is_team_plan(MembershipType::Enterprise, true));
    }

    #[test]
    fn pro_is_pro_series_not_team_plan() {
        let class = classify(MembershipType::Pro, false);
        assert!(class.pro_series);
        assert!(!class.team_plan);
        assert_eq!(class.chart_source(), ChartSource::FilteredEvents);
        assert!(class.fetches_model_aggregation());
        assert!(!class.fetches_team_free_usage());
    }

    #[test]
    fn pro_series_membership() {
        assert!(is_pro_series(MembershipType::ProPlus));
        assert!(is_pro_series(MembershipType::Ultra));
        assert!(!is_pro_series(MembershipType::Free));
        assert!(!is_pro_series(MembershipType::FreeTrial));
        assert!(!is_pro_series(MembershipType::Enterprise));
    }

    #[test]
    fn team_plan_reads_team_sources() {
        let class = classify(MembershipType::Enterprise, false);
        assert_eq!(class.chart_source(), ChartSource::TeamAnalytics);
        assert!(class.fetches_team_free_usage());
        assert!(!class.fetches_model_aggregation());
    }

    #[test]
    fn true_enterprise_and_free_use_filtered_events_without_extras() {
        for class in [
            classify(MembershipType::Enterprise, true),
            classify(MembershipType::Free, false),
        ] {
            assert_eq!(class.chart_source(), ChartSource::FilteredEvents);
            assert!(!class.fetches_team_free_usage());
            assert!(!class.fetches_model_aggregation());
        }
    }
}
