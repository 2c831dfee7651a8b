use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    Free,
    FreeTrial,
    Pro,
    ProPlus,
    Ultra,
    Enterprise,
}

impl MembershipType {
    /// Parse an upstream membership string. Unknown values fall back to `Free`.
    pub fn from_upstream(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "free_trial" | "freetrial" => Self::FreeTrial,
            "pro" => Self::Pro,
            "pro_plus" | "proplus" => Self::ProPlus,
            "ultra" => Self::Ultra,
            "enterprise" => Self::Enterprise,
            "free" => Self::Free,
            other => {
                tracing::debug!("Unknown membership type '{}', treating as free", other);
                Self::Free
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::FreeTrial => "Free Trial",
            Self::Pro => "Pro",
            Self::ProPlus => "Pro+",
            Self::Ultra => "Ultra",
            Self::Enterprise => "Enterprise",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBreakdown {
    pub included: i64,
    pub bonus: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanUsage {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
    pub breakdown: PlanBreakdown,
}

impl PlanUsage {
    pub fn used_percent(&self) -> f64 {
        if self.limit <= 0 {
            return 0.0;
        }
        (self.used as f64 / self.limit as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandUsage {
    pub used: i64,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualUsage {
    pub plan: PlanUsage,
    pub on_demand: Option<OnDemandUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUsage {
    pub on_demand: Option<OnDemandUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub billing_cycle_start: DateTime<Utc>,
    pub billing_cycle_end: DateTime<Utc>,
    pub membership_type: MembershipType,
    pub limit_type: String,
    pub individual_usage: IndividualUsage,
    pub team_usage: Option<TeamUsage>,
}

impl UsageSummary {
    /// Included plan spend plus individual on-demand spend, in cents.
    pub fn spending_cents(&self) -> i64 {
        let on_demand = self
            .individual_usage
            .on_demand
            .as_ref()
            .map(|od| od.used)
            .unwrap_or(0);
        self.individual_usage.plan.used + on_demand
    }

    /// On-demand hard limit in whole dollars, individual first then team.
    pub fn hard_limit_dollars(&self) -> i64 {
        let individual = self
            .individual_usage
            .on_demand
            .as_ref()
            .and_then(|od| od.limit);
        let team = self
            .team_usage
            .as_ref()
            .and_then(|t| t.on_demand.as_ref())
            .and_then(|od| od.limit);
        individual.or(team).map(|cents| cents / 100).unwrap_or(0)
    }
}

/// Billing cycle boundaries as epoch-millisecond strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCycle {
    pub start_ms: String,
    pub end_ms: String,
}
