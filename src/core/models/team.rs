use serde::{Deserialize, Serialize};

/// One row of the team spend roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberSpend {
    pub user_id: i64,
    pub email: String,
    pub included_spend_cents: i64,
    pub hard_limit_override_dollars: i64,
    pub spend_cents: i64,
}

impl TeamMemberSpend {
    /// Included spend not yet covered by the member's hard-limit override,
    /// floored at zero.
    pub fn free_usage_cents(&self) -> i64 {
        (self.included_spend_cents - self.hard_limit_override_dollars * 100).max(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamSpendPage {
    pub members: Vec<TeamMemberSpend>,
    pub total_pages: u32,
}
