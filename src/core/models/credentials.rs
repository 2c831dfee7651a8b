use serde::{Deserialize, Serialize};

/// Session credentials captured at login. The cookie header is opaque and is
/// replayed verbatim on every upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub user_id: i64,
    pub workos_id: String,
    pub email: String,
    pub team_id: i64,
    pub cookie_header: String,
    #[serde(default)]
    pub is_enterprise_user: bool,
}
