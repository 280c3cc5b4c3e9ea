//! Distribution lists: reviewer presets applied to revisions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionList {
    pub id: i64,
    pub name: String,
    pub leader_id: Option<i64>,
    pub approver_id: Option<i64>,
    pub reviewers: Vec<i64>,
    pub categories: Vec<i64>,
}

/// Request to create a distribution list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDistributionListRequest {
    pub name: String,
    pub leader_id: Option<i64>,
    pub approver_id: Option<i64>,
    #[serde(default)]
    pub reviewers: Vec<i64>,
    #[serde(default)]
    pub categories: Vec<i64>,
}
