//! Transmittals: batches of revisions sent from one category to another

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmittalStatus {
    New,
    Accepted,
    Rejected,
}

impl Default for TransmittalStatus {
    fn default() -> Self {
        Self::New
    }
}

impl std::fmt::Display for TransmittalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransmittalStatus::New => write!(f, "new"),
            TransmittalStatus::Accepted => write!(f, "accepted"),
            TransmittalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TransmittalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(TransmittalStatus::New),
            "accepted" => Ok(TransmittalStatus::Accepted),
            "rejected" => Ok(TransmittalStatus::Rejected),
            _ => Err(format!("Invalid transmittal status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transmittal {
    pub id: i64,
    pub transmittal_key: String,
    pub from_category_id: i64,
    pub to_category_id: i64,
    pub sequential_number: i64,
    pub status: TransmittalStatus,
    pub revision_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

/// Build a transmittal key such as `FWF-EDF-TRS-00042`
pub fn transmittal_key(from_org: &str, to_org: &str, sequential_number: i64) -> String {
    format!("{}-{}-TRS-{:05}", from_org, to_org, sequential_number)
}

/// Request to create a transmittal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransmittalRequest {
    pub from_category_id: i64,
    pub to_category_id: i64,
    #[serde(default)]
    pub revision_ids: Vec<i64>,
}
