//! CSV import batches and their per-line results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a batch or of a single imported line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    New,
    Started,
    Success,
    PartialSuccess,
    Error,
}

impl ImportStatus {
    /// Final batch status given per-line outcomes
    pub fn aggregate(succeeded: usize, total: usize) -> Self {
        if total == 0 || succeeded == 0 {
            ImportStatus::Error
        } else if succeeded == total {
            ImportStatus::Success
        } else {
            ImportStatus::PartialSuccess
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportStatus::New => write!(f, "new"),
            ImportStatus::Started => write!(f, "started"),
            ImportStatus::Success => write!(f, "success"),
            ImportStatus::PartialSuccess => write!(f, "partial_success"),
            ImportStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ImportStatus::New),
            "started" => Ok(ImportStatus::Started),
            "success" => Ok(ImportStatus::Success),
            "partial_success" => Ok(ImportStatus::PartialSuccess),
            "error" => Ok(ImportStatus::Error),
            _ => Err(format!("Invalid import status: {}", s)),
        }
    }
}

/// An uploaded CSV file and its processing status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub uid: String,
    pub category_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub imports: Vec<Import>,
}

/// Outcome of one CSV line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub line: i64,
    pub document_id: Option<i64>,
    pub status: ImportStatus,
    pub errors: Option<String>,
}

/// One CSV record
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    pub contract_number: String,
    pub originator: String,
    pub unit: String,
    pub discipline: String,
    pub document_type: String,
    pub sequential_number: String,
    pub title: String,
    pub revision: i64,
    pub revision_date: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub received_date: Option<String>,
    #[serde(default)]
    pub klass: Option<i64>,
}
