//! Document model and search index payload

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{format_date, Revision};

/// Doc type under which documents are mirrored to the search index
pub const DOCUMENT_DOC_TYPE: &str = "documents.document";

/// Engineering document, with the latest revision's fields denormalised
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub category_id: i64,
    pub document_key: String,
    pub contract_number: String,
    pub originator: String,
    pub unit: String,
    pub discipline: String,
    pub document_type: String,
    pub sequential_number: String,
    pub title: String,
    pub latest_revision_id: Option<i64>,
    pub current_revision: i64,
    pub current_revision_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parts a document key is composed of
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentKeyParts {
    pub contract_number: String,
    pub originator: String,
    pub unit: String,
    pub discipline: String,
    pub document_type: String,
    pub sequential_number: String,
}

impl DocumentKeyParts {
    /// Join the parts into a key such as `FAC09001-FWF-000-HSE-REP-0004`
    pub fn document_key(&self) -> String {
        [
            self.contract_number.as_str(),
            self.originator.as_str(),
            self.unit.as_str(),
            self.discipline.as_str(),
            self.document_type.as_str(),
            self.sequential_number.as_str(),
        ]
        .join("-")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("contract_number", self.contract_number.as_str()),
            ("originator", self.originator.as_str()),
            ("unit", self.unit.as_str()),
            ("discipline", self.discipline.as_str()),
            ("document_type", self.document_type.as_str()),
            ("sequential_number", self.sequential_number.as_str()),
        ]
        .into_iter()
    }
}

impl Document {
    /// Search index body: document fields plus the latest revision's review fields
    pub fn to_index_json(&self, latest: Option<&Revision>) -> serde_json::Value {
        let mut body = json!({
            "id": self.id,
            "category_id": self.category_id,
            "document_key": self.document_key,
            "title": self.title,
            "contract_number": self.contract_number,
            "originator": self.originator,
            "unit": self.unit,
            "discipline": self.discipline,
            "document_type": self.document_type,
            "sequential_number": self.sequential_number,
            "status": self.status,
            "current_revision": self.current_revision,
            "current_revision_date": self.current_revision_date.map(format_date),
        });

        if let (Some(rev), Some(map)) = (latest, body.as_object_mut()) {
            map.insert("klass".into(), json!(rev.klass));
            map.insert("received_date".into(), json!(rev.received_date.map(format_date)));
            map.insert("leader_id".into(), json!(rev.leader_id));
            map.insert("approver_id".into(), json!(rev.approver_id));
            map.insert("reviewers".into(), json!(rev.reviewers));
            map.insert("under_review".into(), json!(rev.is_under_review()));
            map.insert("review_state".into(), json!(rev.review_state().to_string()));
            map.insert("review_start_date".into(), json!(rev.review_start_date.map(format_date)));
            map.insert("review_due_date".into(), json!(rev.review_due_date.map(format_date)));
            map.insert("review_end_date".into(), json!(rev.review_end_date.map(format_date)));
        }
        body
    }
}

/// Request to register a revision of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRevisionRequest {
    pub revision: i64,
    pub revision_date: NaiveDate,
    pub status: Option<String>,
    pub received_date: Option<NaiveDate>,
    pub klass: Option<i64>,
    #[serde(default)]
    pub reviewers: Vec<i64>,
    pub leader_id: Option<i64>,
    pub approver_id: Option<i64>,
}

/// Request to create a document together with its first revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    pub category_id: i64,
    #[serde(flatten)]
    pub key: DocumentKeyParts,
    pub title: String,
    pub revision: NewRevisionRequest,
}

/// Document with its revisions, newest first
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub revisions: Vec<Revision>,
}
