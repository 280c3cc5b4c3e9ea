//! Search index mapping generation

use serde_json::{json, Map, Value};

use crate::models::FILTER_COLUMNS;

/// Storage kind of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    Time,
    Boolean,
}

/// Fields the document list can be filtered on
pub const FILTER_FIELDS: [&str; 8] = [
    "contract_number",
    "originator",
    "unit",
    "discipline",
    "document_type",
    "status",
    "klass",
    "under_review",
];

/// Known kinds of document and latest revision fields
const FIELD_KINDS: &[(&str, FieldKind)] = &[
    ("document_key", FieldKind::Text),
    ("title", FieldKind::Text),
    ("contract_number", FieldKind::Text),
    ("originator", FieldKind::Text),
    ("unit", FieldKind::Text),
    ("discipline", FieldKind::Text),
    ("document_type", FieldKind::Text),
    ("sequential_number", FieldKind::Text),
    ("status", FieldKind::Text),
    ("current_revision", FieldKind::Integer),
    ("current_revision_date", FieldKind::Date),
    ("klass", FieldKind::Integer),
    ("received_date", FieldKind::Date),
    ("under_review", FieldKind::Boolean),
    ("review_start_date", FieldKind::Date),
    ("review_due_date", FieldKind::Date),
    ("review_end_date", FieldKind::Date),
];

/// Index type name for a field kind; unknown fields are indexed as strings
pub fn mapping_type(kind: Option<FieldKind>) -> &'static str {
    match kind {
        Some(FieldKind::Text) | None => "string",
        Some(FieldKind::Integer) => "long",
        Some(FieldKind::Decimal) => "double",
        Some(FieldKind::Date) | Some(FieldKind::Time) => "date",
        Some(FieldKind::Boolean) => "boolean",
    }
}

pub fn field_kind(name: &str) -> Option<FieldKind> {
    FIELD_KINDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, kind)| *kind)
}

/// Build a mapping for the given fields
///
/// Each field is indexed twice: analyzed for search and as a `raw`
/// not_analyzed sub-field for sorting and exact filtering.
pub fn get_mapping<'a>(fields: impl IntoIterator<Item = &'a str>) -> Value {
    let mut properties = Map::new();
    for name in fields {
        let es_type = mapping_type(field_kind(name));
        properties.insert(
            name.to_string(),
            json!({
                "type": es_type,
                "fields": {
                    "raw": {
                        "type": es_type,
                        "index": "not_analyzed"
                    }
                }
            }),
        );
    }
    json!({ "properties": properties })
}

/// Mapping of the document doc type: filter fields plus list columns
pub fn document_mapping() -> Value {
    get_mapping(FILTER_FIELDS.iter().chain(FILTER_COLUMNS.iter()).copied())
}
