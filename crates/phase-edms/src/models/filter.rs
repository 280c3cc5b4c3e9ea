//! DataTables-style list/filter query and response

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EdmsError, EdmsResult};

/// Columns of the document list, in display order
pub const FILTER_COLUMNS: [&str; 9] = [
    "document_key",
    "title",
    "status",
    "current_revision",
    "current_revision_date",
    "discipline",
    "document_type",
    "unit",
    "originator",
];

/// Fields matched by the global search term
pub const SEARCHABLE_FIELDS: [&str; 7] = [
    "document_key",
    "title",
    "status",
    "discipline",
    "document_type",
    "unit",
    "originator",
];

/// Upper bound on the page length
pub const MAX_DISPLAY_LENGTH: u32 = 1000;

/// Parsed list/filter parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub echo: String,
    pub start: u32,
    pub length: u32,
    pub sort_column: &'static str,
    pub sort_desc: bool,
    pub search: Option<String>,
    pub column_searches: Vec<(&'static str, String)>,
}

impl FilterQuery {
    /// Parse raw DataTables parameters
    pub fn from_params(params: &HashMap<String, String>, default_length: u32) -> EdmsResult<Self> {
        let get = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let is_false = |name: String| get(&name).map(|v| v == "false").unwrap_or(false);

        let length = match get("iDisplayLength") {
            None => default_length,
            Some(v) => {
                let n: i64 = v
                    .parse()
                    .map_err(|_| EdmsError::Validation(format!("Invalid iDisplayLength: {}", v)))?;
                if n <= 0 {
                    MAX_DISPLAY_LENGTH
                } else {
                    n as u32
                }
            }
        }
        .min(MAX_DISPLAY_LENGTH);

        let start = match get("iDisplayStart") {
            None => 0,
            Some(v) => v
                .parse()
                .map_err(|_| EdmsError::Validation(format!("Invalid iDisplayStart: {}", v)))?,
        };

        let sort_index = match get("iSortCol_0") {
            None => 0,
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|i| *i < FILTER_COLUMNS.len())
                .ok_or_else(|| EdmsError::Validation(format!("Unknown sort column: {}", v)))?,
        };
        let (sort_column, sort_desc) = if is_false(format!("bSortable_{}", sort_index)) {
            (FILTER_COLUMNS[0], false)
        } else {
            (
                FILTER_COLUMNS[sort_index],
                get("sSortDir_0").map(|d| d.eq_ignore_ascii_case("desc")).unwrap_or(false),
            )
        };

        let column_searches = FILTER_COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_false(format!("bSearchable_{}", i)))
            .filter_map(|(i, column)| {
                get(&format!("sSearch_{}", i)).map(|term| (*column, term.to_string()))
            })
            .collect();

        Ok(Self {
            echo: params.get("sEcho").cloned().unwrap_or_default(),
            start,
            length,
            sort_column,
            sort_desc,
            search: get("sSearch").map(str::to_string),
            column_searches,
        })
    }
}

/// Response body of the list/filter endpoint
#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    #[serde(rename = "sEcho")]
    pub echo: String,
    #[serde(rename = "iTotalRecords")]
    pub total_records: u64,
    #[serde(rename = "iTotalDisplayRecords")]
    pub total_display_records: u64,
    /// One array per document: the list columns followed by the document id
    #[serde(rename = "aaData")]
    pub data: Vec<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = FilterQuery::from_params(&HashMap::new(), 50).unwrap();
        assert_eq!(query.length, 50);
        assert_eq!(query.start, 0);
        assert_eq!(query.sort_column, "document_key");
        assert!(!query.sort_desc);
        assert!(query.search.is_none());
    }

    #[test]
    fn test_length_is_capped() {
        let query = FilterQuery::from_params(&params(&[("iDisplayLength", "5000")]), 50).unwrap();
        assert_eq!(query.length, MAX_DISPLAY_LENGTH);
        let query = FilterQuery::from_params(&params(&[("iDisplayLength", "-1")]), 50).unwrap();
        assert_eq!(query.length, MAX_DISPLAY_LENGTH);
    }

    #[test]
    fn test_sort_and_column_search() {
        let query = FilterQuery::from_params(
            &params(&[
                ("sEcho", "3"),
                ("iSortCol_0", "4"),
                ("sSortDir_0", "desc"),
                ("sSearch_2", "STD"),
                ("sSearch_6", "PID"),
                ("sSearch_7", "000"),
                ("bSearchable_7", "false"),
            ]),
            50,
        )
        .unwrap();
        assert_eq!(query.echo, "3");
        assert_eq!(query.sort_column, "current_revision_date");
        assert!(query.sort_desc);
        assert_eq!(
            query.column_searches,
            vec![
                ("status", "STD".to_string()),
                ("document_type", "PID".to_string())
            ]
        );
    }

    #[test]
    fn test_unknown_sort_column() {
        let err = FilterQuery::from_params(&params(&[("iSortCol_0", "12")]), 50).unwrap_err();
        assert!(matches!(err, EdmsError::Validation(_)));
    }
}
