//! Document management configuration module

use serde::{Deserialize, Serialize};

/// Review, listing and import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdmsConfig {
    /// Number of days reviewers are given to submit their comments
    #[serde(default = "default_review_duration")]
    pub review_duration_days: i64,

    /// Review duration for prioritary revisions (klass 1)
    #[serde(default = "default_prioritary_review_duration")]
    pub prioritary_review_duration_days: i64,

    /// Default page length of the document list
    #[serde(default = "default_paginate_by")]
    pub paginate_by: u32,

    /// Directory where uploaded import files are stored
    #[serde(default = "default_import_root")]
    pub import_root: String,

    /// Search index settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Whether documents are mirrored to the external index
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the index service
    #[serde(default = "default_search_url")]
    pub url: String,

    /// Index name
    #[serde(default = "default_search_index")]
    pub index: String,

    /// Number of documents pushed per batch when reindexing
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,
    /// Request timeout towards the index service, in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_review_duration() -> i64 {
    13
}

fn default_prioritary_review_duration() -> i64 {
    5
}

fn default_paginate_by() -> u32 {
    50
}

fn default_import_root() -> String {
    "./data/import".to_string()
}

fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_search_index() -> String {
    "documents".to_string()
}

fn default_bulk_size() -> usize {
    150
}

fn default_search_timeout() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_search_url(),
            index: default_search_index(),
            bulk_size: default_bulk_size(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for EdmsConfig {
    fn default() -> Self {
        Self {
            review_duration_days: default_review_duration(),
            prioritary_review_duration_days: default_prioritary_review_duration(),
            paginate_by: default_paginate_by(),
            import_root: default_import_root(),
            search: SearchConfig::default(),
        }
    }
}

impl EdmsConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Review duration in days for a revision of the given class
    pub fn review_duration_for(&self, klass: Option<i64>) -> i64 {
        if klass == Some(crate::models::PRIORITARY_KLASS) {
            self.prioritary_review_duration_days
        } else {
            self.review_duration_days
        }
    }
}
