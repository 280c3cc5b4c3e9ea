//! Phase engineering document management
//!
//! This crate manages engineering documents and their dated revisions, and
//! runs the review workflow of a revision through three sequential steps:
//! reviewers, leader, approver.
//!
//! # Features
//! - Documents and revisions scoped to categories
//! - Review workflow with role-based step permissions
//! - DataTables-style list/filter endpoint
//! - Search index mirror (Elasticsearch or in-memory)
//! - Transmittals, distribution lists, CSV imports, dashboards

pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod routes;
pub mod search;
pub mod security;
pub mod services;

pub use config::{EdmsConfig, SearchConfig};
pub use error::{EdmsError, EdmsResult};

/// Authenticated user from the auth middleware
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.0
    }
}
