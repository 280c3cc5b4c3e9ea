//! Services module - business logic layer
//!
//! Services hold their long-lived dependencies (configuration, search
//! index) and take the database pool per call.

pub(crate) mod store;

pub mod dashboard_service;
pub mod distribution_list_service;
pub mod document_service;
pub mod import_service;
pub mod review_service;
pub mod transmittal_service;

pub use dashboard_service::{DashboardService, MonthlyStats};
pub use distribution_list_service::DistributionListService;
pub use document_service::DocumentService;
pub use import_service::ImportService;
pub use review_service::{PendingReview, ReviewContext, ReviewService};
pub use transmittal_service::TransmittalService;
