//! Review records and review workflow vocabulary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One of the three sequential review steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStep {
    Reviewers,
    Leader,
    Approver,
}

impl std::fmt::Display for ReviewStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStep::Reviewers => write!(f, "reviewers"),
            ReviewStep::Leader => write!(f, "leader"),
            ReviewStep::Approver => write!(f, "approver"),
        }
    }
}

impl std::str::FromStr for ReviewStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reviewers" => Ok(ReviewStep::Reviewers),
            "leader" => Ok(ReviewStep::Leader),
            "approver" => Ok(ReviewStep::Approver),
            _ => Err(format!("Invalid review step: {}", s)),
        }
    }
}

/// Role a user holds on a revision's review
///
/// Ordered from least to most privileged, so `max()` over a user's roles
/// yields the role used to pick their landing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewRole {
    Reviewer,
    Leader,
    Approver,
}

impl ReviewRole {
    /// Path of the pending review list for this role
    pub fn list_path(&self) -> &'static str {
        match self {
            ReviewRole::Reviewer => "/reviews/reviewers",
            ReviewRole::Leader => "/reviews/leader",
            ReviewRole::Approver => "/reviews/approver",
        }
    }
}

impl std::fmt::Display for ReviewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewRole::Reviewer => write!(f, "reviewer"),
            ReviewRole::Leader => write!(f, "leader"),
            ReviewRole::Approver => write!(f, "approver"),
        }
    }
}

impl std::str::FromStr for ReviewRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reviewer" | "reviewers" => Ok(ReviewRole::Reviewer),
            "leader" => Ok(ReviewRole::Leader),
            "approver" => Ok(ReviewRole::Approver),
            _ => Err(format!("Invalid review role: {}", s)),
        }
    }
}

/// Action a participant may take on a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    View,
    SubmitReview,
    CloseReviewersStep,
    CloseLeaderStep,
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewAction::View => write!(f, "view"),
            ReviewAction::SubmitReview => write!(f, "submit_review"),
            ReviewAction::CloseReviewersStep => write!(f, "close_reviewers_step"),
            ReviewAction::CloseLeaderStep => write!(f, "close_leader_step"),
        }
    }
}

/// A single reviewer's submission record within the reviewers step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub revision_id: i64,
    pub document_id: i64,
    pub reviewer_id: i64,
    /// Review cycle of the revision this record belongs to
    pub round: i64,
    pub reviewed_on: Option<NaiveDate>,
    pub comments: Option<String>,
    pub closed: bool,
    pub due_date: NaiveDate,
}

impl Review {
    /// Whether the reviewer still has to submit
    pub fn is_pending(&self) -> bool {
        !self.closed && self.reviewed_on.is_none()
    }
}

/// Form posted to the review endpoint
///
/// Presence of a key triggers the matching action, whatever its value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewForm {
    pub review: Option<String>,
    pub comments: Option<String>,
    pub close_reviewers_step: Option<String>,
    pub close_leader_step: Option<String>,
}

/// Number of pending reviews per role for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewCounts {
    pub reviewer: u32,
    pub leader: u32,
    pub approver: u32,
    pub priorities: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_parse_and_display() {
        assert_eq!("leader".parse::<ReviewStep>().unwrap(), ReviewStep::Leader);
        assert_eq!(ReviewStep::Reviewers.to_string(), "reviewers");
        assert!("closed".parse::<ReviewStep>().is_err());
    }

    #[test]
    fn test_highest_role_wins() {
        let roles = [ReviewRole::Reviewer, ReviewRole::Approver, ReviewRole::Leader];
        assert_eq!(roles.iter().max(), Some(&ReviewRole::Approver));
        assert_eq!(ReviewRole::Leader.list_path(), "/reviews/leader");
    }
}
