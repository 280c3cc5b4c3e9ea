//! Document revisions and the review step state machine

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ReviewRole, ReviewStep, PRIORITARY_KLASS};
use crate::config::EdmsConfig;
use crate::error::{EdmsError, EdmsResult};

/// Review state derived from the revision's date fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    NotUnderReview,
    ReviewersStep,
    LeaderStep,
    ApproverStep,
    Closed,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewState::NotUnderReview => write!(f, "not_under_review"),
            ReviewState::ReviewersStep => write!(f, "reviewers_step"),
            ReviewState::LeaderStep => write!(f, "leader_step"),
            ReviewState::ApproverStep => write!(f, "approver_step"),
            ReviewState::Closed => write!(f, "closed"),
        }
    }
}

/// A dated, numbered version of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub document_id: i64,
    pub revision: i64,
    pub revision_date: NaiveDate,
    pub status: Option<String>,
    pub received_date: Option<NaiveDate>,
    pub klass: Option<i64>,
    pub reviewers: Vec<i64>,
    pub leader_id: Option<i64>,
    pub approver_id: Option<i64>,
    pub review_start_date: Option<NaiveDate>,
    pub review_due_date: Option<NaiveDate>,
    pub reviewers_step_closed: Option<NaiveDate>,
    pub leader_step_closed: Option<NaiveDate>,
    pub review_end_date: Option<NaiveDate>,
    pub leader_comments: Option<String>,
    pub approver_comments: Option<String>,
    pub review_round: i64,
}

impl Revision {
    /// Revision number formatted for display, e.g. `01`
    pub fn name(&self) -> String {
        format!("{:02}", self.revision)
    }

    pub fn is_prioritary(&self) -> bool {
        self.klass == Some(PRIORITARY_KLASS)
    }

    pub fn review_state(&self) -> ReviewState {
        match (self.review_start_date, self.review_end_date) {
            (_, Some(_)) => ReviewState::Closed,
            (None, None) => ReviewState::NotUnderReview,
            (Some(_), None) => {
                if self.reviewers_step_closed.is_none() {
                    ReviewState::ReviewersStep
                } else if self.leader_step_closed.is_none() {
                    ReviewState::LeaderStep
                } else {
                    ReviewState::ApproverStep
                }
            }
        }
    }

    pub fn is_under_review(&self) -> bool {
        self.review_start_date.is_some() && self.review_end_date.is_none()
    }

    pub fn current_review_step(&self) -> EdmsResult<ReviewStep> {
        match self.review_state() {
            ReviewState::ReviewersStep => Ok(ReviewStep::Reviewers),
            ReviewState::LeaderStep => Ok(ReviewStep::Leader),
            ReviewState::ApproverStep => Ok(ReviewStep::Approver),
            ReviewState::NotUnderReview | ReviewState::Closed => Err(EdmsError::NotUnderReview),
        }
    }

    pub fn is_at_review_step(&self, step: ReviewStep) -> bool {
        self.current_review_step().map(|s| s == step).unwrap_or(false)
    }

    pub fn is_reviewer(&self, user_id: i64) -> bool {
        self.reviewers.contains(&user_id)
    }

    /// Roles the user holds on this revision, least privileged first
    pub fn roles_of(&self, user_id: i64) -> Vec<ReviewRole> {
        let mut roles = Vec::new();
        if self.is_reviewer(user_id) {
            roles.push(ReviewRole::Reviewer);
        }
        if self.leader_id == Some(user_id) {
            roles.push(ReviewRole::Leader);
        }
        if self.approver_id == Some(user_id) {
            roles.push(ReviewRole::Approver);
        }
        roles
    }

    /// Open a new review cycle and return the reviewers' due date
    ///
    /// With no reviewers assigned the reviewers step is closed on the spot.
    pub fn start_review(&mut self, today: NaiveDate, config: &EdmsConfig) -> EdmsResult<NaiveDate> {
        match self.review_state() {
            ReviewState::NotUnderReview => {}
            ReviewState::Closed => {
                return Err(EdmsError::ReviewClosed {
                    revision_id: self.id,
                })
            }
            _ => {
                return Err(EdmsError::ReviewAlreadyStarted {
                    revision_id: self.id,
                })
            }
        }
        if self.leader_id.is_none() {
            return Err(EdmsError::Validation(
                "A leader must be assigned before starting the review".to_string(),
            ));
        }
        if self.approver_id.is_none() {
            return Err(EdmsError::Validation(
                "An approver must be assigned before starting the review".to_string(),
            ));
        }

        let due_date = today + Duration::days(config.review_duration_for(self.klass));
        self.review_start_date = Some(today);
        self.review_due_date = Some(due_date);
        self.reviewers_step_closed = None;
        self.leader_step_closed = None;
        self.review_end_date = None;
        self.leader_comments = None;
        self.approver_comments = None;
        self.review_round += 1;

        if self.reviewers.is_empty() {
            self.reviewers_step_closed = Some(today);
        }
        Ok(due_date)
    }

    /// Abort the running review; returns false when there was none
    pub fn cancel_review(&mut self) -> bool {
        if !self.is_under_review() {
            return false;
        }
        self.review_start_date = None;
        self.review_due_date = None;
        self.reviewers_step_closed = None;
        self.leader_step_closed = None;
        self.review_end_date = None;
        true
    }

    pub fn end_reviewers_step(&mut self, today: NaiveDate) -> EdmsResult<()> {
        self.expect_step(ReviewStep::Reviewers, "close the reviewers step")?;
        self.reviewers_step_closed = Some(today);
        Ok(())
    }

    pub fn end_leader_step(&mut self, today: NaiveDate) -> EdmsResult<()> {
        self.expect_step(ReviewStep::Leader, "close the leader step")?;
        self.leader_step_closed = Some(today);
        Ok(())
    }

    pub fn end_review(&mut self, today: NaiveDate) -> EdmsResult<()> {
        self.expect_step(ReviewStep::Approver, "end the review")?;
        self.review_end_date = Some(today);
        Ok(())
    }

    fn expect_step(&self, expected: ReviewStep, operation: &str) -> EdmsResult<()> {
        let current = self.current_review_step()?;
        if current != expected {
            return Err(EdmsError::ReviewSequence(format!(
                "cannot {} of revision {} while at the {} step",
                operation, self.id, current
            )));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::revision;
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 3, d).unwrap()
    }

    #[test]
    fn test_start_review_sets_due_date() {
        let mut rev = revision();
        let due = rev.start_review(day(4), &EdmsConfig::new()).unwrap();

        assert_eq!(due, day(17));
        assert_eq!(rev.review_due_date, Some(day(17)));
        assert_eq!(rev.review_round, 1);
        assert_eq!(rev.review_state(), ReviewState::ReviewersStep);
        assert!(rev.is_at_review_step(ReviewStep::Reviewers));
    }

    #[test]
    fn test_prioritary_review_is_shorter() {
        let mut rev = revision();
        rev.klass = Some(PRIORITARY_KLASS);
        let due = rev.start_review(day(4), &EdmsConfig::new()).unwrap();
        assert_eq!(due, day(9));
    }

    #[test]
    fn test_start_without_reviewers_skips_reviewers_step() {
        let mut rev = revision();
        rev.reviewers.clear();
        rev.start_review(day(4), &EdmsConfig::new()).unwrap();

        assert_eq!(rev.current_review_step().unwrap(), ReviewStep::Leader);
        assert_eq!(rev.reviewers_step_closed, Some(day(4)));
    }

    #[test]
    fn test_start_requires_leader_and_approver() {
        let mut rev = revision();
        rev.approver_id = None;
        let err = rev.start_review(day(4), &EdmsConfig::new()).unwrap_err();
        assert!(matches!(err, EdmsError::Validation(_)));
        assert!(!rev.is_under_review());
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut rev = revision();
        rev.start_review(day(4), &EdmsConfig::new()).unwrap();
        let err = rev.start_review(day(5), &EdmsConfig::new()).unwrap_err();
        assert!(matches!(err, EdmsError::ReviewAlreadyStarted { revision_id: 1 }));
    }

    #[test]
    fn test_full_review_cycle() {
        let mut rev = revision();
        rev.start_review(day(4), &EdmsConfig::new()).unwrap();
        rev.end_reviewers_step(day(5)).unwrap();
        rev.end_leader_step(day(6)).unwrap();
        assert_eq!(rev.review_state(), ReviewState::ApproverStep);
        rev.end_review(day(7)).unwrap();

        assert_eq!(rev.review_state(), ReviewState::Closed);
        assert!(!rev.is_under_review());
        assert!(matches!(
            rev.current_review_step(),
            Err(EdmsError::NotUnderReview)
        ));
        assert!(matches!(
            rev.start_review(day(8), &EdmsConfig::new()),
            Err(EdmsError::ReviewClosed { .. })
        ));
    }

    #[test]
    fn test_steps_close_in_order() {
        let mut rev = revision();
        rev.start_review(day(4), &EdmsConfig::new()).unwrap();

        assert!(matches!(
            rev.end_leader_step(day(5)),
            Err(EdmsError::ReviewSequence(_))
        ));
        assert!(matches!(
            rev.end_review(day(5)),
            Err(EdmsError::ReviewSequence(_))
        ));

        rev.end_reviewers_step(day(5)).unwrap();
        assert!(matches!(
            rev.end_reviewers_step(day(6)),
            Err(EdmsError::ReviewSequence(_))
        ));
        assert_eq!(rev.reviewers_step_closed, Some(day(5)));
    }

    #[test]
    fn test_closing_outside_review_is_not_under_review() {
        let mut rev = revision();
        assert!(matches!(
            rev.end_reviewers_step(day(5)),
            Err(EdmsError::NotUnderReview)
        ));
    }

    #[test]
    fn test_cancel_review() {
        let mut rev = revision();
        assert!(!rev.cancel_review());

        rev.start_review(day(4), &EdmsConfig::new()).unwrap();
        rev.end_reviewers_step(day(5)).unwrap();
        assert!(rev.cancel_review());

        assert_eq!(rev.review_state(), ReviewState::NotUnderReview);
        assert_eq!(rev.review_due_date, None);
        assert_eq!(rev.reviewers_step_closed, None);
        assert_eq!(rev.review_round, 1);

        rev.start_review(day(6), &EdmsConfig::new()).unwrap();
        assert_eq!(rev.review_round, 2);
    }

    #[test]
    fn test_roles_of_user() {
        let mut rev = revision();
        rev.leader_id = Some(10);
        assert_eq!(
            rev.roles_of(10),
            vec![ReviewRole::Reviewer, ReviewRole::Leader]
        );
        assert_eq!(rev.roles_of(30), vec![ReviewRole::Approver]);
        assert!(rev.roles_of(99).is_empty());
    }

    #[test]
    fn test_revision_name_is_padded() {
        let mut rev = revision();
        rev.revision = 3;
        assert_eq!(rev.name(), "03");
    }
}
