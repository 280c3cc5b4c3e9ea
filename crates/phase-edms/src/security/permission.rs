//! Review permission table

use std::collections::HashSet;

use crate::error::{EdmsError, EdmsResult};
use crate::models::{ReviewAction, ReviewRole, ReviewStep, Revision};

/// Actions a role may take while the review is at the given step
pub fn permitted_actions(role: ReviewRole, step: ReviewStep) -> &'static [ReviewAction] {
    use ReviewAction::*;

    match (role, step) {
        (ReviewRole::Reviewer, ReviewStep::Reviewers) => &[View, SubmitReview],
        (ReviewRole::Reviewer, _) => &[],
        (ReviewRole::Leader, ReviewStep::Reviewers) => &[View, CloseReviewersStep],
        (ReviewRole::Leader, ReviewStep::Leader) => &[View, SubmitReview],
        (ReviewRole::Leader, ReviewStep::Approver) => &[],
        (ReviewRole::Approver, ReviewStep::Reviewers) => &[View, CloseReviewersStep],
        (ReviewRole::Approver, ReviewStep::Leader) => &[View, CloseLeaderStep],
        (ReviewRole::Approver, ReviewStep::Approver) => &[View, SubmitReview],
    }
}

/// What one user may do on a revision at its current step
#[derive(Debug, Clone)]
pub struct ReviewPermissions {
    pub step: ReviewStep,
    pub roles: Vec<ReviewRole>,
    actions: HashSet<ReviewAction>,
}

impl ReviewPermissions {
    /// Resolve the permissions of a user, as the union over the roles they hold
    ///
    /// Fails with a not-found error when the revision is not under review or
    /// the user has nothing to do at the current step.
    pub fn resolve(revision: &Revision, document_key: &str, user_id: i64) -> EdmsResult<Self> {
        let not_available = || EdmsError::ReviewNotAvailable {
            document_key: document_key.to_string(),
        };

        let step = revision.current_review_step().map_err(|_| not_available())?;
        let roles = revision.roles_of(user_id);
        let actions: HashSet<ReviewAction> = roles
            .iter()
            .flat_map(|role| permitted_actions(*role, step).iter().copied())
            .collect();

        if actions.is_empty() {
            return Err(not_available());
        }
        Ok(Self {
            step,
            roles,
            actions,
        })
    }

    pub fn allows(&self, action: ReviewAction) -> bool {
        self.actions.contains(&action)
    }

    /// Ensure an action is permitted; a refused action is reported as not found
    pub fn require(&self, action: ReviewAction, document_key: &str) -> EdmsResult<()> {
        if self.allows(action) {
            Ok(())
        } else {
            tracing::debug!(%action, document_key, "Review action refused");
            Err(EdmsError::ReviewNotAvailable {
                document_key: document_key.to_string(),
            })
        }
    }

    /// Whether the user may post comments at this step
    pub fn can_comment(&self) -> bool {
        self.allows(ReviewAction::SubmitReview)
    }

    pub fn actions(&self) -> Vec<ReviewAction> {
        let mut actions: Vec<ReviewAction> = self.actions.iter().copied().collect();
        actions.sort_by_key(|a| *a as u8);
        actions
    }
}

/// Path a user is redirected to after acting on a review
pub fn redirect_target(roles: &[ReviewRole]) -> &'static str {
    roles
        .iter()
        .max()
        .map(|role| role.list_path())
        .unwrap_or(ReviewRole::Reviewer.list_path())
}
