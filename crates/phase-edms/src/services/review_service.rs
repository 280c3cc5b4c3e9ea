//! Review service - transactional review workflow
//!
//! Every transition loads the revision, checks the caller's permissions and
//! writes the new state inside one transaction. The search index is updated
//! once the transaction is committed.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use super::store;
use crate::config::EdmsConfig;
use crate::error::{EdmsError, EdmsResult};
use crate::models::{
    format_date, parse_date, parse_opt_date, Document, Review, ReviewAction, ReviewCounts,
    ReviewForm, ReviewRole, ReviewStep, Revision,
};
use crate::search::{self, SharedIndex};
use crate::security::{redirect_target, ReviewPermissions};

/// Everything a participant sees on a review page
#[derive(Debug, Clone, Serialize)]
pub struct ReviewContext {
    pub document: Document,
    pub revision: Revision,
    pub step: ReviewStep,
    pub reviews: Vec<Review>,
    pub roles: Vec<ReviewRole>,
    pub actions: Vec<ReviewAction>,
    pub can_comment: bool,
}

/// Entry of a pending review list
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingReview {
    pub document_id: i64,
    pub document_key: String,
    pub title: String,
    pub revision_id: i64,
    pub revision: i64,
    pub klass: Option<i64>,
    pub review_start_date: Option<String>,
    pub due_date: Option<String>,
}

/// Database row struct for reviews
#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    revision_id: i64,
    document_id: i64,
    reviewer_id: i64,
    round: i64,
    reviewed_on: Option<String>,
    comments: Option<String>,
    closed: i64,
    due_date: String,
}

impl ReviewRow {
    fn into_review(self) -> EdmsResult<Review> {
        let due_date = parse_date(&self.due_date).ok_or_else(|| {
            EdmsError::Internal(format!("Invalid due date on review {}", self.id))
        })?;
        Ok(Review {
            id: self.id,
            revision_id: self.revision_id,
            document_id: self.document_id,
            reviewer_id: self.reviewer_id,
            round: self.round,
            reviewed_on: parse_opt_date(self.reviewed_on),
            comments: self.comments,
            closed: self.closed != 0,
            due_date,
        })
    }
}

/// Review service
pub struct ReviewService {
    config: EdmsConfig,
    index: SharedIndex,
}

impl ReviewService {
    pub fn new(config: EdmsConfig, index: SharedIndex) -> Self {
        Self { config, index }
    }

    /// Start a review cycle on the latest revision of a document
    ///
    /// One review is created per assigned reviewer in the same transaction.
    pub async fn start_review(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        today: NaiveDate,
    ) -> EdmsResult<Revision> {
        let mut tx = pool.begin().await?;
        let document = store::fetch_visible_document(&mut tx, user_id, document_key).await?;
        let mut revision = store::require_latest_revision(&mut tx, &document).await?;

        let due_date = revision.start_review(today, &self.config)?;
        store::save_review_state(&mut tx, &revision).await?;

        for reviewer_id in &revision.reviewers {
            sqlx::query(
                r#"
                INSERT INTO reviews (revision_id, document_id, reviewer_id, round, due_date, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(revision.id)
            .bind(document.id)
            .bind(reviewer_id)
            .bind(revision.review_round)
            .bind(format_date(due_date))
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            document_key,
            revision = revision.revision,
            round = revision.review_round,
            reviewers = revision.reviewers.len(),
            "Review started"
        );
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(revision)
    }

    /// Cancel the running review of a document
    ///
    /// Returns false, without changing anything, when no review is running.
    pub async fn cancel_review(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
    ) -> EdmsResult<bool> {
        let mut tx = pool.begin().await?;
        let document = store::fetch_visible_document(&mut tx, user_id, document_key).await?;
        let mut revision = store::require_latest_revision(&mut tx, &document).await?;

        if !revision.cancel_review() {
            tracing::debug!(document_key, "Cancel requested on a revision not under review");
            return Ok(false);
        }
        store::save_review_state(&mut tx, &revision).await?;
        tx.commit().await?;

        tracing::info!(document_key, revision = revision.revision, "Review cancelled");
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(true)
    }

    /// Review page content for a participant
    pub async fn review_context(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
    ) -> EdmsResult<ReviewContext> {
        let mut conn = pool.acquire().await?;
        let (document, revision, permissions) =
            load_for_user(&mut conn, user_id, document_key).await?;
        permissions.require(ReviewAction::View, document_key)?;
        let reviews = fetch_round_reviews(&mut conn, &revision).await?;

        Ok(ReviewContext {
            document,
            step: permissions.step,
            can_comment: permissions.can_comment(),
            actions: permissions.actions(),
            roles: permissions.roles.clone(),
            reviews,
            revision,
        })
    }

    /// Submit the caller's review at the current step
    ///
    /// At the reviewers step the last missing review closes the step.
    /// The leader's review closes the leader step, the approver's ends the
    /// review. Returns the caller's roles on the revision.
    pub async fn submit_review(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        comments: Option<String>,
        today: NaiveDate,
    ) -> EdmsResult<Vec<ReviewRole>> {
        let mut tx = pool.begin().await?;
        let (document, mut revision, permissions) =
            load_for_user(&mut tx, user_id, document_key).await?;
        permissions.require(ReviewAction::SubmitReview, document_key)?;

        match permissions.step {
            ReviewStep::Reviewers => {
                let result = sqlx::query(
                    r#"
                    UPDATE reviews SET reviewed_on = ?, comments = ?, closed = 1
                    WHERE revision_id = ? AND reviewer_id = ? AND round = ? AND closed = 0
                    "#,
                )
                .bind(format_date(today))
                .bind(&comments)
                .bind(revision.id)
                .bind(user_id)
                .bind(revision.review_round)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(EdmsError::ReviewSequence(format!(
                        "review of {} already submitted",
                        document_key
                    )));
                }

                let (open,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM reviews WHERE revision_id = ? AND round = ? AND closed = 0",
                )
                .bind(revision.id)
                .bind(revision.review_round)
                .fetch_one(&mut *tx)
                .await?;
                if open == 0 {
                    revision.end_reviewers_step(today)?;
                    tracing::info!(document_key, "All reviews received, reviewers step closed");
                }
            }
            ReviewStep::Leader => {
                revision.leader_comments = comments;
                revision.end_leader_step(today)?;
            }
            ReviewStep::Approver => {
                revision.approver_comments = comments;
                revision.end_review(today)?;
            }
        }
        store::save_review_state(&mut tx, &revision).await?;
        tx.commit().await?;

        tracing::info!(
            document_key,
            user_id,
            step = %permissions.step,
            "Review submitted"
        );
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(permissions.roles)
    }

    /// Close the reviewers step before every reviewer has submitted
    pub async fn close_reviewers_step(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        today: NaiveDate,
    ) -> EdmsResult<Vec<ReviewRole>> {
        let mut tx = pool.begin().await?;
        let (document, mut revision, permissions) =
            load_for_user(&mut tx, user_id, document_key).await?;
        permissions.require(ReviewAction::CloseReviewersStep, document_key)?;

        revision.end_reviewers_step(today)?;
        sqlx::query("UPDATE reviews SET closed = 1 WHERE revision_id = ? AND round = ? AND closed = 0")
            .bind(revision.id)
            .bind(revision.review_round)
            .execute(&mut *tx)
            .await?;
        store::save_review_state(&mut tx, &revision).await?;
        tx.commit().await?;

        tracing::info!(document_key, user_id, "Reviewers step closed");
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(permissions.roles)
    }

    /// Close the leader step on behalf of the leader
    pub async fn close_leader_step(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        today: NaiveDate,
    ) -> EdmsResult<Vec<ReviewRole>> {
        let mut tx = pool.begin().await?;
        let (document, mut revision, permissions) =
            load_for_user(&mut tx, user_id, document_key).await?;
        permissions.require(ReviewAction::CloseLeaderStep, document_key)?;

        revision.end_leader_step(today)?;
        store::save_review_state(&mut tx, &revision).await?;
        tx.commit().await?;

        tracing::info!(document_key, user_id, "Leader step closed");
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(permissions.roles)
    }

    /// Dispatch a posted review form and return the list to redirect to
    pub async fn handle_form(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        form: ReviewForm,
        today: NaiveDate,
    ) -> EdmsResult<&'static str> {
        let roles = if form.review.is_some() {
            self.submit_review(pool, user_id, document_key, form.comments, today)
                .await?
        } else if form.close_reviewers_step.is_some() {
            self.close_reviewers_step(pool, user_id, document_key, today)
                .await?
        } else if form.close_leader_step.is_some() {
            self.close_leader_step(pool, user_id, document_key, today)
                .await?
        } else {
            return Err(EdmsError::Validation(
                "No review action in the submitted form".to_string(),
            ));
        };
        Ok(redirect_target(&roles))
    }

    /// Reviews waiting for the user in the given role
    pub async fn pending_reviews(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        role: ReviewRole,
    ) -> EdmsResult<Vec<PendingReview>> {
        let sql = match role {
            ReviewRole::Reviewer => {
                r#"
                SELECT d.id AS document_id, d.document_key, d.title, r.id AS revision_id,
                       r.revision, r.klass, r.review_start_date, rv.due_date AS due_date
                FROM reviews rv
                JOIN revisions r ON r.id = rv.revision_id AND rv.round = r.review_round
                JOIN documents d ON d.id = r.document_id
                WHERE rv.reviewer_id = ? AND rv.closed = 0
                  AND r.review_start_date IS NOT NULL AND r.review_end_date IS NULL
                  AND r.reviewers_step_closed IS NULL
                ORDER BY rv.due_date, d.document_key
                "#
            }
            ReviewRole::Leader => {
                r#"
                SELECT d.id AS document_id, d.document_key, d.title, r.id AS revision_id,
                       r.revision, r.klass, r.review_start_date, r.review_due_date AS due_date
                FROM revisions r
                JOIN documents d ON d.id = r.document_id
                WHERE r.leader_id = ?
                  AND r.review_start_date IS NOT NULL AND r.review_end_date IS NULL
                  AND r.leader_step_closed IS NULL
                ORDER BY r.review_due_date, d.document_key
                "#
            }
            ReviewRole::Approver => {
                r#"
                SELECT d.id AS document_id, d.document_key, d.title, r.id AS revision_id,
                       r.revision, r.klass, r.review_start_date, r.review_due_date AS due_date
                FROM revisions r
                JOIN documents d ON d.id = r.document_id
                WHERE r.approver_id = ?
                  AND r.review_start_date IS NOT NULL AND r.review_end_date IS NULL
                ORDER BY r.review_due_date, d.document_key
                "#
            }
        };

        let reviews = sqlx::query_as::<_, PendingReview>(sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(reviews)
    }

    /// Number of pending reviews per role, plus the prioritary ones among them
    pub async fn review_counts(&self, pool: &SqlitePool, user_id: i64) -> EdmsResult<ReviewCounts> {
        let reviewer = self.pending_reviews(pool, user_id, ReviewRole::Reviewer).await?;
        let leader = self.pending_reviews(pool, user_id, ReviewRole::Leader).await?;
        let approver = self.pending_reviews(pool, user_id, ReviewRole::Approver).await?;

        let priorities: HashSet<i64> = reviewer
            .iter()
            .chain(leader.iter())
            .chain(approver.iter())
            .filter(|p| p.klass == Some(crate::models::PRIORITARY_KLASS))
            .map(|p| p.revision_id)
            .collect();

        Ok(ReviewCounts {
            reviewer: reviewer.len() as u32,
            leader: leader.len() as u32,
            approver: approver.len() as u32,
            priorities: priorities.len() as u32,
        })
    }
}

/// Load the latest revision of a document and the user's permissions on it
///
/// Review pages are reached through roles, not category membership.
async fn load_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    document_key: &str,
) -> EdmsResult<(Document, Revision, ReviewPermissions)> {
    let not_available = || EdmsError::ReviewNotAvailable {
        document_key: document_key.to_string(),
    };

    let document = store::find_document_by_key(&mut *conn, document_key)
        .await?
        .ok_or_else(not_available)?;
    let revision = store::fetch_latest_revision(&mut *conn, &document)
        .await?
        .ok_or_else(not_available)?;
    let permissions = ReviewPermissions::resolve(&revision, document_key, user_id)?;
    Ok((document, revision, permissions))
}

async fn fetch_round_reviews(
    conn: &mut SqliteConnection,
    revision: &Revision,
) -> EdmsResult<Vec<Review>> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        r#"
        SELECT id, revision_id, document_id, reviewer_id, round, reviewed_on, comments, closed, due_date
        FROM reviews
        WHERE revision_id = ? AND round = ?
        ORDER BY reviewer_id
        "#,
    )
    .bind(revision.id)
    .bind(revision.review_round)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(ReviewRow::into_review).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::migrations::test_support::{add_to_category, create_category, create_user, test_pool};
    use crate::models::{CreateDocumentRequest, DocumentKeyParts, NewRevisionRequest};
    use crate::search::MemoryIndex;
    use crate::services::DocumentService;

    struct Fixture {
        pool: SqlitePool,
        index: Arc<MemoryIndex>,
        service: ReviewService,
        documents: DocumentService,
        category: i64,
        staff: i64,
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 4, d).unwrap()
    }

    async fn setup() -> Fixture {
        let pool = test_pool().await;
        let staff = create_user(&pool, "staff@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        add_to_category(&pool, category, staff).await;
        let index = Arc::new(MemoryIndex::new());
        Fixture {
            service: ReviewService::new(EdmsConfig::new(), index.clone()),
            documents: DocumentService::new(index.clone()),
            pool,
            index,
            category,
            staff,
        }
    }

    impl Fixture {
        async fn document(
            &self,
            seq: u32,
            klass: i64,
            reviewers: Vec<i64>,
            leader: i64,
            approver: i64,
        ) -> String {
            let request = CreateDocumentRequest {
                category_id: self.category,
                key: DocumentKeyParts {
                    contract_number: "FAC09001".to_string(),
                    originator: "FWF".to_string(),
                    unit: "000".to_string(),
                    discipline: "HSE".to_string(),
                    document_type: "REP".to_string(),
                    sequential_number: format!("{:04}", seq),
                },
                title: format!("Report {}", seq),
                revision: NewRevisionRequest {
                    revision: 1,
                    revision_date: day(1),
                    status: Some("STD".to_string()),
                    received_date: Some(day(1)),
                    klass: Some(klass),
                    reviewers,
                    leader_id: Some(leader),
                    approver_id: Some(approver),
                },
            };
            self.documents
                .create_document(&self.pool, self.staff, request)
                .await
                .unwrap()
                .document
                .document_key
        }

        async fn start(&self, key: &str) -> Revision {
            self.service
                .start_review(&self.pool, self.staff, key, day(2))
                .await
                .unwrap()
        }

        async fn latest(&self, key: &str) -> Revision {
            self.documents
                .get_document(&self.pool, self.staff, key)
                .await
                .unwrap()
                .revisions
                .remove(0)
        }
    }

    #[tokio::test]
    async fn test_start_review_creates_reviews() {
        let f = setup().await;
        let r1 = create_user(&f.pool, "r1@phase.fr").await;
        let r2 = create_user(&f.pool, "r2@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let approver = create_user(&f.pool, "approver@phase.fr").await;
        let key = f.document(1, 2, vec![r1, r2], leader, approver).await;

        let revision = f.start(&key).await;
        assert_eq!(revision.review_due_date, Some(day(15)));

        let context = f.service.review_context(&f.pool, r1, &key).await.unwrap();
        assert_eq!(context.step, ReviewStep::Reviewers);
        assert_eq!(context.reviews.len(), 2);
        assert!(context.reviews.iter().all(|r| r.due_date == day(15) && r.is_pending()));
        assert!(context.can_comment);

        let indexed = f
            .index
            .get(crate::models::DOCUMENT_DOC_TYPE, context.document.id)
            .await
            .unwrap();
        assert_eq!(indexed["under_review"], true);

        let err = f
            .service
            .start_review(&f.pool, f.staff, &key, day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewAlreadyStarted { .. }));
    }

    #[tokio::test]
    async fn test_last_review_closes_reviewers_step() {
        let f = setup().await;
        let r1 = create_user(&f.pool, "r1@phase.fr").await;
        let r2 = create_user(&f.pool, "r2@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let approver = create_user(&f.pool, "approver@phase.fr").await;
        let key = f.document(1, 2, vec![r1, r2], leader, approver).await;
        f.start(&key).await;

        f.service
            .submit_review(&f.pool, r1, &key, Some("ok".to_string()), day(3))
            .await
            .unwrap();
        assert!(f.latest(&key).await.is_at_review_step(ReviewStep::Reviewers));

        let err = f
            .service
            .submit_review(&f.pool, r1, &key, None, day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewSequence(_)));

        f.service
            .submit_review(&f.pool, r2, &key, None, day(4))
            .await
            .unwrap();
        let revision = f.latest(&key).await;
        assert!(revision.is_at_review_step(ReviewStep::Leader));
        assert_eq!(revision.reviewers_step_closed, Some(day(4)));

        // reviewers have nothing left to do
        let err = f.service.review_context(&f.pool, r1, &key).await.unwrap_err();
        assert!(matches!(err, EdmsError::ReviewNotAvailable { .. }));
    }

    #[tokio::test]
    async fn test_full_cycle_through_forms() {
        let f = setup().await;
        let reviewer = create_user(&f.pool, "r1@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let approver = create_user(&f.pool, "approver@phase.fr").await;
        let key = f.document(1, 2, vec![reviewer], leader, approver).await;
        f.start(&key).await;

        let review = |comments: &str| ReviewForm {
            review: Some("submit".to_string()),
            comments: Some(comments.to_string()),
            ..Default::default()
        };

        let target = f
            .service
            .handle_form(&f.pool, reviewer, &key, review("fine"), day(3))
            .await
            .unwrap();
        assert_eq!(target, "/reviews/reviewers");

        let target = f
            .service
            .handle_form(&f.pool, leader, &key, review("leader notes"), day(4))
            .await
            .unwrap();
        assert_eq!(target, "/reviews/leader");

        let target = f
            .service
            .handle_form(&f.pool, approver, &key, review("approved"), day(5))
            .await
            .unwrap();
        assert_eq!(target, "/reviews/approver");

        let revision = f.latest(&key).await;
        assert_eq!(revision.review_end_date, Some(day(5)));
        assert_eq!(revision.leader_comments.as_deref(), Some("leader notes"));
        assert_eq!(revision.approver_comments.as_deref(), Some("approved"));
        assert!(!revision.is_under_review());
    }

    #[tokio::test]
    async fn test_step_permissions() {
        let f = setup().await;
        let reviewer = create_user(&f.pool, "r1@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let approver = create_user(&f.pool, "approver@phase.fr").await;
        let key = f.document(1, 2, vec![reviewer], leader, approver).await;
        f.start(&key).await;

        // leader cannot comment yet, nor close the leader step
        let err = f
            .service
            .submit_review(&f.pool, leader, &key, None, day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewNotAvailable { .. }));
        let err = f
            .service
            .close_leader_step(&f.pool, approver, &key, day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewNotAvailable { .. }));
        // reviewers cannot close their own step
        let err = f
            .service
            .close_reviewers_step(&f.pool, reviewer, &key, day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewNotAvailable { .. }));

        f.service
            .close_reviewers_step(&f.pool, leader, &key, day(3))
            .await
            .unwrap();
        f.service
            .close_leader_step(&f.pool, approver, &key, day(4))
            .await
            .unwrap();
        assert!(f.latest(&key).await.is_at_review_step(ReviewStep::Approver));

        // the leader has no action at the approver step
        let err = f.service.review_context(&f.pool, leader, &key).await.unwrap_err();
        assert!(matches!(err, EdmsError::ReviewNotAvailable { .. }));
    }

    #[tokio::test]
    async fn test_forced_close_empties_reviewer_list() {
        let f = setup().await;
        let reviewer = create_user(&f.pool, "r1@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let key = f.document(1, 2, vec![reviewer], leader, leader).await;
        f.start(&key).await;

        let pending = f
            .service
            .pending_reviews(&f.pool, reviewer, ReviewRole::Reviewer)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].due_date.as_deref(), Some("2014-04-15"));

        let form = ReviewForm {
            close_reviewers_step: Some("1".to_string()),
            ..Default::default()
        };
        let target = f
            .service
            .handle_form(&f.pool, leader, &key, form, day(3))
            .await
            .unwrap();
        assert_eq!(target, "/reviews/approver");

        let pending = f
            .service
            .pending_reviews(&f.pool, reviewer, ReviewRole::Reviewer)
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_keeps_reviews_and_restart_opens_new_round() {
        let f = setup().await;
        let reviewer = create_user(&f.pool, "r1@phase.fr").await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let key = f.document(1, 2, vec![reviewer], leader, leader).await;

        assert!(!f.service.cancel_review(&f.pool, f.staff, &key).await.unwrap());

        f.start(&key).await;
        assert!(f.service.cancel_review(&f.pool, f.staff, &key).await.unwrap());
        assert!(!f.latest(&key).await.is_under_review());

        let revision = f.start(&key).await;
        assert_eq!(revision.review_round, 2);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE revision_id = ?")
            .bind(revision.id)
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!(rows, 2);

        let context = f.service.review_context(&f.pool, reviewer, &key).await.unwrap();
        assert_eq!(context.reviews.len(), 1);
        assert_eq!(context.reviews[0].round, 2);
    }

    #[tokio::test]
    async fn test_empty_form_is_rejected() {
        let f = setup().await;
        let leader = create_user(&f.pool, "leader@phase.fr").await;
        let key = f.document(1, 2, vec![], leader, leader).await;
        f.start(&key).await;

        let err = f
            .service
            .handle_form(&f.pool, leader, &key, ReviewForm::default(), day(3))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::Validation(_)));
    }

    #[tokio::test]
    async fn test_review_counts() {
        let f = setup().await;
        let user = create_user(&f.pool, "user@phase.fr").await;
        let other = create_user(&f.pool, "other@phase.fr").await;

        let doc1 = f.document(1, 2, vec![user, other], user, user).await;
        let doc2 = f.document(2, 2, vec![user], other, user).await;
        f.start(&doc1).await;
        f.start(&doc2).await;

        let counts = f.service.review_counts(&f.pool, user).await.unwrap();
        assert_eq!(
            counts,
            ReviewCounts {
                reviewer: 2,
                leader: 1,
                approver: 2,
                priorities: 0,
            }
        );

        f.service.cancel_review(&f.pool, f.staff, &doc2).await.unwrap();
        let counts = f.service.review_counts(&f.pool, user).await.unwrap();
        assert_eq!((counts.reviewer, counts.leader, counts.approver), (1, 1, 1));

        let doc3 = f.document(3, 1, vec![other], other, user).await;
        f.start(&doc3).await;
        let counts = f.service.review_counts(&f.pool, user).await.unwrap();
        assert_eq!(counts.approver, 2);
        assert_eq!(counts.priorities, 1);
    }
}
