//! Distribution list service - reviewer presets and their application

use sqlx::{SqliteConnection, SqlitePool};

use super::store;
use crate::error::{EdmsError, EdmsResult};
use crate::models::{CreateDistributionListRequest, DistributionList, Revision};
use crate::search::{self, SharedIndex};

/// Distribution list service
pub struct DistributionListService {
    index: SharedIndex,
}

impl DistributionListService {
    pub fn new(index: SharedIndex) -> Self {
        Self { index }
    }

    pub async fn create_list(
        &self,
        pool: &SqlitePool,
        request: CreateDistributionListRequest,
    ) -> EdmsResult<DistributionList> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(EdmsError::Validation(
                "Distribution list name is required".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM distribution_lists WHERE name = ?")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(EdmsError::Conflict(format!(
                "Distribution list {} already exists",
                name
            )));
        }

        let list_id = sqlx::query(
            "INSERT INTO distribution_lists (name, leader_id, approver_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(request.leader_id)
        .bind(request.approver_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for user_id in &request.reviewers {
            sqlx::query(
                "INSERT OR IGNORE INTO distribution_list_reviewers (list_id, user_id) VALUES (?, ?)",
            )
            .bind(list_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        for category_id in &request.categories {
            store::fetch_category(&mut tx, *category_id).await?;
            sqlx::query(
                "INSERT OR IGNORE INTO distribution_list_categories (list_id, category_id) VALUES (?, ?)",
            )
            .bind(list_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        let list = fetch_list(&mut tx, list_id).await?;
        tx.commit().await?;

        tracing::info!(list_id, name = %list.name, "Distribution list created");
        Ok(list)
    }

    pub async fn get_list(&self, pool: &SqlitePool, list_id: i64) -> EdmsResult<DistributionList> {
        let mut conn = pool.acquire().await?;
        fetch_list(&mut conn, list_id).await
    }

    /// All lists, optionally only those linked to a category
    pub async fn list_lists(
        &self,
        pool: &SqlitePool,
        category_id: Option<i64>,
    ) -> EdmsResult<Vec<DistributionList>> {
        let ids: Vec<(i64,)> = match category_id {
            Some(category_id) => {
                sqlx::query_as(
                    r#"
                    SELECT l.id FROM distribution_lists l
                    JOIN distribution_list_categories c ON c.list_id = l.id
                    WHERE c.category_id = ?
                    ORDER BY l.name
                    "#,
                )
                .bind(category_id)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT id FROM distribution_lists ORDER BY name")
                    .fetch_all(pool)
                    .await?
            }
        };

        let mut conn = pool.acquire().await?;
        let mut lists = Vec::with_capacity(ids.len());
        for (id,) in ids {
            lists.push(fetch_list(&mut conn, id).await?);
        }
        Ok(lists)
    }

    pub async fn delete_list(&self, pool: &SqlitePool, list_id: i64) -> EdmsResult<()> {
        let result = sqlx::query("DELETE FROM distribution_lists WHERE id = ?")
            .bind(list_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(list_not_found(list_id));
        }
        tracing::info!(list_id, "Distribution list deleted");
        Ok(())
    }

    /// Copy a list's reviewers, leader and approver onto a revision
    ///
    /// The revision must not be under review and the list must be linked to
    /// the document's category.
    pub async fn apply_to_revision(
        &self,
        pool: &SqlitePool,
        list_id: i64,
        revision_id: i64,
    ) -> EdmsResult<Revision> {
        let mut tx = pool.begin().await?;
        let list = fetch_list(&mut tx, list_id).await?;
        let mut revision = store::fetch_revision(&mut tx, revision_id).await?;
        let document = store::fetch_document(&mut tx, revision.document_id).await?;

        if revision.is_under_review() {
            return Err(EdmsError::ReviewAlreadyStarted { revision_id });
        }
        if !list.categories.contains(&document.category_id) {
            return Err(EdmsError::Validation(format!(
                "Distribution list {} is not available for {}",
                list.name, document.document_key
            )));
        }

        revision.reviewers = list.reviewers.clone();
        revision.leader_id = list.leader_id;
        revision.approver_id = list.approver_id;
        store::save_assignment(&mut tx, &revision).await?;
        tx.commit().await?;

        tracing::info!(
            list_id,
            revision_id,
            document_key = %document.document_key,
            "Distribution list applied"
        );
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(revision)
    }
}

fn list_not_found(list_id: i64) -> EdmsError {
    EdmsError::ResourceNotFound {
        resource_type: "distribution_list".to_string(),
        resource_id: list_id.to_string(),
    }
}

async fn fetch_list(conn: &mut SqliteConnection, list_id: i64) -> EdmsResult<DistributionList> {
    let row = sqlx::query_as::<_, (i64, String, Option<i64>, Option<i64>)>(
        "SELECT id, name, leader_id, approver_id FROM distribution_lists WHERE id = ?",
    )
    .bind(list_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| list_not_found(list_id))?;

    let reviewers: Vec<(i64,)> = sqlx::query_as(
        "SELECT user_id FROM distribution_list_reviewers WHERE list_id = ? ORDER BY user_id",
    )
    .bind(list_id)
    .fetch_all(&mut *conn)
    .await?;
    let categories: Vec<(i64,)> = sqlx::query_as(
        "SELECT category_id FROM distribution_list_categories WHERE list_id = ? ORDER BY category_id",
    )
    .bind(list_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(DistributionList {
        id: row.0,
        name: row.1,
        leader_id: row.2,
        approver_id: row.3,
        reviewers: reviewers.into_iter().map(|r| r.0).collect(),
        categories: categories.into_iter().map(|c| c.0).collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::config::EdmsConfig;
    use crate::migrations::test_support::{add_to_category, create_category, create_user, test_pool};
    use crate::models::{CreateDocumentRequest, DocumentKeyParts, NewRevisionRequest};
    use crate::search::MemoryIndex;
    use crate::services::{DocumentService, ReviewService};

    async fn document(pool: &SqlitePool, index: SharedIndex, user: i64, category: i64) -> (String, i64) {
        let detail = DocumentService::new(index)
            .create_document(
                pool,
                user,
                CreateDocumentRequest {
                    category_id: category,
                    key: DocumentKeyParts {
                        contract_number: "FAC09001".to_string(),
                        originator: "FWF".to_string(),
                        unit: "000".to_string(),
                        discipline: "HSE".to_string(),
                        document_type: "REP".to_string(),
                        sequential_number: "0001".to_string(),
                    },
                    title: "Report".to_string(),
                    revision: NewRevisionRequest {
                        revision: 1,
                        revision_date: NaiveDate::from_ymd_opt(2014, 4, 1).unwrap(),
                        status: None,
                        received_date: None,
                        klass: None,
                        reviewers: vec![],
                        leader_id: None,
                        approver_id: None,
                    },
                },
            )
            .await
            .unwrap();
        (detail.document.document_key, detail.revisions[0].id)
    }

    fn request(name: &str, reviewers: Vec<i64>, leader: i64, categories: Vec<i64>) -> CreateDistributionListRequest {
        CreateDistributionListRequest {
            name: name.to_string(),
            leader_id: Some(leader),
            approver_id: Some(leader),
            reviewers,
            categories,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let pool = test_pool().await;
        let index: SharedIndex = Arc::new(MemoryIndex::new());
        let service = DistributionListService::new(index);
        let user = create_user(&pool, "leader@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        let other = create_category(&pool, "EDF", "Contractor").await;

        service
            .create_list(&pool, request("HSE team", vec![user], user, vec![category]))
            .await
            .unwrap();
        service
            .create_list(&pool, request("Process team", vec![], user, vec![other]))
            .await
            .unwrap();

        let err = service
            .create_list(&pool, request("HSE team", vec![], user, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::Conflict(_)));

        assert_eq!(service.list_lists(&pool, None).await.unwrap().len(), 2);
        let linked = service.list_lists(&pool, Some(category)).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].reviewers, vec![user]);

        service.delete_list(&pool, linked[0].id).await.unwrap();
        assert!(service.get_list(&pool, linked[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_apply_to_revision() {
        let pool = test_pool().await;
        let index: SharedIndex = Arc::new(MemoryIndex::new());
        let service = DistributionListService::new(index.clone());
        let staff = create_user(&pool, "staff@phase.fr").await;
        let reviewer = create_user(&pool, "reviewer@phase.fr").await;
        let leader = create_user(&pool, "leader@phase.fr").await;
        let category = create_category(&pool, "FWF", "Deliverables").await;
        let other = create_category(&pool, "EDF", "Contractor").await;
        add_to_category(&pool, category, staff).await;
        let (key, revision_id) = document(&pool, index.clone(), staff, category).await;

        let foreign = service
            .create_list(&pool, request("Elsewhere", vec![reviewer], leader, vec![other]))
            .await
            .unwrap();
        let err = service
            .apply_to_revision(&pool, foreign.id, revision_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::Validation(_)));

        let list = service
            .create_list(&pool, request("HSE team", vec![reviewer], leader, vec![category]))
            .await
            .unwrap();
        let revision = service
            .apply_to_revision(&pool, list.id, revision_id)
            .await
            .unwrap();
        assert_eq!(revision.reviewers, vec![reviewer]);
        assert_eq!(revision.leader_id, Some(leader));

        ReviewService::new(EdmsConfig::new(), index)
            .start_review(&pool, staff, &key, NaiveDate::from_ymd_opt(2014, 4, 2).unwrap())
            .await
            .unwrap();
        let err = service
            .apply_to_revision(&pool, list.id, revision_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EdmsError::ReviewAlreadyStarted { .. }));
    }
}
