//! Row mapping and shared queries over documents and revisions

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;

use crate::error::{EdmsError, EdmsResult};
use crate::models::{
    format_date, parse_date, parse_opt_date, parse_timestamp, Category, Document,
    DocumentKeyParts, NewRevisionRequest, Revision,
};

pub(crate) const DOCUMENT_COLUMNS: &str = "id, category_id, document_key, contract_number, \
    originator, unit, discipline, document_type, sequential_number, title, latest_revision_id, \
    current_revision, current_revision_date, status, created_at, updated_at";

pub(crate) const REVISION_COLUMNS: &str = "id, document_id, revision, revision_date, status, \
    received_date, klass, leader_id, approver_id, review_start_date, review_due_date, \
    reviewers_step_closed, leader_step_closed, review_end_date, leader_comments, \
    approver_comments, review_round";

/// Database row struct for documents (sqlx has tuple size limit)
#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    id: i64,
    category_id: i64,
    document_key: String,
    contract_number: String,
    originator: String,
    unit: String,
    discipline: String,
    document_type: String,
    sequential_number: String,
    title: String,
    latest_revision_id: Option<i64>,
    current_revision: i64,
    current_revision_date: Option<String>,
    status: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Timestamp column of a stored row; a corrupt value is an error, never replaced
pub(crate) fn stored_timestamp(value: &str, row: &str) -> EdmsResult<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| EdmsError::Internal(format!("Invalid timestamp {:?} on {}", value, row)))
}

impl DocumentRow {
    fn into_document(self) -> EdmsResult<Document> {
        let row = format!("document {}", self.id);
        let created_at = stored_timestamp(&self.created_at, &row)?;
        let updated_at = stored_timestamp(&self.updated_at, &row)?;
        Ok(Document {
            id: self.id,
            category_id: self.category_id,
            document_key: self.document_key,
            contract_number: self.contract_number,
            originator: self.originator,
            unit: self.unit,
            discipline: self.discipline,
            document_type: self.document_type,
            sequential_number: self.sequential_number,
            title: self.title,
            latest_revision_id: self.latest_revision_id,
            current_revision: self.current_revision,
            current_revision_date: parse_opt_date(self.current_revision_date),
            status: self.status,
            created_at,
            updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RevisionRow {
    id: i64,
    document_id: i64,
    revision: i64,
    revision_date: String,
    status: Option<String>,
    received_date: Option<String>,
    klass: Option<i64>,
    leader_id: Option<i64>,
    approver_id: Option<i64>,
    review_start_date: Option<String>,
    review_due_date: Option<String>,
    reviewers_step_closed: Option<String>,
    leader_step_closed: Option<String>,
    review_end_date: Option<String>,
    leader_comments: Option<String>,
    approver_comments: Option<String>,
    review_round: i64,
}

impl RevisionRow {
    fn into_revision(self, reviewers: Vec<i64>) -> EdmsResult<Revision> {
        let revision_date = parse_date(&self.revision_date).ok_or_else(|| {
            EdmsError::Internal(format!(
                "Invalid revision date {:?} on revision {}",
                self.revision_date, self.id
            ))
        })?;
        Ok(Revision {
            id: self.id,
            document_id: self.document_id,
            revision: self.revision,
            revision_date,
            status: self.status,
            received_date: parse_opt_date(self.received_date),
            klass: self.klass,
            reviewers,
            leader_id: self.leader_id,
            approver_id: self.approver_id,
            review_start_date: parse_opt_date(self.review_start_date),
            review_due_date: parse_opt_date(self.review_due_date),
            reviewers_step_closed: parse_opt_date(self.reviewers_step_closed),
            leader_step_closed: parse_opt_date(self.leader_step_closed),
            review_end_date: parse_opt_date(self.review_end_date),
            leader_comments: self.leader_comments,
            approver_comments: self.approver_comments,
            review_round: self.review_round,
        })
    }
}

fn opt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(format_date)
}

pub(crate) async fn fetch_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> EdmsResult<Category> {
    let row = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, organisation, name FROM categories WHERE id = ?",
    )
    .bind(category_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EdmsError::CategoryNotFound(category_id))?;

    Ok(Category {
        id: row.0,
        organisation: row.1,
        name: row.2,
    })
}

/// Whether the user belongs to the category
pub(crate) async fn is_category_member(
    conn: &mut SqliteConnection,
    user_id: i64,
    category_id: i64,
) -> EdmsResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM category_users WHERE category_id = ? AND user_id = ?",
    )
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.is_some())
}

/// Load a category the user belongs to; others are reported as not found
pub(crate) async fn fetch_member_category(
    conn: &mut SqliteConnection,
    user_id: i64,
    category_id: i64,
) -> EdmsResult<Category> {
    if !is_category_member(&mut *conn, user_id, category_id).await? {
        return Err(EdmsError::CategoryNotFound(category_id));
    }
    fetch_category(conn, category_id).await
}

pub(crate) async fn fetch_document(
    conn: &mut SqliteConnection,
    document_id: i64,
) -> EdmsResult<Document> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
    let row = sqlx::query_as::<_, DocumentRow>(&sql)
        .bind(document_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| EdmsError::DocumentNotFound(document_id.to_string()))?;
    row.into_document()
}

pub(crate) async fn find_document_by_key(
    conn: &mut SqliteConnection,
    document_key: &str,
) -> EdmsResult<Option<Document>> {
    let sql = format!(
        "SELECT {} FROM documents WHERE document_key = ?",
        DOCUMENT_COLUMNS
    );
    let row = sqlx::query_as::<_, DocumentRow>(&sql)
        .bind(document_key)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(DocumentRow::into_document).transpose()
}

/// Load a document visible to the user
///
/// Documents outside the user's categories are reported as not found.
pub(crate) async fn fetch_visible_document(
    conn: &mut SqliteConnection,
    user_id: i64,
    document_key: &str,
) -> EdmsResult<Document> {
    let not_found = || EdmsError::DocumentNotFound(document_key.to_string());

    let document = find_document_by_key(&mut *conn, document_key)
        .await?
        .ok_or_else(not_found)?;
    if !is_category_member(&mut *conn, user_id, document.category_id).await? {
        return Err(not_found());
    }
    Ok(document)
}

async fn fetch_reviewers(conn: &mut SqliteConnection, revision_id: i64) -> EdmsResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT user_id FROM revision_reviewers WHERE revision_id = ? ORDER BY user_id",
    )
    .bind(revision_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub(crate) async fn fetch_revision(
    conn: &mut SqliteConnection,
    revision_id: i64,
) -> EdmsResult<Revision> {
    let sql = format!("SELECT {} FROM revisions WHERE id = ?", REVISION_COLUMNS);
    let row = sqlx::query_as::<_, RevisionRow>(&sql)
        .bind(revision_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(EdmsError::RevisionNotFound(revision_id))?;
    let reviewers = fetch_reviewers(&mut *conn, revision_id).await?;
    row.into_revision(reviewers)
}

/// Latest revision of a document, if it has any
pub(crate) async fn fetch_latest_revision(
    conn: &mut SqliteConnection,
    document: &Document,
) -> EdmsResult<Option<Revision>> {
    match document.latest_revision_id {
        Some(id) => Ok(Some(fetch_revision(conn, id).await?)),
        None => Ok(None),
    }
}

/// Latest revision of a document, required to exist
pub(crate) async fn require_latest_revision(
    conn: &mut SqliteConnection,
    document: &Document,
) -> EdmsResult<Revision> {
    fetch_latest_revision(conn, document).await?.ok_or_else(|| {
        EdmsError::ResourceNotFound {
            resource_type: "revision".to_string(),
            resource_id: document.document_key.clone(),
        }
    })
}

/// All revisions of a document, newest first
pub(crate) async fn fetch_revisions_of(
    conn: &mut SqliteConnection,
    document_id: i64,
) -> EdmsResult<Vec<Revision>> {
    let sql = format!(
        "SELECT {} FROM revisions WHERE document_id = ? ORDER BY revision DESC",
        REVISION_COLUMNS
    );
    let rows = sqlx::query_as::<_, RevisionRow>(&sql)
        .bind(document_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut revisions = Vec::with_capacity(rows.len());
    for row in rows {
        let reviewers = fetch_reviewers(&mut *conn, row.id).await?;
        revisions.push(row.into_revision(reviewers)?);
    }
    Ok(revisions)
}

pub(crate) async fn insert_document(
    conn: &mut SqliteConnection,
    category_id: i64,
    key: &DocumentKeyParts,
    title: &str,
) -> EdmsResult<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    let id = sqlx::query(
        r#"
        INSERT INTO documents (category_id, document_key, contract_number, originator, unit,
                               discipline, document_type, sequential_number, title,
                               title_folded, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(category_id)
    .bind(key.document_key())
    .bind(&key.contract_number)
    .bind(&key.originator)
    .bind(&key.unit)
    .bind(&key.discipline)
    .bind(&key.document_type)
    .bind(&key.sequential_number)
    .bind(title.trim())
    .bind(fold_case(title.trim()))
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub(crate) async fn insert_revision(
    conn: &mut SqliteConnection,
    document_id: i64,
    request: &NewRevisionRequest,
) -> EdmsResult<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    let id = sqlx::query(
        r#"
        INSERT INTO revisions (document_id, revision, revision_date, status, received_date,
                               klass, leader_id, approver_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(document_id)
    .bind(request.revision)
    .bind(format_date(request.revision_date))
    .bind(&request.status)
    .bind(opt_date(request.received_date))
    .bind(request.klass)
    .bind(request.leader_id)
    .bind(request.approver_id)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    replace_reviewers(conn, id, &request.reviewers).await?;
    Ok(id)
}

async fn replace_reviewers(
    conn: &mut SqliteConnection,
    revision_id: i64,
    reviewers: &[i64],
) -> EdmsResult<()> {
    sqlx::query("DELETE FROM revision_reviewers WHERE revision_id = ?")
        .bind(revision_id)
        .execute(&mut *conn)
        .await?;
    for user_id in reviewers {
        sqlx::query("INSERT OR IGNORE INTO revision_reviewers (revision_id, user_id) VALUES (?, ?)")
            .bind(revision_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Lowercased copy of a free-text value, matched by the list filter.
/// SQLite `LOWER` and `LIKE` only fold ASCII.
pub(crate) fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Point the document at its highest revision and copy that revision's fields
pub(crate) async fn refresh_latest_revision(
    conn: &mut SqliteConnection,
    document_id: i64,
) -> EdmsResult<()> {
    let latest = sqlx::query_as::<_, (i64, i64, String, Option<String>)>(
        r#"
        SELECT id, revision, revision_date, status FROM revisions
        WHERE document_id = ?
        ORDER BY revision DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((revision_id, revision, revision_date, status)) = latest else {
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE documents SET
            latest_revision_id = ?, current_revision = ?, current_revision_date = ?,
            status = ?, status_folded = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(revision_id)
    .bind(revision)
    .bind(revision_date)
    .bind(&status)
    .bind(status.as_deref().map(fold_case))
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(document_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Persist the review fields of a revision
pub(crate) async fn save_review_state(
    conn: &mut SqliteConnection,
    revision: &Revision,
) -> EdmsResult<()> {
    sqlx::query(
        r#"
        UPDATE revisions SET
            review_start_date = ?, review_due_date = ?, reviewers_step_closed = ?,
            leader_step_closed = ?, review_end_date = ?, leader_comments = ?,
            approver_comments = ?, review_round = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(opt_date(revision.review_start_date))
    .bind(opt_date(revision.review_due_date))
    .bind(opt_date(revision.reviewers_step_closed))
    .bind(opt_date(revision.leader_step_closed))
    .bind(opt_date(revision.review_end_date))
    .bind(&revision.leader_comments)
    .bind(&revision.approver_comments)
    .bind(revision.review_round)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(revision.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Persist the reviewers, leader and approver of a revision
pub(crate) async fn save_assignment(
    conn: &mut SqliteConnection,
    revision: &Revision,
) -> EdmsResult<()> {
    sqlx::query("UPDATE revisions SET leader_id = ?, approver_id = ?, updated_at = ? WHERE id = ?")
        .bind(revision.leader_id)
        .bind(revision.approver_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(revision.id)
        .execute(&mut *conn)
        .await?;
    replace_reviewers(conn, revision.id, &revision.reviewers).await
}
