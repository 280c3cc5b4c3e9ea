//! Document service - documents, revisions and the filtered document list

use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::store;
use crate::error::{EdmsError, EdmsResult};
use crate::models::{
    CreateDocumentRequest, Document, DocumentDetail, DocumentKeyParts, FilterQuery,
    FilterResponse, NewRevisionRequest, Revision, SEARCHABLE_FIELDS,
};
use crate::search::{self, SharedIndex};
use crate::security::{validate_document_key, validate_klass, validate_title};

/// Database row struct for the document list
#[derive(sqlx::FromRow)]
struct FilterRow {
    id: i64,
    document_key: String,
    title: String,
    status: Option<String>,
    current_revision: i64,
    current_revision_date: Option<String>,
    discipline: String,
    document_type: String,
    unit: String,
    originator: String,
}

/// Document service
pub struct DocumentService {
    index: SharedIndex,
}

impl DocumentService {
    pub fn new(index: SharedIndex) -> Self {
        Self { index }
    }

    /// Create a document together with its first revision
    pub async fn create_document(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        request: CreateDocumentRequest,
    ) -> EdmsResult<DocumentDetail> {
        let mut tx = pool.begin().await?;
        store::fetch_member_category(&mut tx, user_id, request.category_id).await?;
        let document_id = self
            .create_document_tx(
                &mut tx,
                request.category_id,
                &request.key,
                &request.title,
                &request.revision,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(document_id, key = %request.key.document_key(), "Document created");
        search::mirror_document(pool, self.index.as_ref(), document_id).await;

        let mut conn = pool.acquire().await?;
        let document = store::fetch_document(&mut conn, document_id).await?;
        let revisions = store::fetch_revisions_of(&mut conn, document_id).await?;
        Ok(DocumentDetail {
            document,
            revisions,
        })
    }

    /// Insert a document and its first revision within the caller's transaction
    pub(crate) async fn create_document_tx(
        &self,
        conn: &mut SqliteConnection,
        category_id: i64,
        key: &DocumentKeyParts,
        title: &str,
        revision: &NewRevisionRequest,
    ) -> EdmsResult<i64> {
        validate_document_key(key)?;
        validate_title(title)?;
        validate_revision_request(revision)?;

        let document_key = key.document_key();
        if store::find_document_by_key(&mut *conn, &document_key)
            .await?
            .is_some()
        {
            return Err(EdmsError::DocumentExists(document_key));
        }

        let document_id = store::insert_document(&mut *conn, category_id, key, title).await?;
        store::insert_revision(&mut *conn, document_id, revision).await?;
        store::refresh_latest_revision(&mut *conn, document_id).await?;
        Ok(document_id)
    }

    /// Get a document and its revisions, newest first
    pub async fn get_document(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
    ) -> EdmsResult<DocumentDetail> {
        let mut conn = pool.acquire().await?;
        let document = store::fetch_visible_document(&mut conn, user_id, document_key).await?;
        let revisions = store::fetch_revisions_of(&mut conn, document.id).await?;
        Ok(DocumentDetail {
            document,
            revisions,
        })
    }

    /// Register a new revision of an existing document
    pub async fn create_revision(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
        request: NewRevisionRequest,
    ) -> EdmsResult<Revision> {
        let mut tx = pool.begin().await?;
        let document = store::fetch_visible_document(&mut tx, user_id, document_key).await?;
        let revision_id = self.create_revision_tx(&mut tx, &document, &request).await?;
        let revision = store::fetch_revision(&mut tx, revision_id).await?;
        tx.commit().await?;

        tracing::info!(
            document_key,
            revision = revision.revision,
            "Revision created"
        );
        search::mirror_document(pool, self.index.as_ref(), document.id).await;
        Ok(revision)
    }

    /// Insert a revision within the caller's transaction
    ///
    /// The revision number must exceed the current one and the latest
    /// revision must not be under review.
    pub(crate) async fn create_revision_tx(
        &self,
        conn: &mut SqliteConnection,
        document: &Document,
        request: &NewRevisionRequest,
    ) -> EdmsResult<i64> {
        validate_revision_request(request)?;

        if let Some(latest) = store::fetch_latest_revision(&mut *conn, document).await? {
            if latest.is_under_review() {
                return Err(EdmsError::ReviewAlreadyStarted {
                    revision_id: latest.id,
                });
            }
            if request.revision <= latest.revision {
                return Err(EdmsError::Validation(format!(
                    "Revision {} of {} must be greater than the current revision {}",
                    request.revision, document.document_key, latest.revision
                )));
            }
        }

        let revision_id = store::insert_revision(&mut *conn, document.id, request).await?;
        store::refresh_latest_revision(&mut *conn, document.id).await?;
        Ok(revision_id)
    }

    /// Delete a document with all its revisions and reviews
    pub async fn delete_document(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        document_key: &str,
    ) -> EdmsResult<()> {
        let mut tx = pool.begin().await?;
        let document = store::fetch_visible_document(&mut tx, user_id, document_key).await?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(document_key, "Document deleted");
        search::unmirror_document(self.index.as_ref(), document.id).await;
        Ok(())
    }

    /// Filtered, sorted page of the documents visible to the user
    pub async fn filter_documents(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        query: &FilterQuery,
    ) -> EdmsResult<FilterResponse> {
        let mut total = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents d");
        push_visibility(&mut total, user_id);
        let (total_records,): (i64,) = total.build_query_as().fetch_one(pool).await?;

        let mut filtered = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents d");
        push_visibility(&mut filtered, user_id);
        push_filters(&mut filtered, query);
        let (total_display_records,): (i64,) = filtered.build_query_as().fetch_one(pool).await?;

        let mut page = QueryBuilder::<Sqlite>::new(
            "SELECT d.id, d.document_key, d.title, d.status, d.current_revision, \
             d.current_revision_date, d.discipline, d.document_type, d.unit, d.originator \
             FROM documents d",
        );
        push_visibility(&mut page, user_id);
        push_filters(&mut page, query);
        // sort_column comes from the fixed column table
        page.push(format!(
            " ORDER BY d.{} {}, d.id ASC",
            query.sort_column,
            if query.sort_desc { "DESC" } else { "ASC" }
        ));
        page.push(" LIMIT ")
            .push_bind(query.length as i64)
            .push(" OFFSET ")
            .push_bind(query.start as i64);

        let rows: Vec<FilterRow> = page.build_query_as().fetch_all(pool).await?;
        let data = rows
            .into_iter()
            .map(|row| {
                vec![
                    json!(row.document_key),
                    json!(row.title),
                    json!(row.status),
                    json!(row.current_revision),
                    json!(row.current_revision_date),
                    json!(row.discipline),
                    json!(row.document_type),
                    json!(row.unit),
                    json!(row.originator),
                    json!(row.id),
                ]
            })
            .collect();

        Ok(FilterResponse {
            echo: query.echo.clone(),
            total_records: total_records as u64,
            total_display_records: total_display_records as u64,
            data,
        })
    }
}

fn validate_revision_request(request: &NewRevisionRequest) -> EdmsResult<()> {
    if request.revision < 0 {
        return Err(EdmsError::Validation(format!(
            "Invalid revision number {}",
            request.revision
        )));
    }
    validate_klass(request.klass)
}

fn push_visibility(builder: &mut QueryBuilder<'_, Sqlite>, user_id: i64) {
    builder
        .push(" WHERE d.category_id IN (SELECT category_id FROM category_users WHERE user_id = ")
        .push_bind(user_id)
        .push(")");
}

/// Case-insensitive substring pattern for LIKE with `\` as escape
fn like_pattern(term: &str) -> String {
    let escaped = store::fold_case(term)
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Folded form of a filterable column. Free-text columns keep a stored
/// lowercase copy; the others are validated ASCII.
fn column_expr(column: &str) -> String {
    match column {
        "title" | "status" => format!("d.{}_folded", column),
        _ => format!("LOWER(CAST(d.{} AS TEXT))", column),
    }
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &FilterQuery) {
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        for (i, field) in SEARCHABLE_FIELDS.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(column_expr(field))
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }

    for (column, term) in &query.column_searches {
        builder
            .push(" AND ")
            .push(column_expr(column))
            .push(" LIKE ")
            .push_bind(like_pattern(term))
            .push(" ESCAPE '\\'");
    }
}
