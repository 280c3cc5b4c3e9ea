//! Transmittal service - revisions sent between categories

use sqlx::{SqliteConnection, SqlitePool};

use super::store;
use crate::error::{EdmsError, EdmsResult};
use crate::models::{
    transmittal_key, CreateTransmittalRequest, Transmittal, TransmittalStatus,
};

/// Transmittal service
pub struct TransmittalService;

impl TransmittalService {
    pub fn new() -> Self {
        Self
    }

    /// Create an outgoing transmittal with the given revisions
    ///
    /// Every revision must belong to a document of the sending category.
    pub async fn create_transmittal(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        request: CreateTransmittalRequest,
    ) -> EdmsResult<Transmittal> {
        if request.revision_ids.is_empty() {
            return Err(EdmsError::MissingRevisions);
        }

        let mut tx = pool.begin().await?;
        let from = store::fetch_member_category(&mut tx, user_id, request.from_category_id).await?;
        let to = store::fetch_category(&mut tx, request.to_category_id).await?;

        let mut invalid = Vec::new();
        for revision_id in &request.revision_ids {
            let owner: Option<(i64,)> = sqlx::query_as(
                r#"
                SELECT d.category_id FROM revisions r
                JOIN documents d ON d.id = r.document_id
                WHERE r.id = ?
                "#,
            )
            .bind(revision_id)
            .fetch_optional(&mut *tx)
            .await?;
            if owner.map(|o| o.0) != Some(from.id) {
                invalid.push(revision_id.to_string());
            }
        }
        if !invalid.is_empty() {
            return Err(EdmsError::InvalidRevisions(invalid.join(", ")));
        }

        let (sequential_number,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(MAX(sequential_number), 0) + 1 FROM transmittals
            WHERE from_category_id = ? AND to_category_id = ?
            "#,
        )
        .bind(from.id)
        .bind(to.id)
        .fetch_one(&mut *tx)
        .await?;
        let key = transmittal_key(&from.organisation, &to.organisation, sequential_number);

        let transmittal_id = sqlx::query(
            r#"
            INSERT INTO transmittals (transmittal_key, from_category_id, to_category_id,
                                      sequential_number, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key)
        .bind(from.id)
        .bind(to.id)
        .bind(sequential_number)
        .bind(TransmittalStatus::New.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for revision_id in &request.revision_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO transmittal_revisions (transmittal_id, revision_id) VALUES (?, ?)",
            )
            .bind(transmittal_id)
            .bind(revision_id)
            .execute(&mut *tx)
            .await?;
        }

        let transmittal = fetch_transmittal(&mut tx, transmittal_id).await?;
        tx.commit().await?;

        tracing::info!(
            transmittal_key = %transmittal.transmittal_key,
            revisions = transmittal.revision_ids.len(),
            "Transmittal created"
        );
        Ok(transmittal)
    }

    /// Transmittals sent from or to the user's categories, newest first
    pub async fn list_transmittals(
        &self,
        pool: &SqlitePool,
        user_id: i64,
    ) -> EdmsResult<Vec<Transmittal>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT t.id FROM transmittals t
            WHERE t.from_category_id IN (SELECT category_id FROM category_users WHERE user_id = ?)
               OR t.to_category_id IN (SELECT category_id FROM category_users WHERE user_id = ?)
            ORDER BY t.id DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut conn = pool.acquire().await?;
        let mut transmittals = Vec::with_capacity(ids.len());
        for (id,) in ids {
            transmittals.push(fetch_transmittal(&mut conn, id).await?);
        }
        Ok(transmittals)
    }

    pub async fn get_transmittal(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        transmittal_id: i64,
    ) -> EdmsResult<Transmittal> {
        let mut conn = pool.acquire().await?;
        let transmittal = fetch_transmittal(&mut conn, transmittal_id).await?;
        let from = store::is_category_member(&mut conn, user_id, transmittal.from_category_id).await?;
        let to = store::is_category_member(&mut conn, user_id, transmittal.to_category_id).await?;
        if !(from || to) {
            return Err(transmittal_not_found(transmittal_id));
        }
        Ok(transmittal)
    }

    pub async fn accept_transmittal(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        transmittal_id: i64,
    ) -> EdmsResult<Transmittal> {
        self.set_status(pool, user_id, transmittal_id, TransmittalStatus::Accepted)
            .await
    }

    pub async fn reject_transmittal(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        transmittal_id: i64,
    ) -> EdmsResult<Transmittal> {
        self.set_status(pool, user_id, transmittal_id, TransmittalStatus::Rejected)
            .await
    }

    /// Only members of the receiving category may answer a new transmittal
    async fn set_status(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        transmittal_id: i64,
        status: TransmittalStatus,
    ) -> EdmsResult<Transmittal> {
        let mut tx = pool.begin().await?;
        let mut transmittal = fetch_transmittal(&mut tx, transmittal_id).await?;
        if !store::is_category_member(&mut tx, user_id, transmittal.to_category_id).await? {
            return Err(transmittal_not_found(transmittal_id));
        }
        if transmittal.status != TransmittalStatus::New {
            return Err(EdmsError::Validation(format!(
                "Transmittal {} is already {}",
                transmittal.transmittal_key, transmittal.status
            )));
        }

        sqlx::query("UPDATE transmittals SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(transmittal_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        transmittal.status = status;
        tracing::info!(
            transmittal_key = %transmittal.transmittal_key,
            %status,
            "Transmittal answered"
        );
        Ok(transmittal)
    }
}

impl Default for TransmittalService {
    fn default() -> Self {
        Self::new()
    }
}

fn transmittal_not_found(transmittal_id: i64) -> EdmsError {
    EdmsError::ResourceNotFound {
        resource_type: "transmittal".to_string(),
        resource_id: transmittal_id.to_string(),
    }
}

async fn fetch_transmittal(
    conn: &mut SqliteConnection,
    transmittal_id: i64,
) -> EdmsResult<Transmittal> {
    let row = sqlx::query_as::<_, (i64, String, i64, i64, i64, String, String)>(
        r#"
        SELECT id, transmittal_key, from_category_id, to_category_id, sequential_number,
               status, created_at
        FROM transmittals WHERE id = ?
        "#,
    )
    .bind(transmittal_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| transmittal_not_found(transmittal_id))?;

    let revisions: Vec<(i64,)> = sqlx::query_as(
        "SELECT revision_id FROM transmittal_revisions WHERE transmittal_id = ? ORDER BY revision_id",
    )
    .bind(transmittal_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Transmittal {
        id: row.0,
        transmittal_key: row.1,
        from_category_id: row.2,
        to_category_id: row.3,
        sequential_number: row.4,
        status: row.5.parse().unwrap_or_default(),
        revision_ids: revisions.into_iter().map(|r| r.0).collect(),
        created_at: store::stored_timestamp(&row.6, &format!("transmittal {}", row.0))?,
    })
}
