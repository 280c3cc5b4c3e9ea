//! Import service - CSV bulk import of documents and revisions

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use uuid::Uuid;

use super::store;
use super::DocumentService;
use crate::config::EdmsConfig;
use crate::error::{EdmsError, EdmsResult};
use crate::models::{
    parse_date, DocumentKeyParts, Import, ImportBatch, ImportRow, ImportStatus,
    NewRevisionRequest,
};
use crate::search::{self, SharedIndex};
use crate::security::validate_file_name;

/// Reader for the import dialect: `;` separated, `"` quoted, no doubled
/// quotes, CRLF terminated, every row with the header's field count
pub fn csv_reader<R: std::io::Read>(data: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .quote(b'"')
        .double_quote(false)
        .terminator(csv::Terminator::CRLF)
        .trim(csv::Trim::All)
        .flexible(false)
        .has_headers(true)
        .from_reader(data)
}

/// Import service
pub struct ImportService {
    import_root: PathBuf,
    documents: DocumentService,
    index: SharedIndex,
}

impl ImportService {
    pub fn new(config: &EdmsConfig, index: SharedIndex) -> Self {
        Self {
            import_root: PathBuf::from(&config.import_root),
            documents: DocumentService::new(index.clone()),
            index,
        }
    }

    /// Store an uploaded file and register a new batch for it
    pub async fn create_batch(
        &self,
        pool: &SqlitePool,
        category_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> EdmsResult<ImportBatch> {
        validate_file_name(file_name)?;
        {
            let mut conn = pool.acquire().await?;
            store::fetch_category(&mut conn, category_id).await?;
        }

        let uid = Uuid::new_v4().to_string();
        let dir = self
            .import_root
            .join(format!("import_{}", chrono::Utc::now().format("%Y%m%d")));
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}_{}", uid, file_name));
        tokio::fs::write(&path, content).await?;

        let file_path = path.to_string_lossy().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO import_batches (uid, category_id, file_name, file_path, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&uid)
        .bind(category_id)
        .bind(file_name)
        .bind(&file_path)
        .bind(ImportStatus::New.to_string())
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        tracing::info!(uid = %uid, file_name, "Import batch created");
        self.get_batch(pool, &uid).await
    }

    /// Import every line of a batch, each in its own transaction
    ///
    /// Failed lines are recorded and never abort the batch.
    pub async fn run_batch(&self, pool: &SqlitePool, uid: &str) -> EdmsResult<ImportBatch> {
        let batch = self.get_batch(pool, uid).await?;
        self.set_status(pool, uid, ImportStatus::Started).await?;

        let content = match tokio::fs::read(&batch.file_path).await {
            Ok(content) => content,
            Err(e) => {
                self.set_status(pool, uid, ImportStatus::Error).await?;
                return Err(e.into());
            }
        };

        let mut reader = csv_reader(content.as_slice());
        let headers = match reader.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                self.set_status(pool, uid, ImportStatus::Error).await?;
                return Err(e.into());
            }
        };

        let mut total = 0usize;
        let mut succeeded = 0usize;
        let mut record = csv::StringRecord::new();
        let mut line = 1i64;
        loop {
            // Line of the record in the file, the header being line 1
            let outcome = match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    line = record.position().map_or(line + 1, |p| p.line() as i64);
                    match record.deserialize::<ImportRow>(Some(&headers)) {
                        Ok(row) => self.import_line(pool, batch.category_id, row).await,
                        Err(e) => Err(e.into()),
                    }
                }
                Err(e) => {
                    line = e.position().map_or(line + 1, |p| p.line() as i64);
                    Err(e.into())
                }
            };
            total += 1;

            let (status, document_id, errors) = match outcome {
                Ok(document_id) => {
                    succeeded += 1;
                    (ImportStatus::Success, Some(document_id), None)
                }
                Err(e) => {
                    tracing::warn!(uid, line, error = %e, "Import line failed");
                    (ImportStatus::Error, None, Some(e.to_string()))
                }
            };
            sqlx::query(
                "INSERT INTO imports (batch_uid, line, document_id, status, errors) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(uid)
            .bind(line)
            .bind(document_id)
            .bind(status.to_string())
            .bind(errors)
            .execute(pool)
            .await?;
        }

        let status = ImportStatus::aggregate(succeeded, total);
        self.set_status(pool, uid, status).await?;
        tracing::info!(uid, total, succeeded, %status, "Import batch finished");
        self.get_batch(pool, uid).await
    }

    /// Create or revise the document described by one line
    async fn import_line(
        &self,
        pool: &SqlitePool,
        category_id: i64,
        row: ImportRow,
    ) -> EdmsResult<i64> {
        let revision = NewRevisionRequest {
            revision: row.revision,
            revision_date: parse_csv_date("revision_date", &row.revision_date)?,
            status: row.status,
            received_date: row
                .received_date
                .as_deref()
                .map(|d| parse_csv_date("received_date", d))
                .transpose()?,
            klass: row.klass,
            reviewers: vec![],
            leader_id: None,
            approver_id: None,
        };
        let key = DocumentKeyParts {
            contract_number: row.contract_number,
            originator: row.originator,
            unit: row.unit,
            discipline: row.discipline,
            document_type: row.document_type,
            sequential_number: row.sequential_number,
        };

        let mut tx = pool.begin().await?;
        let document_id = match store::find_document_by_key(&mut tx, &key.document_key()).await? {
            Some(document) => {
                if document.category_id != category_id {
                    return Err(EdmsError::Validation(format!(
                        "{} belongs to another category",
                        document.document_key
                    )));
                }
                self.documents
                    .create_revision_tx(&mut tx, &document, &revision)
                    .await?;
                document.id
            }
            None => {
                self.documents
                    .create_document_tx(&mut tx, category_id, &key, &row.title, &revision)
                    .await?
            }
        };
        tx.commit().await?;

        search::mirror_document(pool, self.index.as_ref(), document_id).await;
        Ok(document_id)
    }

    pub async fn get_batch(&self, pool: &SqlitePool, uid: &str) -> EdmsResult<ImportBatch> {
        let row = sqlx::query_as::<_, (String, i64, String, String, String, String)>(
            "SELECT uid, category_id, file_name, file_path, status, created_at FROM import_batches WHERE uid = ?",
        )
        .bind(uid)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| EdmsError::ResourceNotFound {
            resource_type: "import_batch".to_string(),
            resource_id: uid.to_string(),
        })?;

        let lines = sqlx::query_as::<_, (i64, Option<i64>, String, Option<String>)>(
            "SELECT line, document_id, status, errors FROM imports WHERE batch_uid = ? ORDER BY line",
        )
        .bind(uid)
        .fetch_all(pool)
        .await?;

        Ok(ImportBatch {
            uid: row.0,
            category_id: row.1,
            file_name: row.2,
            file_path: row.3,
            status: row.4.parse().unwrap_or(ImportStatus::New),
            created_at: store::stored_timestamp(&row.5, &format!("import batch {}", uid))?,
            imports: lines
                .into_iter()
                .map(|l| Import {
                    line: l.0,
                    document_id: l.1,
                    status: l.2.parse().unwrap_or(ImportStatus::Error),
                    errors: l.3,
                })
                .collect(),
        })
    }

    /// A batch of one of the user's categories
    pub async fn get_member_batch(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        uid: &str,
    ) -> EdmsResult<ImportBatch> {
        let batch = self.get_batch(pool, uid).await?;
        let mut conn = pool.acquire().await?;
        if !store::is_category_member(&mut conn, user_id, batch.category_id).await? {
            return Err(EdmsError::ResourceNotFound {
                resource_type: "import_batch".to_string(),
                resource_id: uid.to_string(),
            });
        }
        Ok(batch)
    }

    /// Create and run a batch uploaded by a member of the category
    pub async fn upload(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        category_id: i64,
        file_name: &str,
        content: &[u8],
    ) -> EdmsResult<ImportBatch> {
        {
            let mut conn = pool.acquire().await?;
            store::fetch_member_category(&mut conn, user_id, category_id).await?;
        }
        let batch = self.create_batch(pool, category_id, file_name, content).await?;
        self.run_batch(pool, &batch.uid).await
    }

    /// Create and run a batch from a file on disk
    pub async fn import_file(
        &self,
        pool: &SqlitePool,
        category_id: i64,
        path: &Path,
    ) -> EdmsResult<ImportBatch> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EdmsError::Validation(format!("Invalid file path {}", path.display())))?;
        let content = tokio::fs::read(path).await?;
        let batch = self.create_batch(pool, category_id, file_name, &content).await?;
        self.run_batch(pool, &batch.uid).await
    }

    async fn set_status(&self, pool: &SqlitePool, uid: &str, status: ImportStatus) -> EdmsResult<()> {
        sqlx::query("UPDATE import_batches SET status = ?, updated_at = ? WHERE uid = ?")
            .bind(status.to_string())
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(uid)
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn parse_csv_date(field: &str, value: &str) -> EdmsResult<chrono::NaiveDate> {
    parse_date(value)
        .ok_or_else(|| EdmsError::Validation(format!("Invalid {}: {:?}", field, value)))
}
