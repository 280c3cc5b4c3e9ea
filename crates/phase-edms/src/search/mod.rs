//! Search index mirror
//!
//! The relational store is the source of truth. After each committed
//! mutation the document is pushed to the index; index failures are logged
//! and never undo the store change.

pub mod elastic;
pub mod mapping;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::config::SearchConfig;
use crate::error::EdmsResult;
use crate::models::DOCUMENT_DOC_TYPE;
use crate::services::store;

pub use elastic::ElasticIndex;
pub use mapping::{document_mapping, get_mapping, mapping_type, FieldKind};
pub use memory::MemoryIndex;

/// Document index operations
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn put_mapping(&self, doc_type: &str, mapping: Value) -> EdmsResult<()>;

    async fn index(&self, doc_type: &str, id: i64, body: Value) -> EdmsResult<()>;

    async fn unindex(&self, doc_type: &str, id: i64) -> EdmsResult<()>;

    async fn bulk_index(&self, doc_type: &str, docs: Vec<(i64, Value)>) -> EdmsResult<()> {
        for (id, body) in docs {
            self.index(doc_type, id, body).await?;
        }
        Ok(())
    }
}

/// Shared handle on the configured index
pub type SharedIndex = Arc<dyn SearchIndex>;

/// Build the index selected by the configuration
pub fn build_index(config: &SearchConfig) -> EdmsResult<SharedIndex> {
    if config.enabled {
        tracing::info!(url = %config.url, index = %config.index, "Mirroring documents to search index");
        Ok(Arc::new(ElasticIndex::new(config)?))
    } else {
        Ok(Arc::new(MemoryIndex::new()))
    }
}

/// Push the current state of a document to the index
pub async fn mirror_document(pool: &SqlitePool, index: &dyn SearchIndex, document_id: i64) {
    if let Err(e) = try_mirror_document(pool, index, document_id).await {
        tracing::warn!(document_id, error = %e, "Failed to index document");
    }
}

async fn try_mirror_document(
    pool: &SqlitePool,
    index: &dyn SearchIndex,
    document_id: i64,
) -> EdmsResult<()> {
    let mut conn = pool.acquire().await?;
    let document = store::fetch_document(&mut conn, document_id).await?;
    let latest = store::fetch_latest_revision(&mut conn, &document).await?;
    drop(conn);

    index
        .index(
            DOCUMENT_DOC_TYPE,
            document.id,
            document.to_index_json(latest.as_ref()),
        )
        .await
}

/// Remove a deleted document from the index
pub async fn unmirror_document(index: &dyn SearchIndex, document_id: i64) {
    if let Err(e) = index.unindex(DOCUMENT_DOC_TYPE, document_id).await {
        tracing::warn!(document_id, error = %e, "Failed to remove document from index");
    }
}

/// Rebuild the whole index from the store, `bulk_size` documents at a time
///
/// Returns the number of documents pushed.
pub async fn reindex_all(
    pool: &SqlitePool,
    index: &dyn SearchIndex,
    bulk_size: usize,
) -> EdmsResult<usize> {
    index
        .put_mapping(DOCUMENT_DOC_TYPE, document_mapping())
        .await?;

    let bulk_size = bulk_size.max(1);
    let mut last_id = 0i64;
    let mut total = 0usize;

    loop {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM documents WHERE id > ? ORDER BY id LIMIT ?")
                .bind(last_id)
                .bind(bulk_size as i64)
                .fetch_all(pool)
                .await?;
        let Some(&(max_id,)) = ids.last() else {
            break;
        };

        let mut conn = pool.acquire().await?;
        let mut batch = Vec::with_capacity(ids.len());
        for (id,) in &ids {
            let document = store::fetch_document(&mut conn, *id).await?;
            let latest = store::fetch_latest_revision(&mut conn, &document).await?;
            batch.push((document.id, document.to_index_json(latest.as_ref())));
        }
        drop(conn);

        let count = batch.len();
        index.bulk_index(DOCUMENT_DOC_TYPE, batch).await?;
        total += count;
        last_id = max_id;
        tracing::debug!(count, total, "Indexed document batch");
    }

    tracing::info!(total, "Search index rebuilt");
    Ok(total)
}
