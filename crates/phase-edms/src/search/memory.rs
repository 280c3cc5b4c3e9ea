//! In-process index used when no external index is configured

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::SearchIndex;
use crate::error::EdmsResult;

#[derive(Default)]
pub struct MemoryIndex {
    mappings: RwLock<HashMap<String, Value>>,
    documents: RwLock<HashMap<(String, i64), Value>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, doc_type: &str, id: i64) -> Option<Value> {
        self.documents
            .read()
            .await
            .get(&(doc_type.to_string(), id))
            .cloned()
    }

    pub async fn mapping(&self, doc_type: &str) -> Option<Value> {
        self.mappings.read().await.get(doc_type).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn put_mapping(&self, doc_type: &str, mapping: Value) -> EdmsResult<()> {
        self.mappings
            .write()
            .await
            .insert(doc_type.to_string(), mapping);
        Ok(())
    }

    async fn index(&self, doc_type: &str, id: i64, body: Value) -> EdmsResult<()> {
        self.documents
            .write()
            .await
            .insert((doc_type.to_string(), id), body);
        Ok(())
    }

    async fn unindex(&self, doc_type: &str, id: i64) -> EdmsResult<()> {
        self.documents
            .write()
            .await
            .remove(&(doc_type.to_string(), id));
        Ok(())
    }
}
