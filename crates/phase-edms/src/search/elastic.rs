//! HTTP client for an Elasticsearch-style index

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};

use super::SearchIndex;
use crate::config::SearchConfig;
use crate::error::{EdmsError, EdmsResult};

/// Index reached over its REST API at `{url}/{index}/{doc_type}/{id}`
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticIndex {
    /// Build the client; every request is bounded by `timeout_secs`
    pub fn new(config: &SearchConfig) -> EdmsResult<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
        })
    }

    fn document_url(&self, doc_type: &str, id: i64) -> String {
        format!("{}/{}/{}/{}", self.base_url, self.index, doc_type, id)
    }

    async fn check(response: reqwest::Response, allow: &[StatusCode]) -> EdmsResult<()> {
        let status = response.status();
        if status.is_success() || allow.contains(&status) {
            return Ok(());
        }
        let error = response.text().await.unwrap_or_default();
        Err(EdmsError::SearchIndex(format!("{}: {}", status, error)))
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn put_mapping(&self, doc_type: &str, mapping: Value) -> EdmsResult<()> {
        // Creating an existing index answers 400
        let response = self
            .client
            .put(format!("{}/{}", self.base_url, self.index))
            .send()
            .await?;
        Self::check(response, &[StatusCode::BAD_REQUEST]).await?;

        let response = self
            .client
            .put(format!(
                "{}/{}/_mapping/{}",
                self.base_url, self.index, doc_type
            ))
            .json(&Value::Object(Map::from_iter([(doc_type.to_string(), mapping)])))
            .send()
            .await?;
        Self::check(response, &[]).await
    }

    async fn index(&self, doc_type: &str, id: i64, body: Value) -> EdmsResult<()> {
        let response = self
            .client
            .put(self.document_url(doc_type, id))
            .json(&body)
            .send()
            .await?;
        Self::check(response, &[]).await
    }

    async fn unindex(&self, doc_type: &str, id: i64) -> EdmsResult<()> {
        let response = self
            .client
            .delete(self.document_url(doc_type, id))
            .send()
            .await?;
        Self::check(response, &[StatusCode::NOT_FOUND]).await
    }

    async fn bulk_index(&self, doc_type: &str, docs: Vec<(i64, Value)>) -> EdmsResult<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let mut payload = String::new();
        for (id, body) in &docs {
            let action = json!({
                "index": { "_index": self.index, "_type": doc_type, "_id": id }
            });
            payload.push_str(&action.to_string());
            payload.push('\n');
            payload.push_str(&body.to_string());
            payload.push('\n');
        }

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(EdmsError::SearchIndex(format!("{}: {}", status, error)));
        }

        let result: Value = response.json().await?;
        if result["errors"].as_bool().unwrap_or(false) {
            return Err(EdmsError::SearchIndex(
                "bulk request reported item errors".to_string(),
            ));
        }
        Ok(())
    }
}
