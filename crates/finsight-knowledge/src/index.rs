//! Vector index implementations.
//!
//! [`HttpVectorIndex`] talks to an external REST index service (upsert,
//! top-K query with metadata filter, delete-by-document). The index's
//! internal storage engine is out of scope; only the wire contract lives
//! here. [`InMemoryVectorIndex`] is the in-process double used by tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::RwLock;
use tracing::{debug, info};

use finsight_core::{Error, IndexFilter, IndexMatch, Result, VectorIndex, VectorRecord};
use finsight_inference::cosine_similarity;

/// REST client for the external vector index service.
pub struct HttpVectorIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpVectorIndex {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        info!(base_url = %base_url, "Initializing vector index client");
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Create from `VECTOR_INDEX_URL` / `VECTOR_INDEX_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("VECTOR_INDEX_URL")
            .map_err(|_| Error::Config("VECTOR_INDEX_URL is required".to_string()))?;
        let api_key = std::env::var("VECTOR_INDEX_API_KEY").ok().filter(|k| !k.is_empty());
        Ok(Self::new(base_url, api_key))
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("Api-Key", key);
        }
        builder
    }

    fn filter_payload(filter: &IndexFilter) -> JsonValue {
        let mut clauses = serde_json::Map::new();
        if !filter.categories.is_empty() {
            let categories: Vec<String> =
                filter.categories.iter().map(|c| c.to_string()).collect();
            clauses.insert("categories".to_string(), json!({ "$in": categories }));
        }
        if let Some(document_id) = &filter.document_id {
            clauses.insert("document_id".to_string(), json!({ "$eq": document_id }));
        }
        JsonValue::Object(clauses)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: JsonValue,
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let vectors: Vec<JsonValue> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "values": r.vector,
                    "metadata": r.metadata,
                })
            })
            .collect();

        let response = self
            .request("/vectors/upsert")
            .json(&json!({ "vectors": vectors }))
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorIndex(format!(
                "Upsert returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        debug!(count = records.len(), "Upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexMatch>> {
        let mut payload = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            payload["filter"] = Self::filter_payload(&filter);
        }

        let response = self
            .request("/query")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Query request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VectorIndex(format!(
                "Query returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let reply: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::VectorIndex(format!("Malformed query response: {}", e)))?;

        Ok(reply
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let response = self
            .request("/vectors/delete")
            .json(&json!({
                "filter": { "document_id": { "$eq": document_id } }
            }))
            .send()
            .await
            .map_err(|e| Error::VectorIndex(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::VectorIndex(format!(
                "Delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// In-memory vector index used by tests and offline development.
///
/// Scores are cosine similarities, so stored and query vectors must share
/// one dimensionality, which the embedding service already guarantees.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn matches_filter(metadata: &JsonValue, filter: &IndexFilter) -> bool {
        if let Some(document_id) = &filter.document_id {
            if metadata.get("document_id").and_then(|v| v.as_str()) != Some(document_id.as_str()) {
                return false;
            }
        }
        if !filter.categories.is_empty() {
            let wanted: Vec<String> = filter.categories.iter().map(|c| c.to_string()).collect();
            let present = metadata
                .get("categories")
                .and_then(|v| v.as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_str())
                        .any(|c| wanted.iter().any(|w| w == c))
                })
                .unwrap_or(false);
            if !present {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexMatch>> {
        let store = self.records.read().await;
        let mut matches: Vec<IndexMatch> = store
            .values()
            .filter(|record| {
                filter
                    .as_ref()
                    .map(|f| Self::matches_filter(&record.metadata, f))
                    .unwrap_or(true)
            })
            .map(|record| IndexMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut store = self.records.write().await;
        store.retain(|_, record| {
            record.metadata.get("document_id").and_then(|v| v.as_str())
                != Some(document_id)
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::ConceptCategory;

    fn record(id: &str, vector: Vec<f32>, document_id: &str, categories: &[&str]) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            metadata: json!({
                "document_id": document_id,
                "categories": categories,
            }),
        }
    }

    #[tokio::test]
    async fn test_in_memory_upsert_and_query() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0], "doc-1", &["VALUATION"]),
                record("b", vec![0.0, 1.0], "doc-1", &["ECONOMICS"]),
            ])
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_in_memory_upsert_overwrites() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![record("a", vec![1.0, 0.0], "doc-1", &[])])
            .await
            .unwrap();
        index
            .upsert(vec![record("a", vec![0.0, 1.0], "doc-1", &[])])
            .await
            .unwrap();

        assert_eq!(index.len().await, 1);
        let matches = index.query(&[0.0, 1.0], 1, None).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_in_memory_category_filter() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0], "doc-1", &["VALUATION"]),
                record("b", vec![1.0, 0.0], "doc-1", &["ECONOMICS"]),
            ])
            .await
            .unwrap();

        let filter = IndexFilter {
            categories: vec![ConceptCategory::Valuation],
            document_id: None,
        };
        let matches = index.query(&[1.0, 0.0], 10, Some(filter)).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
    }

    #[tokio::test]
    async fn test_in_memory_delete_document() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0], "doc-1", &[]),
                record("b", vec![1.0], "doc-2", &[]),
            ])
            .await
            .unwrap();

        index.delete_document("doc-1").await.unwrap();
        assert_eq!(index.len().await, 1);
        let matches = index.query(&[1.0], 10, None).await.unwrap();
        assert_eq!(matches[0].id, "b");
    }

    #[test]
    fn test_filter_payload_shape() {
        let filter = IndexFilter {
            categories: vec![ConceptCategory::Valuation, ConceptCategory::Equity],
            document_id: Some("doc-9".to_string()),
        };
        let payload = HttpVectorIndex::filter_payload(&filter);
        assert_eq!(payload["categories"]["$in"][0], "VALUATION");
        assert_eq!(payload["categories"]["$in"][1], "EQUITY");
        assert_eq!(payload["document_id"]["$eq"], "doc-9");
    }

    #[tokio::test]
    async fn test_http_upsert_and_query_contract() {
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "secret"))
            .and(body_partial_json(json!({
                "vectors": [{ "id": "a", "values": [1.0, 0.0] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    { "id": "a", "score": 0.92, "metadata": { "document_id": "doc-1" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), Some("secret".to_string()));
        index
            .upsert(vec![VectorRecord {
                id: "a".to_string(),
                vector: vec![1.0, 0.0],
                metadata: json!({"document_id": "doc-1"}),
            }])
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
        assert!((matches[0].score - 0.92).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_http_error_status_propagates() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(503).set_body_string("index unavailable"))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri(), None);
        let result = index.query(&[1.0], 5, None).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("503"));
    }
}
