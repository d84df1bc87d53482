use crate::embeddings::Embedder;
use crate::traits::{ensure_positive_k, DocumentStore};
use crate::{IndexSummary, ProductRecord, RecordFailure, SearchError, SearchHit};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    embedder: Arc<dyn Embedder>,
}

impl QdrantStore {
    /// Checks the server is reachable and creates the collection if missing.
    pub async fn connect(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, SearchError> {
        let endpoint: String = endpoint.into();
        let store = Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            embedder,
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    /// Connection and timeout failures mean the server went away.
    fn request_error(&self, error: reqwest::Error) -> SearchError {
        if error.is_connect() || error.is_timeout() {
            SearchError::Unavailable(format!("qdrant at {}: {error}", self.endpoint))
        } else {
            SearchError::Http(error)
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    async fn ensure_collection(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(|error| SearchError::Unavailable(format!("qdrant at {}: {error}", self.endpoint)))?;

        if response.status().is_success() {
            let parsed: Value = response.json().await?;
            let size = parsed
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64);
            return match size {
                Some(size) if size as usize != self.embedder.dimensions() => {
                    Err(SearchError::Unavailable(format!(
                        "collection {} has vector size {size}, embedder produces {}",
                        self.collection,
                        self.embedder.dimensions()
                    )))
                }
                _ => Ok(()),
            };
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(SearchError::Unavailable(format!(
                "qdrant collection lookup returned {}",
                response.status()
            )));
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": {
                    "size": self.embedder.dimensions(),
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Unavailable(format!(
                "qdrant collection setup failed with {}",
                response.status()
            )));
        }

        debug!(collection = %self.collection, "qdrant collection created");
        Ok(())
    }
}

/// Qdrant only accepts integer or UUID point ids, so the identifier is hashed.
pub fn point_id(identifier: &str) -> u64 {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn record_payload(id: &str, document: &str, record: &ProductRecord) -> Value {
    json!({
        "identifier": id,
        "document": document,
        "category": record.category,
        "brand": record.brand,
        "product_name": record.product_name,
        "description": record.description,
        "price": record.price,
        "stock": record.stock,
    })
}

fn record_from_payload(payload: &Value) -> Option<ProductRecord> {
    serde_json::from_value(payload.clone()).ok()
}

#[async_trait]
impl DocumentStore for QdrantStore {
    async fn index(&self, records: &[ProductRecord]) -> Result<IndexSummary, SearchError> {
        let mut summary = IndexSummary::default();
        let mut points = Vec::new();

        for record in records {
            let id = record.identifier();
            let document = record.document_text();
            match self.embedder.embed(&document).await {
                Ok(embedding) => points.push(json!({
                    "id": point_id(&id),
                    "vector": embedding,
                    "payload": record_payload(&id, &document, record),
                })),
                Err(error) => summary.failures.push(RecordFailure {
                    id,
                    reason: error.to_string(),
                }),
            }
        }

        if points.is_empty() {
            return Ok(summary);
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|error| self.request_error(error))?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        summary.indexed = points.len();
        Ok(summary)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        ensure_positive_k(k)?;
        let query_vector = self.embedder.embed(query).await?;

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|error| self.request_error(error))?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(hits_from_response(&parsed, k))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProductRecord>, SearchError> {
        let response = self
            .client
            .get(format!("{}/points/{}", self.collection_url(), point_id(id)))
            .send()
            .await
            .map_err(|error| self.request_error(error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let payload = parsed.pointer("/result/payload").unwrap_or(&Value::Null);

        // A hash collision would surface a different product; treat it as absent.
        if payload.get("identifier").and_then(Value::as_str) != Some(id) {
            return Ok(None);
        }
        Ok(record_from_payload(payload))
    }
}

fn hits_from_response(parsed: &Value, k: usize) -> Vec<SearchHit> {
    parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let payload = hit.pointer("/payload")?;
                    let record = record_from_payload(payload)?;
                    let id = payload
                        .get("identifier")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| record.identifier());
                    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
                    Some(SearchHit { id, score, record })
                })
                .take(k)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_stable_per_identifier() {
        assert_eq!(point_id("tvs_OLED_C3"), point_id("tvs_OLED_C3"));
        assert_ne!(point_id("tvs_OLED_C3"), point_id("tvs_OLED_C4"));
    }

    #[test]
    fn search_response_maps_payload_to_records() -> Result<(), serde_json::Error> {
        let response: Value = serde_json::from_str(
            r#"{
                "result": [
                    {"id": 1, "score": 0.91, "payload": {
                        "identifier": "smartphones_Galaxy_S24", "document": "ignored",
                        "category": "smartphones", "brand": "samsung",
                        "product_name": "Galaxy S24", "description": "128GB Storage",
                        "price": 699.0, "stock": "In Stock"}},
                    {"id": 2, "score": 0.5, "payload": {"unrelated": true}}
                ]
            }"#,
        )?;

        let hits = hits_from_response(&response, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "smartphones_Galaxy_S24");
        assert_eq!(hits[0].record.price, 699.0);
        assert_eq!(hits[0].score, 0.91);
        Ok(())
    }

    #[test]
    fn empty_search_response_has_no_hits() {
        assert!(hits_from_response(&json!({"result": []}), 5).is_empty());
        assert!(hits_from_response(&json!({}), 5).is_empty());
    }

    #[tokio::test]
    async fn lost_server_is_reported_as_unavailable() {
        use crate::CharacterNgramEmbedder;

        // Nothing listens on port 1, so every request fails to connect.
        let store = QdrantStore {
            endpoint: "http://127.0.0.1:1".to_string(),
            collection: "products".to_string(),
            client: Client::new(),
            embedder: Arc::new(CharacterNgramEmbedder::default()),
        };

        assert!(matches!(
            store.search("oled tv", 5).await,
            Err(SearchError::Unavailable(_))
        ));
        assert!(matches!(
            store.get_by_id("tvs_OLED_C3").await,
            Err(SearchError::Unavailable(_))
        ));
    }
}
