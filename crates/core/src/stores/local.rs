use crate::embeddings::{cosine_similarity, Embedder};
use crate::traits::{ensure_positive_k, DocumentStore};
use crate::{IndexSummary, IndexedEntry, ProductRecord, RecordFailure, SearchError, SearchHit};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const STORE_FILE: &str = "products.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    model: String,
    dimensions: usize,
    entries: BTreeMap<String, IndexedEntry>,
}

/// Brute-force cosine store persisted as one JSON file under a data directory.
pub struct LocalStore {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<BTreeMap<String, IndexedEntry>>,
}

impl LocalStore {
    /// Opens (or creates) the store at `data_dir`. A store written with a
    /// different embedding model is refused.
    pub async fn open(
        data_dir: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, SearchError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await.map_err(|error| {
            SearchError::Unavailable(format!("cannot create {}: {error}", data_dir.display()))
        })?;

        let path = data_dir.join(STORE_FILE);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes).map_err(|error| {
                    SearchError::Unavailable(format!("corrupt store {}: {error}", path.display()))
                })?;
                if file.model != embedder.model_name() || file.dimensions != embedder.dimensions() {
                    return Err(SearchError::Unavailable(format!(
                        "store {} was built with {} ({} dims), not {} ({} dims)",
                        path.display(),
                        file.model,
                        file.dimensions,
                        embedder.model_name(),
                        embedder.dimensions()
                    )));
                }
                file.entries
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                return Err(SearchError::Unavailable(format!(
                    "cannot read {}: {error}",
                    path.display()
                )))
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "local store opened");

        Ok(Self {
            path,
            embedder,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn persist(&self, entries: &BTreeMap<String, IndexedEntry>) -> Result<(), SearchError> {
        let file = StoreFile {
            model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
            entries: entries.clone(),
        };
        let json = serde_json::to_vec(&file)?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn index(&self, records: &[ProductRecord]) -> Result<IndexSummary, SearchError> {
        let mut entries = self.entries.write().await;
        let mut summary = IndexSummary::default();

        for record in records {
            let id = record.identifier();
            let document = record.document_text();

            match self.embedder.embed(&document).await {
                Ok(embedding) => {
                    debug!(id = %id, "indexed product");
                    entries.insert(
                        id.clone(),
                        IndexedEntry {
                            id,
                            document,
                            record: record.clone(),
                            embedding,
                            indexed_at: Utc::now(),
                        },
                    );
                    summary.indexed += 1;
                }
                Err(error) => summary.failures.push(RecordFailure {
                    id,
                    reason: error.to_string(),
                }),
            }
        }

        if summary.indexed > 0 {
            self.persist(&entries).await?;
        }

        Ok(summary)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        ensure_positive_k(k)?;

        let entries = self.entries.read().await;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut scored: Vec<(f32, &IndexedEntry)> = entries
            .values()
            .map(|entry| (cosine_similarity(&query_vector, &entry.embedding), entry))
            .collect();

        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| SearchHit {
                id: entry.id.clone(),
                score: f64::from(score),
                record: entry.record.clone(),
            })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProductRecord>, SearchError> {
        Ok(self
            .entries
            .read()
            .await
            .get(id)
            .map(|entry| entry.record.clone()))
    }

    async fn close(&self) -> Result<(), SearchError> {
        let entries = self.entries.read().await;
        self.persist(&entries).await
    }
}
