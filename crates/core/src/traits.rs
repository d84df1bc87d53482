use crate::{IndexSummary, OnlineListing, ProductRecord, SearchError, SearchHit};
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Embeds and upserts each record under [`ProductRecord::identifier`].
    async fn index(&self, records: &[ProductRecord]) -> Result<IndexSummary, SearchError>;

    /// Up to `k` records ranked by similarity to `query`. `k` must be positive.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// `Ok(None)` when nothing was indexed under `id`.
    async fn get_by_id(&self, id: &str) -> Result<Option<ProductRecord>, SearchError>;

    async fn close(&self) -> Result<(), SearchError> {
        Ok(())
    }
}

#[async_trait]
impl<T> DocumentStore for Box<T>
where
    T: DocumentStore + ?Sized,
{
    async fn index(&self, records: &[ProductRecord]) -> Result<IndexSummary, SearchError> {
        (**self).index(records).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        (**self).search(query, k).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ProductRecord>, SearchError> {
        (**self).get_by_id(id).await
    }

    async fn close(&self) -> Result<(), SearchError> {
        (**self).close().await
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SearchError>;
}

#[async_trait]
impl<T> LanguageModel for Box<T>
where
    T: LanguageModel + ?Sized,
{
    async fn complete(&self, system: &str, user: &str) -> Result<String, SearchError> {
        (**self).complete(system, user).await
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search_listings(&self, query: &str) -> Result<Vec<OnlineListing>, SearchError>;
}

pub(crate) fn ensure_positive_k(k: usize) -> Result<(), SearchError> {
    if k == 0 {
        return Err(SearchError::Request("k must be a positive integer".to_string()));
    }
    Ok(())
}
