use crate::error::PipelineError;
use crate::ingest::{ingest_catalog_folder, IngestionReport};
use crate::models::{CatalogOptions, IndexSummary};
use crate::traits::DocumentStore;
use std::path::Path;
use tracing::{info, warn};

pub struct IndexRun {
    pub ingestion: IngestionReport,
    pub summary: IndexSummary,
}

/// Extract, normalize, and upsert every catalog in `folder`. Unreadable
/// files and malformed lines are reported in the run; store failures abort it.
pub async fn index_catalog_folder<S>(
    store: &S,
    folder: &Path,
    options: &CatalogOptions,
) -> Result<IndexRun, PipelineError>
where
    S: DocumentStore + ?Sized,
{
    let ingestion = ingest_catalog_folder(folder, options)?;
    let summary = store.index(&ingestion.records).await?;

    for failure in &summary.failures {
        warn!(id = %failure.id, reason = %failure.reason, "record not indexed");
    }
    info!(
        folder = %folder.display(),
        indexed = summary.indexed,
        failed = summary.failures.len(),
        skipped_files = ingestion.skipped_files.len(),
        skipped_entries = ingestion.skipped_units.len(),
        "catalog indexing finished"
    );

    Ok(IndexRun { ingestion, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProductRecord, SearchError, SearchHit};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn index(&self, _records: &[ProductRecord]) -> Result<IndexSummary, SearchError> {
            Err(SearchError::Unavailable("connection refused".to_string()))
        }

        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Unavailable("connection refused".to_string()))
        }

        async fn get_by_id(&self, _id: &str) -> Result<Option<ProductRecord>, SearchError> {
            Err(SearchError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_aborts_the_run() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("catalog.pdf"), b"%PDF-1.4\n%broken")?;

        let result =
            index_catalog_folder(&UnreachableStore, dir.path(), &CatalogOptions::default()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Store(SearchError::Unavailable(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn empty_folder_is_an_ingest_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result =
            index_catalog_folder(&UnreachableStore, dir.path(), &CatalogOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::Ingest(_))));
        Ok(())
    }

    #[tokio::test]
    async fn parsed_line_round_trips_through_local_store() -> Result<(), Box<dyn std::error::Error>> {
        use crate::extractor::{CatalogTextParser, PageText};
        use crate::normalize::normalize_bullet;
        use crate::{CharacterNgramEmbedder, LocalStore};
        use std::sync::Arc;

        let options = CatalogOptions::default();
        let parsed = CatalogTextParser::new(&options).parse_pages(&[PageText {
            number: 1,
            text: "Smartphones\n- Samsung Galaxy S24: 128GB Storage, Price: $699, In Stock"
                .to_string(),
        }]);
        let records: Vec<_> = parsed.entries.iter().map(normalize_bullet).collect();

        let dir = tempdir()?;
        let store = LocalStore::open(dir.path(), Arc::new(CharacterNgramEmbedder::default())).await?;
        let summary = store.index(&records).await?;
        assert_eq!(summary.indexed, 1);

        let stored = store.get_by_id("smartphones_Galaxy_S24").await?;
        assert_eq!(
            stored,
            Some(ProductRecord {
                category: "smartphones".to_string(),
                brand: "samsung".to_string(),
                product_name: "Galaxy S24".to_string(),
                description: "128GB Storage".to_string(),
                price: 699.0,
                stock: "In Stock".to_string(),
            })
        );
        Ok(())
    }
}
