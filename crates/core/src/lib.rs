pub mod assistant;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod sheet;
pub mod stores;
pub mod traits;
pub mod web_search;

pub use assistant::{render_results, ProductAssistant, ProductMatch};
pub use embeddings::{
    cosine_similarity, CharacterNgramEmbedder, Embedder, RemoteEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, LineError, PipelineError, SearchError};
pub use extractor::{
    extract_page_texts, parse_bullet, CatalogTextParser, LopdfExtractor, PageText, PdfExtractor,
};
pub use indexer::{index_catalog_folder, IndexRun};
pub use ingest::{
    discover_catalog_files, extract_catalog_file, ingest_catalog_folder, CatalogExtraction,
    IngestionReport, SkippedFile, SkippedUnit,
};
pub use llm::{ChatCompletionsClient, NoLanguageModel, DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL};
pub use models::{
    BulletLine, CatalogKind, CatalogOptions, CellValue, IndexSummary, IndexedEntry, OnlineListing,
    ProductRecord, RawRecord, RecordFailure, SearchHit, TabularRow,
};
pub use normalize::{normalize, normalize_bullet, normalize_row};
pub use sheet::read_sheet_rows;
pub use stores::{LocalStore, QdrantStore};
pub use traits::{DocumentStore, LanguageModel, WebSearch};
pub use web_search::SerpApiSearch;
