use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<calamine::Error> for IngestError {
    fn from(error: calamine::Error) -> Self {
        IngestError::Spreadsheet(error.to_string())
    }
}

/// Why a single catalog line or sheet row produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("line is not a bullet entry")]
    NotABullet,

    #[error("bullet entry appears before any category heading")]
    NoCategory,

    #[error("missing \": \" between product and details")]
    MissingNameSeparator,

    #[error("missing \", Price: $\" marker")]
    MissingPriceMarker,

    #[error("missing stock status after price")]
    MissingStock,

    #[error("price is not a number: {0:?}")]
    InvalidPrice(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("search request failed: {0}")]
    Request(String),
}

/// Failure of a whole catalog indexing run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] SearchError),
}
