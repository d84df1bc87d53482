use crate::traits::{DocumentStore, LanguageModel, WebSearch};
use crate::{OnlineListing, ProductRecord, SearchError, SearchHit};
use tracing::warn;

pub const ANSWER_RESULTS: usize = 5;
pub const LOOKUP_RESULTS: usize = 10;

const SYSTEM_PROMPT: &str =
    "You are a retail assistant. Provide a concise, helpful response based on the search results.";
const NO_CONTEXT: &str = "No relevant products found in the local catalog.";

#[derive(Debug, Clone, PartialEq)]
pub enum ProductMatch {
    Local(ProductRecord),
    Online(OnlineListing),
}

/// Chat-facing facade: local catalog first, web listings as the fallback,
/// and a language-model summary on top.
pub struct ProductAssistant<S, L, W>
where
    S: DocumentStore,
    L: LanguageModel,
    W: WebSearch,
{
    store: S,
    llm: L,
    web: W,
}

impl<S, L, W> ProductAssistant<S, L, W>
where
    S: DocumentStore,
    L: LanguageModel,
    W: WebSearch,
{
    pub fn new(store: S, llm: L, web: W) -> Self {
        Self { store, llm, web }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Top local matches as prompt context, one catalog line each.
    pub async fn catalog_context(&self, query: &str) -> Result<String, SearchError> {
        let hits = self.store.search(query, ANSWER_RESULTS).await?;
        if hits.is_empty() {
            return Ok(NO_CONTEXT.to_string());
        }

        Ok(hits
            .iter()
            .map(|hit| hit.record.document_text())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Local attributes first; web listings only when asked for and nothing
    /// local matched. A failed web search yields no listings rather than an
    /// error. Tool callers use [`LOOKUP_RESULTS`] as the limit.
    pub async fn search_products(
        &self,
        query: &str,
        limit: usize,
        use_online: bool,
    ) -> Result<Vec<ProductMatch>, SearchError> {
        let local: Vec<ProductMatch> = self
            .store
            .search(query, limit)
            .await?
            .into_iter()
            .map(|hit| ProductMatch::Local(hit.record))
            .collect();

        if use_online && local.is_empty() {
            let online = self.web.search_listings(query).await.unwrap_or_else(|error| {
                warn!(reason = %error, "online search failed");
                Vec::new()
            });
            return Ok(online
                .into_iter()
                .take(limit)
                .map(ProductMatch::Online)
                .collect());
        }

        Ok(local)
    }

    pub async fn product_details(&self, id: &str) -> Result<Option<ProductRecord>, SearchError> {
        self.store.get_by_id(id).await
    }

    /// Always produces a reply. Store and web failures degrade to "no
    /// results"; a language-model failure returns the assembled results.
    pub async fn answer(&self, query: &str) -> String {
        let local = self
            .store
            .search(query, ANSWER_RESULTS)
            .await
            .unwrap_or_else(|error| {
                warn!(reason = %error, "local catalog search failed");
                Vec::new()
            });
        let online = self.web.search_listings(query).await.unwrap_or_else(|error| {
            warn!(reason = %error, "online search failed");
            Vec::new()
        });

        let results = render_results(&local, &online);
        let prompt = format!("Query: {query}\nResults:\n{results}");

        match self.llm.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(reason = %error, "language model unavailable, returning raw results");
                results
            }
        }
    }
}

pub fn render_results(local: &[SearchHit], online: &[OnlineListing]) -> String {
    let mut rendered = String::from("Based on the local catalog:\n");
    if local.is_empty() {
        rendered.push_str(
            "Unfortunately, we don't have any matching products in our local catalog.\n",
        );
    }
    for hit in local {
        let record = &hit.record;
        rendered.push_str(&format!(
            "- {} {}: {}, Price: ${}, {}\n",
            record.brand, record.product_name, record.description, record.price, record.stock
        ));
    }

    rendered.push_str("Online results:\n");
    if online.is_empty() {
        rendered.push_str("No online results found.\n");
    }
    for listing in online {
        rendered.push_str(&format!(
            "- {}: ${}\n",
            listing.title().unwrap_or("Unknown Product"),
            listing.price().unwrap_or_else(|| "N/A".to_string())
        ));
    }

    rendered
}
