use crate::traits::WebSearch;
use crate::{OnlineListing, SearchError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";
pub const MAX_ONLINE_LISTINGS: usize = 10;

/// Walmart listings through SerpApi. Without a key every search is empty.
pub struct SerpApiSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SerpApiSearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(SERPAPI_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn request_url(&self, query: &str, api_key: &str) -> Result<Url, SearchError> {
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[("engine", "walmart"), ("query", query), ("api_key", api_key)],
        )?)
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search_listings(&self, query: &str) -> Result<Vec<OnlineListing>, SearchError> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let response = self
            .client
            .get(self.request_url(query, api_key)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "serpapi".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(listings_from_response(&parsed))
    }
}

fn listings_from_response(parsed: &Value) -> Vec<OnlineListing> {
    parsed
        .get("organic_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .take(MAX_ONLINE_LISTINGS)
                .map(|fields| OnlineListing { fields })
                .collect()
        })
        .unwrap_or_default()
}
