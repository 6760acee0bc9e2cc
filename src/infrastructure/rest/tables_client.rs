//! REST fallback for table discovery
//!
//! When the bus-based table finder times out or fails, the assigner
//! falls back to `GET {restaurant-service}/api/restaurants/{id}/tables/available`.
//! Any non-2xx answer or malformed body degrades to "no candidates";
//! the fallback never turns an availability question into a hard error.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// A table offered by the restaurant service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableCandidate {
    pub id: String,
    pub capacity: i32,
}

#[derive(Debug, Deserialize)]
struct AvailableTablesBody {
    data: AvailableTablesData,
}

#[derive(Debug, Deserialize)]
struct AvailableTablesData {
    tables: Vec<TableCandidate>,
}

/// Port for the available-tables lookup, so the assigner can be tested
/// without a live restaurant service.
#[async_trait]
pub trait AvailableTablesApi: Send + Sync {
    /// Candidate tables in the service's preference order, or None
    /// when the lookup failed.
    async fn fetch_available(&self, restaurant_id: &str) -> Option<Vec<TableCandidate>>;
}

/// reqwest-backed client against the restaurant service.
pub struct RestTablesClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestTablesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AvailableTablesApi for RestTablesClient {
    async fn fetch_available(&self, restaurant_id: &str) -> Option<Vec<TableCandidate>> {
        let url = format!(
            "{}/api/restaurants/{}/tables/available",
            self.base_url, restaurant_id
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(restaurant_id, url, error = %e, "Available-tables request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                restaurant_id,
                status = %response.status(),
                "Available-tables request answered non-2xx"
            );
            return None;
        }

        match response.json::<AvailableTablesBody>().await {
            Ok(body) => Some(body.data.tables),
            Err(e) => {
                warn!(restaurant_id, error = %e, "Malformed available-tables body");
                None
            }
        }
    }
}
