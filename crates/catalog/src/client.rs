//! Transport seam for catalog requests.
//!
//! `CatalogClient` returns the raw JSON body; parsing into an
//! [`ItemPage`](crate::ItemPage) happens in the caller so that every
//! transport shares the same normalization.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CatalogError;
use crate::query::CatalogRequest;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches one page of a catalog.
///
/// Implementations must be `Send + Sync`; methods return boxed futures for
/// dyn-compatibility.
pub trait CatalogClient: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a CatalogRequest) -> BoxFuture<'a, Result<Value, CatalogError>>;
}

/// STAC API over HTTP.
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpCatalog {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl CatalogClient for HttpCatalog {
    fn fetch<'a>(&'a self, request: &'a CatalogRequest) -> BoxFuture<'a, Result<Value, CatalogError>> {
        Box::pin(async move {
            let url = request.as_str();
            debug!(url, "fetching catalog page");

            let resp = self
                .client
                .get(request.url().clone())
                .header(reqwest::header::ACCEPT, "application/geo+json, application/json")
                .send()
                .await
                .map_err(|e| CatalogError::Network(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(CatalogError::BadStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            resp.json::<Value>()
                .await
                .map_err(|e| CatalogError::Decode(e.to_string()))
        })
    }
}

/// In-memory catalog keyed by full request URL. Useful for tests and demos.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    responses: Arc<RwLock<HashMap<String, Result<Value, CatalogError>>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(&self, url: impl Into<String>, body: Value) {
        self.responses.write().await.insert(url.into(), Ok(body));
    }

    pub async fn fail(&self, url: impl Into<String>, error: CatalogError) {
        self.responses.write().await.insert(url.into(), Err(error));
    }

    /// URLs requested so far, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

impl CatalogClient for MemoryCatalog {
    fn fetch<'a>(&'a self, request: &'a CatalogRequest) -> BoxFuture<'a, Result<Value, CatalogError>> {
        Box::pin(async move {
            let url = request.as_str().to_string();
            self.requests.write().await.push(url.clone());
            match self.responses.read().await.get(&url) {
                Some(resp) => resp.clone(),
                None => Err(CatalogError::BadStatus { status: 404, url }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogClient, MemoryCatalog};
    use crate::error::CatalogError;
    use crate::query::{CatalogEndpoint, SearchQuery};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn memory_catalog_serves_scripted_pages() {
        let endpoint = CatalogEndpoint::parse("http://stac.test").unwrap();
        let request = SearchQuery::new("c1", 2).request(&endpoint).unwrap();
        let catalog = MemoryCatalog::new();
        catalog
            .respond(request.as_str(), json!({"type": "FeatureCollection", "features": []}))
            .await;

        let body = catalog.fetch(&request).await.unwrap();
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(
            catalog.requests().await,
            vec!["http://stac.test/collections/c1/items?limit=2".to_string()]
        );
    }

    #[tokio::test]
    async fn unknown_urls_are_not_found() {
        let endpoint = CatalogEndpoint::parse("http://stac.test").unwrap();
        let request = SearchQuery::new("missing", 10).request(&endpoint).unwrap();
        let err = MemoryCatalog::new().fetch(&request).await.unwrap_err();
        assert!(matches!(err, CatalogError::BadStatus { status: 404, .. }));
    }
}
