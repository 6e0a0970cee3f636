use std::env;

use catalog::{DEFAULT_ITEM_LIMIT, DatetimeFilter, clamp_limit};
use foundation::Viewport;
use runtime::RetryPolicy;

pub const DEFAULT_STAC_API_URL: &str = "http://localhost:8000";

/// Camera used at startup and after switching catalogs (Istanbul).
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    longitude: 28.9784,
    latitude: 41.0151,
    zoom: 12.0,
};

/// Session configuration, passed in by value and snapshotted into each query.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub stac_api_url: String,
    pub collection_id: Option<String>,
    pub item_limit: u32,
    pub datetime_filter: DatetimeFilter,
    pub default_viewport: Viewport,
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stac_api_url: DEFAULT_STAC_API_URL.to_string(),
            collection_id: None,
            item_limit: DEFAULT_ITEM_LIMIT,
            datetime_filter: DatetimeFilter::Any,
            default_viewport: DEFAULT_VIEWPORT,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `STAC_API_URL`, `STAC_COLLECTION` and `STAC_ITEM_LIMIT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`], reading variables through `lookup`.
    /// Blank or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            stac_api_url: var("STAC_API_URL").unwrap_or(defaults.stac_api_url),
            collection_id: var("STAC_COLLECTION"),
            item_limit: var("STAC_ITEM_LIMIT")
                .and_then(|v| v.parse().ok())
                .map(clamp_limit)
                .unwrap_or(defaults.item_limit),
            ..defaults
        }
    }

    pub fn with_stac_api_url(mut self, url: impl Into<String>) -> Self {
        self.stac_api_url = url.into();
        self
    }

    pub fn with_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    pub fn with_item_limit(mut self, limit: u32) -> Self {
        self.item_limit = clamp_limit(limit);
        self
    }

    pub fn with_datetime_filter(mut self, filter: DatetimeFilter) -> Self {
        self.datetime_filter = filter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
