//! STAC catalog access: query building, response normalization and transport.

pub mod client;
pub mod error;
pub mod model;
pub mod query;
pub mod thumbnail;

pub use client::{BoxFuture, CatalogClient, HttpCatalog, MemoryCatalog};
pub use error::CatalogError;
pub use model::{Asset, Item, ItemPage, Link, NextCursor};
pub use query::{
    CatalogEndpoint, CatalogRequest, DEFAULT_ITEM_LIMIT, DatetimeFilter, FAR_FUTURE, FAR_PAST,
    MAX_ITEM_LIMIT, SearchQuery, clamp_limit, normalize_datetime,
};
pub use thumbnail::{
    HttpThumbnailProbe, ProbeError, ThumbnailProbe, ThumbnailRef, discover_thumbnail,
};
