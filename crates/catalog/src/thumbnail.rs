//! Thumbnail discovery on items and the preflight check run before display.

use std::collections::BTreeMap;

use crate::client::BoxFuture;
use crate::model::{Asset, Link};

/// Where an item's preview image lives and what it claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRef {
    pub url: Option<String>,
    pub media_type: Option<String>,
}

impl ThumbnailRef {
    pub fn new(url: impl Into<String>, media_type: Option<String>) -> Self {
        Self {
            url: Some(url.into()),
            media_type,
        }
    }

    /// A reference with nothing to show.
    pub fn missing() -> Self {
        Self {
            url: None,
            media_type: None,
        }
    }

    /// Inline-renderable formats: JPEG or PNG by media type or file extension.
    pub fn is_web_image(&self) -> bool {
        let Some(url) = self.url.as_deref() else {
            return false;
        };
        is_web_media(self.media_type.as_deref()) || has_web_image_ext(url)
    }
}

fn has_web_image_ext(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    [".jpg", ".jpeg", ".png"].iter().any(|ext| path.ends_with(ext))
}

fn is_web_media(media_type: Option<&str>) -> bool {
    let m = media_type.unwrap_or("").to_ascii_lowercase();
    m.starts_with("image/jpeg") || m.starts_with("image/png")
}

/// Picks an item's thumbnail, most specific source first:
/// `assets.thumbnail`, a web-image asset with role `thumbnail`, any asset with
/// role `thumbnail`, then a `thumbnail`/`preview` link.
pub fn discover_thumbnail(assets: &BTreeMap<String, Asset>, links: &[Link]) -> Option<ThumbnailRef> {
    let from_asset = |a: &Asset| {
        a.href
            .as_ref()
            .map(|href| ThumbnailRef::new(href.clone(), a.media_type.clone()))
    };

    if let Some(t) = assets.get("thumbnail").and_then(from_asset) {
        return Some(t);
    }
    if let Some(t) = assets
        .values()
        .filter(|a| a.has_role("thumbnail") && is_web_media(a.media_type.as_deref()))
        .find_map(from_asset)
    {
        return Some(t);
    }
    if let Some(t) = assets.values().filter(|a| a.has_role("thumbnail")).find_map(from_asset) {
        return Some(t);
    }
    links
        .iter()
        .find(|l| (l.rel == "thumbnail" || l.rel == "preview") && !l.href.is_empty())
        .map(|l| ThumbnailRef::new(l.href.clone(), l.media_type.clone()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Unreachable(String),
    Status(u16),
    NotAnImage(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Unreachable(msg) => write!(f, "thumbnail unreachable: {msg}"),
            ProbeError::Status(code) => write!(f, "thumbnail returned HTTP {code}"),
            ProbeError::NotAnImage(ct) => write!(f, "thumbnail is not an image ({ct})"),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Non-blocking check that a thumbnail can actually be loaded.
pub trait ThumbnailProbe: Send + Sync {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), ProbeError>>;
}

pub struct HttpThumbnailProbe {
    client: reqwest::Client,
}

impl HttpThumbnailProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ThumbnailProbe for HttpThumbnailProbe {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), ProbeError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(ProbeError::Status(resp.status().as_u16()));
            }

            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if !content_type.is_empty() && !content_type.starts_with("image/") {
                return Err(ProbeError::NotAnImage(content_type));
            }
            Ok(())
        })
    }
}
