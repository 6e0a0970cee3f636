//! STAC item collection wire format and the normalized [`Item`] built from it.

use std::collections::BTreeMap;

use foundation::{BBox, Geometry};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;
use crate::thumbnail::{ThumbnailRef, discover_thumbnail};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Asset {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    assets: BTreeMap<String, Asset>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
    #[serde(default)]
    number_returned: Option<u64>,
    #[serde(default)]
    number_matched: Option<u64>,
    #[serde(default)]
    links: Vec<Link>,
}

/// Opaque server-supplied continuation (`rel="next"` href).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NextCursor(pub String);

impl NextCursor {
    pub fn href(&self) -> &str {
        &self.0
    }
}

/// A catalog record, immutable once built from the server response.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub geometry: Option<Geometry>,
    pub bbox: Option<BBox>,
    pub thumbnail: Option<ThumbnailRef>,
    pub assets: BTreeMap<String, Asset>,
    pub datetime: Option<String>,
}

impl Item {
    fn from_raw(raw: RawFeature, position: usize) -> Self {
        let id = raw.id.unwrap_or_else(|| format!("item-{position}"));

        let geometry = raw.geometry.as_ref().and_then(|g| match Geometry::from_json(g) {
            Ok(g) => Some(g),
            Err(e) => {
                warn!("dropping geometry of item {id}: {e}");
                None
            }
        });

        let bbox = raw.bbox.as_deref().and_then(|b| match BBox::from_slice(b) {
            Ok(b) => Some(b),
            Err(e) => {
                warn!("dropping bbox of item {id}: {e}");
                None
            }
        });

        let prop_str = |key: &str| {
            raw.properties
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let title = prop_str("title").unwrap_or_else(|| id.clone());
        let datetime = prop_str("datetime").or_else(|| prop_str("start_datetime"));
        let thumbnail = discover_thumbnail(&raw.assets, &raw.links);

        Item {
            id,
            title,
            geometry,
            bbox,
            thumbnail,
            assets: raw.assets,
            datetime,
        }
    }
}

/// One decoded response page.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub number_returned: Option<u64>,
    pub number_matched: Option<u64>,
    pub next: Option<NextCursor>,
}

impl ItemPage {
    /// Decodes a response body.
    ///
    /// `first_position` is the result-set position of the page's first item,
    /// used to name items the server sent without an id.
    pub fn from_value(value: serde_json::Value, first_position: usize) -> Result<Self, CatalogError> {
        let raw: RawItemCollection =
            serde_json::from_value(value).map_err(|e| CatalogError::Decode(e.to_string()))?;

        let next = raw
            .links
            .iter()
            .find(|l| l.rel == "next" && !l.href.is_empty())
            .map(|l| NextCursor(l.href.clone()));

        let items = raw
            .features
            .into_iter()
            .enumerate()
            .map(|(i, f)| Item::from_raw(f, first_position + i))
            .collect();

        Ok(ItemPage {
            items,
            number_returned: raw.number_returned,
            number_matched: raw.number_matched,
            next,
        })
    }
}
