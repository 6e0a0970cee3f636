//! Catalog queries and the request URLs they produce.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use foundation::BBox;
use reqwest::Url;

use crate::error::CatalogError;
use crate::model::NextCursor;

pub const DEFAULT_ITEM_LIMIT: u32 = 10;
pub const MAX_ITEM_LIMIT: u32 = 10_000;

/// Open end of a start-only interval.
pub const FAR_FUTURE: &str = "2200-12-31T23:59:59Z";
/// Open start of an end-only interval.
pub const FAR_PAST: &str = "1800-01-01T00:00:00Z";

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_ITEM_LIMIT)
}

/// Base URL of a STAC API, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoint {
    base: Url,
}

impl CatalogEndpoint {
    pub fn parse(url: &str) -> Result<Self, CatalogError> {
        let trimmed = url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(CatalogError::InvalidUrl("empty catalog url".to_string()));
        }
        let base = Url::parse(trimmed).map_err(|e| CatalogError::InvalidUrl(format!("{trimmed}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(format!("{trimmed}: not a base url")));
        }
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn join(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.as_str().to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Temporal filter as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DatetimeFilter {
    #[default]
    Any,
    Instant(String),
    Interval {
        start: Option<String>,
        end: Option<String>,
    },
}

impl DatetimeFilter {
    /// Builds an interval from optional user inputs, normalizing each to RFC 3339 UTC.
    ///
    /// Blank inputs count as absent; two absent ends give [`DatetimeFilter::Any`].
    pub fn from_inputs(start: Option<&str>, end: Option<&str>) -> Result<Self, CatalogError> {
        let norm = |s: Option<&str>| match s.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => normalize_datetime(s).map(Some),
            None => Ok(None),
        };
        let (start, end) = (norm(start)?, norm(end)?);
        if start.is_none() && end.is_none() {
            return Ok(DatetimeFilter::Any);
        }
        Ok(DatetimeFilter::Interval { start, end })
    }

    pub fn instant(value: &str) -> Result<Self, CatalogError> {
        normalize_datetime(value.trim()).map(DatetimeFilter::Instant)
    }

    /// The `datetime` query value, or `None` when no parameter should be sent.
    pub fn to_param(&self) -> Option<String> {
        match self {
            DatetimeFilter::Any => None,
            DatetimeFilter::Instant(t) => Some(t.clone()),
            DatetimeFilter::Interval { start, end } => match (start, end) {
                (Some(s), Some(e)) => Some(format!("{s}/{e}")),
                (Some(s), None) => Some(format!("{s}/{FAR_FUTURE}")),
                (None, Some(e)) => Some(format!("{FAR_PAST}/{e}")),
                (None, None) => None,
            },
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) or `YYYY-MM-DD`.
pub fn normalize_datetime(input: &str) -> Result<String, CatalogError> {
    const OUT: &str = "%Y-%m-%dT%H:%M:%SZ";
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).format(OUT).to_string());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(dt.format(OUT).to_string());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(format!("{}T00:00:00Z", d.format("%Y-%m-%d")));
    }
    Err(CatalogError::InvalidInput(format!("unrecognized datetime: {input}")))
}

/// A single request lineage. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    collection_id: String,
    bbox: Option<BBox>,
    datetime: Option<String>,
    limit: u32,
}

impl SearchQuery {
    pub fn new(collection_id: impl Into<String>, limit: u32) -> Self {
        Self {
            collection_id: collection_id.into(),
            bbox: None,
            datetime: None,
            limit: clamp_limit(limit),
        }
    }

    pub fn with_bbox(mut self, bbox: Option<BBox>) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_datetime(mut self, filter: &DatetimeFilter) -> Self {
        self.datetime = filter.to_param();
        self
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    pub fn datetime(&self) -> Option<&str> {
        self.datetime.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// `/search` when a bbox is set, otherwise the collection's `/items`.
    pub fn request(&self, endpoint: &CatalogEndpoint) -> Result<CatalogRequest, CatalogError> {
        let mut url = match self.bbox {
            Some(_) => endpoint.join(&["search"])?,
            None => endpoint.join(&["collections", &self.collection_id, "items"])?,
        };
        {
            let mut q = url.query_pairs_mut();
            if let Some(bbox) = self.bbox {
                q.append_pair("collections", &self.collection_id);
                q.append_pair("bbox", &bbox.to_query_param());
            }
            q.append_pair("limit", &self.limit.to_string());
            if let Some(dt) = &self.datetime {
                q.append_pair("datetime", dt);
            }
        }
        Ok(CatalogRequest { url })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    url: Url,
}

impl CatalogRequest {
    pub fn from_cursor(cursor: &NextCursor) -> Result<Self, CatalogError> {
        let url = Url::parse(cursor.href())
            .map_err(|e| CatalogError::InvalidUrl(format!("{}: {e}", cursor.href())))?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}
