//! GeoJSON geometry subset used by catalog items and drawn overlays.

use serde::{Deserialize, Serialize};

use crate::bounds::BBox;
use crate::error::GeometryError;

/// A WGS84 position in degrees. Extra ordinates (altitude) are dropped on parse.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct LngLat {
    pub lon: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for LngLat {
    type Error = GeometryError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok(LngLat::new(*lon, *lat)),
            [_, _, ..] => Err(GeometryError::NonFinite),
            other => Err(GeometryError::Position(other.len())),
        }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lon, p.lat]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LngLat),
    MultiPoint(Vec<LngLat>),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    Polygon(Vec<Vec<LngLat>>),
    MultiPolygon(Vec<Vec<Vec<LngLat>>>),
}

const SUPPORTED_TYPES: [&str; 6] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
];

impl Geometry {
    /// Parses a raw GeoJSON geometry object at the catalog boundary.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GeometryError> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| GeometryError::Malformed("missing geometry type".to_string()))?;
        if !SUPPORTED_TYPES.contains(&kind) {
            return Err(GeometryError::Unsupported(kind.to_string()));
        }
        serde_json::from_value(value.clone()).map_err(|e| GeometryError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(v) => v,
            // Positions are plain finite floats; serialization cannot fail.
            Err(_) => serde_json::Value::Null,
        }
    }

    /// Closed outline ring of a bbox.
    pub fn from_bbox(bbox: &BBox) -> Self {
        let [tl, tr, bl, br] = bbox.corners();
        Geometry::Polygon(vec![vec![bl, br, tr, tl, bl]])
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// Envelope of a geometry.
///
/// Polygons contribute their outer ring only; holes always lie inside it.
pub fn bbox_from_geometry(geometry: &Geometry) -> Result<BBox, GeometryError> {
    let mut acc: Option<BBox> = None;
    let mut visit = |points: &[LngLat]| -> Result<(), GeometryError> {
        for p in points {
            let point = BBox::from_point(*p)?;
            acc = Some(match acc {
                Some(b) => b.union(&point),
                None => point,
            });
        }
        Ok(())
    };

    match geometry {
        Geometry::Point(p) => visit(std::slice::from_ref(p))?,
        Geometry::MultiPoint(points) | Geometry::LineString(points) => visit(points.as_slice())?,
        Geometry::MultiLineString(lines) => lines.iter().try_for_each(|l| visit(l.as_slice()))?,
        Geometry::Polygon(rings) => {
            if let Some(outer) = rings.first() {
                visit(outer.as_slice())?;
            }
        }
        Geometry::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(outer) = rings.first() {
                    visit(outer.as_slice())?;
                }
            }
        }
    }

    acc.ok_or(GeometryError::EmptyCoordinates)
}
