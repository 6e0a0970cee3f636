use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::LngLat;

/// Axis-aligned longitude/latitude rectangle `[minLon, minLat, maxLon, maxLat]`.
///
/// Construction always upholds `min <= max` on both axes, so every `BBox` in
/// the system is ordered regardless of where it came from.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 4]")]
pub struct BBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, GeometryError> {
        if ![min_lon, min_lat, max_lon, max_lat].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if min_lon > max_lon {
            return Err(GeometryError::Inverted {
                min: min_lon,
                max: max_lon,
            });
        }
        if min_lat > max_lat {
            return Err(GeometryError::Inverted {
                min: min_lat,
                max: max_lat,
            });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Envelope of two arbitrary corner points, in any drag direction.
    pub fn from_corners(a: LngLat, b: LngLat) -> Result<Self, GeometryError> {
        // `f64::min`/`max` skip NaN, so check the raw corners first.
        if ![a.lon, a.lat, b.lon, b.lat].iter().all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        Self::new(
            a.lon.min(b.lon),
            a.lat.min(b.lat),
            a.lon.max(b.lon),
            a.lat.max(b.lat),
        )
    }

    /// Degenerate bbox covering a single point.
    pub fn from_point(p: LngLat) -> Result<Self, GeometryError> {
        Self::from_corners(p, p)
    }

    /// Parses a 2-D (`4`) or 3-D (`6`) STAC bbox array.
    pub fn from_slice(values: &[f64]) -> Result<Self, GeometryError> {
        match *values {
            [min_lon, min_lat, max_lon, max_lat] => Self::new(min_lon, min_lat, max_lon, max_lat),
            [min_lon, min_lat, _, max_lon, max_lat, _] => {
                Self::new(min_lon, min_lat, max_lon, max_lat)
            }
            _ => Err(GeometryError::BBoxArity(values.len())),
        }
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Corners in `(top-left, top-right, bottom-left, bottom-right)` order.
    pub fn corners(&self) -> [LngLat; 4] {
        [
            LngLat::new(self.min_lon, self.max_lat),
            LngLat::new(self.max_lon, self.max_lat),
            LngLat::new(self.min_lon, self.min_lat),
            LngLat::new(self.max_lon, self.min_lat),
        ]
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Comma-separated `minLon,minLat,maxLon,maxLat` query form.
    pub fn to_query_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl TryFrom<Vec<f64>> for BBox {
    type Error = GeometryError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        BBox::from_slice(&values)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        b.to_array()
    }
}

/// Union of all boxes, or `None` for an empty input.
pub fn union_bbox<'a>(bboxes: impl IntoIterator<Item = &'a BBox>) -> Option<BBox> {
    bboxes
        .into_iter()
        .fold(None, |acc: Option<BBox>, b| match acc {
            Some(u) => Some(u.union(b)),
            None => Some(*b),
        })
}

pub fn center_of(bbox: &BBox) -> LngLat {
    LngLat::new(
        (bbox.min_lon + bbox.max_lon) / 2.0,
        (bbox.min_lat + bbox.max_lat) / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::{BBox, center_of, union_bbox};
    use crate::error::GeometryError;
    use crate::geometry::LngLat;

    #[test]
    fn corners_are_ordered_for_every_drag_direction() {
        let a = LngLat::new(10.0, 5.0);
        let b = LngLat::new(-3.0, 40.0);
        for (p, q) in [(a, b), (b, a)] {
            let bb = BBox::from_corners(p, q).unwrap();
            assert!(bb.min_lon() <= bb.max_lon());
            assert!(bb.min_lat() <= bb.max_lat());
            assert_eq!(bb.to_array(), [-3.0, 5.0, 10.0, 40.0]);
        }
    }

    #[test]
    fn rejects_inverted_and_non_finite() {
        assert!(BBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BBox::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(BBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn corners_reject_nan_and_infinity() {
        let ok = LngLat::new(10.0, 20.0);
        assert_eq!(
            BBox::from_corners(ok, LngLat::new(f64::NAN, f64::NAN)),
            Err(GeometryError::NonFinite)
        );
        assert_eq!(
            BBox::from_corners(LngLat::new(f64::NAN, 0.0), ok),
            Err(GeometryError::NonFinite)
        );
        assert!(BBox::from_point(LngLat::new(f64::INFINITY, 0.0)).is_err());
    }

    #[test]
    fn parses_three_dimensional_bbox() {
        let bb = BBox::from_slice(&[1.0, 2.0, -10.0, 3.0, 4.0, 100.0]).expect("bbox");
        assert_eq!(bb.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert!(BBox::from_slice(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn union_and_center() {
        let a = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BBox::new(-2.0, 0.5, 0.5, 3.0).unwrap();
        let u = union_bbox([&a, &b]).expect("non-empty");
        assert_eq!(u.to_array(), [-2.0, 0.0, 1.0, 3.0]);
        assert_eq!(center_of(&u), LngLat::new(-0.5, 1.5));
        assert!(union_bbox(std::iter::empty()).is_none());
    }

    #[test]
    fn query_param_is_comma_separated() {
        let bb = BBox::new(-1.5, 2.0, 3.25, 4.0).unwrap();
        assert_eq!(bb.to_query_param(), "-1.5,2,3.25,4");
    }

    #[test]
    fn serde_round_trips_as_array() {
        let bb: BBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(serde_json::to_string(&bb).unwrap(), "[1.0,2.0,3.0,4.0]");
        assert!(serde_json::from_str::<BBox>("[3, 2, 1, 4]").is_err());
    }
}
