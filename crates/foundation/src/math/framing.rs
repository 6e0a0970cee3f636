//! Center/zoom heuristics for framing a synthesized bbox.

use crate::bounds::{BBox, center_of};
use crate::geometry::LngLat;

/// Smallest span considered; keeps point and zero-area boxes finite.
pub const MIN_FRAMING_SPAN_DEG: f64 = 0.001;
/// Span (degrees) that frames at exactly [`MAX_HEURISTIC_ZOOM`].
pub const REFERENCE_SPAN_DEG: f64 = 0.1;
pub const MAX_HEURISTIC_ZOOM: f64 = 12.0;

/// Zoom for a bbox span: `clamp(12 - log2(maxDiff / 0.1), 0, 12)`.
///
/// This is an approximation, not a Web-Mercator fit. Framing results in the
/// viewer depends on the exact numbers, so keep it as is.
pub fn zoom_for_span(lon_span: f64, lat_span: f64) -> f64 {
    let max_diff = lon_span.max(lat_span).max(MIN_FRAMING_SPAN_DEG);
    (MAX_HEURISTIC_ZOOM - (max_diff / REFERENCE_SPAN_DEG).log2()).clamp(0.0, MAX_HEURISTIC_ZOOM)
}

pub fn zoom_for_bbox(bbox: &BBox) -> f64 {
    zoom_for_span(bbox.lon_span(), bbox.lat_span())
}

/// Center and heuristic zoom for a bbox.
pub fn frame_bbox(bbox: &BBox) -> (LngLat, f64) {
    (center_of(bbox), zoom_for_bbox(bbox))
}

#[cfg(test)]
mod tests {
    use super::{frame_bbox, zoom_for_span};
    use crate::bounds::BBox;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn reference_span_is_max_zoom() {
        assert_close(zoom_for_span(0.1, 0.05), 12.0);
    }

    #[test]
    fn eightfold_span_drops_three_levels() {
        assert_close(zoom_for_span(0.2, 0.8), 9.0);
    }

    #[test]
    fn degenerate_span_is_floored_then_clamped() {
        // 12 - log2(0.001 / 0.1) is above 12, so the clamp wins.
        assert_close(zoom_for_span(0.0, 0.0), 12.0);
    }

    #[test]
    fn whole_world_stays_non_negative() {
        let z = zoom_for_span(360.0, 180.0);
        assert!(z >= 0.0 && z < 1.0, "got {z}");
        assert_close(zoom_for_span(1.0e6, 0.0), 0.0);
    }

    #[test]
    fn frame_uses_center() {
        let bb = BBox::new(10.0, 20.0, 10.8, 20.4).unwrap();
        let (c, z) = frame_bbox(&bb);
        assert_close(c.lon, 10.4);
        assert_close(c.lat, 20.2);
        assert_close(z, 9.0);
    }
}
