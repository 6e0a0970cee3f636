//! Spherical (Web) Mercator pixel projection, 512 px world at zoom 0.

use crate::bounds::BBox;
use crate::geometry::LngLat;

pub const TILE_SIZE_PX: f64 = 512.0;
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Unit-square mercator coordinates, `x` east and `y` south, both in `[0, 1]`.
pub fn lnglat_to_unit(p: LngLat) -> (f64, f64) {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.lon + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0;
    (x, y)
}

pub fn unit_to_lnglat(x: f64, y: f64) -> LngLat {
    let lon = x * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y);
    let lat = n.sinh().atan().to_degrees();
    LngLat::new(lon, lat)
}

pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Zoom at which `bbox` fills a `width` x `height` viewport minus `padding` per side.
pub fn fit_zoom(bbox: &BBox, width: f64, height: f64, padding: f64) -> f64 {
    let (x0, y0) = lnglat_to_unit(LngLat::new(bbox.min_lon(), bbox.max_lat()));
    let (x1, y1) = lnglat_to_unit(LngLat::new(bbox.max_lon(), bbox.min_lat()));
    let avail_w = (width - 2.0 * padding).max(1.0);
    let avail_h = (height - 2.0 * padding).max(1.0);
    let span_x = ((x1 - x0) * TILE_SIZE_PX).max(f64::EPSILON);
    let span_y = ((y1 - y0) * TILE_SIZE_PX).max(f64::EPSILON);
    (avail_w / span_x).min(avail_h / span_y).log2()
}

#[cfg(test)]
mod tests {
    use super::{fit_zoom, lnglat_to_unit, unit_to_lnglat};
    use crate::bounds::BBox;
    use crate::geometry::LngLat;

    #[test]
    fn origin_maps_to_center() {
        let (x, y) = lnglat_to_unit(LngLat::new(0.0, 0.0));
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn round_trip() {
        let p = LngLat::new(28.9784, 41.0151);
        let (x, y) = lnglat_to_unit(p);
        let q = unit_to_lnglat(x, y);
        assert!((p.lon - q.lon).abs() < 1e-9);
        assert!((p.lat - q.lat).abs() < 1e-9);
    }

    #[test]
    fn whole_world_fits_at_zoom_zero_in_512px() {
        let bb = BBox::new(-180.0, -85.0511, 180.0, 85.0511).unwrap();
        let z = fit_zoom(&bb, 512.0, 512.0, 0.0);
        assert!(z.abs() < 1e-3, "got {z}");
    }
}
