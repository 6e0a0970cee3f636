use crate::bounds::{BBox, center_of};
use crate::geometry::LngLat;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen rectangle centered on `(x, y)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Minimum rect edge in pixels.
pub const MIN_ANCHOR_EDGE_PX: f64 = 1.0;

/// Screen rect covering a bbox under an arbitrary camera.
///
/// All four corners are projected and the larger of the two horizontal (and
/// vertical) edge spans is kept, so rotated or pitched cameras still cover the
/// footprint. Returns `None` if any projection fails.
pub fn anchored_rect(
    bbox: &BBox,
    mut project: impl FnMut(LngLat) -> Option<ScreenPoint>,
) -> Option<ScreenRect> {
    let center = project(center_of(bbox))?;
    let [tl, tr, bl, br] = bbox.corners();
    let (tl, tr, bl, br) = (project(tl)?, project(tr)?, project(bl)?, project(br)?);

    let width = (tr.x - tl.x).abs().max((br.x - bl.x).abs());
    let height = (bl.y - tl.y).abs().max((br.y - tr.y).abs());

    Some(ScreenRect {
        x: center.x,
        y: center.y,
        width: width.max(MIN_ANCHOR_EDGE_PX),
        height: height.max(MIN_ANCHOR_EDGE_PX),
    })
}
