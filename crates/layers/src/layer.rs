//! Naming of the ephemeral sources and layers drawn over the map.

use foundation::Geometry;

pub const BBOX_SOURCE_ID: &str = "bbox-draw-source";
pub const BBOX_FILL_LAYER_ID: &str = "bbox-draw-fill";
pub const BBOX_LINE_LAYER_ID: &str = "bbox-draw-line";

/// Source and layer ids of one item outline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemLayerIds {
    pub source: String,
    pub line: String,
    pub fill: String,
}

impl ItemLayerIds {
    pub fn for_item(item_id: &str) -> Self {
        Self {
            source: format!("geometry-{item_id}"),
            line: format!("geometry-{item_id}"),
            fill: format!("geometry-fill-{item_id}"),
        }
    }

    /// Layers in removal order; every layer goes before its source.
    pub fn layers(&self) -> [&str; 2] {
        [self.fill.as_str(), self.line.as_str()]
    }
}

/// Area geometries get a translucent fill under their outline.
pub fn wants_fill(geometry: &Geometry) -> bool {
    matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
}
