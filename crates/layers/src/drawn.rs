use std::collections::BTreeMap;

use foundation::math::{Hsl, golden_angle_color};
use foundation::{BBox, Geometry};
use scene::{EngineError, LayerKind, LayerPaint, LayerSpec, MapEngine};
use tracing::{debug, warn};

use crate::layer::{
    BBOX_FILL_LAYER_ID, BBOX_LINE_LAYER_ID, BBOX_SOURCE_ID, ItemLayerIds, wants_fill,
};

/// Outline color of the drawn search bbox.
pub const BBOX_COLOR: Hsl = Hsl {
    hue: 210.0,
    saturation: 90,
    lightness: 45,
};

const FILL_OPACITY: f64 = 0.15;
const LINE_WIDTH: f64 = 2.0;

/// Which ephemeral layers are currently on the map.
///
/// Only used to know what to remove; geometry content lives in the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawnLayerRegistry {
    drawn_bbox: bool,
    items: BTreeMap<String, ItemLayerIds>,
}

impl DrawnLayerRegistry {
    pub fn has_drawn_bbox(&self) -> bool {
        self.drawn_bbox
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.drawn_bbox && self.items.is_empty()
    }
}

/// Add/replace/remove of the drawn bbox and per-item outlines.
#[derive(Debug, Clone, Default)]
pub struct GeometryLayerManager {
    registry: DrawnLayerRegistry,
}

impl GeometryLayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DrawnLayerRegistry {
        &self.registry
    }

    pub fn upsert_drawn_bbox_layer<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        bbox: &BBox,
    ) -> Result<(), EngineError> {
        upsert_source(engine, BBOX_SOURCE_ID, Geometry::from_bbox(bbox))?;
        self.registry.drawn_bbox = true;
        upsert_layer(engine, BBOX_SOURCE_ID, BBOX_FILL_LAYER_ID, LayerKind::Fill, BBOX_COLOR)?;
        upsert_layer(engine, BBOX_SOURCE_ID, BBOX_LINE_LAYER_ID, LayerKind::Line, BBOX_COLOR)
    }

    pub fn clear_drawn_bbox_layer<E: MapEngine + ?Sized>(&mut self, engine: &mut E) {
        remove_all(engine, &[BBOX_FILL_LAYER_ID, BBOX_LINE_LAYER_ID], BBOX_SOURCE_ID);
        self.registry.drawn_bbox = false;
    }

    pub fn upsert_item_geometry<E: MapEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        item_id: &str,
        geometry: &Geometry,
        color: Hsl,
    ) -> Result<(), EngineError> {
        let ids = ItemLayerIds::for_item(item_id);
        upsert_source(engine, &ids.source, geometry.clone())?;
        self.registry.items.insert(item_id.to_string(), ids.clone());

        if wants_fill(geometry) {
            upsert_layer(engine, &ids.source, &ids.fill, LayerKind::Fill, color)?;
        } else if engine.has_layer(&ids.fill) {
            engine.remove_layer(&ids.fill)?;
        }
        upsert_layer(engine, &ids.source, &ids.line, LayerKind::Line, color)
    }

    /// Removes every item outline. Engine failures are logged, not returned.
    pub fn clear_all_item_geometries<E: MapEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        let items = std::mem::take(&mut self.registry.items);
        for ids in items.values() {
            remove_all(engine, &ids.layers(), &ids.source);
        }
        if !items.is_empty() {
            debug!(count = items.len(), "cleared item outlines");
        }
        items.len()
    }

    /// Replaces all outlines with `items`, colored by position.
    ///
    /// Items without geometry keep their color slot so colors stay stable.
    /// Returns how many outlines were drawn.
    pub fn show_items<'a, E, I>(&mut self, engine: &mut E, items: I) -> usize
    where
        E: MapEngine + ?Sized,
        I: IntoIterator<Item = (&'a str, Option<&'a Geometry>)>,
    {
        self.clear_all_item_geometries(engine);
        let mut drawn = 0;
        for (index, (id, geometry)) in items.into_iter().enumerate() {
            let Some(geometry) = geometry else {
                continue;
            };
            match self.upsert_item_geometry(engine, id, geometry, golden_angle_color(index)) {
                Ok(()) => drawn += 1,
                Err(e) => warn!("could not draw outline of item {id}: {e}"),
            }
        }
        drawn
    }
}

fn upsert_source<E: MapEngine + ?Sized>(
    engine: &mut E,
    id: &str,
    data: Geometry,
) -> Result<(), EngineError> {
    if engine.has_source(id) {
        engine.set_source_data(id, data)
    } else {
        engine.add_source(id, data)
    }
}

fn upsert_layer<E: MapEngine + ?Sized>(
    engine: &mut E,
    source: &str,
    id: &str,
    kind: LayerKind,
    color: Hsl,
) -> Result<(), EngineError> {
    let paint = LayerPaint {
        color,
        opacity: match kind {
            LayerKind::Fill => FILL_OPACITY,
            LayerKind::Line => 1.0,
        },
        line_width: LINE_WIDTH,
    };
    if engine.has_layer(id) {
        return engine.set_layer_paint(id, paint);
    }
    engine.add_layer(LayerSpec {
        id: id.to_string(),
        source: source.to_string(),
        kind,
        paint,
    })
}

fn remove_all<E: MapEngine + ?Sized>(engine: &mut E, layers: &[&str], source: &str) {
    for layer in layers {
        if engine.has_layer(layer)
            && let Err(e) = engine.remove_layer(layer)
        {
            warn!("failed to remove layer {layer}: {e}");
        }
    }
    if engine.has_source(source)
        && let Err(e) = engine.remove_source(source)
    {
        warn!("failed to remove source {source}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::GeometryLayerManager;
    use crate::layer::{BBOX_FILL_LAYER_ID, BBOX_LINE_LAYER_ID, BBOX_SOURCE_ID};
    use foundation::math::golden_angle_color;
    use foundation::{BBox, Geometry, LngLat, Viewport};
    use scene::{HeadlessMap, MapEngine};

    fn map() -> HeadlessMap {
        HeadlessMap::new(800.0, 600.0, Viewport::new(0.0, 0.0, 3.0))
    }

    fn square(x: f64) -> Geometry {
        Geometry::from_bbox(&BBox::new(x, 0.0, x + 1.0, 1.0).unwrap())
    }

    #[test]
    fn drawn_bbox_is_replaced_in_place() {
        let mut m = map();
        let mut mgr = GeometryLayerManager::new();
        let a = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BBox::new(2.0, 2.0, 3.0, 3.0).unwrap();
        mgr.upsert_drawn_bbox_layer(&mut m, &a).unwrap();
        mgr.upsert_drawn_bbox_layer(&mut m, &b).unwrap();

        assert_eq!(m.layer_ids(), vec![BBOX_FILL_LAYER_ID, BBOX_LINE_LAYER_ID]);
        assert_eq!(m.source_data(BBOX_SOURCE_ID), Some(&Geometry::from_bbox(&b)));

        mgr.clear_drawn_bbox_layer(&mut m);
        mgr.clear_drawn_bbox_layer(&mut m);
        assert!(m.layer_ids().is_empty());
        assert!(m.source_ids().is_empty());
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn clearing_items_twice_is_a_no_op() {
        let mut m = map();
        let mut mgr = GeometryLayerManager::new();
        mgr.upsert_item_geometry(&mut m, "a", &square(0.0), golden_angle_color(0)).unwrap();
        mgr.upsert_item_geometry(&mut m, "b", &Geometry::Point(LngLat::new(5.0, 5.0)), golden_angle_color(1))
            .unwrap();
        assert_eq!(m.layer_ids(), vec!["geometry-fill-a", "geometry-a", "geometry-b"]);

        assert_eq!(mgr.clear_all_item_geometries(&mut m), 2);
        assert_eq!(mgr.clear_all_item_geometries(&mut m), 0);
        assert!(m.layer_ids().is_empty());
        assert!(m.source_ids().is_empty());
        assert_eq!(mgr.registry().item_count(), 0);
    }

    #[test]
    fn colors_are_stable_across_renders() {
        let geoms: Vec<(String, Geometry)> =
            (0..5).map(|i| (format!("item-{i}"), square(i as f64 * 2.0))).collect();
        let mut m = map();
        let mut mgr = GeometryLayerManager::new();

        let colors = |m: &HeadlessMap| -> Vec<String> {
            (0..5)
                .map(|i| m.layer(&format!("geometry-item-{i}")).unwrap().paint.color.to_string())
                .collect()
        };

        let items = || geoms.iter().map(|(id, g)| (id.as_str(), Some(g)));
        assert_eq!(mgr.show_items(&mut m, items()), 5);
        let first = colors(&m);
        assert_eq!(mgr.show_items(&mut m, items()), 5);
        assert_eq!(colors(&m), first);
        assert_eq!(first[1], golden_angle_color(1).to_string());
    }

    #[test]
    fn missing_geometry_keeps_color_slots() {
        let mut m = map();
        let mut mgr = GeometryLayerManager::new();
        let g = square(0.0);
        let drawn = mgr.show_items(&mut m, [("x", None), ("y", Some(&g))]);
        assert_eq!(drawn, 1);
        assert_eq!(m.layer("geometry-y").unwrap().paint.color, golden_angle_color(1));
        assert!(!m.has_layer("geometry-x"));
    }
}
