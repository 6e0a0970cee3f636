//! Deterministic in-memory map engine.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use foundation::math::{ScreenPoint, fit_zoom, lnglat_to_unit, world_size_px};
use foundation::{BBox, Geometry, LngLat, Viewport, center_of};
use tokio::time::Instant;
use tracing::trace;

use crate::engine::{EngineError, FitOptions, LayerPaint, LayerSpec, MapEngine};

const MAX_ZOOM: f64 = 22.0;

/// Web-Mercator camera over a fixed-size canvas with a source/layer stack.
///
/// Camera changes are queued as camera-moved notifications and handed out by
/// [`MapEngine::poll_camera_moved`].
#[derive(Debug)]
pub struct HeadlessMap {
    width: f64,
    height: f64,
    camera: Viewport,
    loads_at: Option<Instant>,
    reject_fit: bool,
    sources: BTreeMap<String, Geometry>,
    layers: Vec<LayerSpec>,
    camera_moves: VecDeque<Viewport>,
}

impl HeadlessMap {
    pub fn new(width: f64, height: f64, camera: Viewport) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            camera,
            loads_at: None,
            reject_fit: false,
            sources: BTreeMap::new(),
            layers: Vec::new(),
            camera_moves: VecDeque::new(),
        }
    }

    /// Engine that reports loaded only after `delay` has elapsed.
    pub fn loading_for(width: f64, height: f64, camera: Viewport, delay: Duration) -> Self {
        let mut map = Self::new(width, height, camera);
        map.loads_at = Some(Instant::now() + delay);
        map
    }

    /// Makes `fit_bounds` fail, as engines do for an unusable camera.
    pub fn reject_fit_bounds(&mut self, reject: bool) {
        self.reject_fit = reject;
    }

    /// Simulates a user gesture moving the camera.
    pub fn pan_to(&mut self, center: LngLat, zoom: f64) {
        self.move_camera(center, zoom);
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn source_data(&self, id: &str) -> Option<&Geometry> {
        self.sources.get(id)
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn ready(&self) -> Result<(), EngineError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(EngineError::NotReady)
        }
    }

    fn move_camera(&mut self, center: LngLat, zoom: f64) {
        self.camera = Viewport::new(center.lon, center.lat, zoom.clamp(0.0, MAX_ZOOM));
        trace!(camera = ?self.camera, "camera moved");
        self.camera_moves.push_back(self.camera);
    }
}

impl MapEngine for HeadlessMap {
    fn is_loaded(&self) -> bool {
        self.loads_at.is_none_or(|t| Instant::now() >= t)
    }

    fn camera(&self) -> Viewport {
        self.camera
    }

    fn jump_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError> {
        self.ready()?;
        self.move_camera(center, zoom);
        Ok(())
    }

    fn fly_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError> {
        self.jump_to(center, zoom)
    }

    fn fit_bounds(&mut self, bbox: &BBox, options: FitOptions) -> Result<(), EngineError> {
        self.ready()?;
        if self.reject_fit {
            return Err(EngineError::Rejected("fit_bounds".to_string()));
        }
        let zoom = fit_zoom(bbox, self.width, self.height, options.padding).min(options.max_zoom);
        if !zoom.is_finite() {
            return Err(EngineError::Rejected(format!("cannot fit {bbox:?}")));
        }
        self.move_camera(center_of(bbox), zoom);
        Ok(())
    }

    fn project(&self, point: LngLat) -> Option<ScreenPoint> {
        let world = world_size_px(self.camera.zoom);
        let (cx, cy) = lnglat_to_unit(self.camera.center());
        let (px, py) = lnglat_to_unit(point);
        let x = (px - cx) * world + self.width / 2.0;
        let y = (py - cy) * world + self.height / 2.0;
        (x.is_finite() && y.is_finite()).then(|| ScreenPoint::new(x, y))
    }

    fn poll_camera_moved(&mut self) -> Option<Viewport> {
        self.camera_moves.pop_front()
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: Geometry) -> Result<(), EngineError> {
        self.ready()?;
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), data);
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: Geometry) -> Result<(), EngineError> {
        self.ready()?;
        let slot = self
            .sources
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        *slot = data;
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        self.ready()?;
        if let Some(layer) = self.layers.iter().find(|l| l.source == id) {
            return Err(EngineError::SourceInUse {
                source: id.to_string(),
                layer: layer.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError> {
        self.ready()?;
        if self.has_layer(&layer.id) {
            return Err(EngineError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(EngineError::UnknownSource(layer.source));
        }
        self.layers.push(layer);
        Ok(())
    }

    fn set_layer_paint(&mut self, id: &str, paint: LayerPaint) -> Result<(), EngineError> {
        self.ready()?;
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.to_string()))?;
        layer.paint = paint;
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        self.ready()?;
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return Err(EngineError::UnknownLayer(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HeadlessMap;
    use crate::engine::{EngineError, FitOptions, LayerKind, LayerPaint, LayerSpec, MapEngine};
    use foundation::math::golden_angle_color;
    use foundation::{BBox, Geometry, LngLat, Viewport};

    fn map() -> HeadlessMap {
        HeadlessMap::new(800.0, 600.0, Viewport::new(0.0, 0.0, 2.0))
    }

    fn line(id: &str, source: &str) -> LayerSpec {
        LayerSpec {
            id: id.to_string(),
            source: source.to_string(),
            kind: LayerKind::Line,
            paint: LayerPaint {
                color: golden_angle_color(0),
                opacity: 1.0,
                line_width: 2.0,
            },
        }
    }

    #[test]
    fn camera_center_projects_to_canvas_center() {
        let m = map();
        let p = m.project(LngLat::new(0.0, 0.0)).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9);
        assert!((p.y - 300.0).abs() < 1e-9);
        let east = m.project(LngLat::new(10.0, 0.0)).unwrap();
        assert!(east.x > p.x);
    }

    #[test]
    fn fit_bounds_centers_and_caps_zoom() {
        let mut m = map();
        let bb = BBox::new(28.9, 41.0, 29.0, 41.1).unwrap();
        m.fit_bounds(&bb, FitOptions { padding: 50.0, max_zoom: 9.0 }).unwrap();
        let cam = m.camera();
        assert!((cam.longitude - 28.95).abs() < 1e-9);
        assert_eq!(cam.zoom, 9.0);
        assert_eq!(m.poll_camera_moved(), Some(cam));
        assert_eq!(m.poll_camera_moved(), None);
    }

    #[test]
    fn source_in_use_cannot_be_removed() {
        let mut m = map();
        m.add_source("s", Geometry::Point(LngLat::new(1.0, 2.0))).unwrap();
        m.add_layer(line("l", "s")).unwrap();
        assert_eq!(
            m.remove_source("s"),
            Err(EngineError::SourceInUse {
                source: "s".to_string(),
                layer: "l".to_string()
            })
        );
        m.remove_layer("l").unwrap();
        m.remove_source("s").unwrap();
        assert!(m.source_ids().is_empty());
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut m = map();
        m.add_source("s", Geometry::Point(LngLat::new(1.0, 2.0))).unwrap();
        assert!(matches!(
            m.add_source("s", Geometry::Point(LngLat::new(1.0, 2.0))),
            Err(EngineError::DuplicateSource(_))
        ));
        m.add_layer(line("l", "s")).unwrap();
        assert!(matches!(m.add_layer(line("l", "s")), Err(EngineError::DuplicateLayer(_))));
        assert!(matches!(m.add_layer(line("x", "nope")), Err(EngineError::UnknownSource(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_until_loaded() {
        let mut m = HeadlessMap::loading_for(
            800.0,
            600.0,
            Viewport::new(0.0, 0.0, 2.0),
            std::time::Duration::from_millis(500),
        );
        assert_eq!(m.jump_to(LngLat::new(1.0, 1.0), 3.0), Err(EngineError::NotReady));
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert!(m.is_loaded());
        m.jump_to(LngLat::new(1.0, 1.0), 3.0).unwrap();
    }
}
