//! Seam to the map rendering engine.
//!
//! The engine owns the camera, the source/layer stack and the screen
//! projection. Everything the map core needs from it goes through
//! [`MapEngine`], so the core can run against a browser map, a native
//! renderer or [`HeadlessMap`](crate::HeadlessMap) in tests.

use foundation::math::{Hsl, ScreenPoint};
use foundation::{BBox, Geometry, LngLat, Viewport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Style/camera not loaded yet.
    NotReady,
    DuplicateSource(String),
    DuplicateLayer(String),
    UnknownSource(String),
    UnknownLayer(String),
    SourceInUse { source: String, layer: String },
    Rejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotReady => write!(f, "map engine is not ready"),
            EngineError::DuplicateSource(id) => write!(f, "source already exists: {id}"),
            EngineError::DuplicateLayer(id) => write!(f, "layer already exists: {id}"),
            EngineError::UnknownSource(id) => write!(f, "no such source: {id}"),
            EngineError::UnknownLayer(id) => write!(f, "no such layer: {id}"),
            EngineError::SourceInUse { source, layer } => {
                write!(f, "source {source} is still used by layer {layer}")
            }
            EngineError::Rejected(msg) => write!(f, "engine rejected command: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerKind {
    Fill,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerPaint {
    pub color: Hsl,
    pub opacity: f64,
    pub line_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
    pub paint: LayerPaint,
}

/// Bounds-fitting parameters handed to the engine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitOptions {
    pub padding: f64,
    pub max_zoom: f64,
}

pub trait MapEngine {
    /// `true` once the engine accepts camera and layer commands.
    fn is_loaded(&self) -> bool;

    fn camera(&self) -> Viewport;

    fn jump_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError>;

    /// Animated camera move. Engines without animation may jump.
    fn fly_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError>;

    fn fit_bounds(&mut self, bbox: &BBox, options: FitOptions) -> Result<(), EngineError>;

    /// Screen position of a geographic point under the current camera.
    fn project(&self, point: LngLat) -> Option<ScreenPoint>;

    /// Next pending camera-moved notification, in emission order.
    fn poll_camera_moved(&mut self) -> Option<Viewport>;

    fn has_source(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, data: Geometry) -> Result<(), EngineError>;
    fn set_source_data(&mut self, id: &str, data: Geometry) -> Result<(), EngineError>;
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    fn has_layer(&self, id: &str) -> bool;
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError>;
    fn set_layer_paint(&mut self, id: &str, paint: LayerPaint) -> Result<(), EngineError>;
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
}
