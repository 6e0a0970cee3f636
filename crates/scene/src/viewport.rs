//! Camera ownership: framing, fly-to and the single write path for [`Viewport`].

use foundation::math::frame_bbox;
use foundation::{BBox, LngLat, Viewport, center_of};
use runtime::{EventBus, MapEvent, RetryError, RetryPolicy, retry};
use tracing::{debug, warn};

use crate::engine::{EngineError, FitOptions, MapEngine};

pub const MIN_PADDING_PX: f64 = 20.0;
pub const MAX_PADDING_PX: f64 = 200.0;
pub const MIN_MAX_ZOOM: f64 = 1.0;
pub const MAX_MAX_ZOOM: f64 = 20.0;
/// Zoom ceiling for the jump used when the engine refuses to fit bounds.
pub const FALLBACK_ZOOM_CAP: f64 = 10.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameOptions {
    pub padding: f64,
    pub max_zoom: f64,
}

impl FrameOptions {
    /// Framing a whole result set.
    pub const RESULTS: FrameOptions = FrameOptions {
        padding: 50.0,
        max_zoom: 14.0,
    };
    /// Framing one selected item.
    pub const ITEM: FrameOptions = FrameOptions {
        padding: 50.0,
        max_zoom: 18.0,
    };

    pub fn clamped(self) -> FitOptions {
        FitOptions {
            padding: self.padding.clamp(MIN_PADDING_PX, MAX_PADDING_PX),
            max_zoom: self.max_zoom.clamp(MIN_MAX_ZOOM, MAX_MAX_ZOOM),
        }
    }
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self::RESULTS
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    Fitted,
    /// Engine refused the fit; camera jumped to the bbox center instead.
    FellBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportError {
    EngineNotReady { attempts: u32 },
    Engine(EngineError),
}

impl std::fmt::Display for ViewportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewportError::EngineNotReady { attempts } => {
                write!(f, "map engine not ready after {attempts} attempts")
            }
            ViewportError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ViewportError {}

impl From<EngineError> for ViewportError {
    fn from(e: EngineError) -> Self {
        ViewportError::Engine(e)
    }
}

fn not_ready(e: &ViewportError) -> bool {
    matches!(e, ViewportError::Engine(EngineError::NotReady))
}

/// Sole owner of the session's [`Viewport`].
///
/// Commands go to the engine; the viewport itself only changes through
/// [`ViewportController::on_camera_moved`].
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    retry: RetryPolicy,
}

impl ViewportController {
    pub fn new(initial: Viewport, retry: RetryPolicy) -> Self {
        Self {
            viewport: initial,
            retry,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fits `bbox` with clamped options, jumping to its center if the fit is rejected.
    pub fn frame_to_bbox<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        bbox: &BBox,
        options: FrameOptions,
    ) -> Result<Framing, ViewportError> {
        if !engine.is_loaded() {
            return Err(EngineError::NotReady.into());
        }
        let fit = options.clamped();
        match engine.fit_bounds(bbox, fit) {
            Ok(()) => Ok(Framing::Fitted),
            Err(e) => {
                warn!("fit_bounds rejected ({e}); jumping to bbox center");
                engine.jump_to(center_of(bbox), fit.max_zoom.min(FALLBACK_ZOOM_CAP))?;
                Ok(Framing::FellBack)
            }
        }
    }

    pub fn fly_to<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        point: LngLat,
        zoom: f64,
    ) -> Result<(), ViewportError> {
        if !engine.is_loaded() {
            return Err(EngineError::NotReady.into());
        }
        engine.fly_to(point, zoom)?;
        Ok(())
    }

    /// Flies to the bbox center at the heuristic span zoom.
    pub fn fly_to_bbox<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        bbox: &BBox,
    ) -> Result<(), ViewportError> {
        let (center, zoom) = frame_bbox(bbox);
        self.fly_to(engine, center, zoom)
    }

    pub fn jump_to<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        viewport: Viewport,
    ) -> Result<(), ViewportError> {
        if !engine.is_loaded() {
            return Err(EngineError::NotReady.into());
        }
        engine.jump_to(viewport.center(), viewport.zoom)?;
        Ok(())
    }

    pub async fn frame_to_bbox_when_ready<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        bbox: &BBox,
        options: FrameOptions,
        bus: &mut EventBus,
    ) -> Result<Framing, ViewportError> {
        let out = retry(self.retry, |_| self.frame_to_bbox(engine, bbox, options), not_ready).await;
        settle("frame_to_bbox", out, bus)
    }

    pub async fn fly_to_when_ready<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        point: LngLat,
        zoom: f64,
        bus: &mut EventBus,
    ) -> Result<(), ViewportError> {
        let out = retry(self.retry, |_| self.fly_to(engine, point, zoom), not_ready).await;
        settle("fly_to", out, bus)
    }

    pub async fn fly_to_bbox_when_ready<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        bbox: &BBox,
        bus: &mut EventBus,
    ) -> Result<(), ViewportError> {
        let out = retry(self.retry, |_| self.fly_to_bbox(engine, bbox), not_ready).await;
        settle("fly_to_bbox", out, bus)
    }

    pub async fn jump_to_when_ready<E: MapEngine + ?Sized>(
        &self,
        engine: &mut E,
        viewport: Viewport,
        bus: &mut EventBus,
    ) -> Result<(), ViewportError> {
        let out = retry(self.retry, |_| self.jump_to(engine, viewport), not_ready).await;
        settle("jump_to", out, bus)
    }

    /// Records a camera change reported by the engine.
    ///
    /// Returns `false` (and publishes nothing) when the camera did not move.
    pub fn on_camera_moved(&mut self, viewport: Viewport, bus: &mut EventBus) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        bus.publish(MapEvent::ViewportChanged(viewport));
        true
    }
}

fn settle<T>(
    command: &'static str,
    out: Result<T, RetryError<ViewportError>>,
    bus: &mut EventBus,
) -> Result<T, ViewportError> {
    let err = match out {
        Ok(v) => return Ok(v),
        Err(RetryError::Exhausted { attempts, .. }) => ViewportError::EngineNotReady { attempts },
        Err(RetryError::Aborted(e)) => e,
    };
    warn!(command, "camera command abandoned: {err}");
    bus.publish(MapEvent::ViewportCommandFailed {
        command,
        reason: err.to_string(),
    });
    debug!(command, "failure published");
    Err(err)
}
