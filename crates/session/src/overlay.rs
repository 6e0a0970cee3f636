//! Single-active-overlay state and the map-anchored thumbnail.

use catalog::{Item, ProbeError, ThumbnailProbe, ThumbnailRef};
use foundation::math::{ScreenRect, anchored_rect};
use foundation::{BBox, Geometry, GeometryError, bbox_from_geometry};
use runtime::{EventBus, MapEvent, OverlayKind, SubscriberId, Topic};
use scene::MapEngine;
use tracing::{debug, info};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Item has no thumbnail at all.
    Missing,
    /// Preflight failed; offer the link instead of a broken image.
    DownloadLink,
    UnsupportedFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presentation {
    Verifying,
    Verified,
    Degraded(Degradation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailOverlay {
    pub item_id: String,
    pub title: String,
    pub thumbnail: ThumbnailRef,
    pub presentation: Presentation,
}

/// At most one overlay is ever active; showing one replaces the other.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverlayState {
    #[default]
    None,
    Thumbnail(ThumbnailOverlay),
    Details(Box<Item>),
    MapAnchoredThumbnail {
        overlay: ThumbnailOverlay,
        geometry: Geometry,
        bbox: BBox,
        rect: Option<ScreenRect>,
    },
}

impl OverlayState {
    pub fn kind(&self) -> Option<OverlayKind> {
        match self {
            OverlayState::None => None,
            OverlayState::Thumbnail(_) => Some(OverlayKind::Thumbnail),
            OverlayState::Details(_) => Some(OverlayKind::Details),
            OverlayState::MapAnchoredThumbnail { .. } => Some(OverlayKind::MapAnchoredThumbnail),
        }
    }

    pub fn thumbnail(&self) -> Option<&ThumbnailOverlay> {
        match self {
            OverlayState::Thumbnail(t) | OverlayState::MapAnchoredThumbnail { overlay: t, .. } => {
                Some(t)
            }
            _ => None,
        }
    }

    /// Item currently previewed as a thumbnail, if any.
    pub fn previewed_item(&self) -> Option<&str> {
        self.thumbnail().map(|t| t.item_id.as_str())
    }

    fn thumbnail_mut(&mut self) -> Option<&mut ThumbnailOverlay> {
        match self {
            OverlayState::Thumbnail(t) | OverlayState::MapAnchoredThumbnail { overlay: t, .. } => {
                Some(t)
            }
            _ => None,
        }
    }
}

/// Pending image preflight for the thumbnail on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTicket {
    token: u64,
    pub url: String,
}

#[derive(Debug, Default)]
pub struct OverlayCoordinator {
    state: OverlayState,
    token: u64,
    anchor_sub: Option<SubscriberId>,
}

impl OverlayCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn show_thumbnail(
        &mut self,
        item_id: &str,
        title: &str,
        thumbnail: ThumbnailRef,
        bus: &mut EventBus,
    ) -> Option<ProbeTicket> {
        let (overlay, ticket) = self.prepare(item_id, title, thumbnail);
        self.replace(OverlayState::Thumbnail(overlay), bus);
        ticket
    }

    pub fn show_details(&mut self, item: Item, bus: &mut EventBus) {
        self.token += 1;
        self.replace(OverlayState::Details(Box::new(item)), bus);
    }

    /// Shows a thumbnail pinned over `geometry` and keeps it aligned with the camera.
    ///
    /// Invalid geometry leaves the current overlay untouched.
    pub fn show_map_anchored_thumbnail<E: MapEngine + ?Sized>(
        &mut self,
        item_id: &str,
        title: &str,
        geometry: &Geometry,
        thumbnail: ThumbnailRef,
        engine: &E,
        bus: &mut EventBus,
    ) -> Result<Option<ProbeTicket>, GeometryError> {
        let bbox = bbox_from_geometry(geometry)?;
        let (overlay, ticket) = self.prepare(item_id, title, thumbnail);
        let rect = anchored_rect(&bbox, |p| engine.project(p));
        self.replace(
            OverlayState::MapAnchoredThumbnail {
                overlay,
                geometry: geometry.clone(),
                bbox,
                rect,
            },
            bus,
        );
        self.anchor_sub = Some(bus.subscribe([Topic::Viewport]));
        if let Some(rect) = rect {
            bus.publish(MapEvent::OverlayAnchorMoved(rect));
        }
        Ok(ticket)
    }

    pub fn hide_all(&mut self, bus: &mut EventBus) {
        self.token += 1;
        self.replace(OverlayState::None, bus);
    }

    /// Applies a preflight outcome if it belongs to the thumbnail still on screen.
    pub fn complete_probe(&mut self, ticket: &ProbeTicket, outcome: Result<(), ProbeError>) -> bool {
        if ticket.token != self.token {
            debug!(url = %ticket.url, "ignoring preflight for a replaced overlay");
            return false;
        }
        let Some(overlay) = self.state.thumbnail_mut() else {
            return false;
        };
        overlay.presentation = match outcome {
            Ok(()) => Presentation::Verified,
            Err(e) => {
                info!(url = %ticket.url, "thumbnail unavailable: {e}");
                Presentation::Degraded(Degradation::DownloadLink)
            }
        };
        true
    }

    pub async fn verify<P: ThumbnailProbe + ?Sized>(&mut self, probe: &P, ticket: ProbeTicket) -> bool {
        let outcome = probe.probe(&ticket.url).await;
        self.complete_probe(&ticket, outcome)
    }

    /// Recomputes the anchored rect if the camera moved since the last call.
    pub fn pump<E: MapEngine + ?Sized>(&mut self, engine: &E, bus: &mut EventBus) -> Option<ScreenRect> {
        let sub = self.anchor_sub?;
        let moved = bus
            .drain_events(sub)
            .iter()
            .any(|e| matches!(e, MapEvent::ViewportChanged(_)));
        if !moved {
            return None;
        }
        let OverlayState::MapAnchoredThumbnail { bbox, rect, .. } = &mut self.state else {
            return None;
        };
        *rect = anchored_rect(bbox, |p| engine.project(p));
        let rect = (*rect)?;
        bus.publish(MapEvent::OverlayAnchorMoved(rect));
        Some(rect)
    }

    fn prepare(
        &mut self,
        item_id: &str,
        title: &str,
        thumbnail: ThumbnailRef,
    ) -> (ThumbnailOverlay, Option<ProbeTicket>) {
        self.token += 1;
        let (presentation, ticket) = match thumbnail.url.as_deref() {
            None => (Presentation::Degraded(Degradation::Missing), None),
            Some(_) if !thumbnail.is_web_image() => {
                (Presentation::Degraded(Degradation::UnsupportedFormat), None)
            }
            Some(url) => (
                Presentation::Verifying,
                Some(ProbeTicket {
                    token: self.token,
                    url: url.to_string(),
                }),
            ),
        };
        let overlay = ThumbnailOverlay {
            item_id: item_id.to_string(),
            title: title.to_string(),
            thumbnail,
            presentation,
        };
        (overlay, ticket)
    }

    fn replace(&mut self, next: OverlayState, bus: &mut EventBus) {
        if let Some(sub) = self.anchor_sub.take() {
            bus.unsubscribe(sub);
        }
        let was_visible = self.state.kind().is_some();
        self.state = next;
        match self.state.kind() {
            Some(kind) => {
                debug!(?kind, "overlay shown");
                bus.publish(MapEvent::OverlayShown(kind));
            }
            None if was_visible => {
                debug!("overlay hidden");
                bus.publish(MapEvent::OverlayHidden);
            }
            None => {}
        }
    }
}
