use foundation::{BBox, LngLat};
use runtime::{EventBus, MapEvent};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DrawState {
    Idle,
    /// Drawing enabled, waiting for the first pointer-down.
    Armed,
    Dragging { anchor: LngLat, live: BBox },
    Committed(BBox),
}

/// Pointer-gesture state machine producing a committed bbox.
///
/// Transitions:
/// - `enable`: any state to `Armed`, clearing any previous bbox.
/// - pointer-down: `Armed` to `Dragging`; `Committed` back to `Armed`.
/// - pointer-move: `Dragging` to `Dragging`, publishing the live preview.
/// - pointer-up: `Dragging` to `Committed`.
/// - `disable`: any state to `Idle`.
///
/// A non-finite pointer position is dropped: the state is kept and nothing
/// is published. Committing does not trigger a search.
#[derive(Debug, Clone)]
pub struct BBoxDrawSession {
    state: DrawState,
}

impl Default for BBoxDrawSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BBoxDrawSession {
    pub fn new() -> Self {
        Self {
            state: DrawState::Idle,
        }
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Drawing mode as shown on a toolbar: armed or mid-drag.
    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Armed | DrawState::Dragging { .. })
    }

    pub fn committed(&self) -> Option<BBox> {
        match self.state {
            DrawState::Committed(b) => Some(b),
            _ => None,
        }
    }

    pub fn live(&self) -> Option<BBox> {
        match self.state {
            DrawState::Dragging { live, .. } => Some(live),
            _ => None,
        }
    }

    pub fn enable(&mut self, bus: &mut EventBus) {
        self.state = DrawState::Armed;
        bus.publish(MapEvent::BBoxCleared);
        bus.publish(MapEvent::DrawingModeChanged { enabled: true });
        debug!("bbox drawing armed");
    }

    pub fn disable(&mut self, bus: &mut EventBus) {
        let was_drawing = self.is_drawing();
        self.state = DrawState::Idle;
        if was_drawing {
            bus.publish(MapEvent::DrawingModeChanged { enabled: false });
        }
    }

    /// Toggles between `Idle` and `Armed`; returns the new drawing mode.
    pub fn toggle(&mut self, bus: &mut EventBus) -> bool {
        if self.is_drawing() {
            self.disable(bus);
            false
        } else {
            self.enable(bus);
            true
        }
    }

    pub fn on_pointer_down(&mut self, point: LngLat, bus: &mut EventBus) {
        match self.state {
            DrawState::Armed => match BBox::from_point(point) {
                Ok(live) => {
                    self.state = DrawState::Dragging {
                        anchor: point,
                        live,
                    };
                }
                Err(e) => debug!(error = %e, "pointer-down ignored"),
            },
            DrawState::Committed(_) => self.enable(bus),
            DrawState::Idle | DrawState::Dragging { .. } => {}
        }
    }

    /// Returns the updated preview while dragging.
    pub fn on_pointer_move(&mut self, point: LngLat, bus: &mut EventBus) -> Option<BBox> {
        let DrawState::Dragging { anchor, .. } = self.state else {
            return None;
        };
        let live = match BBox::from_corners(anchor, point) {
            Ok(live) => live,
            Err(e) => {
                debug!(error = %e, "pointer-move ignored");
                return None;
            }
        };
        self.state = DrawState::Dragging { anchor, live };
        bus.publish(MapEvent::PreviewBBoxChanged(live));
        Some(live)
    }

    /// Commits the envelope of the anchor and `point`.
    pub fn on_pointer_up(&mut self, point: LngLat, bus: &mut EventBus) -> Option<BBox> {
        let DrawState::Dragging { anchor, .. } = self.state else {
            return None;
        };
        let bbox = match BBox::from_corners(anchor, point) {
            Ok(bbox) => bbox,
            Err(e) => {
                debug!(error = %e, "pointer-up ignored");
                return None;
            }
        };
        self.state = DrawState::Committed(bbox);
        debug!(bbox = %bbox.to_query_param(), "bbox committed");
        bus.publish(MapEvent::BBoxCommitted(bbox));
        bus.publish(MapEvent::DrawingModeChanged { enabled: false });
        Some(bbox)
    }

    /// Drops a committed bbox and re-arms.
    pub fn clear(&mut self, bus: &mut EventBus) {
        if let DrawState::Committed(_) = self.state {
            self.enable(bus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BBoxDrawSession, DrawState};
    use foundation::LngLat;
    use runtime::{EventBus, MapEvent, Topic};

    #[test]
    fn bbox_is_ordered_for_every_drag_direction() {
        let corners = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];
        for &(ax, ay) in &corners {
            for &(bx, by) in &corners {
                let mut bus = EventBus::new();
                let mut s = BBoxDrawSession::new();
                s.enable(&mut bus);
                s.on_pointer_down(LngLat::new(ax, ay), &mut bus);
                let b = s.on_pointer_up(LngLat::new(bx, by), &mut bus).unwrap();
                assert!(b.min_lon() <= b.max_lon());
                assert!(b.min_lat() <= b.max_lat());
            }
        }
    }

    #[test]
    fn pointer_events_are_ignored_unless_armed() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe_all();
        let mut s = BBoxDrawSession::new();
        s.on_pointer_down(LngLat::new(0.0, 0.0), &mut bus);
        assert_eq!(s.on_pointer_move(LngLat::new(1.0, 1.0), &mut bus), None);
        assert_eq!(s.on_pointer_up(LngLat::new(1.0, 1.0), &mut bus), None);
        assert_eq!(s.state(), DrawState::Idle);
        assert!(bus.drain(sub).is_empty());
    }

    #[test]
    fn full_gesture_publishes_preview_then_commit() {
        let mut bus = EventBus::new();
        let mut s = BBoxDrawSession::new();
        s.enable(&mut bus);
        let sub = bus.subscribe_all();

        s.on_pointer_down(LngLat::new(29.0, 41.2), &mut bus);
        let live = s.on_pointer_move(LngLat::new(28.8, 41.0), &mut bus).unwrap();
        let committed = s.on_pointer_up(LngLat::new(28.7, 40.9), &mut bus).unwrap();

        assert_eq!(live.to_array(), [28.8, 41.0, 29.0, 41.2]);
        assert_eq!(committed.to_array(), [28.7, 40.9, 29.0, 41.2]);
        assert_eq!(s.committed(), Some(committed));
        assert_eq!(
            bus.drain_events(sub),
            vec![
                MapEvent::PreviewBBoxChanged(live),
                MapEvent::BBoxCommitted(committed),
                MapEvent::DrawingModeChanged { enabled: false },
            ]
        );
    }

    #[test]
    fn non_finite_pointer_keeps_the_gesture_open() {
        let mut bus = EventBus::new();
        let mut s = BBoxDrawSession::new();
        s.enable(&mut bus);
        let sub = bus.subscribe_all();
        let nan = LngLat::new(f64::NAN, f64::NAN);

        s.on_pointer_down(nan, &mut bus);
        assert_eq!(s.state(), DrawState::Armed);

        s.on_pointer_down(LngLat::new(10.0, 20.0), &mut bus);
        assert_eq!(s.on_pointer_move(LngLat::new(f64::INFINITY, 21.0), &mut bus), None);
        assert_eq!(s.on_pointer_up(nan, &mut bus), None);
        assert_eq!(s.committed(), None);
        assert!(matches!(s.state(), DrawState::Dragging { .. }));
        assert!(bus.drain(sub).is_empty());

        let b = s.on_pointer_up(LngLat::new(11.0, 21.0), &mut bus).unwrap();
        assert_eq!(b.to_array(), [10.0, 20.0, 11.0, 21.0]);
    }

    #[test]
    fn pointer_down_after_commit_rearms_and_clears() {
        let mut bus = EventBus::new();
        let mut s = BBoxDrawSession::new();
        s.enable(&mut bus);
        s.on_pointer_down(LngLat::new(0.0, 0.0), &mut bus);
        s.on_pointer_up(LngLat::new(1.0, 1.0), &mut bus);
        let sub = bus.subscribe([Topic::BBox]);

        s.on_pointer_down(LngLat::new(5.0, 5.0), &mut bus);
        assert_eq!(s.state(), DrawState::Armed);
        assert_eq!(s.committed(), None);
        assert_eq!(bus.drain_events(sub), vec![MapEvent::BBoxCleared]);
    }

    #[test]
    fn disable_returns_to_idle_from_any_state() {
        let mut bus = EventBus::new();
        let mut s = BBoxDrawSession::new();
        assert!(s.toggle(&mut bus));
        s.on_pointer_down(LngLat::new(0.0, 0.0), &mut bus);
        assert!(!s.toggle(&mut bus));
        assert_eq!(s.state(), DrawState::Idle);
    }
}
