use std::collections::{BTreeMap, BTreeSet, VecDeque};

use foundation::math::ScreenRect;
use foundation::{BBox, Viewport};
use tracing::trace;

/// Channels a subscriber can listen on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Drawing,
    BBox,
    Search,
    Overlay,
    Viewport,
    Settings,
    Catalog,
}

impl Topic {
    pub const ALL: [Topic; 7] = [
        Topic::Drawing,
        Topic::BBox,
        Topic::Search,
        Topic::Overlay,
        Topic::Viewport,
        Topic::Settings,
        Topic::Catalog,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OverlayKind {
    Thumbnail,
    Details,
    MapAnchoredThumbnail,
}

/// Counts published with every applied result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsSummary {
    pub generation: u64,
    pub item_count: usize,
    pub number_returned: u64,
    pub number_matched: Option<u64>,
    pub has_next: bool,
    /// Items added by this update; equals `item_count` for a fresh search.
    pub appended: usize,
}

/// Settings of a search that failed, so a UI can describe or repeat it.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedQuery {
    pub collection_id: String,
    pub limit: u32,
    pub bbox: Option<BBox>,
    pub datetime: Option<String>,
}

/// Everything the map core announces to the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    DrawingModeChanged { enabled: bool },
    PreviewBBoxChanged(BBox),
    BBoxCommitted(BBox),
    BBoxCleared,
    SearchIssued { generation: u64, url: String },
    SearchResultsUpdated(ResultsSummary),
    SearchFailed {
        generation: u64,
        query: FailedQuery,
        error: String,
    },
    OverlayShown(OverlayKind),
    OverlayHidden,
    OverlayAnchorMoved(ScreenRect),
    ViewportChanged(Viewport),
    ViewportCommandFailed { command: &'static str, reason: String },
    LimitChanged { limit: u32 },
    CollectionChanged { collection_id: Option<String> },
    DatetimeFilterChanged { param: Option<String> },
    CatalogSwitched { url: String },
}

impl MapEvent {
    pub fn topic(&self) -> Topic {
        match self {
            MapEvent::DrawingModeChanged { .. } => Topic::Drawing,
            MapEvent::PreviewBBoxChanged(_) | MapEvent::BBoxCommitted(_) | MapEvent::BBoxCleared => {
                Topic::BBox
            }
            MapEvent::SearchIssued { .. }
            | MapEvent::SearchResultsUpdated(_)
            | MapEvent::SearchFailed { .. } => Topic::Search,
            MapEvent::OverlayShown(_) | MapEvent::OverlayHidden | MapEvent::OverlayAnchorMoved(_) => {
                Topic::Overlay
            }
            MapEvent::ViewportChanged(_) | MapEvent::ViewportCommandFailed { .. } => Topic::Viewport,
            MapEvent::LimitChanged { .. }
            | MapEvent::CollectionChanged { .. }
            | MapEvent::DatetimeFilterChanged { .. } => Topic::Settings,
            MapEvent::CatalogSwitched { .. } => Topic::Catalog,
        }
    }
}

/// A published event stamped with its global publish sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub seq: u64,
    pub event: MapEvent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

#[derive(Debug)]
struct Subscriber {
    topics: BTreeSet<Topic>,
    mailbox: VecDeque<Envelope>,
}

/// Explicit publish/subscribe channel.
///
/// Delivery is synchronous into per-subscriber mailboxes; each subscriber
/// sees events in publish order and pulls them with [`EventBus::drain`].
#[derive(Debug, Default)]
pub struct EventBus {
    next_seq: u64,
    next_subscriber: u64,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topics: impl IntoIterator<Item = Topic>) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.insert(
            id,
            Subscriber {
                topics: topics.into_iter().collect(),
                mailbox: VecDeque::new(),
            },
        );
        id
    }

    pub fn subscribe_all(&mut self) -> SubscriberId {
        self.subscribe(Topic::ALL)
    }

    /// Drops the subscriber and any undelivered events. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Returns the sequence number assigned to the event.
    pub fn publish(&mut self, event: MapEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let topic = event.topic();
        trace!(seq, ?topic, "publish");
        for sub in self.subscribers.values_mut() {
            if sub.topics.contains(&topic) {
                sub.mailbox.push_back(Envelope {
                    seq,
                    event: event.clone(),
                });
            }
        }
        seq
    }

    pub fn pending(&self, id: SubscriberId) -> usize {
        self.subscribers.get(&id).map_or(0, |s| s.mailbox.len())
    }

    pub fn drain(&mut self, id: SubscriberId) -> Vec<Envelope> {
        match self.subscribers.get_mut(&id) {
            Some(sub) => sub.mailbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Drains and discards envelopes, returning only the events.
    pub fn drain_events(&mut self, id: SubscriberId) -> Vec<MapEvent> {
        self.drain(id).into_iter().map(|e| e.event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, MapEvent, Topic};
    use foundation::BBox;

    #[test]
    fn delivers_only_subscribed_topics() {
        let mut bus = EventBus::new();
        let bbox_only = bus.subscribe([Topic::BBox]);
        let all = bus.subscribe_all();

        bus.publish(MapEvent::LimitChanged { limit: 20 });
        bus.publish(MapEvent::BBoxCleared);

        assert_eq!(bus.drain_events(bbox_only), vec![MapEvent::BBoxCleared]);
        assert_eq!(bus.pending(all), 2);
    }

    #[test]
    fn preserves_publish_order_per_subscriber() {
        let mut bus = EventBus::new();
        let id = bus.subscribe([Topic::BBox]);
        let a = BBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BBox::new(0.0, 0.0, 2.0, 2.0).unwrap();
        bus.publish(MapEvent::PreviewBBoxChanged(a));
        bus.publish(MapEvent::PreviewBBoxChanged(b));
        bus.publish(MapEvent::BBoxCommitted(b));

        let drained = bus.drain(id);
        let seqs: Vec<u64> = drained.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(drained[2].event, MapEvent::BBoxCommitted(b));
        assert!(bus.drain(id).is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let id = bus.subscribe([Topic::Overlay]);
        bus.publish(MapEvent::OverlayHidden);
        bus.unsubscribe(id);
        bus.publish(MapEvent::OverlayHidden);
        assert!(!bus.is_subscribed(id));
        assert_eq!(bus.pending(id), 0);
        assert!(bus.drain(id).is_empty());
    }
}
