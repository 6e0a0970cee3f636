//! Wires drawing, search, framing, layers and overlays into one map session.

use catalog::{
    CatalogClient, CatalogEndpoint, CatalogError, DatetimeFilter, Item, ProbeError, SearchQuery,
    ThumbnailProbe, ThumbnailRef, clamp_limit,
};
use foundation::math::golden_angle_color;
use foundation::{BBox, LngLat, Viewport};
use layers::GeometryLayerManager;
use runtime::{EventBus, MapEvent};
use scene::{BBoxDrawSession, DrawState, FrameOptions, Framing, MapEngine, ViewportController, ViewportError};
use search::{PageTicket, SearchApply, SearchOrchestrator, SearchResult, SearchTicket, item_footprint};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::overlay::{OverlayCoordinator, OverlayState, ProbeTicket};

/// One interactive map session.
///
/// Owns every component and the event bus; the host forwards pointer input
/// and engine callbacks and subscribes to the bus for UI updates.
pub struct MapSession<E: MapEngine> {
    config: SessionConfig,
    engine: E,
    bus: EventBus,
    draw: BBoxDrawSession,
    viewport: ViewportController,
    layers: GeometryLayerManager,
    search: SearchOrchestrator,
    overlays: OverlayCoordinator,
    search_bbox: Option<BBox>,
    collection_id: Option<String>,
    item_limit: u32,
    datetime: DatetimeFilter,
    /// Item whose outline alone is shown while it is selected or previewed.
    focused: Option<String>,
}

impl<E: MapEngine> MapSession<E> {
    pub fn new(config: SessionConfig, engine: E) -> Result<Self, CatalogError> {
        let endpoint = CatalogEndpoint::parse(&config.stac_api_url)?;
        Ok(Self {
            engine,
            bus: EventBus::new(),
            draw: BBoxDrawSession::new(),
            viewport: ViewportController::new(config.default_viewport, config.retry),
            layers: GeometryLayerManager::new(),
            search: SearchOrchestrator::new(endpoint),
            overlays: OverlayCoordinator::new(),
            search_bbox: None,
            collection_id: config.collection_id.clone(),
            item_limit: clamp_limit(config.item_limit),
            datetime: config.datetime_filter.clone(),
            focused: None,
            config,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn overlay(&self) -> &OverlayState {
        self.overlays.state()
    }

    pub fn draw_state(&self) -> DrawState {
        self.draw.state()
    }

    pub fn search_bbox(&self) -> Option<BBox> {
        self.search_bbox
    }

    pub fn result(&self) -> Option<&SearchResult> {
        self.search.result()
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn item_limit(&self) -> u32 {
        self.item_limit
    }

    pub fn datetime_filter(&self) -> &DatetimeFilter {
        &self.datetime
    }

    pub fn drawn_item_ids(&self) -> Vec<String> {
        self.layers.registry().item_ids().map(str::to_string).collect()
    }

    // Drawing

    /// Returns the new drawing mode.
    pub fn toggle_bbox_drawing(&mut self) -> bool {
        if self.draw.is_drawing() {
            self.draw.disable(&mut self.bus);
            return false;
        }
        self.discard_bbox();
        self.draw.enable(&mut self.bus);
        true
    }

    pub fn pointer_down(&mut self, point: LngLat) {
        let was_committed = matches!(self.draw.state(), DrawState::Committed(_));
        self.draw.on_pointer_down(point, &mut self.bus);
        if was_committed {
            self.discard_bbox();
        }
    }

    pub fn pointer_move(&mut self, point: LngLat) {
        if let Some(live) = self.draw.on_pointer_move(point, &mut self.bus)
            && let Err(e) = self.layers.upsert_drawn_bbox_layer(&mut self.engine, &live)
        {
            warn!("bbox preview not drawn: {e}");
        }
    }

    pub fn pointer_up(&mut self, point: LngLat) -> Option<BBox> {
        let bbox = self.draw.on_pointer_up(point, &mut self.bus)?;
        if let Err(e) = self.layers.upsert_drawn_bbox_layer(&mut self.engine, &bbox) {
            warn!("committed bbox not drawn: {e}");
        }
        self.search_bbox = Some(bbox);
        Some(bbox)
    }

    /// Forgets the committed bbox and removes it from the map.
    pub fn clear_bbox(&mut self) {
        let had_bbox = self.search_bbox.is_some();
        self.discard_bbox();
        self.draw.clear(&mut self.bus);
        if had_bbox {
            self.bus.publish(MapEvent::BBoxCleared);
        }
    }

    fn discard_bbox(&mut self) {
        self.search_bbox = None;
        self.layers.clear_drawn_bbox_layer(&mut self.engine);
    }

    // Search

    /// Query built from the current settings.
    pub fn current_query(&self) -> Result<SearchQuery, CatalogError> {
        let collection = self
            .collection_id
            .as_deref()
            .ok_or_else(|| CatalogError::InvalidInput("no collection selected".to_string()))?;
        Ok(SearchQuery::new(collection, self.item_limit)
            .with_bbox(self.search_bbox)
            .with_datetime(&self.datetime))
    }

    /// Issues a search: hides overlays and resets drawing first.
    pub fn begin_search(&mut self) -> Result<SearchTicket, CatalogError> {
        let query = self.current_query()?;
        self.overlays.hide_all(&mut self.bus);
        self.draw.disable(&mut self.bus);
        self.search.begin_search(query, &mut self.bus)
    }

    /// Applies a search outcome and redraws outlines if it was current.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<serde_json::Value, CatalogError>,
    ) -> SearchApply {
        let applied = self.search.complete_search(ticket, outcome, &mut self.bus);
        if let SearchApply::Applied(_) = applied {
            self.focused = None;
            self.render_outlines();
        }
        applied
    }

    /// Searches with the current settings and frames the results.
    pub async fn run_search<C: CatalogClient + ?Sized>(&mut self, client: &C) -> SearchApply {
        let ticket = match self.begin_search() {
            Ok(t) => t,
            Err(e) => return SearchApply::Failed(e),
        };
        let outcome = client.fetch(&ticket.request).await;
        let applied = self.complete_search(ticket, outcome);
        if let SearchApply::Applied(_) = applied {
            let target = self.search_bbox.or_else(|| self.result().and_then(SearchResult::bounds));
            if let Some(bbox) = target
                && let Err(e) = self.frame(&bbox, FrameOptions::RESULTS).await
            {
                debug!(error = %e, "search results not framed");
            }
        }
        applied
    }

    pub fn begin_load_next(&mut self) -> Result<Option<PageTicket>, CatalogError> {
        let cursor = self.search.next_cursor();
        self.search.begin_load_next(cursor, &mut self.bus)
    }

    pub fn complete_load_next(
        &mut self,
        ticket: PageTicket,
        outcome: Result<serde_json::Value, CatalogError>,
    ) -> SearchApply {
        let applied = self.search.complete_load_next(ticket, outcome, &mut self.bus);
        if let SearchApply::Applied(_) = applied
            && self.focused.is_none()
        {
            self.render_outlines();
        }
        applied
    }

    pub async fn load_next<C: CatalogClient + ?Sized>(&mut self, client: &C) -> SearchApply {
        let ticket = match self.begin_load_next() {
            Ok(Some(t)) => t,
            Ok(None) => return SearchApply::NoOp,
            Err(e) => return SearchApply::Failed(e),
        };
        let outcome = client.fetch(&ticket.request).await;
        let applied = self.complete_load_next(ticket, outcome);
        if let SearchApply::Applied(_) = applied
            && self.focused.is_none()
            && let Some(bounds) = self.result().and_then(SearchResult::bounds)
            && let Err(e) = self
                .viewport
                .fly_to_bbox_when_ready(&mut self.engine, &bounds, &mut self.bus)
                .await
        {
            debug!(error = %e, "merged results not shown");
        }
        applied
    }

    // Results on the map

    /// Draws every outline and flies to the union of their footprints.
    pub async fn show_items_on_map(&mut self) -> Result<(), ViewportError> {
        self.focused = None;
        self.render_outlines();
        let Some(bounds) = self.result().and_then(SearchResult::bounds) else {
            return Ok(());
        };
        self.viewport
            .fly_to_bbox_when_ready(&mut self.engine, &bounds, &mut self.bus)
            .await
    }

    /// Fits the union of all result footprints.
    pub async fn frame_results(&mut self) -> Result<Option<Framing>, ViewportError> {
        let Some(bounds) = self.result().and_then(SearchResult::bounds) else {
            return Ok(None);
        };
        self.frame(&bounds, FrameOptions::RESULTS).await.map(Some)
    }

    /// Hides overlays, isolates the item's outline and fits its footprint.
    ///
    /// Returns `false` if the item is not in the current result.
    pub async fn select_item(&mut self, item_id: &str) -> Result<bool, ViewportError> {
        let Some((_, item)) = self.find_item(item_id) else {
            return Ok(false);
        };
        let footprint = item_footprint(&item);
        self.overlays.hide_all(&mut self.bus);
        self.focus_item(item_id);
        if let Some(bbox) = footprint {
            self.frame(&bbox, FrameOptions::ITEM).await?;
        }
        Ok(true)
    }

    pub fn show_item_details(&mut self, item_id: &str) -> bool {
        let Some((_, item)) = self.find_item(item_id) else {
            return false;
        };
        self.focus_item(item_id);
        self.overlays.show_details(item, &mut self.bus);
        true
    }

    /// Toggles the thumbnail preview of an item.
    ///
    /// Items with geometry get a map-anchored thumbnail, others a panel.
    /// Previewing the item already on screen hides it and restores all
    /// outlines. Returns the preflight still to run, if any.
    pub fn preview_item(&mut self, item_id: &str) -> Option<ProbeTicket> {
        if self.overlay().previewed_item() == Some(item_id) {
            self.hide_overlays();
            return None;
        }
        let (_, item) = self.find_item(item_id)?;
        let thumbnail = item.thumbnail.clone().unwrap_or_else(ThumbnailRef::missing);
        self.focus_item(item_id);

        if let Some(geometry) = &item.geometry
            && thumbnail.url.is_some()
        {
            match self.overlays.show_map_anchored_thumbnail(
                &item.id,
                &item.title,
                geometry,
                thumbnail.clone(),
                &self.engine,
                &mut self.bus,
            ) {
                Ok(ticket) => return ticket,
                Err(e) => debug!("anchoring preview of {item_id} failed: {e}"),
            }
        }
        self.overlays
            .show_thumbnail(&item.id, &item.title, thumbnail, &mut self.bus)
    }

    /// [`MapSession::preview_item`] followed by the image preflight.
    pub async fn preview_item_verified<P: ThumbnailProbe + ?Sized>(
        &mut self,
        item_id: &str,
        probe: &P,
    ) -> &OverlayState {
        if let Some(ticket) = self.preview_item(item_id) {
            self.overlays.verify(probe, ticket).await;
        }
        self.overlays.state()
    }

    pub fn complete_probe(&mut self, ticket: &ProbeTicket, outcome: Result<(), ProbeError>) -> bool {
        self.overlays.complete_probe(ticket, outcome)
    }

    /// Hides any overlay and brings back every result outline.
    pub fn hide_overlays(&mut self) {
        self.overlays.hide_all(&mut self.bus);
        if self.focused.take().is_some() {
            self.render_outlines();
        }
    }

    // Settings

    pub fn set_item_limit(&mut self, limit: u32) {
        let limit = clamp_limit(limit);
        if limit != self.item_limit {
            self.item_limit = limit;
            self.bus.publish(MapEvent::LimitChanged { limit });
        }
    }

    /// Sets the temporal filter from optional start/end inputs.
    pub fn set_datetime_filter(&mut self, start: Option<&str>, end: Option<&str>) -> Result<(), CatalogError> {
        let filter = DatetimeFilter::from_inputs(start, end)?;
        if filter != self.datetime {
            self.bus.publish(MapEvent::DatetimeFilterChanged {
                param: filter.to_param(),
            });
            self.datetime = filter;
        }
        Ok(())
    }

    /// Switching collection drops results, selection and the custom limit.
    pub fn select_collection(&mut self, collection_id: Option<&str>) {
        let next = collection_id.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
        if next == self.collection_id {
            return;
        }
        info!(collection = ?next, "collection selected");
        self.reset_results();
        self.collection_id = next.clone();
        self.bus.publish(MapEvent::CollectionChanged { collection_id: next });
        self.set_item_limit(self.config.item_limit);
    }

    /// Points the session at another catalog and resets everything but the bus.
    ///
    /// Blank URLs are ignored (`Ok(false)`).
    pub async fn switch_catalog(&mut self, url: &str) -> Result<bool, CatalogError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(false);
        }
        let endpoint = CatalogEndpoint::parse(url)?;
        info!(url = endpoint.as_str(), "switching catalog");

        self.reset_results();
        self.draw.disable(&mut self.bus);
        self.clear_bbox();
        self.search.set_endpoint(endpoint.clone());
        self.collection_id = None;
        self.datetime = DatetimeFilter::Any;
        self.item_limit = clamp_limit(self.config.item_limit);
        self.config.stac_api_url = endpoint.as_str().to_string();
        self.bus.publish(MapEvent::CatalogSwitched {
            url: endpoint.as_str().to_string(),
        });

        let home = self.config.default_viewport;
        if let Err(e) = self
            .viewport
            .jump_to_when_ready(&mut self.engine, home, &mut self.bus)
            .await
        {
            warn!("could not reset viewport: {e}");
        }
        Ok(true)
    }

    // Engine callbacks

    /// Forwards a camera change reported by the engine.
    pub fn on_camera_moved(&mut self, viewport: Viewport) {
        if self.viewport.on_camera_moved(viewport, &mut self.bus) {
            self.overlays.pump(&self.engine, &mut self.bus);
        }
    }

    /// Delivers every camera change the engine has queued.
    pub fn pump(&mut self) -> usize {
        let mut moves = 0;
        while let Some(v) = self.engine.poll_camera_moved() {
            self.on_camera_moved(v);
            moves += 1;
        }
        moves
    }

    // Internals

    fn find_item(&self, item_id: &str) -> Option<(usize, Item)> {
        let result = self.search.result()?;
        result
            .items
            .iter()
            .position(|i| i.id == item_id)
            .map(|idx| (idx, result.items[idx].clone()))
    }

    fn render_outlines(&mut self) {
        let Some(result) = self.search.result() else {
            self.layers.clear_all_item_geometries(&mut self.engine);
            return;
        };
        let items = result.items.iter().map(|i| (i.id.as_str(), i.geometry.as_ref()));
        let drawn = self.layers.show_items(&mut self.engine, items);
        debug!(drawn, "result outlines drawn");
    }

    /// Keeps only `item_id`'s outline, in its result-set color.
    fn focus_item(&mut self, item_id: &str) {
        self.layers.clear_all_item_geometries(&mut self.engine);
        self.focused = Some(item_id.to_string());
        let Some((index, item)) = self.find_item(item_id) else {
            return;
        };
        if let Some(geometry) = &item.geometry
            && let Err(e) =
                self.layers
                    .upsert_item_geometry(&mut self.engine, &item.id, geometry, golden_angle_color(index))
        {
            warn!("outline of {item_id} not drawn: {e}");
        }
    }

    fn reset_results(&mut self) {
        self.overlays.hide_all(&mut self.bus);
        self.search.reset();
        self.focused = None;
        self.layers.clear_all_item_geometries(&mut self.engine);
    }

    async fn frame(&mut self, bbox: &BBox, options: FrameOptions) -> Result<Framing, ViewportError> {
        self.viewport
            .frame_to_bbox_when_ready(&mut self.engine, bbox, options, &mut self.bus)
            .await
    }
}
