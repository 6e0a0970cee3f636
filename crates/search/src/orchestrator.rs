//! Query issue, stale-result discard and pagination.
//!
//! Every search is split into a ticket (`begin_*`) and an outcome
//! (`complete_*`). Hosts may hold several tickets in flight and complete them
//! in any order; only the ticket of the latest generation is applied. The
//! async [`SearchOrchestrator::search`] and [`SearchOrchestrator::load_next`]
//! wrap both halves around one [`CatalogClient`] fetch.

use catalog::{
    CatalogClient, CatalogEndpoint, CatalogError, CatalogRequest, ItemPage, NextCursor, SearchQuery,
};
use runtime::{EventBus, FailedQuery, MapEvent, ResultsSummary};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::result::SearchResult;

/// An issued first-page request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: SearchQuery,
    pub request: CatalogRequest,
}

/// An issued follow-up page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTicket {
    pub generation: u64,
    pub cursor: NextCursor,
    pub request: CatalogRequest,
    first_position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchApply {
    Applied(ResultsSummary),
    /// Superseded by a newer generation; dropped without side effects.
    Stale { generation: u64, latest: u64 },
    /// Request failed; the previous result is untouched.
    Failed(CatalogError),
    /// Nothing to do (no continuation, or that page is already in flight).
    NoOp,
}

#[derive(Debug)]
pub struct SearchOrchestrator {
    endpoint: CatalogEndpoint,
    latest: u64,
    result: Option<SearchResult>,
    pending_page: Option<NextCursor>,
}

impl SearchOrchestrator {
    pub fn new(endpoint: CatalogEndpoint) -> Self {
        Self {
            endpoint,
            latest: 0,
            result: None,
            pending_page: None,
        }
    }

    pub fn endpoint(&self) -> &CatalogEndpoint {
        &self.endpoint
    }

    /// Highest generation issued so far.
    pub fn generation(&self) -> u64 {
        self.latest
    }

    pub fn result(&self) -> Option<&SearchResult> {
        self.result.as_ref()
    }

    pub fn next_cursor(&self) -> Option<NextCursor> {
        self.result.as_ref().and_then(|r| r.next.clone())
    }

    /// Drops the current result and invalidates every in-flight ticket.
    pub fn reset(&mut self) {
        self.latest += 1;
        self.result = None;
        self.pending_page = None;
    }

    /// Points at another catalog; implies [`SearchOrchestrator::reset`].
    pub fn set_endpoint(&mut self, endpoint: CatalogEndpoint) {
        self.endpoint = endpoint;
        self.reset();
    }

    pub fn begin_search(
        &mut self,
        query: SearchQuery,
        bus: &mut EventBus,
    ) -> Result<SearchTicket, CatalogError> {
        self.latest += 1;
        self.pending_page = None;
        let generation = self.latest;

        let request = match query.request(&self.endpoint) {
            Ok(r) => r,
            Err(e) => {
                report_failure(generation, &query, &e, bus);
                return Err(e);
            }
        };

        info!(generation, url = request.as_str(), "search issued");
        bus.publish(MapEvent::SearchIssued {
            generation,
            url: request.as_str().to_string(),
        });
        Ok(SearchTicket {
            generation,
            query,
            request,
        })
    }

    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Value, CatalogError>,
        bus: &mut EventBus,
    ) -> SearchApply {
        if let Some(stale) = self.stale(ticket.generation) {
            return stale;
        }
        let page = match outcome.and_then(|body| ItemPage::from_value(body, 0)) {
            Ok(page) => page,
            Err(e) => {
                report_failure(ticket.generation, &ticket.query, &e, bus);
                return SearchApply::Failed(e);
            }
        };

        let result = SearchResult::from_page(ticket.generation, ticket.query, page);
        let summary = result.summary(result.items.len());
        info!(
            generation = ticket.generation,
            items = summary.item_count,
            matched = ?summary.number_matched,
            "search results applied"
        );
        self.result = Some(result);
        bus.publish(MapEvent::SearchResultsUpdated(summary.clone()));
        SearchApply::Applied(summary)
    }

    /// Issues, fetches and applies one search.
    pub async fn search<C: CatalogClient + ?Sized>(
        &mut self,
        client: &C,
        query: SearchQuery,
        bus: &mut EventBus,
    ) -> SearchApply {
        let ticket = match self.begin_search(query, bus) {
            Ok(t) => t,
            Err(e) => return SearchApply::Failed(e),
        };
        let outcome = client.fetch(&ticket.request).await;
        self.complete_search(ticket, outcome, bus)
    }

    /// Starts fetching the page behind `cursor`.
    ///
    /// Returns `Ok(None)` when there is no cursor, no result to append to, or
    /// the same page is already in flight.
    pub fn begin_load_next(
        &mut self,
        cursor: Option<NextCursor>,
        bus: &mut EventBus,
    ) -> Result<Option<PageTicket>, CatalogError> {
        let Some(cursor) = cursor else {
            return Ok(None);
        };
        let Some(result) = self.result.as_ref() else {
            return Ok(None);
        };
        if self.pending_page.as_ref() == Some(&cursor) {
            debug!(href = cursor.href(), "page already in flight");
            return Ok(None);
        }

        let first_position = result.items.len();
        let request = match CatalogRequest::from_cursor(&cursor) {
            Ok(r) => r,
            Err(e) => {
                report_failure(self.latest, &result.query, &e, bus);
                return Err(e);
            }
        };

        debug!(generation = self.latest, url = request.as_str(), "loading next page");
        self.pending_page = Some(cursor.clone());
        Ok(Some(PageTicket {
            generation: self.latest,
            cursor,
            request,
            first_position,
        }))
    }

    pub fn complete_load_next(
        &mut self,
        ticket: PageTicket,
        outcome: Result<Value, CatalogError>,
        bus: &mut EventBus,
    ) -> SearchApply {
        if let Some(stale) = self.stale(ticket.generation) {
            return stale;
        }
        if self.pending_page.as_ref() != Some(&ticket.cursor) {
            debug!(href = ticket.cursor.href(), "page no longer pending");
            return SearchApply::NoOp;
        }
        self.pending_page = None;

        let page = outcome.and_then(|body| ItemPage::from_value(body, ticket.first_position));
        let Some(result) = self.result.as_mut() else {
            return SearchApply::NoOp;
        };
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                report_failure(ticket.generation, &result.query, &e, bus);
                return SearchApply::Failed(e);
            }
        };

        let appended = result.merge_page(page);
        let summary = result.summary(appended);
        info!(
            generation = ticket.generation,
            appended,
            items = summary.item_count,
            "next page merged"
        );
        bus.publish(MapEvent::SearchResultsUpdated(summary.clone()));
        SearchApply::Applied(summary)
    }

    /// Fetches and merges the page after the current result, if any.
    pub async fn load_next<C: CatalogClient + ?Sized>(
        &mut self,
        client: &C,
        bus: &mut EventBus,
    ) -> SearchApply {
        let ticket = match self.begin_load_next(self.next_cursor(), bus) {
            Ok(Some(t)) => t,
            Ok(None) => return SearchApply::NoOp,
            Err(e) => return SearchApply::Failed(e),
        };
        let outcome = client.fetch(&ticket.request).await;
        self.complete_load_next(ticket, outcome, bus)
    }

    fn stale(&self, generation: u64) -> Option<SearchApply> {
        (generation != self.latest).then(|| {
            debug!(generation, latest = self.latest, "discarding stale search response");
            SearchApply::Stale {
                generation,
                latest: self.latest,
            }
        })
    }
}

fn report_failure(generation: u64, query: &SearchQuery, error: &CatalogError, bus: &mut EventBus) {
    warn!(generation, "search failed: {error}");
    bus.publish(MapEvent::SearchFailed {
        generation,
        query: FailedQuery {
            collection_id: query.collection_id().to_string(),
            limit: query.limit(),
            bbox: query.bbox(),
            datetime: query.datetime().map(str::to_string),
        },
        error: error.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::{SearchApply, SearchOrchestrator};
    use catalog::{CatalogEndpoint, CatalogError, MemoryCatalog, SearchQuery};
    use foundation::BBox;
    use pretty_assertions::assert_eq;
    use runtime::{EventBus, MapEvent, Topic};
    use serde_json::{Value, json};

    const BASE: &str = "http://stac.test";

    fn orchestrator() -> SearchOrchestrator {
        SearchOrchestrator::new(CatalogEndpoint::parse(BASE).unwrap())
    }

    fn body(prefix: &str, n: usize, next: Option<&str>, matched: Option<u64>) -> Value {
        let features: Vec<Value> = (0..n)
            .map(|i| json!({"id": format!("{prefix}-{i}"), "geometry": null, "properties": {}}))
            .collect();
        let mut b = json!({"type": "FeatureCollection", "features": features, "numberReturned": n});
        if let Some(m) = matched {
            b["numberMatched"] = json!(m);
        }
        if let Some(href) = next {
            b["links"] = json!([{"rel": "next", "href": href}]);
        }
        b
    }

    fn ids(o: &SearchOrchestrator) -> Vec<String> {
        o.result().map(|r| r.items.iter().map(|i| i.id.clone()).collect()).unwrap_or_default()
    }

    #[test]
    fn late_response_of_superseded_query_is_discarded() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe([Topic::Search]);
        let mut o = orchestrator();

        let q1 = SearchQuery::new("c", 10);
        let q2 = SearchQuery::new("c", 10).with_bbox(Some(BBox::new(0.0, 0.0, 1.0, 1.0).unwrap()));
        let t1 = o.begin_search(q1, &mut bus).unwrap();
        let t2 = o.begin_search(q2, &mut bus).unwrap();
        assert_eq!((t1.generation, t2.generation), (1, 2));

        let applied = o.complete_search(t2, Ok(body("second", 2, None, None)), &mut bus);
        assert!(matches!(applied, SearchApply::Applied(_)));
        let late = o.complete_search(t1, Ok(body("first", 5, None, None)), &mut bus);
        assert_eq!(late, SearchApply::Stale { generation: 1, latest: 2 });

        assert_eq!(ids(&o), vec!["second-0", "second-1"]);
        let updates = bus
            .drain_events(sub)
            .into_iter()
            .filter(|e| matches!(e, MapEvent::SearchResultsUpdated(_)))
            .count();
        assert_eq!(updates, 1);
    }

    #[test]
    fn failure_keeps_last_good_result() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe([Topic::Search]);
        let mut o = orchestrator();

        let t = o.begin_search(SearchQuery::new("c", 3), &mut bus).unwrap();
        o.complete_search(t, Ok(body("good", 3, None, Some(3))), &mut bus);
        bus.drain(sub);

        let q = SearchQuery::new("c", 7);
        let t = o.begin_search(q.clone(), &mut bus).unwrap();
        let err = CatalogError::BadStatus {
            status: 502,
            url: t.request.as_str().to_string(),
        };
        assert_eq!(o.complete_search(t, Err(err.clone()), &mut bus), SearchApply::Failed(err));
        assert_eq!(ids(&o), vec!["good-0", "good-1", "good-2"]);

        let events = bus.drain_events(sub);
        assert!(matches!(
            events.last(),
            Some(MapEvent::SearchFailed { generation: 2, query, .. })
                if query.collection_id == q.collection_id() && query.limit == 7
        ));
    }

    #[test]
    fn garbage_body_is_a_failure_not_a_result() {
        let mut bus = EventBus::new();
        let mut o = orchestrator();
        let t = o.begin_search(SearchQuery::new("c", 3), &mut bus).unwrap();
        let out = o.complete_search(t, Ok(json!({"features": "nope"})), &mut bus);
        assert!(matches!(out, SearchApply::Failed(CatalogError::Decode(_))));
        assert!(o.result().is_none());
    }

    #[tokio::test]
    async fn next_page_is_appended_in_order() {
        let catalog = MemoryCatalog::new();
        catalog
            .respond(
                format!("{BASE}/collections/c/items?limit=10"),
                body("p1", 10, Some("http://stac.test/page2"), Some(13)),
            )
            .await;
        catalog
            .respond("http://stac.test/page2", body("p2", 3, None, Some(13)))
            .await;

        let mut bus = EventBus::new();
        let mut o = orchestrator();
        o.search(&catalog, SearchQuery::new("c", 10), &mut bus).await;
        let out = o.load_next(&catalog, &mut bus).await;

        let SearchApply::Applied(summary) = out else {
            panic!("expected applied page, got {out:?}");
        };
        assert_eq!(summary.item_count, 13);
        assert_eq!(summary.appended, 3);
        assert_eq!(summary.number_returned, 3);
        assert_eq!(summary.number_matched, Some(13));
        assert!(!summary.has_next);

        let got = ids(&o);
        assert_eq!(got.len(), 13);
        assert_eq!(got[9], "p1-9");
        assert_eq!(got[10], "p2-0");

        assert_eq!(o.load_next(&catalog, &mut bus).await, SearchApply::NoOp);
        assert_eq!(catalog.requests().await.len(), 2);
    }

    #[test]
    fn duplicate_page_request_is_suppressed() {
        let mut bus = EventBus::new();
        let mut o = orchestrator();
        let t = o.begin_search(SearchQuery::new("c", 1), &mut bus).unwrap();
        o.complete_search(t, Ok(body("a", 1, Some("http://stac.test/n"), None)), &mut bus);

        let first = o.begin_load_next(o.next_cursor(), &mut bus).unwrap();
        assert!(first.is_some());
        assert_eq!(o.begin_load_next(o.next_cursor(), &mut bus), Ok(None));
    }

    #[test]
    fn page_of_superseded_lineage_is_discarded() {
        let mut bus = EventBus::new();
        let mut o = orchestrator();
        let t = o.begin_search(SearchQuery::new("c", 1), &mut bus).unwrap();
        o.complete_search(t, Ok(body("a", 1, Some("http://stac.test/n"), None)), &mut bus);
        let page = o.begin_load_next(o.next_cursor(), &mut bus).unwrap().unwrap();

        let t = o.begin_search(SearchQuery::new("d", 1), &mut bus).unwrap();
        o.complete_search(t, Ok(body("d", 1, None, None)), &mut bus);

        let out = o.complete_load_next(page, Ok(body("late", 4, None, None)), &mut bus);
        assert!(matches!(out, SearchApply::Stale { .. }));
        assert_eq!(ids(&o), vec!["d-0"]);
    }

    #[test]
    fn reset_invalidates_in_flight_tickets() {
        let mut bus = EventBus::new();
        let mut o = orchestrator();
        let t = o.begin_search(SearchQuery::new("c", 1), &mut bus).unwrap();
        o.reset();
        assert!(matches!(
            o.complete_search(t, Ok(body("a", 1, None, None)), &mut bus),
            SearchApply::Stale { .. }
        ));
        assert!(o.result().is_none());
    }
}
