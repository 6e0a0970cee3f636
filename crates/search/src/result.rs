use catalog::{Item, ItemPage, NextCursor, SearchQuery};
use foundation::{BBox, bbox_from_geometry, union_bbox};
use runtime::ResultsSummary;

/// The applied result set of one query lineage.
///
/// Items keep server order; later pages are appended.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub generation: u64,
    pub query: SearchQuery,
    pub items: Vec<Item>,
    pub number_returned: u64,
    pub number_matched: Option<u64>,
    pub next: Option<NextCursor>,
}

impl SearchResult {
    pub fn from_page(generation: u64, query: SearchQuery, page: ItemPage) -> Self {
        let number_returned = page.number_returned.unwrap_or(page.items.len() as u64);
        Self {
            generation,
            query,
            items: page.items,
            number_returned,
            number_matched: page.number_matched,
            next: page.next,
        }
    }

    /// Appends a follow-up page. Returns the number of appended items.
    pub fn merge_page(&mut self, page: ItemPage) -> usize {
        let appended = page.items.len();
        self.items.extend(page.items);
        self.number_returned = page.number_returned.unwrap_or(self.items.len() as u64);
        if page.number_matched.is_some() {
            self.number_matched = page.number_matched;
        }
        self.next = page.next;
        appended
    }

    pub fn summary(&self, appended: usize) -> ResultsSummary {
        ResultsSummary {
            generation: self.generation,
            item_count: self.items.len(),
            number_returned: self.number_returned,
            number_matched: self.number_matched,
            has_next: self.next.is_some(),
            appended,
        }
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Union of every item's footprint, or `None` if no item has one.
    pub fn bounds(&self) -> Option<BBox> {
        let footprints: Vec<BBox> = self.items.iter().filter_map(item_footprint).collect();
        union_bbox(&footprints)
    }
}

/// Declared bbox, else the bbox of the geometry.
pub fn item_footprint(item: &Item) -> Option<BBox> {
    item.bbox
        .or_else(|| item.geometry.as_ref().and_then(|g| bbox_from_geometry(g).ok()))
}

#[cfg(test)]
mod tests {
    use super::SearchResult;
    use catalog::{ItemPage, SearchQuery};
    use serde_json::json;

    fn page(ids: &[&str], returned: Option<u64>, matched: Option<u64>, next: bool) -> ItemPage {
        let features: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let x = i as f64;
                json!({
                    "id": id,
                    "geometry": {"type": "Point", "coordinates": [x, x]},
                    "properties": {}
                })
            })
            .collect();
        let mut body = json!({"type": "FeatureCollection", "features": features, "links": []});
        if let Some(n) = returned {
            body["numberReturned"] = json!(n);
        }
        if let Some(n) = matched {
            body["numberMatched"] = json!(n);
        }
        if next {
            body["links"] = json!([{"rel": "next", "href": "http://c/next"}]);
        }
        ItemPage::from_value(body, 0).unwrap()
    }

    #[test]
    fn counts_default_when_absent() {
        let r = SearchResult::from_page(1, SearchQuery::new("c", 10), page(&["a", "b"], None, None, false));
        assert_eq!(r.number_returned, 2);
        assert_eq!(r.number_matched, None);
        assert!(!r.summary(2).has_next);
    }

    #[test]
    fn merge_keeps_matched_when_page_omits_it() {
        let mut r =
            SearchResult::from_page(1, SearchQuery::new("c", 2), page(&["a", "b"], Some(2), Some(9), true));
        let appended = r.merge_page(page(&["c"], None, None, false));
        assert_eq!(appended, 1);
        assert_eq!(r.number_returned, 3);
        assert_eq!(r.number_matched, Some(9));
        assert_eq!(r.next, None);
    }

    #[test]
    fn bounds_fall_back_to_geometry() {
        let r = SearchResult::from_page(1, SearchQuery::new("c", 10), page(&["a", "b", "c"], None, None, false));
        assert_eq!(r.bounds().unwrap().to_array(), [0.0, 0.0, 2.0, 2.0]);
    }
}
