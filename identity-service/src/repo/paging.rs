//! Marker arithmetic shared by backends.
//!
//! Collections page in stable descending id order. A marker names the last
//! item of the previous page, so the current page is the run of items
//! strictly after it. `next` re-fetches the following page and `prev` the
//! preceding one; the first page has no marker, so `prev` is `None` both on
//! the first page and when the previous page *is* the first page.

use super::PageMarkers;

/// Sort a collection into paging order (descending id).
pub fn sort_desc<T>(items: &mut [T], id_of: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| id_of(b).cmp(id_of(a)));
}

fn start_index<T>(items: &[T], marker: Option<&str>, id_of: &impl Fn(&T) -> &str) -> usize {
    match marker {
        None => 0,
        // Descending order: the page starts at the first id below the marker.
        Some(marker) => items
            .iter()
            .position(|item| id_of(item) < marker)
            .unwrap_or(items.len()),
    }
}

/// The page after `marker`, at most `limit` items. `items` must already be
/// in descending id order.
pub fn page<T: Clone>(
    items: &[T],
    marker: Option<&str>,
    limit: usize,
    id_of: impl Fn(&T) -> &str,
) -> Vec<T> {
    let start = start_index(items, marker, &id_of);
    let end = (start + limit).min(items.len());
    items[start..end].to_vec()
}

/// Markers of the pages adjacent to the one `marker` identifies.
pub fn page_markers<T>(
    items: &[T],
    marker: Option<&str>,
    limit: usize,
    id_of: impl Fn(&T) -> &str,
) -> PageMarkers {
    if items.is_empty() || limit == 0 {
        return PageMarkers::default();
    }

    let start = start_index(items, marker, &id_of);

    let next = if start + limit < items.len() {
        Some(id_of(&items[start + limit - 1]).to_string())
    } else {
        None
    };

    // The previous page is re-fetched with the id just before it; when the
    // previous page is the first page that id does not exist and the page is
    // reached with no marker at all.
    let prev = if start > limit {
        Some(id_of(&items[start - limit - 1]).to_string())
    } else {
        None
    };

    PageMarkers { prev, next }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        // id-09, id-08, ... descending
        (0..n).rev().map(|i| format!("id-{:02}", i)).collect()
    }

    fn id_of(s: &String) -> &str {
        s.as_str()
    }

    #[test]
    fn empty_collection_has_no_markers() {
        let items: Vec<String> = vec![];
        assert_eq!(page_markers(&items, None, 3, id_of), PageMarkers::default());
    }

    #[test]
    fn first_page_has_no_prev() {
        let items = ids(10);
        let markers = page_markers(&items, None, 3, id_of);
        assert_eq!(markers.prev, None);
        assert_eq!(markers.next.as_deref(), Some("id-07"));
    }

    #[test]
    fn last_page_has_no_next() {
        let items = ids(10);
        // pages of 3: [9,8,7] [6,5,4] [3,2,1] [0]
        let markers = page_markers(&items, Some("id-01"), 3, id_of);
        assert_eq!(markers.next, None);
        assert_eq!(markers.prev.as_deref(), Some("id-04"));
    }

    #[test]
    fn exact_final_page_has_no_next() {
        let items = ids(6);
        let markers = page_markers(&items, Some("id-03"), 3, id_of);
        assert_eq!(markers.next, None);
    }

    #[test]
    fn forward_then_back_returns_to_the_same_page() {
        let items = ids(10);
        let limit = 3;

        // Walk every page forward, then step back with the reported prev.
        let mut marker: Option<String> = None;
        loop {
            let current = page(&items, marker.as_deref(), limit, id_of);
            let markers = page_markers(&items, marker.as_deref(), limit, id_of);

            let Some(next) = markers.next.clone() else {
                break;
            };
            let forward = page(&items, Some(&next), limit, id_of);
            let back = page_markers(&items, Some(&next), limit, id_of);
            let replay = page(&items, back.prev.as_deref(), limit, id_of);
            assert_eq!(replay, current, "prev of next page must replay this page");

            assert!(!forward.is_empty());
            marker = Some(next);
        }
    }

    #[test]
    fn page_is_strictly_after_marker() {
        let items = ids(5);
        let page_two = page(&items, Some("id-02"), 2, id_of);
        assert_eq!(page_two, vec!["id-01".to_string(), "id-00".to_string()]);
    }

    #[test]
    fn unknown_marker_lands_on_the_next_lower_id() {
        let items = ids(5);
        let result = page(&items, Some("id-015"), 2, id_of);
        assert_eq!(result, vec!["id-01".to_string(), "id-00".to_string()]);
    }
}
