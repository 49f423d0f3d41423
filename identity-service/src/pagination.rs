//! Pagination links.

use serde::Serialize;

use crate::repo::PageMarkers;

/// One `prev`/`next` link of a paged collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    fn new(rel: &str, base_url: &str, marker: &str, limit: usize) -> Self {
        Self {
            rel: rel.to_string(),
            href: format!("{base_url}?marker={marker}&limit={limit}"),
        }
    }
}

/// Build the link list for a page: zero, one or two links, `prev` before
/// `next`. Query parameters of the original request are not preserved.
pub fn get_links(base_url: &str, markers: &PageMarkers, limit: usize) -> Vec<Link> {
    let mut links = Vec::new();
    if let Some(prev) = &markers.prev {
        links.push(Link::new("prev", base_url, prev, limit));
    }
    if let Some(next) = &markers.next {
        links.push(Link::new("next", base_url, next, limit));
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_keep_prev_before_next() {
        let markers = PageMarkers {
            prev: Some("p1".to_string()),
            next: Some("n1".to_string()),
        };
        let links = get_links("http://id.example.com/tenants", &markers, 10);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].rel, "prev");
        assert_eq!(
            links[0].href,
            "http://id.example.com/tenants?marker=p1&limit=10"
        );
        assert_eq!(links[1].rel, "next");
    }

    #[test]
    fn absent_markers_emit_no_links() {
        assert!(get_links("http://x", &PageMarkers::default(), 10).is_empty());

        let only_next = PageMarkers {
            prev: None,
            next: Some("n".to_string()),
        };
        let links = get_links("http://x", &only_next, 5);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].rel, "next");
    }
}
