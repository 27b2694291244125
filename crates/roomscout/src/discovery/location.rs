use super::listing::Listing;

/// Case-insensitive substring query over a listing's title and location label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    needle: String,
}

impl LocationQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.trim().to_lowercase(),
        }
    }

    /// An empty (or whitespace-only) query matches every listing.
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.is_empty()
            || listing.title.to_lowercase().contains(&self.needle)
            || listing.location_label.to_lowercase().contains(&self.needle)
    }
}

/// Narrows an already-matched subset by free text, keeping input order.
pub fn location_filter(listings: &[Listing], query: &str) -> Vec<Listing> {
    let query = LocationQuery::new(query);
    if query.is_empty() {
        return listings.to_vec();
    }

    listings
        .iter()
        .filter(|listing| query.matches(listing))
        .cloned()
        .collect()
}
