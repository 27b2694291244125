//! Discovery core: criteria store, matching engine, location matcher, selection
//! coordinator and map marker synchronizer, tied together by [`DiscoverySession`].

pub mod criteria;
pub mod engine;
pub mod listing;
pub mod location;
pub mod markers;
pub mod notify;
pub mod selection;
pub mod session;
pub mod source;

pub use criteria::{
    CriteriaChanged, CriteriaPatch, CriteriaStore, FilterCriteria, GenderFilter, OccupancyFilter,
    PriceBounds, PriceRange, PropertyTypeFilter,
};
pub use engine::{match_listings, matches};
pub use listing::{
    Coordinates, GenderPreference, Listing, ListingAdapter, ListingId, ListingStatus, Occupancy,
    PropertyType, RawListing,
};
pub use location::{location_filter, LocationQuery};
pub use markers::{
    Bounds, MapBackend, MapCommand, Marker, MarkerSynchronizer, MarkerVariant,
    RecordingMapBackend, SyncReport,
};
pub use notify::{Subscribers, SubscriptionId};
pub use selection::{ActiveSelection, SelectionChanged, SelectionCoordinator, SelectionTrigger};
pub use session::{DiscoverySession, FetchOutcome, ResultsChanged, ResultsView};
pub use source::{FetchToken, JsonFileSource, ListingSource, SourceError, StaticListingSource};

/// Failures surfaced by the discovery session. Empty results are never an error.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("listing source failed: {0}")]
    Source(#[from] SourceError),
    #[error("listing {0} is not in the current result set")]
    UnknownListing(ListingId),
}
