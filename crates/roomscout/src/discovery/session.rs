use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;

use super::criteria::{CriteriaChanged, CriteriaPatch, CriteriaStore, FilterCriteria, PriceBounds};
use super::engine::match_listings;
use super::listing::{Listing, ListingAdapter, ListingId, RawListing};
use super::location::location_filter;
use super::markers::{Bounds, MapBackend, Marker, MarkerSynchronizer};
use super::notify::{Subscribers, SubscriptionId};
use super::selection::{ActiveSelection, SelectionChanged, SelectionCoordinator};
use super::source::{FetchToken, ListingSource, SourceError};
use super::DiscoveryError;

/// Sent after the visible result set was recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultsChanged {
    pub total_count: usize,
    pub matching_count: usize,
    pub visible_count: usize,
}

/// Read-only snapshot handed to grid/detail consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub total_count: usize,
    pub matching_count: usize,
    pub visible_count: usize,
    pub search_query: String,
    pub listings: Vec<Listing>,
    pub active: Option<ActiveSelection>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied {
        token: FetchToken,
        listings: usize,
        skipped: usize,
    },
    /// A newer fetch was started after this one; its result was discarded.
    Superseded {
        token: FetchToken,
        latest: FetchToken,
    },
}

/// Coordinator for one user's discovery state.
///
/// Owns the listings cache, the criteria store, the free-text search query and the
/// selection coordinator. Every effective change eagerly recomputes the derived
/// state: structured matches, the text-filtered visible set, and the map markers.
/// All mutation goes through `&mut self`, so callers sharing a session across
/// threads wrap it in a single lock.
#[derive(Debug)]
pub struct DiscoverySession<M> {
    adapter: ListingAdapter,
    criteria: CriteriaStore,
    selection: SelectionCoordinator,
    synchronizer: MarkerSynchronizer,
    map: M,
    listings: Vec<Listing>,
    matching: Vec<Listing>,
    visible: Vec<Listing>,
    search_query: String,
    latest_fetch: u64,
    last_refreshed: Option<DateTime<Utc>>,
    results: Subscribers<ResultsChanged>,
}

impl<M: MapBackend> DiscoverySession<M> {
    pub fn new(config: &DiscoveryConfig, map: M) -> Self {
        Self {
            adapter: ListingAdapter::new(config.map_center),
            criteria: CriteriaStore::new(config.price_bounds),
            selection: SelectionCoordinator::new(),
            synchronizer: MarkerSynchronizer::new(config.currency_symbol.clone()),
            map,
            listings: Vec::new(),
            matching: Vec::new(),
            visible: Vec::new(),
            search_query: String::new(),
            latest_fetch: 0,
            last_refreshed: None,
            results: Subscribers::default(),
        }
    }

    /// Every listing from the last applied fetch.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Listings passing the structured criteria.
    pub fn matching(&self) -> &[Listing] {
        &self.matching
    }

    /// Matching listings narrowed by the search query; what the grid and map show.
    pub fn visible(&self) -> &[Listing] {
        &self.visible
    }

    pub fn listing(&self, listing_id: &ListingId) -> Result<&Listing, DiscoveryError> {
        self.listings
            .iter()
            .find(|listing| &listing.id == listing_id)
            .ok_or_else(|| DiscoveryError::UnknownListing(listing_id.clone()))
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.criteria.criteria()
    }

    pub fn criteria_defaults(&self) -> &FilterCriteria {
        self.criteria.defaults()
    }

    pub fn price_bounds(&self) -> PriceBounds {
        self.criteria.bounds()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn active_selection(&self) -> Option<&ActiveSelection> {
        self.selection.active()
    }

    /// The selected listing's record, if it is still part of the loaded set.
    pub fn active_listing(&self) -> Option<&Listing> {
        let active = self.selection.active_id()?;
        self.listings.iter().find(|listing| &listing.id == active)
    }

    pub fn markers(&self) -> &[Marker] {
        self.synchronizer.markers()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.synchronizer.bounds()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn results_view(&self) -> ResultsView {
        ResultsView {
            total_count: self.listings.len(),
            matching_count: self.matching.len(),
            visible_count: self.visible.len(),
            search_query: self.search_query.clone(),
            listings: self.visible.clone(),
            active: self.selection.active().cloned(),
            last_refreshed: self.last_refreshed,
        }
    }

    pub fn set_partial(&mut self, patch: CriteriaPatch) -> bool {
        let changed = self.criteria.set_partial(patch);
        if changed {
            self.recompute_matching();
        }
        changed
    }

    pub fn reset_criteria(&mut self) -> bool {
        let changed = self.criteria.reset();
        if changed {
            self.recompute_matching();
        }
        changed
    }

    /// Re-runs only the text filter over the cached structured matches.
    pub fn set_search_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if query == self.search_query {
            return false;
        }
        self.search_query = query;
        self.recompute_visible();
        true
    }

    pub fn hover(&mut self, listing_id: Option<ListingId>) -> bool {
        let changed = self.selection.hover(listing_id);
        if changed {
            self.sync_map();
        }
        changed
    }

    pub fn click(&mut self, listing_id: Option<ListingId>) -> bool {
        let changed = self.selection.click(listing_id);
        if changed {
            self.sync_map();
        }
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        if changed {
            self.sync_map();
        }
        changed
    }

    /// Inbound marker click from the map; becomes a click selection.
    pub fn marker_clicked(&mut self, listing_id: &ListingId) -> Result<bool, DiscoveryError> {
        if !self.synchronizer.has_marker(listing_id) {
            return Err(DiscoveryError::UnknownListing(listing_id.clone()));
        }
        Ok(self.click(Some(listing_id.clone())))
    }

    /// Starts a fetch. Any token issued earlier becomes stale.
    pub fn begin_fetch(&mut self) -> FetchToken {
        self.latest_fetch += 1;
        FetchToken(self.latest_fetch)
    }

    /// Applies a fetch result if `token` is still the latest one issued.
    ///
    /// Stale results are discarded whether they succeeded or failed. A failure of the
    /// latest fetch is returned to the caller and the previous listings stay in place.
    pub fn apply_fetch(
        &mut self,
        token: FetchToken,
        result: Result<Vec<RawListing>, SourceError>,
    ) -> Result<FetchOutcome, DiscoveryError> {
        let latest = FetchToken(self.latest_fetch);
        if token != latest {
            warn!(
                token = token.generation(),
                latest = latest.generation(),
                "discarding superseded listing fetch"
            );
            return Ok(FetchOutcome::Superseded { token, latest });
        }

        match result {
            Ok(rows) => Ok(self.install(token, rows)),
            Err(err) => {
                warn!(
                    token = token.generation(),
                    error = %err,
                    retained = self.listings.len(),
                    "listing fetch failed; keeping previous listings"
                );
                Err(DiscoveryError::Source(err))
            }
        }
    }

    /// Fetches from `source` and applies the result.
    pub async fn refresh<S>(&mut self, source: &S) -> Result<FetchOutcome, DiscoveryError>
    where
        S: ListingSource + ?Sized,
    {
        let token = self.begin_fetch();
        let result = source.fetch_active_listings().await;
        self.apply_fetch(token, result)
    }

    /// Loads rows that are already in hand, superseding any fetch in flight.
    pub fn load(&mut self, rows: Vec<RawListing>) -> FetchOutcome {
        let token = self.begin_fetch();
        self.install(token, rows)
    }

    pub fn subscribe_criteria<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CriteriaChanged) + Send + 'static,
    {
        self.criteria.subscribe(listener)
    }

    pub fn unsubscribe_criteria(&mut self, id: SubscriptionId) -> bool {
        self.criteria.unsubscribe(id)
    }

    pub fn subscribe_selection<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SelectionChanged) + Send + 'static,
    {
        self.selection.subscribe(listener)
    }

    pub fn unsubscribe_selection(&mut self, id: SubscriptionId) -> bool {
        self.selection.unsubscribe(id)
    }

    pub fn subscribe_results<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ResultsChanged) + Send + 'static,
    {
        self.results.subscribe(listener)
    }

    pub fn unsubscribe_results(&mut self, id: SubscriptionId) -> bool {
        self.results.unsubscribe(id)
    }

    fn install(&mut self, token: FetchToken, rows: Vec<RawListing>) -> FetchOutcome {
        let (listings, skipped) = self.adapter.adapt_all(rows);
        info!(
            token = token.generation(),
            listings = listings.len(),
            skipped,
            "listing fetch applied"
        );

        let count = listings.len();
        self.listings = listings;
        self.last_refreshed = Some(Utc::now());
        self.recompute_matching();

        FetchOutcome::Applied {
            token,
            listings: count,
            skipped,
        }
    }

    fn recompute_matching(&mut self) {
        self.matching = match_listings(&self.listings, self.criteria.criteria());
        self.recompute_visible();
    }

    fn recompute_visible(&mut self) {
        self.visible = location_filter(&self.matching, &self.search_query);
        debug!(
            total = self.listings.len(),
            matching = self.matching.len(),
            visible = self.visible.len(),
            "results recomputed"
        );

        self.sync_map();
        let event = ResultsChanged {
            total_count: self.listings.len(),
            matching_count: self.matching.len(),
            visible_count: self.visible.len(),
        };
        self.results.emit(&event);
    }

    fn sync_map(&mut self) {
        self.synchronizer
            .sync(&mut self.map, &self.visible, self.selection.active_id());
    }
}
