//! Map marker derivation and synchronization.
//!
//! Markers mirror the visible listings 1:1 (minus listings without usable
//! coordinates). Each sync removes stale markers, places new or changed ones and
//! asks the backend to fit every marker in view. Clicks coming back from the map are
//! routed through the selection coordinator by the session; this module never
//! changes selection itself.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::listing::{Coordinates, Listing, ListingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerVariant {
    Default,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub listing_id: ListingId,
    pub coordinates: Coordinates,
    pub label: String,
    pub variant: MarkerVariant,
}

/// Smallest latitude/longitude box covering a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// `None` for an empty set: there is no region to fit.
    pub fn covering<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        points.into_iter().fold(None, |bounds, point| {
            Some(match bounds {
                None => Self {
                    south: point.latitude,
                    west: point.longitude,
                    north: point.latitude,
                    east: point.longitude,
                },
                Some(bounds) => Self {
                    south: bounds.south.min(point.latitude),
                    west: bounds.west.min(point.longitude),
                    north: bounds.north.max(point.latitude),
                    east: bounds.east.max(point.longitude),
                },
            })
        })
    }
}

/// Commands the discovery core issues to whatever draws the map.
///
/// Placing a marker for a listing already on the map replaces it.
pub trait MapBackend {
    fn place_marker(
        &mut self,
        listing_id: &ListingId,
        coordinates: Coordinates,
        label: &str,
        variant: MarkerVariant,
    );
    fn remove_marker(&mut self, listing_id: &ListingId);
    fn fit_bounds(&mut self, coordinates: &[Coordinates]);
}

/// Rent rounded to the nearest thousand, e.g. `₹15k`.
pub fn price_label(price: u32, currency_symbol: &str) -> String {
    let thousands = (u64::from(price) + 500) / 1_000;
    format!("{currency_symbol}{thousands}k")
}

/// Markers for `listings` in input order, skipping listings without valid coordinates.
pub fn derive_markers(
    listings: &[Listing],
    active: Option<&ListingId>,
    currency_symbol: &str,
) -> Vec<Marker> {
    listings
        .iter()
        .filter_map(|listing| {
            let coordinates = listing.valid_coordinates()?;
            let variant = if active == Some(&listing.id) {
                MarkerVariant::Selected
            } else {
                MarkerVariant::Default
            };
            Some(Marker {
                listing_id: listing.id.clone(),
                coordinates,
                label: price_label(listing.price, currency_symbol),
                variant,
            })
        })
        .collect()
}

/// What one synchronization pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub placed: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Listings kept off the map for lack of usable coordinates.
    pub excluded: usize,
    pub bounds: Option<Bounds>,
}

/// Keeps a [`MapBackend`] in step with the current listings and selection.
#[derive(Debug, Clone)]
pub struct MarkerSynchronizer {
    currency_symbol: String,
    markers: Vec<Marker>,
    bounds: Option<Bounds>,
}

impl MarkerSynchronizer {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
            markers: Vec::new(),
            bounds: None,
        }
    }

    /// Markers currently on the map, in listing order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn has_marker(&self, listing_id: &ListingId) -> bool {
        self.markers
            .iter()
            .any(|marker| &marker.listing_id == listing_id)
    }

    pub fn sync<B>(
        &mut self,
        backend: &mut B,
        listings: &[Listing],
        active: Option<&ListingId>,
    ) -> SyncReport
    where
        B: MapBackend + ?Sized,
    {
        let next = derive_markers(listings, active, &self.currency_symbol);
        let mut report = SyncReport {
            excluded: listings.len() - next.len(),
            ..SyncReport::default()
        };

        let next_ids: HashSet<&ListingId> = next.iter().map(|marker| &marker.listing_id).collect();
        for stale in self
            .markers
            .iter()
            .filter(|marker| !next_ids.contains(&marker.listing_id))
        {
            backend.remove_marker(&stale.listing_id);
            report.removed += 1;
        }

        let previous: HashMap<&ListingId, &Marker> = self
            .markers
            .iter()
            .map(|marker| (&marker.listing_id, marker))
            .collect();
        for marker in &next {
            if previous
                .get(&marker.listing_id)
                .is_some_and(|existing| *existing == marker)
            {
                report.unchanged += 1;
                continue;
            }
            backend.place_marker(
                &marker.listing_id,
                marker.coordinates,
                &marker.label,
                marker.variant,
            );
            report.placed += 1;
        }

        let points: Vec<Coordinates> = next.iter().map(|marker| marker.coordinates).collect();
        report.bounds = Bounds::covering(&points);
        if report.bounds.is_some() {
            backend.fit_bounds(&points);
        }

        debug!(
            placed = report.placed,
            removed = report.removed,
            excluded = report.excluded,
            fitted = report.bounds.is_some(),
            "map markers synchronized"
        );

        self.markers = next;
        self.bounds = report.bounds;
        report
    }
}

/// One command as issued to a [`MapBackend`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MapCommand {
    PlaceMarker {
        listing_id: ListingId,
        coordinates: Coordinates,
        label: String,
        variant: MarkerVariant,
    },
    RemoveMarker {
        listing_id: ListingId,
    },
    FitBounds {
        coordinates: Vec<Coordinates>,
    },
}

/// Backend that queues commands for a remote renderer to drain.
#[derive(Debug, Clone, Default)]
pub struct RecordingMapBackend {
    commands: Vec<MapCommand>,
}

impl RecordingMapBackend {
    pub fn commands(&self) -> &[MapCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<MapCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl MapBackend for RecordingMapBackend {
    fn place_marker(
        &mut self,
        listing_id: &ListingId,
        coordinates: Coordinates,
        label: &str,
        variant: MarkerVariant,
    ) {
        self.commands.push(MapCommand::PlaceMarker {
            listing_id: listing_id.clone(),
            coordinates,
            label: label.to_string(),
            variant,
        });
    }

    fn remove_marker(&mut self, listing_id: &ListingId) {
        self.commands.push(MapCommand::RemoveMarker {
            listing_id: listing_id.clone(),
        });
    }

    fn fit_bounds(&mut self, coordinates: &[Coordinates]) {
        self.commands.push(MapCommand::FitBounds {
            coordinates: coordinates.to_vec(),
        });
    }
}
