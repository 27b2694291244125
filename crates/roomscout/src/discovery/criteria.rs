use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::listing::{GenderPreference, Occupancy, PropertyType, UnknownVariant};
use super::notify::{Subscribers, SubscriptionId};

/// Slider limits for the price filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub floor: u32,
    pub ceiling: u32,
    pub step: u32,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            floor: 1_000,
            ceiling: 100_000,
            step: 1_000,
        }
    }
}

impl PriceBounds {
    pub fn new(floor: u32, ceiling: u32, step: u32) -> Option<Self> {
        (floor < ceiling && step > 0).then_some(Self {
            floor,
            ceiling,
            step,
        })
    }

    /// Clamps into `[floor, ceiling]` and snaps to the nearest step above the floor.
    pub fn quantize(&self, value: u32) -> u32 {
        let clamped = value.clamp(self.floor, self.ceiling);
        let step = u64::from(self.step);
        let offset = u64::from(clamped - self.floor);
        let snapped = u64::from(self.floor) + (offset + step / 2) / step * step;
        u32::try_from(snapped)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }

    /// Saturates an untrusted price into `u32` before it is quantized.
    pub fn saturate(value: i64) -> u32 {
        u32::try_from(value.max(0)).unwrap_or(u32::MAX)
    }

    /// Quantizes both ends and swaps them when they arrive inverted.
    pub fn normalize(&self, min: u32, max: u32) -> PriceRange {
        let (min, max) = (self.quantize(min), self.quantize(max));
        if min <= max {
            PriceRange { min, max }
        } else {
            PriceRange { min: max, max: min }
        }
    }
}

/// Inclusive monthly rent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    pub fn contains(&self, price: u32) -> bool {
        self.min <= price && price <= self.max
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropertyTypeFilter {
    #[default]
    All,
    Only(PropertyType),
}

impl FromStr for PropertyTypeFilter {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse().map(Self::Only)
    }
}

impl fmt::Display for PropertyTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(property_type) => f.write_str(property_type.label()),
        }
    }
}

impl TryFrom<String> for PropertyTypeFilter {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyTypeFilter> for String {
    fn from(value: PropertyTypeFilter) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GenderFilter {
    #[default]
    Any,
    Only(GenderPreference),
}

impl GenderFilter {
    /// Requesting `Any` is the wildcard, never a literal match on `Any`.
    pub fn only(preference: GenderPreference) -> Self {
        match preference {
            GenderPreference::Any => Self::Any,
            other => Self::Only(other),
        }
    }
}

impl FromStr for GenderFilter {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse().map(Self::only)
    }
}

impl fmt::Display for GenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any | Self::Only(GenderPreference::Any) => f.write_str("any"),
            Self::Only(preference) => f.write_str(preference.label()),
        }
    }
}

impl TryFrom<String> for GenderFilter {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GenderFilter> for String {
    fn from(value: GenderFilter) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OccupancyFilter {
    #[default]
    Any,
    Only(Occupancy),
}

impl OccupancyFilter {
    pub fn only(occupancy: Occupancy) -> Self {
        match occupancy {
            Occupancy::Any => Self::Any,
            other => Self::Only(other),
        }
    }
}

impl FromStr for OccupancyFilter {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse().map(Self::only)
    }
}

impl fmt::Display for OccupancyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any | Self::Only(Occupancy::Any) => f.write_str("any"),
            Self::Only(occupancy) => f.write_str(occupancy.label()),
        }
    }
}

impl TryFrom<String> for OccupancyFilter {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OccupancyFilter> for String {
    fn from(value: OccupancyFilter) -> Self {
        value.to_string()
    }
}

/// Complete filter state. Always total: every field carries a value or its wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub price_range: PriceRange,
    pub amenities: BTreeSet<String>,
    pub property_type: PropertyTypeFilter,
    pub gender_preference: GenderFilter,
    pub occupancy: OccupancyFilter,
    pub verified_only: bool,
    pub location_query: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            price_range: PriceRange {
                min: 5_000,
                max: 50_000,
            },
            amenities: BTreeSet::new(),
            property_type: PropertyTypeFilter::All,
            gender_preference: GenderFilter::Any,
            occupancy: OccupancyFilter::Any,
            verified_only: false,
            location_query: String::new(),
        }
    }
}

/// Named fields to merge into the live criteria; absent fields are left untouched.
///
/// Prices are signed so that out-of-range input is clamped by the store rather than
/// failing to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaPatch {
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub amenities: Option<BTreeSet<String>>,
    pub property_type: Option<PropertyTypeFilter>,
    pub gender_preference: Option<GenderFilter>,
    pub occupancy: Option<OccupancyFilter>,
    pub verified_only: Option<bool>,
    pub location_query: Option<String>,
}

impl CriteriaPatch {
    pub fn price_range(min: u32, max: u32) -> Self {
        Self {
            price_min: Some(i64::from(min)),
            price_max: Some(i64::from(max)),
            ..Self::default()
        }
    }

    pub fn amenities<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            amenities: Some(tags.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Notification sent after the live criteria changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriteriaChanged {
    pub revision: u64,
    pub criteria: FilterCriteria,
}

/// Holds the single live [`FilterCriteria`] and keeps it valid across partial updates.
#[derive(Debug)]
pub struct CriteriaStore {
    bounds: PriceBounds,
    initial: FilterCriteria,
    current: FilterCriteria,
    revision: u64,
    subscribers: Subscribers<CriteriaChanged>,
}

impl Default for CriteriaStore {
    fn default() -> Self {
        Self::new(PriceBounds::default())
    }
}

impl CriteriaStore {
    pub fn new(bounds: PriceBounds) -> Self {
        let mut initial = FilterCriteria::default();
        initial.price_range = bounds.normalize(initial.price_range.min, initial.price_range.max);

        Self {
            bounds,
            current: initial.clone(),
            initial,
            revision: 0,
            subscribers: Subscribers::default(),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.current
    }

    /// The value `reset` restores.
    pub fn defaults(&self) -> &FilterCriteria {
        &self.initial
    }

    pub fn bounds(&self) -> PriceBounds {
        self.bounds
    }

    /// Incremented on every effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Merges the patch and re-validates the price range. Returns whether anything changed.
    pub fn set_partial(&mut self, patch: CriteriaPatch) -> bool {
        let CriteriaPatch {
            price_min,
            price_max,
            amenities,
            property_type,
            gender_preference,
            occupancy,
            verified_only,
            location_query,
        } = patch;

        let mut next = self.current.clone();
        let min = price_min.map_or(next.price_range.min, PriceBounds::saturate);
        let max = price_max.map_or(next.price_range.max, PriceBounds::saturate);
        next.price_range = self.bounds.normalize(min, max);

        if let Some(amenities) = amenities {
            next.amenities = amenities;
        }
        if let Some(property_type) = property_type {
            next.property_type = property_type;
        }
        if let Some(gender_preference) = gender_preference {
            next.gender_preference = gender_preference;
        }
        if let Some(occupancy) = occupancy {
            next.occupancy = occupancy;
        }
        if let Some(verified_only) = verified_only {
            next.verified_only = verified_only;
        }
        if let Some(location_query) = location_query {
            next.location_query = location_query;
        }

        self.commit(next)
    }

    pub fn reset(&mut self) -> bool {
        self.commit(self.initial.clone())
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&CriteriaChanged) + Send + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn commit(&mut self, next: FilterCriteria) -> bool {
        if next == self.current {
            return false;
        }

        self.current = next;
        self.revision += 1;
        debug!(revision = self.revision, "criteria updated");

        let event = CriteriaChanged {
            revision: self.revision,
            criteria: self.current.clone(),
        };
        self.subscribers.emit(&event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn quantize_clamps_and_snaps() {
        let bounds = PriceBounds::default();
        assert_eq!(bounds.quantize(0), 1_000);
        assert_eq!(bounds.quantize(250_000), 100_000);
        assert_eq!(bounds.quantize(15_400), 15_000);
        assert_eq!(bounds.quantize(15_500), 16_000);
        assert_eq!(bounds.quantize(20_000), 20_000);
    }

    #[test]
    fn quantize_never_exceeds_off_grid_ceiling() {
        let bounds = PriceBounds::new(1_000, 10_500, 1_000).expect("valid bounds");
        assert_eq!(bounds.quantize(10_400), 10_000);
        assert_eq!(bounds.quantize(u32::MAX), 10_500);
    }

    #[test]
    fn bounds_reject_degenerate_configuration() {
        assert!(PriceBounds::new(5_000, 5_000, 1_000).is_none());
        assert!(PriceBounds::new(1_000, 5_000, 0).is_none());
    }

    #[test]
    fn inverted_partial_update_is_swapped() {
        let mut store = CriteriaStore::default();
        store.set_partial(CriteriaPatch {
            price_min: Some(60_000),
            ..CriteriaPatch::default()
        });

        assert_eq!(
            store.criteria().price_range,
            PriceRange {
                min: 50_000,
                max: 60_000
            }
        );
    }

    #[test]
    fn out_of_range_patch_prices_are_clamped() {
        let mut store = CriteriaStore::default();
        assert!(store.set_partial(CriteriaPatch {
            price_min: Some(-500),
            ..CriteriaPatch::default()
        }));
        assert_eq!(store.criteria().price_range.min, 1_000);

        store.set_partial(CriteriaPatch {
            price_max: Some(5_000_000_000),
            ..CriteriaPatch::default()
        });
        assert_eq!(
            store.criteria().price_range,
            PriceRange {
                min: 1_000,
                max: 100_000
            }
        );

        let patch: CriteriaPatch =
            serde_json::from_str(r#"{"price_min": -500, "price_max": 5000000000}"#)
                .expect("signed prices decode");
        assert_eq!(patch.price_min, Some(-500));
        assert_eq!(patch.price_max, Some(5_000_000_000));
    }

    #[test]
    fn set_partial_keeps_untouched_fields() {
        let mut store = CriteriaStore::default();
        store.set_partial(CriteriaPatch {
            verified_only: Some(true),
            property_type: Some(PropertyTypeFilter::Only(PropertyType::Studio)),
            ..CriteriaPatch::default()
        });
        store.set_partial(CriteriaPatch::amenities(["WiFi", "Gym"]));

        let criteria = store.criteria();
        assert!(criteria.verified_only);
        assert_eq!(
            criteria.property_type,
            PropertyTypeFilter::Only(PropertyType::Studio)
        );
        assert_eq!(criteria.amenities.len(), 2);
        assert_eq!(criteria.price_range, FilterCriteria::default().price_range);
    }

    #[test]
    fn reset_restores_defaults_after_any_mutation() {
        let mut store = CriteriaStore::default();
        store.set_partial(CriteriaPatch {
            price_min: Some(2_000),
            price_max: Some(99_000),
            amenities: Some(["Parking".to_string()].into()),
            gender_preference: Some(GenderFilter::Only(GenderPreference::Female)),
            occupancy: Some(OccupancyFilter::Only(Occupancy::Triple)),
            verified_only: Some(true),
            location_query: Some("Indiranagar".to_string()),
            ..CriteriaPatch::default()
        });

        assert!(store.reset());
        assert_eq!(store.criteria(), &FilterCriteria::default());
        assert!(!store.reset());
    }

    #[test]
    fn notifies_only_on_effective_change() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut store = CriteriaStore::default();
        let sink = events.clone();
        store.subscribe(move |event| sink.lock().expect("events mutex").push(event.revision));

        assert!(store.set_partial(CriteriaPatch::price_range(10_000, 20_000)));
        assert!(!store.set_partial(CriteriaPatch::price_range(10_000, 20_000)));
        assert!(!store.set_partial(CriteriaPatch::default()));
        assert!(store.reset());

        assert_eq!(*events.lock().expect("events mutex"), vec![1, 2]);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn wildcard_filters_parse_from_strings() {
        assert_eq!(
            "all".parse::<PropertyTypeFilter>(),
            Ok(PropertyTypeFilter::All)
        );
        assert_eq!(
            "Apartment".parse::<PropertyTypeFilter>(),
            Ok(PropertyTypeFilter::Only(PropertyType::Apartment))
        );
        assert_eq!("ANY".parse::<GenderFilter>(), Ok(GenderFilter::Any));
        assert_eq!(
            "male".parse::<GenderFilter>(),
            Ok(GenderFilter::Only(GenderPreference::Male))
        );
        assert_eq!("any".parse::<OccupancyFilter>(), Ok(OccupancyFilter::Any));
        assert!("everything".parse::<PropertyTypeFilter>().is_err());
    }

    #[test]
    fn patch_json_rejects_unknown_fields() {
        let patch: CriteriaPatch = serde_json::from_str(
            r#"{"price_max": 30000, "property_type": "PG", "gender_preference": "any"}"#,
        )
        .expect("patch parses");
        assert_eq!(patch.price_max, Some(30_000));
        assert_eq!(
            patch.property_type,
            Some(PropertyTypeFilter::Only(PropertyType::Pg))
        );

        let typo = serde_json::from_str::<CriteriaPatch>(r#"{"verifed_only": true}"#);
        assert!(typo.is_err());

        let bad_value = serde_json::from_str::<CriteriaPatch>(r#"{"occupancy": "quad"}"#);
        assert!(bad_value.is_err());
    }
}
