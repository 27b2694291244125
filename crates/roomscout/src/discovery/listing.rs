use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Opaque listing identifier assigned by the data source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "PG")]
    Pg,
    Room,
    Apartment,
    Studio,
    House,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pg => "PG",
            Self::Room => "Room",
            Self::Apartment => "Apartment",
            Self::Studio => "Studio",
            Self::House => "House",
        }
    }
}

impl FromStr for PropertyType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pg" => Ok(Self::Pg),
            "room" => Ok(Self::Room),
            "apartment" => Ok(Self::Apartment),
            "studio" => Ok(Self::Studio),
            "house" => Ok(Self::House),
            _ => Err(UnknownVariant {
                kind: "property type",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenderPreference {
    Male,
    Female,
    Any,
}

impl GenderPreference {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Any => "Any",
        }
    }
}

impl FromStr for GenderPreference {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "any" => Ok(Self::Any),
            _ => Err(UnknownVariant {
                kind: "gender preference",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occupancy {
    Single,
    Double,
    Triple,
    #[default]
    Any,
}

impl Occupancy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Triple => "Triple",
            Self::Any => "Any",
        }
    }
}

impl FromStr for Occupancy {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            "triple" => Ok(Self::Triple),
            "any" => Ok(Self::Any),
            _ => Err(UnknownVariant {
                kind: "occupancy",
                value: value.to_string(),
            }),
        }
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Immutable snapshot of one rental listing as seen by a filtering pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub location_label: String,
    pub price: u32,
    pub property_type: PropertyType,
    pub gender_preference: GenderPreference,
    pub occupancy: Occupancy,
    pub verified: bool,
    pub amenities: BTreeSet<String>,
    /// `None` when the source supplied unusable coordinates; such listings stay off the map.
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Listing {
    pub fn has_amenity(&self, tag: &str) -> bool {
        self.amenities.contains(tag)
    }

    pub fn valid_coordinates(&self) -> Option<Coordinates> {
        self.coordinates.filter(Coordinates::is_valid)
    }
}

/// Publication state of a row. Values the source invents later decode as `Unrecognized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ListingStatus {
    Active,
    Inactive,
    Pending,
    Unrecognized,
}

impl From<String> for ListingStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "pending" => Self::Pending,
            _ => Self::Unrecognized,
        }
    }
}

/// Row shape published by the property data source. Optional columns may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub id: String,
    pub title: String,
    pub location: String,
    /// Typed as a plain number upstream; the adapter decides whether it is usable.
    pub price_per_month: f64,
    pub property_type: String,
    #[serde(default)]
    pub gender_preference: Option<String>,
    #[serde(default)]
    pub occupancy: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<ListingStatus>,
}

impl RawListing {
    /// Rows without a status predate the status column and count as active.
    pub fn is_active(&self) -> bool {
        matches!(self.status, None | Some(ListingStatus::Active))
    }
}

/// Spread of fallback positions around the map centre, in degrees.
const FALLBACK_SPREAD: f64 = 0.1;

/// Converts raw source rows into [`Listing`] values, substituting documented defaults.
#[derive(Debug, Clone)]
pub struct ListingAdapter {
    map_center: Coordinates,
}

impl ListingAdapter {
    pub fn new(map_center: Coordinates) -> Self {
        Self { map_center }
    }

    pub fn adapt(&self, raw: RawListing) -> Option<Listing> {
        let property_type = match raw.property_type.parse::<PropertyType>() {
            Ok(property_type) => property_type,
            Err(err) => {
                warn!(listing = %raw.id, %err, "skipping listing with unsupported type");
                return None;
            }
        };

        let Some(price) = whole_price(raw.price_per_month) else {
            warn!(listing = %raw.id, price = raw.price_per_month, "skipping listing with unusable price");
            return None;
        };

        let gender_preference = parse_or_any(&raw.id, raw.gender_preference.as_deref())
            .unwrap_or(GenderPreference::Any);
        let occupancy: Occupancy =
            parse_or_any(&raw.id, raw.occupancy.as_deref()).unwrap_or_default();
        let coordinates = self.resolve_coordinates(&raw.id, raw.latitude, raw.longitude);

        Some(Listing {
            id: ListingId(raw.id),
            title: raw.title,
            location_label: raw.location,
            price,
            property_type,
            gender_preference,
            occupancy,
            verified: raw.verified.unwrap_or(false),
            amenities: raw.amenities.unwrap_or_default().into_iter().collect(),
            coordinates,
            available_from: raw.available_from,
            image: raw.images.and_then(|images| images.into_iter().next()),
        })
    }

    /// Adapts a batch, preserving order. Returns the listings and the count of skipped rows.
    pub fn adapt_all(&self, rows: Vec<RawListing>) -> (Vec<Listing>, usize) {
        let total = rows.len();
        let listings: Vec<Listing> = rows.into_iter().filter_map(|raw| self.adapt(raw)).collect();
        let skipped = total - listings.len();
        (listings, skipped)
    }

    fn resolve_coordinates(
        &self,
        id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Option<Coordinates> {
        match (latitude, longitude) {
            (None, None) => Some(self.fallback_coordinates(id)),
            (Some(latitude), Some(longitude)) => {
                Some(Coordinates::new(latitude, longitude)).filter(Coordinates::is_valid)
            }
            _ => None,
        }
    }

    /// Stable position near the map centre derived from the listing id.
    pub fn fallback_coordinates(&self, id: &str) -> Coordinates {
        let hash = fnv1a(id.as_bytes());
        let lat_unit = (hash & 0xffff_ffff) as f64 / u32::MAX as f64;
        let lng_unit = (hash >> 32) as f64 / u32::MAX as f64;
        Coordinates::new(
            self.map_center.latitude + (lat_unit - 0.5) * FALLBACK_SPREAD,
            self.map_center.longitude + (lng_unit - 0.5) * FALLBACK_SPREAD,
        )
    }
}

/// Whole, non-negative rent that fits the listing price type.
fn whole_price(value: f64) -> Option<u32> {
    let usable = value.is_finite()
        && value.fract() == 0.0
        && (0.0..=f64::from(u32::MAX)).contains(&value);
    usable.then_some(value as u32)
}

fn parse_or_any<T>(id: &str, raw: Option<&str>) -> Option<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(listing = %id, %err, "treating unrecognised value as Any");
            None
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |acc, byte| {
        (acc ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ListingAdapter {
        ListingAdapter::new(Coordinates::new(12.9716, 77.5946))
    }

    fn raw(id: &str) -> RawListing {
        RawListing {
            id: id.to_string(),
            title: "Sunny PG near Koramangala".to_string(),
            location: "Koramangala, Bangalore".to_string(),
            price_per_month: 12_000.0,
            property_type: "PG".to_string(),
            gender_preference: Some("Female".to_string()),
            occupancy: Some("Double".to_string()),
            verified: Some(true),
            amenities: Some(vec!["WiFi".to_string(), "AC".to_string()]),
            latitude: Some(12.9352),
            longitude: Some(77.6245),
            images: Some(vec!["/img/1.jpg".to_string(), "/img/2.jpg".to_string()]),
            available_from: None,
            status: Some(ListingStatus::Active),
        }
    }

    #[test]
    fn adapt_maps_every_field() {
        let listing = adapter().adapt(raw("p-1")).expect("listing adapts");

        assert_eq!(listing.id, ListingId::from("p-1"));
        assert_eq!(listing.price, 12_000);
        assert_eq!(listing.property_type, PropertyType::Pg);
        assert_eq!(listing.gender_preference, GenderPreference::Female);
        assert_eq!(listing.occupancy, Occupancy::Double);
        assert!(listing.verified);
        assert!(listing.has_amenity("WiFi") && listing.has_amenity("AC"));
        assert_eq!(listing.coordinates, Some(Coordinates::new(12.9352, 77.6245)));
        assert_eq!(listing.image.as_deref(), Some("/img/1.jpg"));
    }

    #[test]
    fn missing_optional_fields_get_defaults() {
        let mut row = raw("p-2");
        row.gender_preference = None;
        row.occupancy = None;
        row.verified = None;
        row.amenities = None;
        row.images = None;

        let listing = adapter().adapt(row).expect("listing adapts");
        assert_eq!(listing.gender_preference, GenderPreference::Any);
        assert_eq!(listing.occupancy, Occupancy::Any);
        assert!(!listing.verified);
        assert!(listing.amenities.is_empty());
        assert!(listing.image.is_none());
    }

    #[test]
    fn fallback_coordinates_are_deterministic_and_near_centre() {
        let mut row = raw("p-3");
        row.latitude = None;
        row.longitude = None;

        let first = adapter().adapt(row.clone()).expect("adapts");
        let second = adapter().adapt(row).expect("adapts");
        let coords = first.coordinates.expect("fallback assigned");

        assert_eq!(first.coordinates, second.coordinates);
        assert!((coords.latitude - 12.9716).abs() <= 0.05);
        assert!((coords.longitude - 77.5946).abs() <= 0.05);
    }

    #[test]
    fn partial_or_invalid_coordinates_stay_unset() {
        let mut half = raw("p-4");
        half.longitude = None;
        assert!(adapter().adapt(half).expect("adapts").coordinates.is_none());

        let mut broken = raw("p-5");
        broken.latitude = Some(f64::NAN);
        assert!(adapter().adapt(broken).expect("adapts").coordinates.is_none());

        let mut out_of_range = raw("p-6");
        out_of_range.latitude = Some(123.0);
        assert!(adapter()
            .adapt(out_of_range)
            .expect("adapts")
            .coordinates
            .is_none());
    }

    #[test]
    fn unsupported_rows_are_skipped() {
        let mut unknown_type = raw("p-7");
        unknown_type.property_type = "Castle".to_string();
        let mut negative_price = raw("p-8");
        negative_price.price_per_month = -1.0;
        let mut fractional_price = raw("p-10");
        fractional_price.price_per_month = 9_000.5;

        let (listings, skipped) = adapter().adapt_all(vec![
            unknown_type,
            raw("p-9"),
            negative_price,
            fractional_price,
        ]);
        assert_eq!(skipped, 3);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id.as_str(), "p-9");
    }

    #[test]
    fn unknown_status_is_not_active() {
        let row: RawListing = serde_json::from_value(serde_json::json!({
            "id": "p-11", "title": "Old flat", "location": "Hebbal",
            "price_per_month": 30000, "property_type": "Apartment", "status": "archived"
        }))
        .expect("row decodes");

        assert_eq!(row.status, Some(ListingStatus::Unrecognized));
        assert!(!row.is_active());
        assert_eq!(row.price_per_month, 30_000.0);
        assert_eq!(ListingStatus::from(" Pending ".to_string()), ListingStatus::Pending);
    }

    #[test]
    fn enum_parsing_is_case_insensitive() {
        assert_eq!("pg".parse::<PropertyType>(), Ok(PropertyType::Pg));
        assert_eq!("APARTMENT".parse::<PropertyType>(), Ok(PropertyType::Apartment));
        assert_eq!("female".parse::<GenderPreference>(), Ok(GenderPreference::Female));
        assert_eq!(" Triple ".parse::<Occupancy>(), Ok(Occupancy::Triple));
        assert!("loft".parse::<PropertyType>().is_err());
    }
}
