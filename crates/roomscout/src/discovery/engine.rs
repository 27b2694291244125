//! Structured filtering of listings against a [`FilterCriteria`].
//!
//! A listing is kept only when every predicate holds: price window (inclusive),
//! property type, gender preference, occupancy, verification, amenities (all
//! requested tags present) and the criteria's own location text. Output keeps the
//! input order; nothing is re-sorted.

use super::criteria::{FilterCriteria, GenderFilter, OccupancyFilter, PropertyTypeFilter};
use super::listing::{GenderPreference, Listing, Occupancy, PropertyType};
use super::location::LocationQuery;

/// Returns the listings satisfying every criterion, in their original order.
pub fn match_listings(listings: &[Listing], criteria: &FilterCriteria) -> Vec<Listing> {
    let query = LocationQuery::new(&criteria.location_query);
    listings
        .iter()
        .filter(|listing| matches_with(listing, criteria, &query))
        .cloned()
        .collect()
}

/// Single-listing form of [`match_listings`].
pub fn matches(listing: &Listing, criteria: &FilterCriteria) -> bool {
    matches_with(listing, criteria, &LocationQuery::new(&criteria.location_query))
}

fn matches_with(listing: &Listing, criteria: &FilterCriteria, query: &LocationQuery) -> bool {
    criteria.price_range.contains(listing.price)
        && property_type_accepts(criteria.property_type, listing.property_type)
        && gender_accepts(criteria.gender_preference, listing.gender_preference)
        && occupancy_accepts(criteria.occupancy, listing.occupancy)
        && (!criteria.verified_only || listing.verified)
        && criteria
            .amenities
            .iter()
            .all(|tag| listing.has_amenity(tag))
        && query.matches(listing)
}

fn property_type_accepts(filter: PropertyTypeFilter, listing: PropertyType) -> bool {
    match filter {
        PropertyTypeFilter::All => true,
        PropertyTypeFilter::Only(wanted) => wanted == listing,
    }
}

// A listing open to any gender satisfies every request.
fn gender_accepts(filter: GenderFilter, listing: GenderPreference) -> bool {
    match filter {
        GenderFilter::Any | GenderFilter::Only(GenderPreference::Any) => true,
        GenderFilter::Only(wanted) => listing == GenderPreference::Any || listing == wanted,
    }
}

// Unlike gender, an `Any` listing (including one with no occupancy on record) only
// satisfies the wildcard.
fn occupancy_accepts(filter: OccupancyFilter, listing: Occupancy) -> bool {
    match filter {
        OccupancyFilter::Any | OccupancyFilter::Only(Occupancy::Any) => true,
        OccupancyFilter::Only(wanted) => listing == wanted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::criteria::PriceRange;
    use crate::discovery::listing::ListingId;

    fn listing(id: &str, price: u32) -> Listing {
        Listing {
            id: ListingId::from(id),
            title: format!("Listing {id}"),
            location_label: "Bangalore".to_string(),
            price,
            property_type: PropertyType::Room,
            gender_preference: GenderPreference::Any,
            occupancy: Occupancy::Any,
            verified: false,
            amenities: Default::default(),
            coordinates: None,
            available_from: None,
            image: None,
        }
    }

    fn wide_open() -> FilterCriteria {
        FilterCriteria {
            price_range: PriceRange {
                min: 1_000,
                max: 100_000,
            },
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let criteria = FilterCriteria {
            price_range: PriceRange {
                min: 10_000,
                max: 20_000,
            },
            ..FilterCriteria::default()
        };

        assert!(matches(&listing("min", 10_000), &criteria));
        assert!(matches(&listing("max", 20_000), &criteria));
        assert!(!matches(&listing("below", 9_999), &criteria));
        assert!(!matches(&listing("above", 20_001), &criteria));
    }

    #[test]
    fn property_type_wildcard_and_exact() {
        let mut studio = listing("s", 12_000);
        studio.property_type = PropertyType::Studio;

        let mut criteria = wide_open();
        assert!(matches(&studio, &criteria));

        criteria.property_type = PropertyTypeFilter::Only(PropertyType::Studio);
        assert!(matches(&studio, &criteria));

        criteria.property_type = PropertyTypeFilter::Only(PropertyType::Pg);
        assert!(!matches(&studio, &criteria));
    }

    #[test]
    fn gender_any_listing_matches_every_request() {
        let open = listing("open", 12_000);
        let mut criteria = wide_open();

        for filter in [
            GenderFilter::Any,
            GenderFilter::Only(GenderPreference::Male),
            GenderFilter::Only(GenderPreference::Female),
        ] {
            criteria.gender_preference = filter;
            assert!(matches(&open, &criteria), "{filter} should match");
        }
    }

    #[test]
    fn gender_specific_listing_needs_same_or_wildcard() {
        let mut male_only = listing("m", 12_000);
        male_only.gender_preference = GenderPreference::Male;
        let mut criteria = wide_open();

        assert!(matches(&male_only, &criteria));
        criteria.gender_preference = GenderFilter::Only(GenderPreference::Male);
        assert!(matches(&male_only, &criteria));
        criteria.gender_preference = GenderFilter::Only(GenderPreference::Female);
        assert!(!matches(&male_only, &criteria));
    }

    #[test]
    fn occupancy_unknown_only_matches_wildcard() {
        let unknown = listing("u", 12_000);
        let mut double = listing("d", 12_000);
        double.occupancy = Occupancy::Double;
        let mut criteria = wide_open();

        assert!(matches(&unknown, &criteria));
        assert!(matches(&double, &criteria));

        criteria.occupancy = OccupancyFilter::Only(Occupancy::Double);
        assert!(!matches(&unknown, &criteria));
        assert!(matches(&double, &criteria));
    }

    #[test]
    fn verified_only_drops_unverified() {
        let mut verified = listing("v", 12_000);
        verified.verified = true;
        let unverified = listing("n", 12_000);

        let criteria = FilterCriteria {
            verified_only: true,
            ..wide_open()
        };
        assert!(matches(&verified, &criteria));
        assert!(!matches(&unverified, &criteria));
    }

    #[test]
    fn amenities_use_and_semantics() {
        let mut equipped = listing("e", 12_000);
        equipped.amenities = ["WiFi".to_string(), "AC".to_string()].into();

        let mut criteria = wide_open();
        assert!(matches(&equipped, &criteria));

        criteria.amenities = ["WiFi".to_string()].into();
        assert!(matches(&equipped, &criteria));

        criteria.amenities = ["WiFi".to_string(), "Parking".to_string()].into();
        assert!(!matches(&equipped, &criteria));
    }

    #[test]
    fn unknown_amenity_yields_no_matches() {
        let listings = vec![listing("a", 12_000), listing("b", 14_000)];
        let criteria = FilterCriteria {
            amenities: ["Helipad".to_string()].into(),
            ..wide_open()
        };
        assert!(match_listings(&listings, &criteria).is_empty());
    }

    #[test]
    fn location_query_is_part_of_the_criteria() {
        let mut hsr = listing("h", 12_000);
        hsr.location_label = "HSR Layout".to_string();
        let listings = vec![listing("a", 12_000), hsr];

        let criteria = FilterCriteria {
            location_query: "  hsr ".to_string(),
            ..wide_open()
        };
        let matched = match_listings(&listings, &criteria);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id.as_str(), "h");
    }

    #[test]
    fn output_preserves_input_order() {
        let listings = vec![
            listing("c", 30_000),
            listing("a", 10_000),
            listing("x", 500),
            listing("b", 20_000),
        ];
        let matched = match_listings(&listings, &wide_open());
        let ids: Vec<&str> = matched.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
