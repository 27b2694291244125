use crate::infra::{listing_source, Session};
use clap::Args;
use roomscout::config::{AppConfig, DiscoveryConfig};
use roomscout::discovery::{
    CriteriaPatch, DiscoverySession, GenderFilter, Listing, OccupancyFilter, PropertyTypeFilter,
    RecordingMapBackend,
};
use roomscout::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct SearchArgs {
    /// JSON export of listing rows (defaults to APP_LISTINGS_PATH or the bundled catalog)
    #[arg(long)]
    pub(crate) listings: Option<PathBuf>,
    /// Lowest monthly rent to include
    #[arg(long)]
    pub(crate) min_price: Option<u32>,
    /// Highest monthly rent to include
    #[arg(long)]
    pub(crate) max_price: Option<u32>,
    /// Required amenity; repeat for several (all must be present)
    #[arg(long = "amenity")]
    pub(crate) amenities: Vec<String>,
    /// PG, Room, Apartment, Studio, House or all
    #[arg(long)]
    pub(crate) property_type: Option<PropertyTypeFilter>,
    /// Male, Female or any
    #[arg(long)]
    pub(crate) gender: Option<GenderFilter>,
    /// Single, Double, Triple or any
    #[arg(long)]
    pub(crate) occupancy: Option<OccupancyFilter>,
    /// Only show verified listings
    #[arg(long)]
    pub(crate) verified_only: bool,
    /// Free-text match against title and location
    #[arg(long)]
    pub(crate) query: Option<String>,
    /// Also print map markers and bounds
    #[arg(long)]
    pub(crate) markers: bool,
}

impl SearchArgs {
    fn criteria_patch(&self) -> CriteriaPatch {
        CriteriaPatch {
            price_min: self.min_price.map(i64::from),
            price_max: self.max_price.map(i64::from),
            amenities: (!self.amenities.is_empty())
                .then(|| self.amenities.iter().cloned().collect()),
            property_type: self.property_type,
            gender_preference: self.gender,
            occupancy: self.occupancy,
            verified_only: self.verified_only.then_some(true),
            location_query: None,
        }
    }
}

pub(crate) async fn run_search(mut args: SearchArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = args.listings.take() {
        config.discovery.listings_path = Some(path);
    }

    let session = search_session(&config.discovery, &args).await?;
    render_results(&session, &config.discovery.currency_symbol, args.markers);
    Ok(())
}

pub(crate) async fn search_session(
    config: &DiscoveryConfig,
    args: &SearchArgs,
) -> Result<Session, AppError> {
    let source = listing_source(config);
    let mut session = DiscoverySession::new(config, RecordingMapBackend::default());
    session.refresh(source.as_ref()).await?;

    session.set_partial(args.criteria_patch());
    if let Some(query) = &args.query {
        session.set_search_query(query.clone());
    }
    Ok(session)
}

fn render_results(session: &Session, currency_symbol: &str, show_markers: bool) {
    let criteria = session.criteria();
    println!(
        "RoomScout search: {} of {} listings ({} match the filters)",
        session.visible().len(),
        session.listings().len(),
        session.matching().len()
    );
    println!(
        "Filters: {}{}-{}{} | type {} | gender {} | occupancy {}{}",
        currency_symbol,
        criteria.price_range.min,
        currency_symbol,
        criteria.price_range.max,
        criteria.property_type,
        criteria.gender_preference,
        criteria.occupancy,
        if criteria.verified_only {
            " | verified only"
        } else {
            ""
        }
    );
    if !criteria.amenities.is_empty() {
        let amenities: Vec<&str> = criteria.amenities.iter().map(String::as_str).collect();
        println!("Amenities: {}", amenities.join(", "));
    }
    if !session.search_query().trim().is_empty() {
        println!("Search: \"{}\"", session.search_query().trim());
    }

    if session.visible().is_empty() {
        println!("\nNo listings match. Try widening the price range or removing amenities.");
        return;
    }

    println!();
    for listing in session.visible() {
        println!("{}", listing_line(listing, currency_symbol));
    }

    if show_markers {
        println!("\nMap markers");
        for marker in session.markers() {
            println!(
                "  - {} {} at ({:.4}, {:.4}){}",
                marker.listing_id,
                marker.label,
                marker.coordinates.latitude,
                marker.coordinates.longitude,
                if marker.variant == roomscout::discovery::MarkerVariant::Selected {
                    " [selected]"
                } else {
                    ""
                }
            );
        }
        let hidden = session.visible().len() - session.markers().len();
        if hidden > 0 {
            println!("  ({hidden} listing(s) without usable coordinates are not mapped)");
        }
        match session.bounds() {
            Some(bounds) => println!(
                "Bounds: south {:.4}, west {:.4}, north {:.4}, east {:.4}",
                bounds.south, bounds.west, bounds.north, bounds.east
            ),
            None => println!("Bounds: none"),
        }
    }
}

fn listing_line(listing: &Listing, currency_symbol: &str) -> String {
    let amenities: Vec<&str> = listing.amenities.iter().map(String::as_str).collect();
    format!(
        "- [{}] {} | {} | {}{}/month | {} | {} | {} | {}{}",
        listing.id,
        listing.title,
        listing.location_label,
        currency_symbol,
        listing.price,
        listing.property_type.label(),
        listing.gender_preference.label(),
        listing.occupancy.label(),
        if listing.verified {
            "verified"
        } else {
            "unverified"
        },
        if amenities.is_empty() {
            String::new()
        } else {
            format!(" | {}", amenities.join(", "))
        }
    )
}
