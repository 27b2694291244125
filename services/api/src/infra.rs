use metrics_exporter_prometheus::PrometheusHandle;
use roomscout::config::DiscoveryConfig;
use roomscout::discovery::{
    DiscoveryError, DiscoverySession, FetchOutcome, JsonFileSource, ListingSource, ListingStatus,
    RawListing, RecordingMapBackend, StaticListingSource,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Session = DiscoverySession<RecordingMapBackend>;

/// Shared discovery state: one session behind one lock, plus the listing source.
#[derive(Clone)]
pub(crate) struct DiscoveryState {
    session: Arc<Mutex<Session>>,
    source: Arc<dyn ListingSource>,
}

impl DiscoveryState {
    pub(crate) fn new(config: &DiscoveryConfig, source: Arc<dyn ListingSource>) -> Self {
        Self {
            session: Arc::new(Mutex::new(DiscoverySession::new(
                config,
                RecordingMapBackend::default(),
            ))),
            source,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().expect("discovery session mutex poisoned")
    }

    /// The fetch itself runs without holding the session lock.
    pub(crate) async fn refresh(&self) -> Result<FetchOutcome, DiscoveryError> {
        let token = self.lock().begin_fetch();
        let result = self.source.fetch_active_listings().await;
        self.lock().apply_fetch(token, result)
    }
}

pub(crate) fn listing_source(config: &DiscoveryConfig) -> Arc<dyn ListingSource> {
    match &config.listings_path {
        Some(path) => {
            info!(path = %path.display(), "reading listings from JSON export");
            Arc::new(JsonFileSource::new(path.clone()))
        }
        None => {
            info!("no listings path configured; serving the bundled catalog");
            Arc::new(StaticListingSource::new(sample_catalog()))
        }
    }
}

struct SampleRow {
    id: &'static str,
    title: &'static str,
    location: &'static str,
    price: u32,
    property_type: &'static str,
    gender: Option<&'static str>,
    occupancy: Option<&'static str>,
    verified: bool,
    amenities: &'static [&'static str],
    coordinates: Option<(f64, f64)>,
    status: ListingStatus,
}

const SAMPLE_ROWS: &[SampleRow] = &[
    SampleRow {
        id: "blr-001",
        title: "Sunny PG near Forum Mall",
        location: "Koramangala, Bangalore",
        price: 12_000,
        property_type: "PG",
        gender: Some("Female"),
        occupancy: Some("Double"),
        verified: true,
        amenities: &["WiFi", "AC", "Meals", "Laundry"],
        coordinates: Some((12.9352, 77.6245)),
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-002",
        title: "2BHK apartment with balcony",
        location: "Indiranagar, Bangalore",
        price: 32_000,
        property_type: "Apartment",
        gender: Some("Any"),
        occupancy: None,
        verified: true,
        amenities: &["WiFi", "Parking", "Power Backup"],
        coordinates: Some((12.9784, 77.6408)),
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-003",
        title: "Compact studio for professionals",
        location: "Whitefield, Bangalore",
        price: 18_500,
        property_type: "Studio",
        gender: Some("Any"),
        occupancy: Some("Single"),
        verified: false,
        amenities: &["WiFi", "AC", "Gym"],
        coordinates: Some((12.9698, 77.7500)),
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-004",
        title: "Boys PG with meals",
        location: "BTM Layout, Bangalore",
        price: 8_500,
        property_type: "PG",
        gender: Some("Male"),
        occupancy: Some("Triple"),
        verified: true,
        amenities: &["WiFi", "Meals"],
        coordinates: Some((12.9166, 77.6101)),
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-005",
        title: "Independent house near lake",
        location: "Hebbal, Bangalore",
        price: 48_000,
        property_type: "House",
        gender: None,
        occupancy: None,
        verified: true,
        amenities: &["Parking", "Garden", "Power Backup"],
        coordinates: Some((13.0358, 77.5970)),
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-006",
        title: "Private room in shared flat",
        location: "HSR Layout, Bangalore",
        price: 14_000,
        property_type: "Room",
        gender: Some("Female"),
        occupancy: Some("Single"),
        verified: false,
        amenities: &["WiFi", "Laundry"],
        coordinates: None,
        status: ListingStatus::Active,
    },
    SampleRow {
        id: "blr-007",
        title: "Furnished room awaiting inspection",
        location: "Jayanagar, Bangalore",
        price: 16_000,
        property_type: "Room",
        gender: Some("Any"),
        occupancy: Some("Single"),
        verified: false,
        amenities: &["WiFi"],
        coordinates: Some((12.9250, 77.5938)),
        status: ListingStatus::Pending,
    },
];

/// Bundled Bangalore catalog served when no JSON export is configured.
pub(crate) fn sample_catalog() -> Vec<RawListing> {
    SAMPLE_ROWS
        .iter()
        .map(|row| RawListing {
            id: row.id.to_string(),
            title: row.title.to_string(),
            location: row.location.to_string(),
            price_per_month: f64::from(row.price),
            property_type: row.property_type.to_string(),
            gender_preference: row.gender.map(str::to_string),
            occupancy: row.occupancy.map(str::to_string),
            verified: Some(row.verified),
            amenities: Some(row.amenities.iter().map(|tag| tag.to_string()).collect()),
            latitude: row.coordinates.map(|(latitude, _)| latitude),
            longitude: row.coordinates.map(|(_, longitude)| longitude),
            images: None,
            available_from: None,
            status: Some(row.status),
        })
        .collect()
}
