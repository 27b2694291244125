use crate::infra::{AppState, DiscoveryState, Session};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use roomscout::discovery::{
    ActiveSelection, Bounds, CriteriaPatch, FetchOutcome, FilterCriteria, Listing, ListingId,
    MapCommand, Marker, PriceBounds, ResultsView,
};
use roomscout::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
pub(crate) struct CriteriaView {
    pub(crate) criteria: FilterCriteria,
    pub(crate) defaults: FilterCriteria,
    pub(crate) price_bounds: PriceBounds,
}

/// Result of a criteria or search mutation.
#[derive(Debug, Serialize)]
pub(crate) struct ResultsUpdate {
    pub(crate) changed: bool,
    pub(crate) criteria: FilterCriteria,
    pub(crate) search_query: String,
    pub(crate) total_count: usize,
    pub(crate) matching_count: usize,
    pub(crate) visible_count: usize,
}

impl ResultsUpdate {
    fn from_session(changed: bool, session: &Session) -> Self {
        Self {
            changed,
            criteria: session.criteria().clone(),
            search_query: session.search_query().to_string(),
            total_count: session.listings().len(),
            matching_count: session.matching().len(),
            visible_count: session.visible().len(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchRequest {
    pub(crate) query: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SelectionRequest {
    pub(crate) listing_id: Option<ListingId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SelectionView {
    pub(crate) changed: bool,
    pub(crate) active: Option<ActiveSelection>,
    pub(crate) active_listing: Option<Listing>,
}

impl SelectionView {
    fn from_session(changed: bool, session: &Session) -> Self {
        Self {
            changed,
            active: session.active_selection().cloned(),
            active_listing: session.active_listing().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshResponse {
    pub(crate) fetch: FetchOutcome,
    pub(crate) results: ResultsView,
}

#[derive(Debug, Serialize)]
pub(crate) struct MapView {
    pub(crate) markers: Vec<Marker>,
    pub(crate) bounds: Option<Bounds>,
    pub(crate) active_listing: Option<Listing>,
    /// Backend commands issued since the previous poll.
    pub(crate) commands: Vec<MapCommand>,
}

pub(crate) fn discovery_router(state: DiscoveryState) -> Router {
    Router::new()
        .route("/api/v1/listings", get(list_listings))
        .route("/api/v1/listings/refresh", post(refresh_listings))
        .route("/api/v1/listings/:listing_id", get(get_listing))
        .route(
            "/api/v1/criteria",
            get(get_criteria).patch(patch_criteria).delete(reset_criteria),
        )
        .route("/api/v1/search", put(set_search_query))
        .route("/api/v1/selection", delete(clear_selection))
        .route("/api/v1/selection/hover", post(hover_listing))
        .route("/api/v1/selection/click", post(click_listing))
        .route("/api/v1/map", get(map_view))
        .route(
            "/api/v1/map/markers/:listing_id/click",
            post(marker_clicked),
        )
        .with_state(state)
}

pub(crate) fn with_discovery_routes(state: DiscoveryState) -> Router {
    discovery_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_listings(State(state): State<DiscoveryState>) -> Json<ResultsView> {
    Json(state.lock().results_view())
}

pub(crate) async fn refresh_listings(
    State(state): State<DiscoveryState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let fetch = state.refresh().await?;
    let results = state.lock().results_view();
    Ok(Json(RefreshResponse { fetch, results }))
}

pub(crate) async fn get_listing(
    State(state): State<DiscoveryState>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, AppError> {
    let session = state.lock();
    let listing = session.listing(&ListingId(listing_id))?;
    Ok(Json(listing.clone()))
}

pub(crate) async fn get_criteria(State(state): State<DiscoveryState>) -> Json<CriteriaView> {
    let session = state.lock();
    Json(CriteriaView {
        criteria: session.criteria().clone(),
        defaults: session.criteria_defaults().clone(),
        price_bounds: session.price_bounds(),
    })
}

pub(crate) async fn patch_criteria(
    State(state): State<DiscoveryState>,
    Json(patch): Json<CriteriaPatch>,
) -> Json<ResultsUpdate> {
    let mut session = state.lock();
    let changed = session.set_partial(patch);
    Json(ResultsUpdate::from_session(changed, &session))
}

pub(crate) async fn reset_criteria(State(state): State<DiscoveryState>) -> Json<ResultsUpdate> {
    let mut session = state.lock();
    let changed = session.reset_criteria();
    Json(ResultsUpdate::from_session(changed, &session))
}

pub(crate) async fn set_search_query(
    State(state): State<DiscoveryState>,
    Json(request): Json<SearchRequest>,
) -> Json<ResultsUpdate> {
    let mut session = state.lock();
    let changed = session.set_search_query(request.query);
    Json(ResultsUpdate::from_session(changed, &session))
}

pub(crate) async fn hover_listing(
    State(state): State<DiscoveryState>,
    Json(request): Json<SelectionRequest>,
) -> Json<SelectionView> {
    let mut session = state.lock();
    let changed = session.hover(request.listing_id);
    Json(SelectionView::from_session(changed, &session))
}

pub(crate) async fn click_listing(
    State(state): State<DiscoveryState>,
    Json(request): Json<SelectionRequest>,
) -> Json<SelectionView> {
    let mut session = state.lock();
    let changed = session.click(request.listing_id);
    Json(SelectionView::from_session(changed, &session))
}

pub(crate) async fn clear_selection(State(state): State<DiscoveryState>) -> Json<SelectionView> {
    let mut session = state.lock();
    let changed = session.clear_selection();
    Json(SelectionView::from_session(changed, &session))
}

pub(crate) async fn map_view(State(state): State<DiscoveryState>) -> Json<MapView> {
    let mut session = state.lock();
    let commands = session.map_mut().take_commands();
    Json(MapView {
        markers: session.markers().to_vec(),
        bounds: session.bounds(),
        active_listing: session.active_listing().cloned(),
        commands,
    })
}

pub(crate) async fn marker_clicked(
    State(state): State<DiscoveryState>,
    Path(listing_id): Path<String>,
) -> Result<Json<SelectionView>, AppError> {
    let mut session = state.lock();
    let changed = session.marker_clicked(&ListingId(listing_id))?;
    Ok(Json(SelectionView::from_session(changed, &session)))
}
