//! HTTP API with Axum and Utoipa
//!
//! The engine is built lazily through an [`EngineGate`]: the server warms it
//! up in the background at startup, and requests that arrive before it is
//! ready wait for the same build instead of starting another.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use wayfarer_routing::{
    CancelToken, Coordinate, Endpoint, Engine, EngineGate, Error, GateStatus, Maneuver, Profile,
    QueryOptions, RouteOutcome, RouteSummary,
};

/// Builds the engine; run at most once per server
pub type EngineLoader = dyn Fn() -> wayfarer_routing::Result<Engine> + Send + Sync;

#[derive(Clone)]
pub struct AppState {
    gate: Arc<EngineGate>,
    loader: Arc<EngineLoader>,
    query_timeout: Duration,
}

impl AppState {
    pub fn new(loader: Arc<EngineLoader>, query_timeout: Duration) -> Self {
        Self {
            gate: Arc::new(EngineGate::new()),
            loader,
            query_timeout,
        }
    }

    pub fn status(&self) -> GateStatus {
        self.gate.status()
    }

    /// The shared engine, building it on first use
    pub async fn engine(&self) -> Result<Arc<Engine>, ApiError> {
        if let Some(engine) = self.gate.get() {
            return Ok(engine);
        }
        let gate = Arc::clone(&self.gate);
        let loader = Arc::clone(&self.loader);
        let engine = tokio::task::spawn_blocking(move || gate.get_or_build(|| (*loader)())).await??;
        Ok(engine)
    }

    fn query_options(&self, cancel: &CancelToken) -> QueryOptions {
        QueryOptions::default()
            .with_deadline(Instant::now() + self.query_timeout)
            .with_cancel(cancel.clone())
    }
}

/// Cancels the search when the request future is dropped
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(health, profiles, resolve, route),
    components(schemas(
        HealthResponse,
        ProfilesResponse,
        ResolveResponse,
        RouteResponse,
        InstructionView,
        ErrorResponse
    )),
    info(
        title = "Wayfarer Route API",
        description = "Point resolution and turn-by-turn routing over OpenStreetMap data"
    )
)]
struct ApiDoc;

/// Build the Axum router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/profiles", get(profiles))
        .route("/resolve", get(resolve))
        .route("/route", get(route))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let warmup = state.clone();
    tokio::spawn(async move {
        if let Err(e) = warmup.engine().await {
            error!(error = %e.message, "engine warm-up failed");
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    info!("API docs at http://{addr}/swagger-ui");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Errors ============

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::UnknownProfile { .. } | Error::UnsupportedProfile { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::DeadlineExceeded | Error::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            Error::EngineUnavailable(_) | Error::Build(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        error!(error = %e, "blocking task failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// ============ Health ============

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Engine state: uninitialized, building, ready or failed
    #[schema(value_type = String, example = "ready")]
    pub engine: GateStatus,
    pub version: String,
}

/// Liveness and engine build state; never waits for the build
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
    tag = "status"
)]
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        engine: state.status(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Profiles ============

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilesResponse {
    #[schema(example = json!(["car", "bike", "foot"]))]
    pub profiles: Vec<String>,
}

/// Profiles the engine was built with
#[utoipa::path(
    get,
    path = "/profiles",
    responses(
        (status = 200, description = "Enabled profiles", body = ProfilesResponse),
        (status = 503, description = "Engine failed to build", body = ErrorResponse),
    ),
    tag = "status"
)]
async fn profiles(State(state): State<AppState>) -> Result<Json<ProfilesResponse>, ApiError> {
    let engine = state.engine().await?;
    Ok(Json(ProfilesResponse {
        profiles: engine
            .profiles()
            .iter()
            .map(|p| p.name().to_string())
            .collect(),
    }))
}

// ============ Resolve ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    /// car, bike or foot
    profile: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveResponse {
    #[schema(example = 55.9533)]
    pub latitude: f64,
    #[schema(example = -3.1883)]
    pub longitude: f64,
}

impl From<Coordinate> for ResolveResponse {
    fn from(c: Coordinate) -> Self {
        Self {
            latitude: c.lat,
            longitude: c.lon,
        }
    }
}

/// Nearest point on the network usable by the profile
#[utoipa::path(
    get,
    path = "/resolve",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Resolved point", body = ResolveResponse),
        (status = 400, description = "Unknown or disabled profile", body = ErrorResponse),
        (status = 404, description = "No usable edge within range", body = ErrorResponse),
    ),
    tag = "routing"
)]
async fn resolve(
    State(state): State<AppState>,
    Query(req): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let profile: Profile = req.profile.parse()?;
    let engine = state.engine().await?;
    let point =
        tokio::task::spawn_blocking(move || engine.resolve_point(profile, req.lat, req.lon))
            .await??;

    point
        .map(|c| Json(c.into()))
        .ok_or_else(|| ApiError::not_found("no usable road near the requested point"))
}

// ============ Route ============

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RouteQuery {
    /// car, bike or foot
    profile: String,
    from_lat: f64,
    from_lon: f64,
    to_lat: f64,
    to_lon: f64,
    /// Return a GeoJSON Feature instead of the route object
    #[serde(default)]
    geojson: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructionView {
    #[schema(example = "Turn left onto Princes Street")]
    pub text: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Index into the route geometry
    pub index: usize,
    #[schema(value_type = Object)]
    pub maneuver: Maneuver,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteResponse {
    pub profile: String,
    /// Distance in meters
    #[schema(example = 1523.4)]
    pub distance_m: f64,
    /// Travel time in seconds
    #[schema(example = 183.0)]
    pub duration_s: f64,
    /// [longitude, latitude] pairs
    pub geometry: Vec<[f64; 2]>,
    pub instructions: Vec<InstructionView>,
}

impl From<RouteSummary> for RouteResponse {
    fn from(summary: RouteSummary) -> Self {
        Self {
            profile: summary.profile.name().to_string(),
            distance_m: summary.total_distance,
            duration_s: summary.total_time,
            geometry: summary.geometry.iter().map(|c| [c.lon, c.lat]).collect(),
            instructions: summary
                .instructions
                .into_iter()
                .map(|i| InstructionView {
                    text: i.text,
                    latitude: i.position.lat,
                    longitude: i.position.lon,
                    index: i.entry,
                    maneuver: i.maneuver,
                })
                .collect(),
        }
    }
}

/// Fastest route between two points
#[utoipa::path(
    get,
    path = "/route",
    params(RouteQuery),
    responses(
        (status = 200, description = "Route found", body = RouteResponse),
        (status = 400, description = "Unknown or disabled profile", body = ErrorResponse),
        (status = 404, description = "Endpoint unresolved or no route", body = ErrorResponse),
        (status = 504, description = "Query deadline exceeded", body = ErrorResponse),
    ),
    tag = "routing"
)]
async fn route(
    State(state): State<AppState>,
    Query(req): Query<RouteQuery>,
) -> Result<Response, ApiError> {
    let profile: Profile = req.profile.parse()?;
    let engine = state.engine().await?;

    let guard = CancelOnDrop(CancelToken::new());
    let options = state.query_options(&guard.0);
    let start = Coordinate::new(req.from_lat, req.from_lon);
    let end = Coordinate::new(req.to_lat, req.to_lon);

    let outcome =
        tokio::task::spawn_blocking(move || engine.calculate_route_with(profile, start, end, &options))
            .await??;

    match outcome {
        RouteOutcome::Found(summary) if req.geojson => Ok(Json(summary.to_geojson()).into_response()),
        RouteOutcome::Found(summary) => Ok(Json(RouteResponse::from(summary)).into_response()),
        RouteOutcome::Unresolved(Endpoint::Start) => {
            Err(ApiError::not_found("no usable road near the start point"))
        }
        RouteOutcome::Unresolved(Endpoint::End) => {
            Err(ApiError::not_found("no usable road near the end point"))
        }
        RouteOutcome::NotFound => Err(ApiError::not_found("no route between the points")),
    }
}
