//! Fleet Tracking API Server
//!
//! REST API and WebSocket server for the fleet tracking dashboard.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
pub mod config;
mod error;
mod telemetry;
mod rate_limit;
mod routes;
mod ws;

pub use auth::AuthUser;
pub use config::{LogFormat, LoggingConfig, Settings};
pub use error::{ApiError, ApiResult};
pub use rate_limit::RateLimitConfig;
pub use ws::Broadcaster;

use alerting::AlertEngine;
use data_validator::Validator;
use rate_limit::create_governor_config;
use session_auth::{AuthError, TokenSigner};
use storage::Repository;

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Repository,
    pub signer: TokenSigner,
    pub validator: Validator,
    /// Alert rules with cooldown state
    pub alerts: AlertEngine,
    pub broadcaster: Broadcaster,
    /// Set once the Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    /// Create application state and apply configured seed records
    pub fn new(settings: &Settings) -> Result<Self, AuthError> {
        let repository = Repository::with_retention(settings.tracking.max_samples_per_vehicle);
        settings.seed.apply(&repository)?;

        Ok(Self {
            repository,
            signer: TokenSigner::new(&settings.auth),
            validator: Validator::new(settings.validation.clone()),
            alerts: AlertEngine::new(settings.alerts.clone()),
            broadcaster: Broadcaster::new(settings.websocket.channel_capacity),
            prometheus: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: SystemMetrics,
}

/// Record counts
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub vehicle_count: usize,
    pub alert_count: usize,
    pub sample_count: usize,
    pub websocket_clients: usize,
}

/// Create the application router
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let mut auth_routes = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh));
    if let Some(config) = create_governor_config(&settings.rate_limit) {
        auth_routes = auth_routes.layer(GovernorLayer { config });
    }

    let router = Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/auth/verify", get(routes::auth::verify))
        .route(
            "/api/vehicles",
            get(routes::vehicles::list_vehicles).post(routes::vehicles::create_vehicle),
        )
        .route(
            "/api/vehicles/:id",
            get(routes::vehicles::get_vehicle).put(routes::vehicles::update_vehicle),
        )
        .route("/api/vehicles/:id/history", get(routes::vehicles::get_history))
        .route("/api/vehicles/:id/immobilize", post(routes::vehicles::immobilize))
        .route("/api/vehicles/:id/fuel-control", post(routes::vehicles::fuel_control))
        .route("/api/vehicles/:id/sos", post(routes::vehicles::trigger_sos))
        .route(
            "/api/alerts",
            get(routes::alerts::get_alerts).post(routes::alerts::create_alert),
        )
        .route("/api/alerts/:id/acknowledge", post(routes::alerts::acknowledge_alert))
        .route("/api/alerts/:id/resolve", post(routes::alerts::resolve_alert))
        .route(
            "/api/geofences",
            get(routes::geofences::list_geofences).post(routes::geofences::create_geofence),
        )
        .route(
            "/api/geofences/:id",
            axum::routing::put(routes::geofences::update_geofence)
                .delete(routes::geofences::delete_geofence),
        )
        .route("/api/tracking", post(routes::tracking::ingest))
        .route("/api/tracking/live", get(routes::tracking::live))
        .route("/api/dashboard/stats", get(routes::dashboard::get_stats))
        .route("/api/ws", get(ws::ws_handler))
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http());

    let router = if settings.server.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: SystemMetrics {
            vehicle_count: state.repository.vehicle_count(),
            alert_count: state.repository.alert_count(),
            sample_count: state.repository.sample_count(),
            websocket_clients: state.broadcaster.client_count(),
        },
    };

    Json(response)
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match &state.read().await.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let mut state = AppState::new(&settings)?;
    state.prometheus = telemetry::install();
    let app = create_router(state.shared(), &settings);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    info!("Starting API server on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    })
    .await?;

    Ok(())
}
