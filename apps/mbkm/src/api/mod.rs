//! # MBKM HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /dashboard` - Filtered registrant table with statistics
//! - `GET /dashboard/summary` - Headline counts
//! - `GET /dashboard/status/{status}` - Registrants with one status
//! - `GET /dashboard/activity-summary` - Registrations per activity type
//! - `POST /dashboard/cache/clear` - Drop cached read models
//! - `GET /dashboard/export` - Registrant CSV of the filtered dashboard (base64)
//! - `GET|POST /registrants` - List / create registrations
//! - `GET /registrants/search` - Quick search
//! - `GET /registrants/statistics` - Counts per status and rates
//! - `GET /registrants/filter-options` - Dropdown values
//! - `POST /registrants/export` - Registrant CSV (base64)
//! - `POST /registrants/bulk/{approve,reject,delete}` - Bulk actions
//! - `GET|PUT|DELETE /registrants/{id}` - Detail / patch / delete
//! - `POST /registrants/{id}/approve`, `/reject` - Assessment
//! - `POST /registrants/{id}/payment/verify`, `/payment/reject` - Payment review
//! - `GET|PUT|DELETE /registrants/{id}/report` - Final report
//! - `GET|POST /registrants/{id}/logbooks` - Logbook entries of a registration
//! - `GET /logbooks` - Logbook overview
//! - `GET /logbooks/student/{id}`, `/logbooks/entry/{id}` - Logbook details
//! - `GET /logbooks/statistics` - Global logbook statistics
//! - `GET /logbooks/export` - Logbook CSV (base64)
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `MBKM_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `MBKM_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `MBKM_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{get_api_key_from_env, keys_match};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, ApiResponse, ApproveRequest, BulkRequest, BulkResponse, DashboardParams,
    ExportRequest, ExportResponse, HealthResponse, LogbookParams, ReasonRequest,
    RegistrantParams, SearchParams, status_for,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use mbkm_core::{Dashboard, MbkmError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the dashboard.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<RwLock<Dashboard>>,
    /// Root of the stored payment proofs and reports.
    pub uploads_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    #[must_use]
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(RwLock::new(dashboard)),
            uploads_dir: None,
        }
    }

    /// Remove stored files under `dir` when records referencing them go away.
    #[must_use]
    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = Some(Arc::new(dir.into()));
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build CORS layer from environment configuration.
///
/// Reads `MBKM_CORS_ORIGINS`:
/// - If "*": allows all origins (development only)
/// - If not set: defaults to localhost only
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("MBKM_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (MBKM_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in MBKM_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No MBKM_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_handler))
        // Dashboard
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/dashboard/summary", get(handlers::dashboard_summary_handler))
        .route(
            "/dashboard/status/{status}",
            get(handlers::students_by_status_handler),
        )
        .route(
            "/dashboard/activity-summary",
            get(handlers::activity_summary_handler),
        )
        .route("/dashboard/cache/clear", post(handlers::clear_cache_handler))
        .route("/dashboard/export", get(handlers::export_dashboard_handler))
        // Registrants
        .route(
            "/registrants",
            get(handlers::list_registrants_handler).post(handlers::create_registrant_handler),
        )
        .route("/registrants/search", get(handlers::search_handler))
        .route(
            "/registrants/statistics",
            get(handlers::registrant_statistics_handler),
        )
        .route(
            "/registrants/filter-options",
            get(handlers::filter_options_handler),
        )
        .route(
            "/registrants/export",
            post(handlers::export_registrants_handler),
        )
        .route(
            "/registrants/bulk/approve",
            post(handlers::bulk_approve_handler),
        )
        .route("/registrants/bulk/reject", post(handlers::bulk_reject_handler))
        .route("/registrants/bulk/delete", post(handlers::bulk_delete_handler))
        .route(
            "/registrants/{id}",
            get(handlers::show_registrant_handler)
                .put(handlers::update_registrant_handler)
                .delete(handlers::delete_registrant_handler),
        )
        .route("/registrants/{id}/approve", post(handlers::approve_handler))
        .route("/registrants/{id}/reject", post(handlers::reject_handler))
        .route(
            "/registrants/{id}/payment/verify",
            post(handlers::verify_payment_handler),
        )
        .route(
            "/registrants/{id}/payment/reject",
            post(handlers::reject_payment_handler),
        )
        .route(
            "/registrants/{id}/report",
            get(handlers::report_handler)
                .put(handlers::upload_report_handler)
                .delete(handlers::delete_report_handler),
        )
        .route(
            "/registrants/{id}/logbooks",
            get(handlers::student_logbooks_handler).post(handlers::create_logbook_handler),
        )
        // Logbooks
        .route("/logbooks", get(handlers::logbook_overview_handler))
        .route(
            "/logbooks/student/{id}",
            get(handlers::student_logbooks_handler),
        )
        .route("/logbooks/entry/{id}", get(handlers::logbook_detail_handler))
        .route(
            "/logbooks/statistics",
            get(handlers::logbook_statistics_handler),
        )
        .route("/logbooks/export", get(handlers::export_logbooks_handler))
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - protects against floods (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set MBKM_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = routes();

    // Innermost: runs last on the way in.
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), MbkmError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MbkmError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("MBKM dashboard server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| MbkmError::IoError(format!("Server error: {}", e)))
}
