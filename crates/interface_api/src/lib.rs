//! HTTP API Layer
//!
//! This crate exposes the metering ledger over a JSON API using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for bills, settings, data and backups
//! - **Middleware**: Tracing and request logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! The ledger is a single owned value behind an async mutex. Handlers never
//! hold the lock while waiting on the backup store.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(ledger, backups, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_metering::{BackupBlobStore, Ledger};

use crate::config::ApiConfig;
use crate::handlers::{backup, bills, data, health, settings};
use crate::middleware::request_log_middleware;

/// Backup storage the API can both use and health-check
pub trait BackupAdapter: BackupBlobStore + HealthCheckable {}

impl<T: BackupBlobStore + HealthCheckable> BackupAdapter for T {}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub backups: Arc<dyn BackupAdapter>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(ledger: Ledger, backups: impl BackupAdapter, config: ApiConfig) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            backups: Arc::new(backups),
            config,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Ledger, backup store and configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health::health_check));

    let bill_routes = Router::new()
        .route("/", get(bills::list_bills).post(bills::create_bill))
        .route(
            "/:id",
            get(bills::get_bill)
                .put(bills::update_bill)
                .delete(bills::delete_bill),
        );

    let backup_routes = Router::new()
        .route("/", get(backup::download_backup))
        .route("/restore", post(backup::restore_backup))
        .route("/cloud", post(backup::save_to_cloud))
        .route("/cloud/load", post(backup::load_from_cloud));

    let api_routes = Router::new()
        .nest("/bills", bill_routes)
        .nest("/backup", backup_routes)
        .route("/undo/:token", post(bills::undo))
        .route("/summary", get(data::summary))
        .route("/settings", get(settings::get_settings).put(settings::update_settings))
        .route("/data", delete(data::clear_all))
        .route("/export.csv", get(data::export_csv))
        .route("/import.csv", post(data::import_csv))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(axum_middleware::from_fn(request_log_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
