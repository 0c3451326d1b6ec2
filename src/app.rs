use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::auth::SessionStore;
use crate::config::Config;
use crate::db::{LocalityRepository, UserRepository, VehicleRepository};
use crate::importers::SheetExtractor;
use crate::services::{AuthService, LocalityService, VehicleService};

/// Running application
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    /// Wire repositories into services and spawn the HTTP server
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let app = build_router(&config, pool)?;

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self { server_handle })
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}

/// Router backed by the Postgres repositories
pub fn build_router(config: &Config, pool: PgPool) -> Result<Router, Box<dyn std::error::Error>> {
    let vehicle_repo = Arc::new(VehicleRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let locality_repo = Arc::new(LocalityRepository::new(pool));

    let extractor = SheetExtractor::standard()?;
    let sessions = SessionStore::new(config.session_ttl());

    let app_state = AppState {
        vehicle_service: VehicleService::new(vehicle_repo, extractor),
        auth_service: AuthService::new(user_repo, sessions),
        locality_service: LocalityService::new(locality_repo),
        max_upload_bytes: config.max_upload_bytes,
    };

    Ok(create_router(app_state).layer(TraceLayer::new_for_http()))
}
