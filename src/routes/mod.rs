// Route exports
pub mod error;
pub mod requests;
pub mod resources;
pub mod views;

use actix_web::web;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::Projection;
use crate::services::{Coordinator, ViewCache};

pub use error::ApiError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub projection: Arc<RwLock<Projection>>,
    pub cache: Arc<ViewCache>,
    pub default_radius_km: f64,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(views::configure)
            .configure(requests::configure)
            .configure(resources::configure),
    );
}
