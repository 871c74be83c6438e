// Route exports
pub mod notifications;
pub mod settings;

use actix_web::web;
use std::sync::Arc;

use crate::core::NotificationOrchestrator;
use crate::services::{Geocoder, UserStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub orchestrator: NotificationOrchestrator,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(notifications::configure)
            .configure(settings::configure),
    );
}
