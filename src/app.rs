//! Wiring from [`Settings`] to the running components
//!
//! Shared by the HTTP server and the `daily-notify` binary.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{GeocoderSettings, Settings};
use crate::core::{EmailComposer, NotificationOrchestrator, RunError};
use crate::services::{
    BoardClient, BoardError, ClassifierError, EmailError, GeocodeError, HttpEmailSink,
    JsonFileStore, LlmClassifier, NominatimGeocoder, UserStore,
};

/// Startup and run failures surfaced to the binaries
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Email setup failed: {0}")]
    Email(#[from] EmailError),

    #[error("Geocoder setup failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Classifier setup failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Board fetch failed: {0}")]
    Board(#[from] BoardError),

    #[error(transparent)]
    Run(#[from] RunError),
}

pub fn build_store(settings: &Settings) -> Arc<dyn UserStore> {
    Arc::new(JsonFileStore::new(&settings.store.path))
}

pub fn build_geocoder(settings: &GeocoderSettings) -> Result<NominatimGeocoder, GeocodeError> {
    let mut geocoder = NominatimGeocoder::new(
        settings.base_url.clone(),
        settings.user_agent.clone(),
        settings.requests_per_second,
        settings.cache_size,
        settings.timeout(),
    )?;

    if let Some(codes) = &settings.country_codes {
        geocoder = geocoder.with_country_codes(codes.clone());
    }
    if let Some(suffix) = &settings.region_suffix {
        geocoder = geocoder.with_region_suffix(suffix.clone());
    }

    Ok(geocoder)
}

pub fn build_orchestrator(
    settings: &Settings,
    store: Arc<dyn UserStore>,
) -> Result<NotificationOrchestrator, EmailError> {
    let email = &settings.email;
    if email.api_key.is_empty() {
        tracing::warn!("No email API key configured, sends will be rejected");
    }

    let sink = HttpEmailSink::new(
        email.api_url.clone(),
        email.api_key.clone(),
        &email.from_name,
        &email.from_email,
        email.timeout(),
    )?;

    let notifications = &settings.notifications;
    let composer = EmailComposer::new(
        notifications.public_base_url.clone(),
        notifications.subject.clone(),
        notifications.footer.clone(),
    );

    Ok(NotificationOrchestrator::new(store, Arc::new(sink), composer)
        .with_max_concurrent_users(notifications.max_concurrent_users))
}

pub fn build_board_client(settings: &Settings) -> Result<BoardClient, BoardError> {
    BoardClient::new(settings.board.feed_url.clone(), settings.board.timeout())
}

pub fn build_classifier(
    settings: &Settings,
    geocoder: Arc<NominatimGeocoder>,
) -> Result<LlmClassifier, ClassifierError> {
    let classifier = &settings.classifier;

    Ok(LlmClassifier::new(
        classifier.endpoint.clone(),
        classifier.api_key.clone(),
        classifier.model.clone(),
        classifier.chunk_size,
        classifier.timeout(),
    )?
    .with_geocoder(geocoder))
}
