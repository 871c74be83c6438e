use actix_web::{web, HttpResponse, Responder};
use thiserror::Error;
use validator::Validate;

use crate::models::{
    Coordinates, ErrorResponse, GetSettingsRequest, PreferenceRule, RuleInput, SettingsResponse,
    UpdateSettingsRequest, UserProfile,
};
use crate::routes::AppState;
use crate::services::{GeocodeError, Geocoder};

/// Configure the settings routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/settings/get", web::post().to(get_settings))
        .route("/settings/update", web::post().to(update_settings));
}

#[derive(Debug, Error)]
enum RuleError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Invalid rule: {0}")]
    Invalid(&'static str),
}

impl RuleError {
    fn into_response(self) -> HttpResponse {
        match self {
            RuleError::Geocode(_) => HttpResponse::BadGateway().json(ErrorResponse {
                error: "Geocoding unavailable".to_string(),
                message: self.to_string(),
                status_code: 502,
            }),
            _ => HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid preference".to_string(),
                message: self.to_string(),
                status_code: 400,
            }),
        }
    }
}

/// Turn a user-entered rule into a stored one
///
/// A location that parses as `"lat, lon"` is taken literally; anything else is a place name.
async fn resolve_rule(geocoder: &dyn Geocoder, input: RuleInput) -> Result<PreferenceRule, RuleError> {
    let center = match input.location.parse::<Coordinates>() {
        Ok(coords) => coords,
        Err(_) => geocoder
            .resolve(&input.location)
            .await?
            .ok_or_else(|| RuleError::UnknownLocation(input.location.clone()))?,
    };

    let rule = PreferenceRule::new(input.categories, center, input.radius_km);
    match rule.invalid_reason() {
        Some(reason) => Err(RuleError::Invalid(reason)),
        None => Ok(rule),
    }
}

fn settings_of(user: UserProfile) -> SettingsResponse {
    SettingsResponse {
        email: user.email,
        notifications: user.notifications,
        email_notifications: user.email_notifications,
        notification_preferences: user.notification_preferences,
    }
}

fn user_not_found(email: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "User not found".to_string(),
        message: format!("No user registered with {}", email),
        status_code: 404,
    })
}

fn store_failure(e: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "User store error".to_string(),
        message: e.to_string(),
        status_code: 500,
    })
}

/// Read a user's alert settings
///
/// POST /api/v1/settings/get
async fn get_settings(
    state: web::Data<AppState>,
    req: web::Json<GetSettingsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match state.store.find_user(&req.email).await {
        Ok(Some(user)) => HttpResponse::Ok().json(settings_of(user)),
        Ok(None) => user_not_found(&req.email),
        Err(e) => {
            tracing::error!("Failed to load settings for {}: {}", req.email, e);
            store_failure(e)
        }
    }
}

/// Replace a user's alert settings
///
/// POST /api/v1/settings/update
///
/// Request body:
/// ```json
/// {
///   "email": "user@example.com",
///   "notifications": true,
///   "emailNotifications": true,
///   "notificationPreferences": [
///     {"categories": ["Zdravotnictví A Zdraví"], "location": "Trutnov", "radiusKm": 15}
///   ]
/// }
/// ```
async fn update_settings(
    state: web::Data<AppState>,
    req: web::Json<UpdateSettingsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();

    let mut user = match state.store.find_user(&req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return user_not_found(&req.email),
        Err(e) => {
            tracing::error!("Failed to load user {}: {}", req.email, e);
            return store_failure(e);
        }
    };

    let mut rules = Vec::with_capacity(req.notification_preferences.len());
    for input in req.notification_preferences {
        match resolve_rule(state.geocoder.as_ref(), input).await {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                tracing::info!("Rejected preference for {}: {}", req.email, e);
                return e.into_response();
            }
        }
    }

    user.notifications = req.notifications;
    user.email_notifications = req.email_notifications;
    user.notification_preferences = rules;

    if let Err(e) = state.store.update_user(&user).await {
        tracing::error!("Failed to save settings for {}: {}", user.email, e);
        return store_failure(e);
    }

    tracing::info!(
        "Updated settings for {} ({} rules)",
        user.email,
        user.notification_preferences.len()
    );

    HttpResponse::Ok().json(settings_of(user))
}
