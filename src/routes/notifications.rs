use actix_web::{web, HttpResponse, Responder};

use crate::core::{today_utc, RunError};
use crate::models::{CheckAndSendRequest, ErrorResponse, HealthResponse};
use crate::routes::AppState;

/// Configure the health and run-trigger routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/notifications/check-and-send", web::post().to(check_and_send));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = match state.store.list_users().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("User store health check failed: {}", e);
            "degraded"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run the daily check over the posted batch
///
/// POST /api/v1/notifications/check-and-send
///
/// Request body:
/// ```json
/// {
///   "items": [{"id": "...", "category": "...", "publicationDate": "2024-01-02", ...}],
///   "today": "2024-01-02"
/// }
/// ```
///
/// `today` defaults to the current UTC date.
async fn check_and_send(
    state: web::Data<AppState>,
    req: web::Json<CheckAndSendRequest>,
) -> impl Responder {
    let CheckAndSendRequest { items, today } = req.into_inner();
    let today = today.unwrap_or_else(today_utc);

    tracing::info!("Check-and-send requested for {} notices on {}", items.len(), today);

    match state.orchestrator.run(&items, today).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e @ RunError::InvalidBatch(_)) => {
            tracing::info!("Rejected notice batch: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid batch".to_string(),
                message: e.to_string(),
                status_code: 400,
            })
        }
        Err(e @ RunError::UserStore(_)) => {
            tracing::error!("Notification run failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load users".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
