use serde::{Deserialize, Serialize};
use crate::models::domain::PreferenceRule;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// A user's stored alert settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub email: String,
    pub notifications: bool,
    #[serde(rename = "emailNotifications")]
    pub email_notifications: bool,
    #[serde(rename = "notificationPreferences")]
    pub notification_preferences: Vec<PreferenceRule>,
}
