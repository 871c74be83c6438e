use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{deserialize_known_categories, Category, Notice};

/// Request body for the daily check-and-send trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAndSendRequest {
    pub items: Vec<Notice>,
    /// Overrides the UTC calendar day, mainly for re-runs
    #[serde(default)]
    pub today: Option<chrono::NaiveDate>,
}

/// Request to read a user's alert settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GetSettingsRequest {
    #[validate(email)]
    pub email: String,
}

/// Request to replace a user's alert settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub notifications: bool,
    #[serde(rename = "emailNotifications", default)]
    pub email_notifications: bool,
    #[serde(rename = "notificationPreferences", default)]
    #[validate(nested)]
    pub notification_preferences: Vec<RuleInput>,
}

/// Preference rule as entered by a user
///
/// `location` is either a `"lat, lon"` pair or a place name that gets geocoded.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuleInput {
    /// Unknown labels fail deserialization instead of becoming `Unclassified`
    #[serde(deserialize_with = "deserialize_known_categories")]
    #[validate(length(min = 1))]
    pub categories: Vec<Category>,
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(rename = "radiusKm")]
    #[validate(range(min = 0.0, max = 20000.0))]
    pub radius_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_input_rejects_unknown_category() {
        let json = r#"{"categories":["Sport"],"location":"Trutnov","radiusKm":10}"#;
        let err = serde_json::from_str::<RuleInput>(json).unwrap_err();
        assert!(err.to_string().contains("unknown category \"Sport\""));
    }

    #[test]
    fn test_rule_input_accepts_known_labels() {
        let json = r#"{"categories":["Zdravotnictví A Zdraví","veřejná doprava a silnice"],"location":"Trutnov","radiusKm":10}"#;
        let input: RuleInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.categories, vec![Category::Health, Category::Transport]);
    }
}
