use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Notice category as assigned by the classifier
///
/// The labels are the topic names used by the regional official board.
/// Anything that does not match a known label is `Unclassified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Category {
    Economy,
    Investment,
    Safety,
    Subsidies,
    Culture,
    SocialServices,
    Education,
    Transport,
    Health,
    Environment,
    Unclassified,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Economy,
        Category::Investment,
        Category::Safety,
        Category::Subsidies,
        Category::Culture,
        Category::SocialServices,
        Category::Education,
        Category::Transport,
        Category::Health,
        Category::Environment,
        Category::Unclassified,
    ];

    /// Board label for this category
    pub fn label(&self) -> &'static str {
        match self {
            Category::Economy => "Ekonomika A Trh Práce",
            Category::Investment => "Investice Kraje",
            Category::Safety => "Izs A Bezpečnost",
            Category::Subsidies => "Kraj A Dotace",
            Category::Culture => "Kultura A Cestovní Ruch",
            Category::SocialServices => "Lidé A Sociální Služby",
            Category::Education => "Školství A Výzkum",
            Category::Transport => "Veřejná Doprava A Silnice",
            Category::Health => "Zdravotnictví A Zdraví",
            Category::Environment => "Životní Prostředí",
            Category::Unclassified => "Nezařazeno",
        }
    }

    /// Resolve a label case-insensitively
    ///
    /// The board publishes its topics in sentence case ("Kraj a dotace") while the
    /// classifier answers in title case ("Kraj A Dotace"); both resolve to the same variant.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().to_lowercase() == wanted)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::from_label(&value).unwrap_or(Category::Unclassified)
    }
}

impl From<Category> for &'static str {
    fn from(value: Category) -> Self {
        value.label()
    }
}

/// Strict label list for user-entered interests
///
/// `Category`'s own `Deserialize` maps unknown labels to `Unclassified`, which is
/// right for classifier output but would silently subscribe a user to unclassified
/// notices. Here an unknown label is an error.
pub fn deserialize_known_categories<'de, D, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: FromIterator<Category>,
{
    let labels = Vec::<String>::deserialize(deserializer)?;
    labels
        .iter()
        .map(|label| {
            Category::from_label(label)
                .ok_or_else(|| D::Error::custom(format!("unknown category {:?}", label)))
        })
        .collect()
}

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        crate::core::distance::is_valid_coordinate(self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Error returned when a `"lat, lon"` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a coordinate pair: {0}")]
pub struct ParseCoordinatesError(pub String);

impl FromStr for Coordinates {
    type Err = ParseCoordinatesError;

    /// Parse `"50.209, 15.832"`; values outside the valid ranges are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| ParseCoordinatesError(s.to_string()))?;

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| ParseCoordinatesError(s.to_string()))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| ParseCoordinatesError(s.to_string()))?;

        let coords = Coordinates::new(latitude, longitude);
        if !coords.is_valid() {
            return Err(ParseCoordinatesError(s.to_string()));
        }
        Ok(coords)
    }
}

/// One record published on the official board, already classified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub category: Category,
    #[serde(rename = "publicationDate", default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Resolved town name, display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(rename = "relevanceScore", default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    /// Position in the board feed; the public detail page is addressed by it
    #[serde(rename = "boardIndex", default, skip_serializing_if = "Option::is_none")]
    pub board_index: Option<usize>,
}

/// A "notify me about these topics near this place" rule
///
/// Also reads the older record layout `{zajmy, lokace: "lat, lon", radius}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord")]
pub struct PreferenceRule {
    pub categories: BTreeSet<Category>,
    pub center: Coordinates,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
}

impl PreferenceRule {
    pub fn new(
        categories: impl IntoIterator<Item = Category>,
        center: Coordinates,
        radius_km: f64,
    ) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            center,
            radius_km,
        }
    }

    /// Reason this rule cannot be evaluated, if any
    pub fn invalid_reason(&self) -> Option<&'static str> {
        if !self.center.is_valid() {
            return Some("center coordinates out of range");
        }
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Some("radius must be a non-negative number of kilometers");
        }
        None
    }
}

#[derive(Deserialize)]
struct RuleRecord {
    #[serde(alias = "zajmy", deserialize_with = "deserialize_known_categories")]
    categories: BTreeSet<Category>,
    #[serde(default)]
    center: Option<Coordinates>,
    #[serde(default)]
    lokace: Option<String>,
    #[serde(rename = "radiusKm", alias = "radius")]
    radius_km: f64,
}

impl TryFrom<RuleRecord> for PreferenceRule {
    type Error = String;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        let center = match (record.center, record.lokace) {
            (Some(center), _) => center,
            (None, Some(lokace)) => lokace.parse::<Coordinates>().map_err(|e| e.to_string())?,
            (None, None) => return Err("missing field `center`".to_string()),
        };

        Ok(Self {
            categories: record.categories,
            center,
            radius_km: record.radius_km,
        })
    }
}

/// Load stored rules one by one, dropping the ones that cannot be read
///
/// A single bad rule must not make the whole user database unreadable.
fn deserialize_stored_rules<'de, D>(deserializer: D) -> Result<Vec<PreferenceRule>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<PreferenceRule>(value) {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::warn!("Dropping unreadable preference rule: {}", e);
                None
            }
        })
        .collect())
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Registered user and their alert preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    /// In-app notifications, not used by the daily run
    #[serde(default)]
    pub notifications: bool,
    #[serde(rename = "emailNotifications", default)]
    pub email_notifications: bool,
    #[serde(
        rename = "notificationPreferences",
        default,
        deserialize_with = "deserialize_stored_rules"
    )]
    pub notification_preferences: Vec<PreferenceRule>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UserProfile {
    /// Users are only evaluated when email alerts are on and at least one rule exists
    pub fn wants_email_alerts(&self) -> bool {
        self.email_notifications && !self.notification_preferences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
    }

    #[test]
    fn test_category_board_topic_is_case_insensitive() {
        assert_eq!(Category::from_label("Kraj a dotace"), Some(Category::Subsidies));
        assert_eq!(Category::from_label("  veřejná doprava a silnice "), Some(Category::Transport));
        assert_eq!(Category::from_label("Ostatní"), None);
    }

    #[test]
    fn test_classifier_category_falls_back_to_unclassified() {
        let category: Category = serde_json::from_str("\"Sport\"").unwrap();
        assert_eq!(category, Category::Unclassified);

        let json = serde_json::to_string(&Category::Health).unwrap();
        assert_eq!(json, "\"Zdravotnictví A Zdraví\"");
    }

    #[test]
    fn test_rule_rejects_unknown_category() {
        let json = r#"{"categories":["Sport"],"center":{"latitude":50.2,"longitude":15.8},"radiusKm":10}"#;
        assert!(serde_json::from_str::<PreferenceRule>(json).is_err());

        let json = r#"{"categories":["kraj a dotace"],"center":{"latitude":50.2,"longitude":15.8},"radiusKm":10}"#;
        let rule: PreferenceRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.categories.into_iter().collect::<Vec<_>>(), vec![Category::Subsidies]);
    }

    #[test]
    fn test_legacy_rule_layout() {
        let json = r#"{"zajmy":["Kultura A Cestovní Ruch"],"lokace":"50.2092, 15.8328","radius":12}"#;
        let rule: PreferenceRule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.center, Coordinates::new(50.2092, 15.8328));
        assert_eq!(rule.radius_km, 12.0);
        assert!(rule.categories.contains(&Category::Culture));

        // Written back in the current layout
        let written = serde_json::to_value(&rule).unwrap();
        assert_eq!(written["radiusKm"], 12.0);
        assert_eq!(written["center"]["latitude"], 50.2092);
    }

    #[test]
    fn test_legacy_user_record_loads() {
        let json = r#"{
            "id": "1718000000000",
            "email": "jana@example.com",
            "password": "$2b$10$hash",
            "createdAt": "2024-06-10T08:00:00.000Z",
            "emailNotifications": true,
            "notificationPreferences": [
                {"zajmy": ["Zdravotnictví A Zdraví"], "lokace": "50.561, 15.9127", "radius": 20},
                {"zajmy": ["Sport"], "lokace": "50.2, 15.8", "radius": 5},
                {"zajmy": ["Kraj A Dotace"], "lokace": "Trutnov", "radius": 5}
            ]
        }"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();

        // Only the readable rule survives
        assert_eq!(user.notification_preferences.len(), 1);
        assert_eq!(user.notification_preferences[0].center, Coordinates::new(50.561, 15.9127));
        assert!(user.wants_email_alerts());
    }

    #[test]
    fn test_parse_coordinates() {
        let coords: Coordinates = "50.209, 15.832".parse().unwrap();
        assert_eq!(coords, Coordinates::new(50.209, 15.832));

        assert!("Trutnov".parse::<Coordinates>().is_err());
        assert!("95.0, 15.0".parse::<Coordinates>().is_err());
        assert!("50.0, abc".parse::<Coordinates>().is_err());
    }

    #[test]
    fn test_rule_validation() {
        let valid = PreferenceRule::new([Category::Health], Coordinates::new(50.0, 15.0), 0.0);
        assert!(valid.invalid_reason().is_none());

        let bad_center = PreferenceRule::new([Category::Health], Coordinates::new(91.0, 15.0), 10.0);
        assert!(bad_center.invalid_reason().is_some());

        let bad_radius = PreferenceRule::new([Category::Health], Coordinates::new(50.0, 15.0), -1.0);
        assert!(bad_radius.invalid_reason().is_some());

        let nan_radius = PreferenceRule::new([Category::Health], Coordinates::new(50.0, 15.0), f64::NAN);
        assert!(nan_radius.invalid_reason().is_some());
    }

    #[test]
    fn test_user_profile_defaults() {
        let json = r#"{"id":"u1","email":"a@example.com"}"#;
        let user: UserProfile = serde_json::from_str(json).unwrap();

        assert!(!user.email_notifications);
        assert!(user.notification_preferences.is_empty());
        assert!(!user.wants_email_alerts());
    }
}
