// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{BoundingBox, Category, Coordinates, Notice, ParseCoordinatesError, PreferenceRule, UserProfile};
pub use requests::{CheckAndSendRequest, GetSettingsRequest, RuleInput, UpdateSettingsRequest};
pub use responses::{ErrorResponse, HealthResponse, SettingsResponse};
