// Core algorithm exports
pub mod compose;
pub mod dedup;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod orchestrator;
pub mod report;
pub mod window;

pub use compose::EmailComposer;
pub use dedup::dedupe;
pub use distance::{haversine_distance, calculate_bounding_box, is_within_bounding_box};
pub use filters::{matches_category, matches_radius, matches_rule};
pub use matcher::{Matcher, MatchResult};
pub use orchestrator::{NotificationOrchestrator, RunError};
pub use report::{DeliveryStatus, RunOutcome, RunReport};
pub use window::{select_today, today_utc};
