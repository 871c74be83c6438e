//! Board Alerts - daily notification engine for the regional official board
//!
//! This library matches newly published notices against users' category and
//! radius preferences and sends each user one digest email per day.

pub mod app;
pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::haversine_distance, NotificationOrchestrator, RunError, RunOutcome, RunReport,
};
pub use crate::models::{Category, Coordinates, Notice, PreferenceRule, UserProfile};
