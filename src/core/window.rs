use chrono::{NaiveDate, Utc};

use crate::models::Notice;

/// Date format used by the board for publication dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current calendar day in UTC
///
/// The daily run always uses UTC so that re-runs on another host pick the same window.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Keep only the notices published on `today`
///
/// Comparison is exact string equality against `YYYY-MM-DD`; notices without a
/// publication date are dropped.
pub fn select_today(notices: &[Notice], today: NaiveDate) -> Vec<Notice> {
    let today = today.format(DATE_FORMAT).to_string();

    notices
        .iter()
        .filter(|notice| notice.publication_date.as_deref() == Some(today.as_str()))
        .cloned()
        .collect()
}
