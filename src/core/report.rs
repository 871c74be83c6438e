use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery result for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed { error: String },
}

/// Per-user record of a run
///
/// Serialized flat as `{email, matchedCount, success, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRecord", from = "OutcomeRecord")]
pub struct RunOutcome {
    pub email: String,
    pub matched_count: usize,
    pub status: DeliveryStatus,
}

impl RunOutcome {
    pub fn sent(email: impl Into<String>, matched_count: usize) -> Self {
        Self {
            email: email.into(),
            matched_count,
            status: DeliveryStatus::Sent,
        }
    }

    pub fn failed(email: impl Into<String>, matched_count: usize, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            matched_count,
            status: DeliveryStatus::Failed { error: error.into() },
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            DeliveryStatus::Sent => None,
            DeliveryStatus::Failed { error } => Some(error),
        }
    }

    /// Counted towards `usersNotified`
    pub fn notified(&self) -> bool {
        self.success() && self.matched_count > 0
    }
}

#[derive(Serialize, Deserialize)]
struct OutcomeRecord {
    email: String,
    #[serde(rename = "matchedCount")]
    matched_count: usize,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<RunOutcome> for OutcomeRecord {
    fn from(outcome: RunOutcome) -> Self {
        let (success, error) = match outcome.status {
            DeliveryStatus::Sent => (true, None),
            DeliveryStatus::Failed { error } => (false, Some(error)),
        };
        Self {
            email: outcome.email,
            matched_count: outcome.matched_count,
            success,
            error,
        }
    }
}

impl From<OutcomeRecord> for RunOutcome {
    fn from(record: OutcomeRecord) -> Self {
        let status = if record.success {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed {
                error: record.error.unwrap_or_else(|| "unknown error".to_string()),
            }
        };
        Self {
            email: record.email,
            matched_count: record.matched_count,
            status,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(rename = "runId")]
    pub run_id: Uuid,
    pub today: NaiveDate,
    #[serde(rename = "usersConsidered")]
    pub users_considered: usize,
    #[serde(rename = "usersNotified")]
    pub users_notified: usize,
    #[serde(rename = "totalNewNoticesToday")]
    pub total_new_notices_today: usize,
    pub outcomes: Vec<RunOutcome>,
}

impl RunReport {
    /// Assemble a report; `users_notified` is derived from the outcomes
    pub fn new(
        run_id: Uuid,
        today: NaiveDate,
        users_considered: usize,
        total_new_notices_today: usize,
        outcomes: Vec<RunOutcome>,
    ) -> Self {
        let users_notified = outcomes.iter().filter(|o| o.notified()).count();
        Self {
            run_id,
            today,
            users_considered,
            users_notified,
            total_new_notices_today,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}
