use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{
    compose::EmailComposer,
    dedup::dedupe,
    matcher::Matcher,
    report::{RunOutcome, RunReport},
    window::select_today,
};
use crate::models::{Notice, UserProfile};
use crate::services::{EmailSink, StoreError, UserStore};

/// Errors that abort a whole run before any user is processed
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid notice batch: {0}")]
    InvalidBatch(String),

    #[error("User store unavailable: {0}")]
    UserStore(#[from] StoreError),
}

/// Drives one daily notification run
///
/// # Run Stages
/// 1. Batch validation
/// 2. Eligible user selection
/// 3. Daily window filter
/// 4. Per-user matching, deduplication and delivery (bounded concurrency)
/// 5. Report assembly
///
/// A failure while notifying one user is recorded in that user's outcome and
/// never stops the others.
#[derive(Clone)]
pub struct NotificationOrchestrator {
    store: Arc<dyn UserStore>,
    sink: Arc<dyn EmailSink>,
    matcher: Matcher,
    composer: EmailComposer,
    max_concurrent_users: usize,
}

impl NotificationOrchestrator {
    pub fn new(store: Arc<dyn UserStore>, sink: Arc<dyn EmailSink>, composer: EmailComposer) -> Self {
        Self {
            store,
            sink,
            matcher: Matcher::new(),
            composer,
            max_concurrent_users: 4,
        }
    }

    /// Number of users notified at the same time (default 4); `1` processes users sequentially
    pub fn with_max_concurrent_users(mut self, limit: usize) -> Self {
        self.max_concurrent_users = limit.max(1);
        self
    }

    /// Run the daily check for `batch` as of `today`
    pub async fn run(&self, batch: &[Notice], today: NaiveDate) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("notification_run", %run_id, %today);

        self.run_inner(run_id, batch, today).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        batch: &[Notice],
        today: NaiveDate,
    ) -> Result<RunReport, RunError> {
        validate_batch(batch)?;

        let eligible: Vec<UserProfile> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(UserProfile::wants_email_alerts)
            .collect();

        let todays = select_today(batch, today);

        tracing::info!(
            batch = batch.len(),
            new_today = todays.len(),
            eligible_users = eligible.len(),
            "Starting notification run"
        );

        if eligible.is_empty() {
            tracing::info!("No users to notify");
            return Ok(RunReport::new(run_id, today, 0, todays.len(), Vec::new()));
        }

        if todays.is_empty() {
            tracing::info!("No new notices today");
            return Ok(RunReport::new(run_id, today, eligible.len(), 0, Vec::new()));
        }

        let outcomes: Vec<RunOutcome> = stream::iter(eligible.iter())
            .map(|user| self.notify_user(user, &todays))
            .buffered(self.max_concurrent_users)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        let report = RunReport::new(run_id, today, eligible.len(), todays.len(), outcomes);

        tracing::info!(
            users_considered = report.users_considered,
            users_notified = report.users_notified,
            failed = report.failed_count(),
            "Notification run completed"
        );

        Ok(report)
    }

    /// Match and notify one user; `None` when nothing matched
    async fn notify_user(&self, user: &UserProfile, todays: &[Notice]) -> Option<RunOutcome> {
        let span = tracing::debug_span!("user", user_id = %user.id);

        let unique = span.in_scope(|| {
            let result = self.matcher.match_rules(&user.notification_preferences, todays);
            let unique = dedupe(result.matches);

            tracing::debug!(
                rules_evaluated = result.rules_evaluated,
                rules_skipped = result.rules_skipped,
                matched = unique.len(),
                "Matched notices"
            );
            unique
        });

        if unique.is_empty() {
            return None;
        }

        let message = self.composer.compose(&user.email, &unique);

        let outcome = match self.sink.send(&message).instrument(span).await {
            Ok(()) => {
                tracing::info!("Sent {} notices to {}", unique.len(), user.email);
                RunOutcome::sent(&user.email, unique.len())
            }
            Err(e) => {
                tracing::warn!("Failed to notify {}: {}", user.email, e);
                RunOutcome::failed(&user.email, unique.len(), e.to_string())
            }
        };

        Some(outcome)
    }
}

/// Reject batches whose notices lack a unique, non-empty id
fn validate_batch(batch: &[Notice]) -> Result<(), RunError> {
    let mut seen = HashSet::with_capacity(batch.len());

    for (index, notice) in batch.iter().enumerate() {
        if notice.id.trim().is_empty() {
            return Err(RunError::InvalidBatch(format!("notice #{} has an empty id", index)));
        }
        if !seen.insert(notice.id.as_str()) {
            return Err(RunError::InvalidBatch(format!("duplicate notice id {}", notice.id)));
        }
    }

    Ok(())
}
