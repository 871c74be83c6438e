use crate::models::{Notice, PreferenceRule};
use crate::core::{
    distance::calculate_bounding_box,
    filters::matches_rule,
};

/// Result of evaluating one user's rules
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// Matched notices, one entry per satisfied rule (not deduplicated)
    pub matches: Vec<&'a Notice>,
    pub rules_evaluated: usize,
    pub rules_skipped: usize,
}

/// Evaluates a user's preference rules against today's notices
///
/// # Pipeline Stages
/// 1. Rule validation (invalid rules are skipped with a warning)
/// 2. Category filter
/// 3. Geospatial bounding box pre-filter
/// 4. Haversine radius check
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    /// Find the notices that satisfy at least one rule
    ///
    /// Rules are evaluated in list order and results are concatenated, so a
    /// notice satisfying two rules appears twice. Uniqueness is the job of
    /// [`crate::core::dedup::dedupe`].
    ///
    /// # Arguments
    /// * `rules` - The user's saved preference rules
    /// * `candidates` - Notices published today
    pub fn match_rules<'a>(
        &self,
        rules: &[PreferenceRule],
        candidates: &'a [Notice],
    ) -> MatchResult<'a> {
        let mut matches = Vec::new();
        let mut rules_evaluated = 0;
        let mut rules_skipped = 0;

        for (index, rule) in rules.iter().enumerate() {
            if let Some(reason) = rule.invalid_reason() {
                tracing::warn!(
                    rule = index,
                    latitude = rule.center.latitude,
                    longitude = rule.center.longitude,
                    radius_km = rule.radius_km,
                    "Skipping preference rule: {}",
                    reason
                );
                rules_skipped += 1;
                continue;
            }

            let bbox = calculate_bounding_box(
                rule.center.latitude,
                rule.center.longitude,
                rule.radius_km,
            );

            let before = matches.len();
            matches.extend(
                candidates
                    .iter()
                    .filter(|notice| matches_rule(notice, rule, &bbox)),
            );
            rules_evaluated += 1;

            tracing::trace!(rule = index, matched = matches.len() - before, "Rule evaluated");
        }

        MatchResult {
            matches,
            rules_evaluated,
            rules_skipped,
        }
    }
}
