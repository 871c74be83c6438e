use crate::models::{BoundingBox, Notice, PreferenceRule};
use super::distance::{haversine_distance, is_within_bounding_box};

/// Check if the notice's category is one the rule asks for
#[inline]
pub fn matches_category(notice: &Notice, rule: &PreferenceRule) -> bool {
    rule.categories.contains(&notice.category)
}

/// Check if the notice lies within the rule's radius
///
/// Notices without coordinates never match. `bbox` must be the rule's bounding
/// box and only serves as a cheap pre-filter before the haversine check.
#[inline]
pub fn matches_radius(notice: &Notice, rule: &PreferenceRule, bbox: &BoundingBox) -> bool {
    let Some(coords) = notice.coordinates else {
        return false;
    };

    if !is_within_bounding_box(coords.latitude, coords.longitude, bbox) {
        return false;
    }

    let distance_km = haversine_distance(
        rule.center.latitude,
        rule.center.longitude,
        coords.latitude,
        coords.longitude,
    );

    distance_km <= rule.radius_km
}

/// Check if a notice satisfies a single preference rule
#[inline]
pub fn matches_rule(notice: &Notice, rule: &PreferenceRule, bbox: &BoundingBox) -> bool {
    matches_category(notice, rule) && matches_radius(notice, rule, bbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distance::calculate_bounding_box;
    use crate::models::{Category, Coordinates};

    fn create_test_notice(category: Category, coordinates: Option<(f64, f64)>) -> Notice {
        Notice {
            id: "notice-1".to_string(),
            category,
            publication_date: Some("2024-01-02".to_string()),
            coordinates: coordinates.map(|(lat, lon)| Coordinates::new(lat, lon)),
            title: "Test notice".to_string(),
            url: "https://example.com/1".to_string(),
            place: None,
            relevance_score: None,
            board_index: None,
        }
    }

    fn create_test_rule() -> PreferenceRule {
        PreferenceRule::new([Category::Economy], Coordinates::new(50.0, 15.0), 10.0)
    }

    fn bbox_for(rule: &PreferenceRule) -> BoundingBox {
        calculate_bounding_box(rule.center.latitude, rule.center.longitude, rule.radius_km)
    }

    #[test]
    fn test_nearby_notice_matches() {
        let rule = create_test_rule();
        let notice = create_test_notice(Category::Economy, Some((50.05, 15.02)));

        assert!(matches_rule(&notice, &rule, &bbox_for(&rule)));
    }

    #[test]
    fn test_distant_notice_does_not_match() {
        let rule = create_test_rule();
        let notice = create_test_notice(Category::Economy, Some((51.0, 16.0)));

        assert!(!matches_rule(&notice, &rule, &bbox_for(&rule)));
    }

    #[test]
    fn test_other_category_does_not_match() {
        let rule = create_test_rule();
        let notice = create_test_notice(Category::Health, Some((50.0, 15.0)));

        assert!(!matches_category(&notice, &rule));
        assert!(!matches_rule(&notice, &rule, &bbox_for(&rule)));
    }

    #[test]
    fn test_notice_without_coordinates_never_matches() {
        let mut rule = create_test_rule();
        rule.radius_km = 20000.0;
        let notice = create_test_notice(Category::Economy, None);

        assert!(!matches_rule(&notice, &rule, &bbox_for(&rule)));
    }

    #[test]
    fn test_zero_radius_matches_exact_center() {
        let mut rule = create_test_rule();
        rule.radius_km = 0.0;
        let notice = create_test_notice(Category::Economy, Some((50.0, 15.0)));

        assert!(matches_rule(&notice, &rule, &bbox_for(&rule)));
    }
}
