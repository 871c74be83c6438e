use std::f64::consts::{FRAC_PI_2, PI};

use crate::models::BoundingBox;

/// Earth's mean radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack added to box edges so that floating-point rounding never drops a boundary point
const BOX_EPSILON_DEG: f64 = 1e-9;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whether a coordinate pair lies in the valid latitude/longitude ranges
#[inline]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Calculate a bounding box that contains every point within `radius_km` of the center
///
/// Uses the angular radius on the sphere, so the box is never smaller than the
/// haversine circle. When the circle reaches a pole or crosses the antimeridian
/// the box spans the full longitude range.
///
/// # Arguments
/// * `lat` - Center latitude in degrees
/// * `lon` - Center longitude in degrees
/// * `radius_km` - Radius in kilometers
///
/// # Returns
/// BoundingBox with min/max lat/lon
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let angular = radius_km.max(0.0) / EARTH_RADIUS_KM;
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();

    let mut min_lat = lat_rad - angular;
    let mut max_lat = lat_rad + angular;
    let (min_lon, max_lon);

    if angular < PI && min_lat > -FRAC_PI_2 && max_lat < FRAC_PI_2 {
        let delta_lon = (angular.sin() / lat_rad.cos()).asin();
        let lo = lon_rad - delta_lon;
        let hi = lon_rad + delta_lon;

        if lo < -PI || hi > PI {
            min_lon = -PI;
            max_lon = PI;
        } else {
            min_lon = lo;
            max_lon = hi;
        }
    } else {
        min_lat = min_lat.max(-FRAC_PI_2);
        max_lat = max_lat.min(FRAC_PI_2);
        min_lon = -PI;
        max_lon = PI;
    }

    BoundingBox {
        min_lat: min_lat.to_degrees() - BOX_EPSILON_DEG,
        max_lat: max_lat.to_degrees() + BOX_EPSILON_DEG,
        min_lon: min_lon.to_degrees() - BOX_EPSILON_DEG,
        max_lon: max_lon.to_degrees() + BOX_EPSILON_DEG,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(
    lat: f64,
    lon: f64,
    bbox: &BoundingBox,
) -> bool {
    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon >= bbox.min_lon
        && lon <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // Hradec Králové to Prague (approximately 100 km)
        let hk_lat = 50.2092;
        let hk_lon = 15.8328;
        let prague_lat = 50.0755;
        let prague_lon = 14.4378;

        let distance = haversine_distance(hk_lat, hk_lon, prague_lat, prague_lon);
        assert!((distance - 100.0).abs() < 5.0, "Distance should be ~100km, got {}", distance);
    }

    #[test]
    fn test_haversine_same_point_and_symmetry() {
        assert!(haversine_distance(50.2, 15.8, 50.2, 15.8).abs() < 1e-9);

        let ab = haversine_distance(50.2, 15.8, 50.0, 20.0);
        let ba = haversine_distance(50.0, 20.0, 50.2, 15.8);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_antipodal_is_half_circumference() {
        let distance = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!((distance - PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_valid_coordinates() {
        assert!(is_valid_coordinate(50.2, 15.8));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(90.1, 0.0));
        assert!(!is_valid_coordinate(0.0, -180.5));
        assert!(!is_valid_coordinate(f64::NAN, 0.0));
    }

    #[test]
    fn test_bounding_box() {
        let bbox = calculate_bounding_box(50.2, 15.8, 10.0);

        assert!(bbox.min_lat < 50.2);
        assert!(bbox.max_lat > 50.2);
        assert!(bbox.min_lon < 15.8);
        assert!(bbox.max_lon > 15.8);

        // 20km / ~111.2km per degree = ~0.18 degrees
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }

    #[test]
    fn test_bounding_box_near_pole_spans_all_longitudes() {
        let bbox = calculate_bounding_box(89.95, 10.0, 50.0);
        assert!(bbox.max_lat >= 90.0 - 1e-6);
        assert!(bbox.min_lon <= -180.0);
        assert!(bbox.max_lon >= 180.0);
    }

    #[test]
    fn test_bounding_box_across_antimeridian() {
        let bbox = calculate_bounding_box(0.0, 179.95, 50.0);
        assert!(is_within_bounding_box(0.0, -179.95, &bbox));
    }

    #[test]
    fn test_bounding_box_contains_circle_edge() {
        // Point due east at exactly the radius must stay inside the box
        let radius = 500.0;
        let lat = 60.0;
        let mut lon = 10.0;
        while haversine_distance(lat, 10.0, lat, lon) < radius {
            lon += 0.001;
        }
        lon -= 0.001;

        let bbox = calculate_bounding_box(lat, 10.0, radius);
        assert!(is_within_bounding_box(lat, lon, &bbox));
    }

    #[test]
    fn test_point_within_bbox() {
        let bbox = calculate_bounding_box(50.2, 15.8, 10.0);

        assert!(is_within_bounding_box(50.2, 15.8, &bbox));
        assert!(is_within_bounding_box(50.21, 15.85, &bbox));
        assert!(!is_within_bounding_box(51.0, 16.0, &bbox));
    }
}
