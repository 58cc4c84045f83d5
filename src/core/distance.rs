use crate::models::{BoundingBox, GeoPoint};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack added to bounding boxes so points exactly on the radius survive
/// floating point rounding in the pre-filter.
const BBOX_EPSILON_DEG: f64 = 1e-6;

/// Calculate the Haversine distance between two points in kilometers
///
/// `a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlng/2)`,
/// `distance = 2·R·atan2(√a, √(1-a))`.
///
/// The evaluation order is fixed so results are reproducible bit for bit.
#[inline]
pub fn haversine_distance(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points.
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Calculate a bounding box that fully contains the circle of `radius_km`
/// around `center`
///
/// Returns `None` when the box would cross a pole or the antimeridian; the
/// caller should then skip the pre-filter and rely on the exact distance.
///
/// # Arguments
/// * `center` - Center point in degrees
/// * `radius_km` - Radius in kilometers
pub fn calculate_bounding_box(center: GeoPoint, radius_km: f64) -> Option<BoundingBox> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return None;
    }

    let angular = radius_km / EARTH_RADIUS_KM;
    if angular >= std::f64::consts::FRAC_PI_2 {
        return None;
    }

    let lat_delta = angular.to_degrees() + BBOX_EPSILON_DEG;
    let min_lat = center.lat - lat_delta;
    let max_lat = center.lat + lat_delta;
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return None;
    }

    // Widest longitude span of the circle, reached away from the center row.
    let ratio = angular.sin() / center.lat.to_radians().cos();
    if !(0.0..1.0).contains(&ratio) {
        return None;
    }
    let lng_delta = ratio.asin().to_degrees() + BBOX_EPSILON_DEG;
    let min_lng = center.lng - lng_delta;
    let max_lng = center.lng + lng_delta;
    if min_lng < -180.0 || max_lng > 180.0 {
        return None;
    }

    Some(BoundingBox {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    })
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: GeoPoint, bbox: &BoundingBox) -> bool {
    point.lat >= bbox.min_lat
        && point.lat <= bbox.max_lat
        && point.lng >= bbox.min_lng
        && point.lng <= bbox.max_lng
}

/// Round a distance to the given number of decimal places
#[inline]
pub fn round_distance(distance_km: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (distance_km * factor).round() / factor
}
