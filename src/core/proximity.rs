use crate::core::distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box, round_distance};
use crate::models::{GeoPoint, Geolocated, Ranked};

/// Default number of decimals kept on reported distances
pub const DEFAULT_DISTANCE_DECIMALS: u32 = 1;

/// Read-side ranking of geolocated entities around an observer
///
/// # Pipeline Stages
/// 1. Drop candidates without a location
/// 2. Bounding box pre-filter (skipped near poles and the antimeridian)
/// 3. Exact haversine distance against the radius
/// 4. Stable ascending sort by distance
///
/// Candidates are never mutated; the result holds clones annotated with the
/// rounded distance.
#[derive(Debug, Clone, Copy)]
pub struct ProximityFilter {
    distance_decimals: u32,
}

impl ProximityFilter {
    pub fn new(distance_decimals: u32) -> Self {
        Self { distance_decimals }
    }

    pub fn distance_decimals(&self) -> u32 {
        self.distance_decimals
    }

    /// Return every candidate within `radius_km` of `observer`, nearest first
    ///
    /// Inclusion is decided on the unrounded distance (`distance <= radius`),
    /// and ties keep their input order.
    pub fn filter_within_radius<T>(
        &self,
        observer: GeoPoint,
        candidates: &[T],
        radius_km: f64,
    ) -> Vec<Ranked<T>>
    where
        T: Geolocated + Clone,
    {
        if radius_km.is_nan() || radius_km < 0.0 {
            return Vec::new();
        }

        let bbox = calculate_bounding_box(observer, radius_km);

        let mut within: Vec<(f64, &T)> = candidates
            .iter()
            .filter_map(|candidate| candidate.location().map(|loc| (loc, candidate)))
            .filter(|(loc, _)| bbox.as_ref().map_or(true, |b| is_within_bounding_box(*loc, b)))
            .map(|(loc, candidate)| (haversine_distance(observer, loc), candidate))
            .filter(|(distance, _)| *distance <= radius_km)
            .collect();

        within.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        within
            .into_iter()
            .map(|(distance, candidate)| Ranked {
                item: candidate.clone(),
                distance_km: round_distance(distance, self.distance_decimals),
            })
            .collect()
    }
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE_DECIMALS)
    }
}

/// [`ProximityFilter::filter_within_radius`] with the default rounding
pub fn filter_within_radius<T>(observer: GeoPoint, candidates: &[T], radius_km: f64) -> Vec<Ranked<T>>
where
    T: Geolocated + Clone,
{
    ProximityFilter::default().filter_within_radius(observer, candidates, radius_km)
}
