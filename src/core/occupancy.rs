use crate::models::{Shelter, ShelterStatus};

/// Share of capacity above which a shelter reports `limited`
pub const DEFAULT_LIMITED_THRESHOLD: f64 = 0.8;

/// Derives shelter status from its occupancy counters
///
/// `occupied` is a saturating counter: any delta is clamped into
/// `[0, capacity]` instead of failing, so racing bookings can never push it
/// negative or past capacity.
#[derive(Debug, Clone, Copy)]
pub struct OccupancyModel {
    limited_threshold: f64,
}

impl OccupancyModel {
    pub fn new(limited_threshold: f64) -> Self {
        Self { limited_threshold }
    }

    pub fn limited_threshold(&self) -> f64 {
        self.limited_threshold
    }

    /// Status for a given (already clamped) occupancy
    ///
    /// - `occupied >= capacity` → full
    /// - `occupied > threshold × capacity` → limited
    /// - otherwise → open
    pub fn derive_status(&self, occupied: u32, capacity: u32) -> ShelterStatus {
        if occupied >= capacity {
            ShelterStatus::Full
        } else if f64::from(occupied) > self.limited_threshold * f64::from(capacity) {
            ShelterStatus::Limited
        } else {
            ShelterStatus::Open
        }
    }

    /// Clamp `occupied` into range and re-derive the status
    ///
    /// Idempotent: normalizing an already normalized shelter returns it as is.
    pub fn normalize(&self, shelter: &Shelter) -> Shelter {
        let occupied = shelter.occupied.min(shelter.capacity);
        Shelter {
            occupied,
            status: self.derive_status(occupied, shelter.capacity),
            ..shelter.clone()
        }
    }

    /// Apply a booking (`delta > 0`) or a departure (`delta < 0`)
    ///
    /// `new_occupied = max(0, min(capacity, occupied + delta))`
    pub fn apply_occupancy_change(&self, shelter: &Shelter, delta: i64) -> Shelter {
        let capacity = i64::from(shelter.capacity);
        let occupied = i64::from(shelter.occupied)
            .saturating_add(delta)
            .clamp(0, capacity);

        let occupied = u32::try_from(occupied).unwrap_or(shelter.capacity);
        Shelter {
            occupied,
            status: self.derive_status(occupied, shelter.capacity),
            ..shelter.clone()
        }
    }
}

impl Default for OccupancyModel {
    fn default() -> Self {
        Self::new(DEFAULT_LIMITED_THRESHOLD)
    }
}

/// [`OccupancyModel::apply_occupancy_change`] with the default threshold
pub fn apply_occupancy_change(shelter: &Shelter, delta: i64) -> Shelter {
    OccupancyModel::default().apply_occupancy_change(shelter, delta)
}

/// [`OccupancyModel::normalize`] with the default threshold
pub fn derive_status(shelter: &Shelter) -> Shelter {
    OccupancyModel::default().normalize(shelter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn shelter(capacity: u32, occupied: u32) -> Shelter {
        let mut s = Shelter {
            id: "S1".to_string(),
            name: "Community Hall".to_string(),
            capacity,
            occupied,
            status: ShelterStatus::Open,
            location: GeoPoint::new(28.6139, 77.2090),
        };
        s.status = OccupancyModel::default().derive_status(occupied.min(capacity), capacity);
        s
    }

    #[test]
    fn test_overbooking_saturates_at_full() {
        let s = apply_occupancy_change(&shelter(10, 8), 5);
        assert_eq!(s.occupied, 10);
        assert_eq!(s.status, ShelterStatus::Full);
    }

    #[test]
    fn test_ninety_percent_is_limited() {
        let s = apply_occupancy_change(&shelter(10, 0), 9);
        assert_eq!(s.occupied, 9);
        assert_eq!(s.status, ShelterStatus::Limited);
    }

    #[test]
    fn test_exactly_at_threshold_is_open() {
        let s = apply_occupancy_change(&shelter(10, 0), 8);
        assert_eq!(s.status, ShelterStatus::Open);
    }

    #[test]
    fn test_departures_saturate_at_zero() {
        let s = apply_occupancy_change(&shelter(10, 3), -7);
        assert_eq!(s.occupied, 0);
        assert_eq!(s.status, ShelterStatus::Open);
    }

    #[test]
    fn test_extreme_deltas_stay_in_range() {
        for delta in [i64::MIN, -1_000_000_000, -1, 0, 1, 1_000_000_000, i64::MAX] {
            for start in [0, 5, 10] {
                let s = apply_occupancy_change(&shelter(10, start), delta);
                assert!(s.occupied <= s.capacity, "delta {} overflowed", delta);
            }
        }
    }

    #[test]
    fn test_derive_status_is_idempotent() {
        for occupied in 0..=12 {
            let once = derive_status(&shelter(10, occupied));
            let twice = derive_status(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_zero_capacity_is_full() {
        let s = apply_occupancy_change(&shelter(0, 0), 3);
        assert_eq!(s.occupied, 0);
        assert_eq!(s.status, ShelterStatus::Full);
    }

    #[test]
    fn test_custom_threshold() {
        let model = OccupancyModel::new(0.5);
        assert_eq!(model.derive_status(6, 10), ShelterStatus::Limited);
        assert_eq!(model.derive_status(5, 10), ShelterStatus::Open);
    }
}
