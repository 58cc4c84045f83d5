use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{Category, GeoPoint, RequestStatus};

/// Request to assign a volunteer to an aid request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssignVolunteerRequest {
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "volunteer_id", rename = "volunteerId")]
    pub volunteer_id: String,
}

/// Request to move an aid request to another status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub status: RequestStatus,
}

/// Booking (`delta > 0`) or departure (`delta < 0`) at a shelter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupancyChangeRequest {
    pub delta: i64,
}

/// Query string for the nearby views
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(range(min = 0.0, max = 20000.0))]
    #[serde(alias = "radius_km", rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl NearbyQuery {
    pub fn observer(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}
