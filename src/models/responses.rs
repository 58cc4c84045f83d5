use serde::{Deserialize, Serialize};

use crate::core::projection::Inconsistency;
use crate::models::domain::{AskedDonation, Donation, Ranked};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub generation: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

/// Outcome of a match attempt for one donation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub matched: bool,
    pub donation: Donation,
    pub ask: Option<AskedDonation>,
}

/// A ranked nearby view, tagged with the projection state it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResponse<T> {
    pub results: Vec<Ranked<T>>,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyResponse {
    pub generation: u64,
    pub consistent: bool,
    pub issues: Vec<Inconsistency>,
}
