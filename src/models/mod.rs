// Model exports
pub mod documents;
pub mod domain;
pub mod requests;
pub mod responses;

pub use documents::{Collection, Document, SnapshotBatch, Versioned};
pub use domain::{
    AskStatus, AskedDonation, BoundingBox, Category, Donation, DonationStatus, GeoPoint, Geolocated, Ranked, Request,
    RequestStatus, Shelter, ShelterStatus, Urgency,
};
pub use requests::{AssignVolunteerRequest, NearbyQuery, OccupancyChangeRequest, TransitionRequest};
pub use responses::{ConsistencyResponse, ErrorResponse, HealthResponse, MatchResponse, NearbyResponse};
