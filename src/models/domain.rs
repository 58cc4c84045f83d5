use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Anything that may carry a location and can be ranked by distance
pub trait Geolocated {
    fn location(&self) -> Option<GeoPoint>;
}

/// Resource category shared by requests, donations and asks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Medical,
    Food,
    Shelter,
    Transport,
    Clothing,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Medical => "medical",
            Category::Food => "food",
            Category::Shelter => "shelter",
            Category::Transport => "transport",
            Category::Clothing => "clothing",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of an aid request
///
/// `in-progress` is the single canonical state for "a volunteer holds this
/// request". The legacy `assigned` spelling is accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress", alias = "assigned", alias = "in_progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Resolved | RequestStatus::Cancelled)
    }

    /// Whether a request in this status must carry an assigned volunteer
    pub fn requires_volunteer(&self) -> bool {
        matches!(self, RequestStatus::InProgress | RequestStatus::Resolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Resolved => "resolved",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An aid request raised by a requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub category: Category,
    pub urgency: Urgency,
    pub status: RequestStatus,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "assignedVolunteerId", default)]
    pub assigned_volunteer_id: Option<String>,
    #[serde(rename = "assignedAt", default)]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(rename = "resolvedAt", default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub panic: bool,
    #[serde(rename = "requesterId", default)]
    pub requester_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Request {
    /// A fresh pending request with no assignment
    pub fn new(id: impl Into<String>, category: Category, urgency: Urgency, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            category,
            urgency,
            status: RequestStatus::Pending,
            location: None,
            created_at,
            assigned_volunteer_id: None,
            assigned_at: None,
            resolved_at: None,
            panic: false,
            requester_id: None,
            description: None,
        }
    }

    /// `assignedVolunteerId` is set iff the status requires a volunteer
    pub fn assignment_consistent(&self) -> bool {
        self.assigned_volunteer_id.is_some() == self.status.requires_volunteer()
    }
}

impl Geolocated for Request {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Available,
    Claimed,
    Matched,
}

/// An offered resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub category: Category,
    pub quantity: u32,
    pub status: DonationStatus,
    #[serde(rename = "linkedAskId", default)]
    pub linked_ask_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(rename = "donorId", default)]
    pub donor_id: Option<String>,
}

impl Donation {
    pub fn new(id: impl Into<String>, category: Category, quantity: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            category,
            quantity,
            status: DonationStatus::Available,
            linked_ask_id: None,
            created_at,
            location: None,
            donor_id: None,
        }
    }
}

impl Geolocated for Donation {
    fn location(&self) -> Option<GeoPoint> {
        self.location
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AskStatus {
    Pending,
    Matched,
    Cancelled,
}

/// A requester's ask for a resource of a given category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskedDonation {
    pub id: String,
    pub category: Category,
    pub status: AskStatus,
    #[serde(rename = "matchedDonationId", default)]
    pub matched_donation_id: Option<String>,
    #[serde(rename = "requesterId", default)]
    pub requester_id: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AskedDonation {
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            category,
            status: AskStatus::Pending,
            matched_donation_id: None,
            requester_id: None,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShelterStatus {
    Open,
    Limited,
    Full,
}

/// A capacity-bounded shelter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub capacity: u32,
    pub occupied: u32,
    pub status: ShelterStatus,
    pub location: GeoPoint,
}

impl Geolocated for Shelter {
    fn location(&self) -> Option<GeoPoint> {
        Some(self.location)
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// A candidate annotated with its distance from the observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}
