//! Relief Engine - matching and state-transition core for emergency-aid coordination
//!
//! This library decides who gets which donation, how aid requests move through
//! their lifecycle, how full a shelter is, and what lies within reach of a
//! person. Decisions are pure functions; the [`services::Coordinator`] commits
//! them to the document store with optimistic concurrency.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    apply_occupancy_change, assign_volunteer, filter_within_radius, haversine_distance, transition, unassign,
    DonationMatcher, EngineError, EngineResult, OccupancyModel, Projection,
};
pub use crate::models::{AskedDonation, Donation, GeoPoint, Request, RequestStatus, Shelter, ShelterStatus};
pub use crate::services::{Coordinator, DocumentStore, InMemoryStore};
