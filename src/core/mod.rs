// Core algorithm exports
pub mod distance;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod matcher;
pub mod occupancy;
pub mod projection;
pub mod proximity;
pub mod scoring;
pub mod selection;

pub use distance::{haversine_distance, calculate_bounding_box, is_within_bounding_box, round_distance};
pub use error::{EngineError, EngineResult};
pub use filters::{FilterPolicy, MatchFilter};
pub use lifecycle::{assign_volunteer, transition, unassign};
pub use matcher::{plan_commit, DonationMatcher, MatchCommit};
pub use occupancy::{apply_occupancy_change, derive_status, OccupancyModel};
pub use projection::{ApplyOutcome, Inconsistency, Projection};
pub use proximity::{filter_within_radius, ProximityFilter};
pub use scoring::{MatchScorer, ScorePolicy};
pub use selection::{MatchSelector, ScoredAsk, SelectPolicy};
