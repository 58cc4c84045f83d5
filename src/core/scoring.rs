use crate::models::{AskedDonation, Donation};
use serde::Deserialize;

/// Score stage of donation matching
///
/// Higher scores win. Scores only need to be comparable with each other for
/// a single donation.
pub trait MatchScorer: Send + Sync {
    fn score(&self, donation: &Donation, ask: &AskedDonation) -> f64;
}

/// Built-in score policies, selected by name from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    /// Every eligible ask scores the same; first seen wins
    #[default]
    Uniform,
    /// Asks that have waited longest relative to the donation win
    WaitTime,
}

impl ScorePolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "uniform" | "constant" => Some(ScorePolicy::Uniform),
            "wait-time" | "waittime" | "wait_time" => Some(ScorePolicy::WaitTime),
            _ => None,
        }
    }
}

impl MatchScorer for ScorePolicy {
    #[inline]
    fn score(&self, donation: &Donation, ask: &AskedDonation) -> f64 {
        match self {
            ScorePolicy::Uniform => 1.0,
            ScorePolicy::WaitTime => wait_time_score(donation, ask),
        }
    }
}

/// Seconds the ask had been open when the donation arrived
///
/// Asks with no creation time score 0, behind anything that had been waiting.
#[inline]
fn wait_time_score(donation: &Donation, ask: &AskedDonation) -> f64 {
    ask.created_at
        .map(|created| (donation.created_at - created).num_seconds() as f64)
        .unwrap_or(0.0)
}
