use crate::models::AskedDonation;
use serde::Deserialize;

/// An eligible ask together with its score
#[derive(Debug, Clone, Copy)]
pub struct ScoredAsk<'a> {
    pub ask: &'a AskedDonation,
    pub score: f64,
}

/// Select stage of donation matching
///
/// Receives the scored asks in filter order and picks at most one. Must be
/// deterministic for a given input order.
pub trait MatchSelector: Send + Sync {
    fn select<'a>(&self, scored: Vec<ScoredAsk<'a>>) -> Option<&'a AskedDonation>;
}

/// Built-in select policies, selected by name from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectPolicy {
    /// Highest score wins, ties go to the first seen
    #[default]
    HighestScore,
}

impl SelectPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "highest-score" | "highestscore" | "highest_score" => Some(SelectPolicy::HighestScore),
            _ => None,
        }
    }
}

impl MatchSelector for SelectPolicy {
    fn select<'a>(&self, scored: Vec<ScoredAsk<'a>>) -> Option<&'a AskedDonation> {
        match self {
            SelectPolicy::HighestScore => highest_score(scored),
        }
    }
}

/// Pick the highest scoring ask
///
/// Stable sort, so equal scores keep their first-seen order. NaN scores
/// compare as equal.
pub fn highest_score<'a>(mut scored: Vec<ScoredAsk<'a>>) -> Option<&'a AskedDonation> {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.first().map(|s| s.ask)
}
