use crate::models::{AskStatus, AskedDonation, Donation};
use serde::Deserialize;

/// Filter stage of donation matching
///
/// Decides whether an ask is eligible at all for a donation. Implementations
/// must be pure so the same inputs always yield the same candidate list.
pub trait MatchFilter: Send + Sync {
    fn accepts(&self, donation: &Donation, ask: &AskedDonation) -> bool;
}

/// Built-in filter policies, selected by name from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterPolicy {
    /// Pending asks of the donation's category
    #[default]
    CategoryMatch,
}

impl FilterPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "category-match" | "categorymatch" | "category_match" => Some(FilterPolicy::CategoryMatch),
            _ => None,
        }
    }
}

impl MatchFilter for FilterPolicy {
    #[inline]
    fn accepts(&self, donation: &Donation, ask: &AskedDonation) -> bool {
        match self {
            FilterPolicy::CategoryMatch => matches_category(donation, ask),
        }
    }
}

/// `ask.status == pending && ask.category == donation.category`
#[inline]
pub fn matches_category(donation: &Donation, ask: &AskedDonation) -> bool {
    ask.status == AskStatus::Pending && ask.category == donation.category
}

/// Keep the asks a filter accepts, preserving input order
pub fn filter_candidates<'a, F>(filter: &F, donation: &Donation, asks: &'a [AskedDonation]) -> Vec<&'a AskedDonation>
where
    F: MatchFilter + ?Sized,
{
    asks.iter().filter(|ask| filter.accepts(donation, ask)).collect()
}
