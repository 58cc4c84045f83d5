use crate::core::error::{EngineError, EngineResult};
use crate::core::filters::{filter_candidates, FilterPolicy, MatchFilter};
use crate::core::scoring::{MatchScorer, ScorePolicy};
use crate::core::selection::{MatchSelector, ScoredAsk, SelectPolicy};
use crate::models::{AskStatus, AskedDonation, Donation, DonationStatus};

/// Both sides of a match, ready to be written in one transaction
///
/// Writing only one of the two records is an inconsistent state; the store
/// adapter commits `donation` and `ask` together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCommit {
    pub donation: Donation,
    pub ask: AskedDonation,
}

/// Pairs an incoming donation with one outstanding ask
///
/// # Pipeline Stages
/// 1. Filter: keep eligible asks (policy `F`)
/// 2. Score: rate each eligible ask (policy `S`)
/// 3. Select: pick one scored ask (policy `P`)
///
/// The matcher only decides. Persisting the decision is the caller's job,
/// see [`plan_commit`].
#[derive(Debug, Clone)]
pub struct DonationMatcher<F = FilterPolicy, S = ScorePolicy, P = SelectPolicy> {
    filter: F,
    scorer: S,
    selector: P,
}

impl<F, S, P> DonationMatcher<F, S, P>
where
    F: MatchFilter,
    S: MatchScorer,
    P: MatchSelector,
{
    pub fn new(filter: F, scorer: S, selector: P) -> Self {
        Self {
            filter,
            scorer,
            selector,
        }
    }

    pub fn filter_candidates<'a>(&self, donation: &Donation, asks: &'a [AskedDonation]) -> Vec<&'a AskedDonation> {
        filter_candidates(&self.filter, donation, asks)
    }

    pub fn score(&self, donation: &Donation, ask: &AskedDonation) -> f64 {
        self.scorer.score(donation, ask)
    }

    /// Find the ask this donation should be linked to
    ///
    /// Returns `None` when the donation is not available or no ask passes the
    /// filter.
    pub fn match_donation<'a>(&self, donation: &Donation, asks: &'a [AskedDonation]) -> Option<&'a AskedDonation> {
        if donation.status != DonationStatus::Available {
            return None;
        }

        let scored: Vec<ScoredAsk<'_>> = self
            .filter_candidates(donation, asks)
            .into_iter()
            .map(|ask| ScoredAsk {
                ask,
                score: self.score(donation, ask),
            })
            .collect();

        self.selector.select(scored)
    }
}

impl DonationMatcher {
    pub fn with_default_policies() -> Self {
        Self::new(FilterPolicy::default(), ScorePolicy::default(), SelectPolicy::default())
    }
}

impl Default for DonationMatcher {
    fn default() -> Self {
        Self::with_default_policies()
    }
}

/// Build the two-sided update for a match decision
///
/// Fails with [`EngineError::Conflict`] when either side has moved on since
/// it was read, which the caller handles by re-reading and matching again.
pub fn plan_commit(donation: &Donation, ask: &AskedDonation) -> EngineResult<MatchCommit> {
    if donation.status != DonationStatus::Available {
        return Err(EngineError::Conflict(format!(
            "donation {} is no longer available",
            donation.id
        )));
    }
    if ask.status != AskStatus::Pending {
        return Err(EngineError::Conflict(format!("ask {} is no longer pending", ask.id)));
    }

    let mut donation = donation.clone();
    donation.status = DonationStatus::Matched;
    donation.linked_ask_id = Some(ask.id.clone());

    let mut ask = ask.clone();
    ask.status = AskStatus::Matched;
    ask.matched_donation_id = Some(donation.id.clone());

    Ok(MatchCommit { donation, ask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{Duration, Utc};

    fn ask(id: &str, category: Category) -> AskedDonation {
        AskedDonation::new(id, category)
    }

    #[test]
    fn test_match_by_category() {
        let matcher = DonationMatcher::with_default_policies();
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let asks = vec![ask("M1", Category::Medical), ask("A1", Category::Food)];

        let winner = matcher.match_donation(&donation, &asks).unwrap();
        assert_eq!(winner.id, "A1");
    }

    #[test]
    fn test_no_candidate_returns_none() {
        let matcher = DonationMatcher::with_default_policies();
        let donation = Donation::new("D1", Category::Clothing, 5, Utc::now());
        let asks = vec![ask("M1", Category::Medical), ask("F1", Category::Food)];

        assert!(matcher.match_donation(&donation, &asks).is_none());
        assert!(matcher.match_donation(&donation, &[]).is_none());
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let matcher = DonationMatcher::with_default_policies();
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let asks = vec![ask("A1", Category::Food), ask("A2", Category::Food), ask("A3", Category::Food)];

        for _ in 0..10 {
            assert_eq!(matcher.match_donation(&donation, &asks).unwrap().id, "A1");
        }
    }

    #[test]
    fn test_unavailable_donation_never_matches() {
        let matcher = DonationMatcher::with_default_policies();
        let mut donation = Donation::new("D1", Category::Food, 5, Utc::now());
        donation.status = DonationStatus::Claimed;

        assert!(matcher.match_donation(&donation, &[ask("A1", Category::Food)]).is_none());
    }

    #[test]
    fn test_wait_time_policy_picks_oldest() {
        let now = Utc::now();
        let matcher = DonationMatcher::new(FilterPolicy::CategoryMatch, ScorePolicy::WaitTime, SelectPolicy::HighestScore);
        let donation = Donation::new("D1", Category::Food, 5, now);

        let mut newer = ask("newer", Category::Food);
        newer.created_at = Some(now - Duration::minutes(10));
        let mut older = ask("older", Category::Food);
        older.created_at = Some(now - Duration::days(2));

        let asks = vec![newer, older];
        assert_eq!(matcher.match_donation(&donation, &asks).unwrap().id, "older");
    }

    #[test]
    fn test_custom_scorer_plugs_in() {
        struct PreferId(&'static str);
        impl MatchScorer for PreferId {
            fn score(&self, _donation: &Donation, ask: &AskedDonation) -> f64 {
                if ask.id == self.0 { 10.0 } else { 0.0 }
            }
        }

        let matcher = DonationMatcher::new(FilterPolicy::CategoryMatch, PreferId("A2"), SelectPolicy::HighestScore);
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let asks = vec![ask("A1", Category::Food), ask("A2", Category::Food)];

        assert_eq!(matcher.match_donation(&donation, &asks).unwrap().id, "A2");
    }

    #[test]
    fn test_custom_selector_plugs_in() {
        struct LastSeen;
        impl MatchSelector for LastSeen {
            fn select<'a>(&self, scored: Vec<ScoredAsk<'a>>) -> Option<&'a AskedDonation> {
                scored.last().map(|s| s.ask)
            }
        }

        let matcher = DonationMatcher::new(FilterPolicy::CategoryMatch, ScorePolicy::Uniform, LastSeen);
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let asks = vec![
            ask("A1", Category::Food),
            ask("M1", Category::Medical),
            ask("A2", Category::Food),
        ];

        assert_eq!(matcher.match_donation(&donation, &asks).unwrap().id, "A2");
        assert!(matcher.match_donation(&donation, &[ask("M1", Category::Medical)]).is_none());
    }

    #[test]
    fn test_plan_commit_links_both_sides() {
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let target = ask("A1", Category::Food);

        let commit = plan_commit(&donation, &target).unwrap();
        assert_eq!(commit.donation.status, DonationStatus::Matched);
        assert_eq!(commit.donation.linked_ask_id.as_deref(), Some("A1"));
        assert_eq!(commit.ask.status, AskStatus::Matched);
        assert_eq!(commit.ask.matched_donation_id.as_deref(), Some("D1"));
    }

    #[test]
    fn test_plan_commit_rejects_stale_ask() {
        let donation = Donation::new("D1", Category::Food, 5, Utc::now());
        let mut taken = ask("A1", Category::Food);
        taken.status = AskStatus::Matched;
        taken.matched_donation_id = Some("D0".to_string());

        assert!(matches!(plan_commit(&donation, &taken), Err(EngineError::Conflict(_))));
    }
}
