use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::core::{lifecycle, plan_commit, DonationMatcher, EngineError, EngineResult, OccupancyModel};
use crate::models::{AskedDonation, Collection, Donation, Request, RequestStatus, Shelter};
use crate::services::store::{fetch, fetch_all, DocumentStore, FieldFilter, WriteOp};

/// How often a lost race is re-evaluated before giving up
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling each time
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(50),
        }
    }
}

/// Result of trying to match one donation
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// The donation as stored after the attempt
    pub donation: Donation,
    /// The ask it was linked to, if any qualified
    pub ask: Option<AskedDonation>,
}

/// The transactional boundary around the pure engine
///
/// Every mutation is read → decide → commit with version preconditions. A
/// commit that loses a race is re-run from a fresh read, never replayed with
/// the stale inputs. Engine rejections are returned as-is.
pub struct Coordinator {
    store: Arc<dyn DocumentStore>,
    matcher: DonationMatcher,
    occupancy: OccupancyModel,
    retry: RetryPolicy,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        matcher: DonationMatcher,
        occupancy: OccupancyModel,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            matcher,
            occupancy,
            retry,
        }
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut attempt: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut tried = 0;

        loop {
            tried += 1;
            match attempt().await {
                Err(e) if e.is_retryable() && tried < max_attempts => {
                    let delay = self.retry.delay(tried);
                    tracing::warn!("{} attempt {}/{} lost a race ({}), retrying in {:?}", what, tried, max_attempts, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!("{} gave up after {} attempts: {}", what, tried, e);
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    async fn update_request<F>(&self, id: &str, decide: F) -> EngineResult<Request>
    where
        F: Fn(&Request) -> EngineResult<Request>,
    {
        let current = fetch::<Request, _>(self.store.as_ref(), Collection::Requests, id).await?;
        let next = decide(&current.value)?;
        self.store
            .commit(vec![WriteOp::replace(Collection::Requests, id, current.version, &next)?])
            .await?;
        Ok(next)
    }

    pub async fn assign_volunteer(&self, request_id: &str, volunteer_id: &str) -> EngineResult<Request> {
        let request = self
            .with_retry("assign_volunteer", || {
                self.update_request(request_id, |r| lifecycle::assign_volunteer(r, volunteer_id, Utc::now()))
            })
            .await?;

        tracing::info!("Request {} assigned to volunteer {}", request_id, volunteer_id);
        Ok(request)
    }

    pub async fn transition_request(&self, request_id: &str, status: RequestStatus) -> EngineResult<Request> {
        let request = self
            .with_retry("transition_request", || {
                self.update_request(request_id, |r| lifecycle::transition(r, status, Utc::now()))
            })
            .await?;

        tracing::info!("Request {} moved to {}", request_id, status);
        Ok(request)
    }

    pub async fn unassign_request(&self, request_id: &str) -> EngineResult<Request> {
        let request = self
            .with_retry("unassign_request", || self.update_request(request_id, lifecycle::unassign))
            .await?;

        tracing::info!("Request {} released back to pending", request_id);
        Ok(request)
    }

    async fn try_match(&self, donation_id: &str) -> EngineResult<MatchOutcome> {
        let donation = fetch::<Donation, _>(self.store.as_ref(), Collection::Donations, donation_id).await?;
        let asks = fetch_all::<AskedDonation, _>(
            self.store.as_ref(),
            Collection::Asks,
            &[FieldFilter::new("status", "pending")],
        )
        .await?;

        let candidates: Vec<AskedDonation> = asks.iter().map(|a| a.value.clone()).collect();
        let Some(chosen) = self.matcher.match_donation(&donation.value, &candidates) else {
            return Ok(MatchOutcome {
                donation: donation.value,
                ask: None,
            });
        };

        let ask_version = asks
            .iter()
            .find(|a| a.value.id == chosen.id)
            .map(|a| a.version)
            .ok_or_else(|| EngineError::Conflict(format!("ask {} vanished during matching", chosen.id)))?;

        let commit = plan_commit(&donation.value, chosen)?;
        self.store
            .commit(vec![
                WriteOp::replace(Collection::Donations, &commit.donation.id, donation.version, &commit.donation)?,
                WriteOp::replace(Collection::Asks, &commit.ask.id, ask_version, &commit.ask)?,
            ])
            .await?;

        Ok(MatchOutcome {
            donation: commit.donation,
            ask: Some(commit.ask),
        })
    }

    /// Link a donation to the best pending ask, committing both sides at once
    pub async fn match_donation(&self, donation_id: &str) -> EngineResult<MatchOutcome> {
        let outcome = self.with_retry("match_donation", || self.try_match(donation_id)).await?;

        match &outcome.ask {
            Some(ask) => tracing::info!("Donation {} matched to ask {}", donation_id, ask.id),
            None => tracing::info!("No pending ask for donation {}", donation_id),
        }
        Ok(outcome)
    }

    async fn try_occupancy(&self, shelter_id: &str, delta: i64) -> EngineResult<Shelter> {
        let current = fetch::<Shelter, _>(self.store.as_ref(), Collection::Shelters, shelter_id).await?;
        let next = self.occupancy.apply_occupancy_change(&current.value, delta);
        self.store
            .commit(vec![WriteOp::replace(Collection::Shelters, shelter_id, current.version, &next)?])
            .await?;
        Ok(next)
    }

    /// Book (`delta > 0`) or release (`delta < 0`) places at a shelter
    pub async fn apply_occupancy_change(&self, shelter_id: &str, delta: i64) -> EngineResult<Shelter> {
        let shelter = self
            .with_retry("apply_occupancy_change", || self.try_occupancy(shelter_id, delta))
            .await?;

        tracing::info!(
            "Shelter {} occupancy now {}/{} ({:?})",
            shelter_id,
            shelter.occupied,
            shelter.capacity,
            shelter.status
        );
        Ok(shelter)
    }
}
