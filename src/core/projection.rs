//! Derived state rebuilt from full collection snapshots.
//!
//! The external feed pushes the complete monitored set on every change.
//! [`Projection::apply`] replaces the working set for that collection and
//! never merges; every derived view is computed from scratch on demand.
//!
//! Collections arrive independently, so cross-entity links (a matched
//! donation and its ask) can be briefly out of step. They are checked with
//! [`Projection::validate_links`], never assumed.
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::occupancy::OccupancyModel;
use crate::core::proximity::ProximityFilter;
use crate::models::{
    AskStatus, AskedDonation, Category, Collection, Document, Donation, DonationStatus, GeoPoint, Ranked,
    Request, RequestStatus, Shelter, ShelterStatus, SnapshotBatch,
};

/// One collection's working set and the sequence it was taken at
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    sequence: Option<u64>,
    items: Vec<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            sequence: None,
            items: Vec::new(),
        }
    }
}

impl<T> Snapshot<T> {
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    fn is_stale(&self, sequence: u64) -> bool {
        self.sequence.map_or(false, |current| sequence <= current)
    }
}

/// What happened to a delivered batch
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The batch replaced the working set. `rejected` lists ids of documents
    /// that could not be decoded and were left out.
    Applied { accepted: usize, rejected: Vec<String> },
    /// The batch was older than (or a repeat of) what is already applied
    Stale { current: u64 },
}

/// A cross-entity link that does not hold in the current projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Inconsistency {
    /// `linkedAskId` set without `matched` status, or the reverse
    DonationLinkMismatch { donation_id: String },
    /// `matchedDonationId` set without `matched` status, or the reverse
    AskLinkMismatch { ask_id: String },
    /// A matched donation points at an ask that is not in the snapshot
    MissingAsk { donation_id: String, ask_id: String },
    /// A matched ask points at a donation that is not in the snapshot
    MissingDonation { ask_id: String, donation_id: String },
    /// The two sides of a match do not point at each other
    BrokenBacklink { donation_id: String, ask_id: String },
    /// `assignedVolunteerId` disagrees with the request status
    RequestAssignment { request_id: String, status: RequestStatus },
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    requests: Snapshot<Request>,
    donations: Snapshot<Donation>,
    asks: Snapshot<AskedDonation>,
    shelters: Snapshot<Shelter>,
    generation: u64,
    proximity: ProximityFilter,
    occupancy: OccupancyModel,
}

fn decode_all<T: DeserializeOwned>(documents: &[Document]) -> (Vec<T>, Vec<String>) {
    let mut items = Vec::with_capacity(documents.len());
    let mut rejected = Vec::new();
    for doc in documents {
        match doc.decode::<T>() {
            Ok(versioned) => items.push(versioned.value),
            Err(_) => rejected.push(doc.id.clone()),
        }
    }
    (items, rejected)
}

fn replace<T: DeserializeOwned>(snapshot: &mut Snapshot<T>, batch: &SnapshotBatch) -> ApplyOutcome {
    if snapshot.is_stale(batch.sequence) {
        return ApplyOutcome::Stale {
            current: snapshot.sequence.unwrap_or_default(),
        };
    }
    let (items, rejected) = decode_all(&batch.documents);
    let accepted = items.len();
    snapshot.items = items;
    snapshot.sequence = Some(batch.sequence);
    ApplyOutcome::Applied { accepted, rejected }
}

impl Projection {
    pub fn new(proximity: ProximityFilter, occupancy: OccupancyModel) -> Self {
        Self {
            proximity,
            occupancy,
            ..Self::default()
        }
    }

    /// Replace the working set of the batch's collection
    pub fn apply(&mut self, batch: &SnapshotBatch) -> ApplyOutcome {
        let outcome = match batch.collection {
            Collection::Requests => replace(&mut self.requests, batch),
            Collection::Donations => replace(&mut self.donations, batch),
            Collection::Asks => replace(&mut self.asks, batch),
            Collection::Shelters => {
                let outcome = replace(&mut self.shelters, batch);
                if matches!(outcome, ApplyOutcome::Applied { .. }) {
                    let model = self.occupancy;
                    for shelter in &mut self.shelters.items {
                        *shelter = model.normalize(shelter);
                    }
                }
                outcome
            }
        };

        if matches!(outcome, ApplyOutcome::Applied { .. }) {
            self.generation += 1;
        }
        outcome
    }

    /// Bumped on every applied batch; identifies a projection state
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sequence(&self, collection: Collection) -> Option<u64> {
        match collection {
            Collection::Requests => self.requests.sequence(),
            Collection::Donations => self.donations.sequence(),
            Collection::Asks => self.asks.sequence(),
            Collection::Shelters => self.shelters.sequence(),
        }
    }

    pub fn requests(&self) -> &[Request] {
        self.requests.items()
    }

    pub fn donations(&self) -> &[Donation] {
        self.donations.items()
    }

    pub fn asks(&self) -> &[AskedDonation] {
        self.asks.items()
    }

    pub fn shelters(&self) -> &[Shelter] {
        self.shelters.items()
    }

    /// Pending requests within `radius_km`, nearest first
    pub fn pending_requests_near(&self, observer: GeoPoint, radius_km: f64) -> Vec<Ranked<Request>> {
        let pending: Vec<Request> = self
            .requests
            .items
            .iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        self.proximity.filter_within_radius(observer, &pending, radius_km)
    }

    /// Open panic requests, oldest first
    pub fn panic_requests(&self) -> Vec<&Request> {
        let mut panics: Vec<&Request> = self
            .requests
            .items
            .iter()
            .filter(|r| r.panic && !r.status.is_terminal())
            .collect();
        panics.sort_by_key(|r| r.created_at);
        panics
    }

    /// Available donations, optionally restricted to one category
    pub fn available_donations(&self, category: Option<Category>) -> Vec<&Donation> {
        self.donations
            .items
            .iter()
            .filter(|d| d.status == DonationStatus::Available)
            .filter(|d| category.map_or(true, |c| d.category == c))
            .collect()
    }

    pub fn available_donations_near(
        &self,
        observer: GeoPoint,
        radius_km: f64,
        category: Option<Category>,
    ) -> Vec<Ranked<Donation>> {
        let available: Vec<Donation> = self.available_donations(category).into_iter().cloned().collect();
        self.proximity.filter_within_radius(observer, &available, radius_km)
    }

    /// Shelters that are not full within `radius_km`, nearest first
    pub fn shelters_with_space_near(&self, observer: GeoPoint, radius_km: f64) -> Vec<Ranked<Shelter>> {
        let open: Vec<Shelter> = self
            .shelters
            .items
            .iter()
            .filter(|s| s.status != ShelterStatus::Full)
            .cloned()
            .collect();
        self.proximity.filter_within_radius(observer, &open, radius_km)
    }

    /// Check every cross-entity link the store is expected to keep
    pub fn validate_links(&self) -> Vec<Inconsistency> {
        let mut found = Vec::new();

        let asks: HashMap<&str, &AskedDonation> = self.asks.items.iter().map(|a| (a.id.as_str(), a)).collect();
        let donations: HashMap<&str, &Donation> =
            self.donations.items.iter().map(|d| (d.id.as_str(), d)).collect();

        for donation in &self.donations.items {
            let matched = donation.status == DonationStatus::Matched;
            match (&donation.linked_ask_id, matched) {
                (Some(ask_id), true) => match asks.get(ask_id.as_str()) {
                    None => found.push(Inconsistency::MissingAsk {
                        donation_id: donation.id.clone(),
                        ask_id: ask_id.clone(),
                    }),
                    Some(ask) => {
                        if ask.status != AskStatus::Matched
                            || ask.matched_donation_id.as_deref() != Some(donation.id.as_str())
                        {
                            found.push(Inconsistency::BrokenBacklink {
                                donation_id: donation.id.clone(),
                                ask_id: ask_id.clone(),
                            });
                        }
                    }
                },
                (None, false) => {}
                _ => found.push(Inconsistency::DonationLinkMismatch {
                    donation_id: donation.id.clone(),
                }),
            }
        }

        for ask in &self.asks.items {
            let matched = ask.status == AskStatus::Matched;
            match (&ask.matched_donation_id, matched) {
                (Some(donation_id), true) => match donations.get(donation_id.as_str()) {
                    None => found.push(Inconsistency::MissingDonation {
                        ask_id: ask.id.clone(),
                        donation_id: donation_id.clone(),
                    }),
                    Some(donation) => {
                        let linked_back = donation.status == DonationStatus::Matched
                            && donation.linked_ask_id.as_deref() == Some(ask.id.as_str());
                        let issue = Inconsistency::BrokenBacklink {
                            donation_id: donation_id.clone(),
                            ask_id: ask.id.clone(),
                        };
                        if !linked_back && !found.contains(&issue) {
                            found.push(issue);
                        }
                    }
                },
                (None, false) => {}
                _ => found.push(Inconsistency::AskLinkMismatch { ask_id: ask.id.clone() }),
            }
        }

        for request in &self.requests.items {
            if !request.assignment_consistent() {
                found.push(Inconsistency::RequestAssignment {
                    request_id: request.id.clone(),
                    status: request.status,
                });
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;
    use chrono::Utc;
    use serde_json::json;

    fn doc<T: Serialize>(id: &str, value: &T) -> Document {
        Document {
            id: id.to_string(),
            version: 1,
            data: serde_json::to_value(value).unwrap(),
        }
    }

    fn batch(collection: Collection, sequence: u64, documents: Vec<Document>) -> SnapshotBatch {
        SnapshotBatch {
            collection,
            sequence,
            documents,
        }
    }

    fn request_at(id: &str, lat: f64, lng: f64) -> Request {
        let mut r = Request::new(id, Category::Medical, Urgency::High, Utc::now());
        r.location = Some(GeoPoint::new(lat, lng));
        r
    }

    #[test]
    fn test_batches_replace_not_merge() {
        let mut projection = Projection::default();

        let first = vec![doc("R1", &request_at("R1", 1.0, 1.0)), doc("R2", &request_at("R2", 1.0, 1.0))];
        projection.apply(&batch(Collection::Requests, 1, first));
        assert_eq!(projection.requests().len(), 2);

        let second = vec![doc("R3", &request_at("R3", 1.0, 1.0))];
        projection.apply(&batch(Collection::Requests, 2, second));

        let ids: Vec<_> = projection.requests().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R3"]);
    }

    #[test]
    fn test_stale_batches_dropped() {
        let mut projection = Projection::default();
        projection.apply(&batch(Collection::Requests, 5, vec![doc("R1", &request_at("R1", 1.0, 1.0))]));
        let generation = projection.generation();

        let outcome = projection.apply(&batch(Collection::Requests, 4, vec![]));
        assert_eq!(outcome, ApplyOutcome::Stale { current: 5 });

        let outcome = projection.apply(&batch(Collection::Requests, 5, vec![]));
        assert_eq!(outcome, ApplyOutcome::Stale { current: 5 });

        assert_eq!(projection.requests().len(), 1);
        assert_eq!(projection.generation(), generation);
    }

    #[test]
    fn test_collections_sequence_independently() {
        let mut projection = Projection::default();
        projection.apply(&batch(Collection::Requests, 10, vec![]));
        let outcome = projection.apply(&batch(Collection::Shelters, 1, vec![]));

        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));
        assert_eq!(projection.sequence(Collection::Requests), Some(10));
        assert_eq!(projection.sequence(Collection::Shelters), Some(1));
    }

    #[test]
    fn test_undecodable_documents_rejected() {
        let mut projection = Projection::default();
        let broken = Document {
            id: "bad".to_string(),
            version: 1,
            data: json!({"id": "bad", "category": "spaceship"}),
        };
        let outcome = projection.apply(&batch(
            Collection::Requests,
            1,
            vec![broken, doc("R1", &request_at("R1", 0.0, 0.0))],
        ));

        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                accepted: 1,
                rejected: vec!["bad".to_string()]
            }
        );
    }

    #[test]
    fn test_pending_requests_near() {
        let mut projection = Projection::default();
        let mut taken = request_at("taken", 40.7128, -74.0060);
        taken.status = RequestStatus::InProgress;
        taken.assigned_volunteer_id = Some("V1".to_string());

        projection.apply(&batch(
            Collection::Requests,
            1,
            vec![
                doc("near", &request_at("near", 40.72, -74.01)),
                doc("far", &request_at("far", 45.0, -74.0)),
                doc("taken", &taken),
            ],
        ));

        let near = projection.pending_requests_near(GeoPoint::new(40.7128, -74.0060), 25.0);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].item.id, "near");
    }

    #[test]
    fn test_shelter_status_rederived_on_ingest() {
        let mut projection = Projection::default();
        let drifted = Shelter {
            id: "S1".to_string(),
            name: "Gym".to_string(),
            capacity: 10,
            occupied: 10,
            status: ShelterStatus::Open,
            location: GeoPoint::new(0.0, 0.0),
        };
        projection.apply(&batch(Collection::Shelters, 1, vec![doc("S1", &drifted)]));

        assert_eq!(projection.shelters()[0].status, ShelterStatus::Full);
        assert!(projection.shelters_with_space_near(GeoPoint::new(0.0, 0.0), 5.0).is_empty());
    }

    #[test]
    fn test_validate_links_reports_half_committed_match() {
        let mut projection = Projection::default();

        let mut donation = Donation::new("D1", Category::Food, 3, Utc::now());
        donation.status = DonationStatus::Matched;
        donation.linked_ask_id = Some("A1".to_string());
        let ask = AskedDonation::new("A1", Category::Food);

        projection.apply(&batch(Collection::Donations, 1, vec![doc("D1", &donation)]));
        assert_eq!(
            projection.validate_links(),
            vec![Inconsistency::MissingAsk {
                donation_id: "D1".to_string(),
                ask_id: "A1".to_string()
            }]
        );

        // The ask collection arrives later, still pending
        projection.apply(&batch(Collection::Asks, 1, vec![doc("A1", &ask)]));
        assert_eq!(
            projection.validate_links(),
            vec![Inconsistency::BrokenBacklink {
                donation_id: "D1".to_string(),
                ask_id: "A1".to_string()
            }]
        );

        // Then catches up
        let mut matched = ask.clone();
        matched.status = AskStatus::Matched;
        matched.matched_donation_id = Some("D1".to_string());
        projection.apply(&batch(Collection::Asks, 2, vec![doc("A1", &matched)]));
        assert!(projection.validate_links().is_empty());
    }

    #[test]
    fn test_validate_links_reports_request_assignment() {
        let mut projection = Projection::default();
        let mut broken = request_at("R1", 0.0, 0.0);
        broken.assigned_volunteer_id = Some("V1".to_string());

        projection.apply(&batch(Collection::Requests, 1, vec![doc("R1", &broken)]));
        assert_eq!(
            projection.validate_links(),
            vec![Inconsistency::RequestAssignment {
                request_id: "R1".to_string(),
                status: RequestStatus::Pending
            }]
        );
    }

    #[test]
    fn test_panic_requests_oldest_first() {
        let mut projection = Projection::default();
        let mut older = request_at("older", 0.0, 0.0);
        older.panic = true;
        older.created_at = Utc::now() - chrono::Duration::minutes(30);
        let mut newer = request_at("newer", 0.0, 0.0);
        newer.panic = true;
        let calm = request_at("calm", 0.0, 0.0);

        projection.apply(&batch(
            Collection::Requests,
            1,
            vec![doc("newer", &newer), doc("calm", &calm), doc("older", &older)],
        ));

        let ids: Vec<_> = projection.panic_requests().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["older", "newer"]);
    }

    #[test]
    fn test_available_donations_by_category() {
        let mut projection = Projection::default();
        let food = Donation::new("D1", Category::Food, 3, Utc::now());
        let blankets = Donation::new("D2", Category::Clothing, 3, Utc::now());

        projection.apply(&batch(
            Collection::Donations,
            1,
            vec![doc("D1", &food), doc("D2", &blankets)],
        ));

        assert_eq!(projection.available_donations(None).len(), 2);
        let only_food = projection.available_donations(Some(Category::Food));
        assert_eq!(only_food.len(), 1);
        assert_eq!(only_food[0].id, "D1");
    }
}
