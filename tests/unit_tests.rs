// Unit tests for the relief engine

use chrono::{TimeZone, Utc};
use relief_engine::core::{
    apply_occupancy_change, assign_volunteer, derive_status, filter_within_radius, haversine_distance, transition,
    unassign, DonationMatcher, EngineError,
};
use relief_engine::models::{
    AskStatus, AskedDonation, Category, Donation, GeoPoint, Geolocated, Request, RequestStatus, Shelter,
    ShelterStatus, Urgency,
};

#[derive(Debug, Clone)]
struct Marker(GeoPoint);

impl Geolocated for Marker {
    fn location(&self) -> Option<GeoPoint> {
        Some(self.0)
    }
}

fn pending_request() -> Request {
    let created = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    Request::new("R1", Category::Medical, Urgency::High, created)
}

fn shelter(capacity: u32, occupied: u32) -> Shelter {
    Shelter {
        id: "S1".to_string(),
        name: "Community Hall".to_string(),
        capacity,
        occupied,
        status: ShelterStatus::Open,
        location: GeoPoint::new(40.7128, -74.0060),
    }
}

const ALL_STATUSES: [RequestStatus; 4] = [
    RequestStatus::Pending,
    RequestStatus::InProgress,
    RequestStatus::Resolved,
    RequestStatus::Cancelled,
];

#[test]
fn test_assign_then_reassign_fails() {
    let now = Utc::now();
    let assigned = assign_volunteer(&pending_request(), "V1", now).unwrap();

    assert_eq!(assigned.status, RequestStatus::InProgress);
    assert_eq!(assigned.assigned_volunteer_id.as_deref(), Some("V1"));

    let err = assign_volunteer(&assigned, "V2", now).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[test]
fn test_terminal_requests_reject_every_target() {
    let now = Utc::now();
    let assigned = assign_volunteer(&pending_request(), "V1", now).unwrap();
    let resolved = transition(&assigned, RequestStatus::Resolved, now).unwrap();
    let cancelled = transition(&pending_request(), RequestStatus::Cancelled, now).unwrap();

    for terminal in [&resolved, &cancelled] {
        for target in ALL_STATUSES {
            let err = transition(terminal, target, now).unwrap_err();
            assert!(
                matches!(err, EngineError::TerminalStateViolation { .. }),
                "{} -> {} gave {:?}",
                terminal.status,
                target,
                err
            );
        }
        assert!(matches!(
            assign_volunteer(terminal, "V9", now),
            Err(EngineError::TerminalStateViolation { .. })
        ));
        assert!(matches!(unassign(terminal), Err(EngineError::TerminalStateViolation { .. })));
    }
}

#[test]
fn test_volunteer_presence_tracks_status() {
    let now = Utc::now();
    let mut seen = vec![pending_request()];
    let mut frontier = vec![pending_request()];

    while let Some(request) = frontier.pop() {
        assert!(request.assignment_consistent(), "{:?}", request);
        if seen.len() > 32 {
            break;
        }

        let mut next = Vec::new();
        if let Ok(r) = assign_volunteer(&request, "V1", now) {
            next.push(r);
        }
        if let Ok(r) = unassign(&request) {
            next.push(r);
        }
        for target in ALL_STATUSES {
            if let Ok(r) = transition(&request, target, now) {
                next.push(r);
            }
        }

        for r in next {
            seen.push(r.clone());
            frontier.push(r);
        }
    }
}

#[test]
fn test_failed_transition_leaves_input_untouched() {
    let request = pending_request();
    let before = request.clone();

    assert!(transition(&request, RequestStatus::Resolved, Utc::now()).is_err());
    assert_eq!(request, before);
}

#[test]
fn test_same_location_is_zero_distance() {
    let here = GeoPoint::new(51.5074, -0.1278);
    let ranked = filter_within_radius(here, &[Marker(here)], 1.0);

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].distance_km, 0.0);
}

#[test]
fn test_haversine_symmetry() {
    let points = [
        GeoPoint::new(40.7128, -74.0060),
        GeoPoint::new(51.5074, -0.1278),
        GeoPoint::new(-33.8688, 151.2093),
        GeoPoint::new(89.9, 179.9),
        GeoPoint::new(-89.9, -179.9),
        GeoPoint::new(0.0, 0.0),
    ];

    for a in points {
        for b in points {
            assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
        }
    }
}

#[test]
fn test_haversine_new_york_to_london() {
    let d = haversine_distance(GeoPoint::new(40.7128, -74.0060), GeoPoint::new(51.5074, -0.1278));
    assert!((d - 5570.0).abs() < 10.0, "got {}", d);
}

#[test]
fn test_proximity_orders_nearest_first() {
    let observer = GeoPoint::new(40.7128, -74.0060);
    let markers = vec![
        Marker(GeoPoint::new(40.80, -74.00)),
        Marker(GeoPoint::new(40.72, -74.01)),
        Marker(GeoPoint::new(41.50, -74.00)),
    ];

    let ranked = filter_within_radius(observer, &markers, 20.0);

    assert_eq!(ranked.len(), 2);
    assert!(ranked[0].distance_km <= ranked[1].distance_km);
    assert_eq!(ranked[0].item.0.lat, 40.72);
}

#[test]
fn test_occupancy_clamped_for_extreme_deltas() {
    for start in [0, 5, 10] {
        for delta in [-1_000_000_000i64, -11, -1, 0, 1, 11, 1_000_000_000, i64::MIN, i64::MAX] {
            let next = apply_occupancy_change(&shelter(10, start), delta);
            assert!(next.occupied <= next.capacity, "{} + {} -> {}", start, delta, next.occupied);
        }
    }
}

#[test]
fn test_occupancy_overbooking_fills_shelter() {
    let next = apply_occupancy_change(&shelter(10, 8), 5);
    assert_eq!(next.occupied, 10);
    assert_eq!(next.status, ShelterStatus::Full);
}

#[test]
fn test_occupancy_above_threshold_is_limited() {
    let next = apply_occupancy_change(&shelter(10, 0), 9);
    assert_eq!(next.occupied, 9);
    assert_eq!(next.status, ShelterStatus::Limited);
}

#[test]
fn test_derive_status_idempotent() {
    for occupied in 0..=12 {
        let once = derive_status(&shelter(10, occupied));
        let twice = derive_status(&once);
        assert_eq!(once, twice);
    }
}

#[test]
fn test_match_picks_same_category() {
    let donation = Donation::new("D1", Category::Food, 3, Utc::now());
    let asks = vec![
        AskedDonation::new("A0", Category::Medical),
        AskedDonation::new("A1", Category::Food),
    ];

    let matcher = DonationMatcher::default();
    let chosen = matcher.match_donation(&donation, &asks).unwrap();

    assert_eq!(chosen.id, "A1");
    assert_eq!(chosen.status, AskStatus::Pending);
}

#[test]
fn test_match_none_without_category() {
    let donation = Donation::new("D1", Category::Clothing, 3, Utc::now());
    let asks = vec![
        AskedDonation::new("A0", Category::Medical),
        AskedDonation::new("A1", Category::Food),
    ];

    assert!(DonationMatcher::default().match_donation(&donation, &asks).is_none());
}
