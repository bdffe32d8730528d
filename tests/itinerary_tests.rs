//! End-to-end planning with mock routing and place services.

mod fixtures;

use std::collections::HashMap;

use chrono::NaiveTime;

use itinerary_planner::haversine::{haversine_km, travel_minutes};
use itinerary_planner::places::{CacheConfig, PlaceError, StopResolver};
use itinerary_planner::routes_api::{RoutesApiClient, RoutesApiConfig, RoutingError, parse_routes_body};
use itinerary_planner::traits::{LegEstimate, LegProvider, PlaceDetailsProvider};
use itinerary_planner::{
    ClusteringStrategy, EndTimePreference, ItineraryAssembler, ItineraryOptions, LatLng, LegSource, Stop,
};

// ============================================================================
// Mock Services
// ============================================================================

/// Every leg is 1 km and 2 minutes.
struct FlatRate;

impl LegProvider for FlatRate {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        Ok((1..waypoints.len())
            .map(|_| LegEstimate {
                distance_meters: 1000,
                duration_seconds: 120,
                encoded_path: Some("_p~iF~ps|U_ulLnnqC".to_string()),
            })
            .collect())
    }
}

struct Down;

impl LegProvider for Down {
    fn legs_for(&self, _waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        Err(RoutingError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

/// Fails for any day that reaches north of `limit_lat`.
struct NorthOutage {
    limit_lat: f64,
}

impl LegProvider for NorthOutage {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        if waypoints.iter().any(|p| p.lat > self.limit_lat) {
            return Err(RoutingError::NoRoutes);
        }
        FlatRate.legs_for(waypoints)
    }
}

/// Answers with a canned response body, parsed like a real service reply.
struct CannedBody {
    leg: &'static str,
}

impl LegProvider for CannedBody {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        let legs = vec![self.leg; waypoints.len() - 1].join(",");
        let body = format!(r#"{{"routes": [{{"legs": [{}]}}]}}"#, legs);
        parse_routes_body(&body, waypoints.len() - 1)
    }
}

/// Returns the largest values the leg type can hold.
struct Saturated;

impl LegProvider for Saturated {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        Ok((1..waypoints.len())
            .map(|_| LegEstimate {
                distance_meters: u64::MAX,
                duration_seconds: u64::MAX,
                encoded_path: None,
            })
            .collect())
    }
}

struct FixturePlaces {
    stops: HashMap<String, Stop>,
}

impl FixturePlaces {
    fn new() -> Self {
        Self {
            stops: fixtures::all_stops().into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }
}

impl PlaceDetailsProvider for FixturePlaces {
    fn place_details(&self, id: &str) -> Result<Stop, PlaceError> {
        self.stops
            .get(id)
            .cloned()
            .ok_or_else(|| PlaceError::NotFound { id: id.to_string() })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn seeded() -> ItineraryOptions {
    ItineraryOptions {
        seed: Some(7),
        ..ItineraryOptions::default()
    }
}

fn stop(id: &str, lat: f64, lng: f64) -> Stop {
    Stop::new(id, id, LatLng::new(lat, lng))
}

fn two_regions() -> Vec<Stop> {
    vec![
        stop("vishwanath", 25.3109, 83.0107),
        stop("dhamek", 25.3811, 83.0245),
        stop("annapurna", 25.3107, 83.0104),
        stop("mulagandha", 25.3790, 83.0250),
    ]
}

// ============================================================================
// Structure Tests
// ============================================================================

#[test]
fn test_plan_covers_every_stop_once() {
    let stops = fixtures::all_stops();
    let assembler = ItineraryAssembler::new(FlatRate, seeded());

    for strategy in [
        ClusteringStrategy::Geographical,
        ClusteringStrategy::Balanced,
        ClusteringStrategy::TimeOptimized,
    ] {
        let plan = assembler.plan(&stops, 3, strategy, None).unwrap();

        assert_eq!(plan.total_days, 3);
        assert_eq!(plan.total_stops, stops.len());
        let mut planned: Vec<&str> = plan.days.iter().flat_map(|d| &d.stops).map(|s| s.id.as_str()).collect();
        planned.sort();
        let mut expected: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
        expected.sort();
        assert_eq!(planned, expected, "{}", strategy);

        let days: Vec<usize> = plan.days.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }
}

#[test]
fn test_totals_are_exact_sums() {
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&fixtures::all_stops(), 3, ClusteringStrategy::Balanced, None)
        .unwrap();

    for day in &plan.days {
        assert_eq!(day.legs.len(), day.stops.len() - 1);
        assert_eq!(day.total_distance_meters, day.legs.iter().map(|l| l.distance_meters).sum::<u64>());
        assert_eq!(day.total_duration_seconds, day.legs.iter().map(|l| l.duration_seconds).sum::<u64>());
    }
    assert_eq!(
        plan.total_distance_meters,
        plan.days.iter().map(|d| d.total_distance_meters).sum::<u64>()
    );
    assert_eq!(
        plan.total_duration_seconds,
        plan.days.iter().map(|d| d.total_duration_seconds).sum::<u64>()
    );

    // 14 stops over 3 days means 11 legs of 1 km each.
    assert_eq!(plan.total_distance_meters, 11_000);
}

#[test]
fn test_four_stops_two_days_balanced() {
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&two_regions(), 2, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.days.len(), 2);
    for day in &plan.days {
        assert_eq!(day.stops.len(), 2);
        assert_eq!(day.legs.len(), 1);
        assert_eq!(day.leg_source, LegSource::Provider);
    }
    assert!(plan.degraded_days().is_empty());
}

#[test]
fn test_accommodation_brackets_every_day() {
    let hotel = fixtures::hotel();
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&fixtures::all_stops(), 3, ClusteringStrategy::Balanced, Some(&hotel))
        .unwrap();

    for day in &plan.days {
        assert_eq!(day.legs.len(), day.stops.len() + 1);
        let first = day.legs.first().unwrap();
        let last = day.legs.last().unwrap();
        assert!(first.from.is_accommodation());
        assert!(last.to.is_accommodation());
        assert_eq!(first.from.name(), hotel.name);
        assert!(day.legs[1..day.legs.len() - 1].iter().all(|leg| !leg.touches_accommodation()));
    }
}

#[test]
fn test_single_stop_day_has_no_legs() {
    let assembler = ItineraryAssembler::new(FlatRate, seeded());
    let plan = assembler
        .plan(&[stop("only", 25.31, 83.01)], 1, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.days.len(), 1);
    assert!(plan.days[0].legs.is_empty());
    assert_eq!(plan.days[0].leg_source, LegSource::NotRequired);
    assert!(plan.degraded_days().is_empty());
    assert_eq!(plan.total_distance_meters, 0);
    assert_eq!(plan.days[0].start_time, "09:00");
    assert_eq!(plan.days[0].end_time, "09:45");
}

#[test]
fn test_empty_input_is_an_empty_plan() {
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&[], 3, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert!(plan.days.is_empty());
    assert_eq!(plan.total_days, 0);
    assert_eq!(plan.total_stops, 0);
}

#[test]
fn test_fewer_stops_than_days() {
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&two_regions()[..2], 5, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.days.len(), 2);
    assert!(plan.days.iter().all(|d| d.stops.len() == 1));
}

#[test]
fn test_same_seed_same_plan() {
    let stops = fixtures::all_stops();
    let assembler = ItineraryAssembler::new(FlatRate, seeded());
    let first = assembler.plan(&stops, 4, ClusteringStrategy::Geographical, None).unwrap();
    let second = assembler.plan(&stops, 4, ClusteringStrategy::Geographical, None).unwrap();

    assert_eq!(first.days, second.days);
}

// ============================================================================
// Fallback Tests
// ============================================================================

#[test]
fn test_routing_outage_falls_back_to_estimates() {
    let stops = vec![
        stop("a", 25.3000, 83.0000),
        stop("b", 25.3100, 83.0000),
        stop("c", 25.3200, 83.0000),
    ];
    let plan = ItineraryAssembler::new(Down, seeded())
        .plan(&stops, 1, ClusteringStrategy::Balanced, None)
        .unwrap();

    let day = &plan.days[0];
    assert_eq!(day.leg_source, LegSource::Fallback);
    assert_eq!(day.legs.len(), 2);
    assert_eq!(plan.degraded_days(), vec![1]);

    for leg in &day.legs {
        let road_km = haversine_km(leg.from.location(), leg.to.location()) * 1.4;
        assert_eq!(leg.distance_meters, (road_km * 1000.0).round() as u64);
        // About 1.56 road km per hop: urban speed.
        assert!(road_km < 5.0);
        assert_eq!(leg.duration_seconds, travel_minutes(road_km) * 60);
        assert_eq!(leg.duration_seconds, 240);
        assert!(leg.encoded_path.is_none());
    }
}

#[test]
fn test_outage_on_one_day_leaves_others_intact() {
    let plan = ItineraryAssembler::new(NorthOutage { limit_lat: 25.35 }, seeded())
        .plan(&two_regions(), 2, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.degraded_days().len(), 1);
    for day in &plan.days {
        let north = day.stops.iter().any(|s| s.location.lat > 25.35);
        let expected = if north { LegSource::Fallback } else { LegSource::Provider };
        assert_eq!(day.leg_source, expected, "day {}", day.day);
        if !north {
            assert!(day.legs.iter().all(|leg| leg.distance_meters == 1000));
        }
    }
}

#[test]
fn test_huge_duration_in_response_falls_back() {
    let provider = CannedBody {
        leg: r#"{"distanceMeters": 1200, "duration": "1e20s"}"#,
    };
    let plan = ItineraryAssembler::new(provider, seeded())
        .plan(&two_regions()[..2], 1, ClusteringStrategy::Balanced, None)
        .unwrap();

    let day = &plan.days[0];
    assert_eq!(day.leg_source, LegSource::Fallback);
    assert_eq!(day.legs.len(), 1);
    assert!(day.total_duration_seconds < 3600);
    assert!(!day.end_time.contains("may run late"));
}

#[test]
fn test_huge_distance_in_response_falls_back() {
    let provider = CannedBody {
        leg: r#"{"distanceMeters": 18446744073709551615, "duration": "60s"}"#,
    };
    let plan = ItineraryAssembler::new(provider, seeded())
        .plan(&two_regions(), 2, ClusteringStrategy::Balanced, Some(&fixtures::hotel()))
        .unwrap();

    assert_eq!(plan.degraded_days(), vec![1, 2]);
    assert!(plan.total_distance_meters < 100_000);
}

#[test]
fn test_saturated_provider_values_fall_back() {
    let options = ItineraryOptions {
        end_time: EndTimePreference::Fixed(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
        ..seeded()
    };
    let plan = ItineraryAssembler::new(Saturated, options)
        .plan(&fixtures::all_stops(), 3, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.degraded_days(), vec![1, 2, 3]);
    for day in &plan.days {
        assert!(day.legs.iter().all(|leg| leg.duration_seconds < u64::MAX));
    }
}

#[test]
fn test_unreachable_routing_service_falls_back() {
    let client = RoutesApiClient::new(RoutesApiConfig {
        base_url: "http://127.0.0.1:1/directions/v2:computeRoutes".to_string(),
        timeout_secs: 2,
        ..RoutesApiConfig::default()
    })
    .unwrap();

    let plan = ItineraryAssembler::new(client, seeded())
        .plan(&two_regions(), 1, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.degraded_days(), vec![1]);
    assert_eq!(plan.days[0].legs.len(), 3);
    assert!(plan.total_distance_meters > 0);
}

// ============================================================================
// Scheduling Tests
// ============================================================================

#[test]
fn test_fixed_end_time_marks_overrun() {
    let options = ItineraryOptions {
        end_time: EndTimePreference::Fixed(NaiveTime::from_hms_opt(11, 0, 0).unwrap()),
        ..seeded()
    };
    let plan = ItineraryAssembler::new(FlatRate, options)
        .plan(&fixtures::all_stops(), 1, ClusteringStrategy::Balanced, None)
        .unwrap();

    let day = &plan.days[0];
    assert!(day.runs_late);
    assert_eq!(day.end_time, "11:00 (may run late)");
    assert_eq!(day.stops.len(), 14, "an overrun never drops stops");
}

#[test]
fn test_start_time_comes_from_options() {
    let options = ItineraryOptions {
        start_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        ..seeded()
    };
    let plan = ItineraryAssembler::new(FlatRate, options)
        .plan(&two_regions(), 2, ClusteringStrategy::Balanced, None)
        .unwrap();

    for day in &plan.days {
        assert_eq!(day.start_time, "07:30");
        // Two 45 minute visits, one 2 minute leg and the buffer.
        assert_eq!(day.end_time, "09:12");
    }
}

// ============================================================================
// Place Resolution Tests
// ============================================================================

#[test]
fn test_plan_from_ids_skips_unknown_places() {
    let mut resolver = StopResolver::new(
        FixturePlaces::new(),
        CacheConfig {
            batch_pause: std::time::Duration::ZERO,
            ..CacheConfig::default()
        },
    );
    let ids: Vec<String> = ["poi-0", "poi-1", "unknown", "poi-10", "poi-11"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan_from_ids(&mut resolver, &ids, 2, ClusteringStrategy::Balanced, None)
        .unwrap();

    assert_eq!(plan.total_stops, 4);
    assert_eq!(resolver.cache().stats().size, 4);
}

#[test]
fn test_plan_from_ids_with_nothing_resolvable() {
    let mut resolver = StopResolver::new(FixturePlaces::new(), CacheConfig::default());
    let ids = vec!["nope".to_string()];

    let result = ItineraryAssembler::new(FlatRate, seeded()).plan_from_ids(
        &mut resolver,
        &ids,
        1,
        ClusteringStrategy::Balanced,
        None,
    );

    assert!(matches!(
        result,
        Err(itinerary_planner::PlanError::Places(PlaceError::NoneResolved { requested: 1 }))
    ));
}

#[test]
fn test_plan_serializes_to_json() {
    let plan = ItineraryAssembler::new(FlatRate, seeded())
        .plan(&two_regions(), 2, ClusteringStrategy::Balanced, Some(&fixtures::hotel()))
        .unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["total_days"], 2);
    assert_eq!(json["days"][0]["legs"][0]["from"]["kind"], "accommodation");
    assert_eq!(json["days"][0]["leg_source"], "provider");
}
