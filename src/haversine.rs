//! Haversine distance and the straight-line leg estimator.
//!
//! Great-circle distance is the clustering metric. Scaled by a road factor it
//! also stands in for the routing service when that service is unavailable.
//! Less accurate than real routing (ignores roads) but always available.

use crate::model::LatLng;
use crate::routes_api::RoutingError;
use crate::traits::{LegEstimate, LegProvider};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Ratio of road distance to straight-line distance.
pub const ROAD_FACTOR: f64 = 1.4;

/// Road distance below which the slower urban speed applies.
const URBAN_THRESHOLD_KM: f64 = 5.0;
const URBAN_SPEED_KMH: f64 = 25.0;
const RURAL_SPEED_KMH: f64 = 35.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Straight-line distance scaled to an estimated road distance.
pub fn road_distance_km(from: LatLng, to: LatLng) -> f64 {
    haversine_km(from, to) * ROAD_FACTOR
}

/// Estimated driving minutes for a road distance, using the speed tiers.
pub fn travel_minutes(road_km: f64) -> u64 {
    let speed = if road_km < URBAN_THRESHOLD_KM {
        URBAN_SPEED_KMH
    } else {
        RURAL_SPEED_KMH
    };
    (road_km / speed * 60.0).round() as u64
}

/// Leg estimator built only on haversine distance.
///
/// Produces the same shape as the routing service. Durations are whole
/// minutes, matching the resolution of the estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineLegs;

impl HaversineLegs {
    pub fn estimate(&self, from: LatLng, to: LatLng) -> LegEstimate {
        let road_km = road_distance_km(from, to);
        LegEstimate {
            distance_meters: (road_km * 1000.0).round() as u64,
            duration_seconds: travel_minutes(road_km) * 60,
            encoded_path: None,
        }
    }

    pub fn estimate_all(&self, waypoints: &[LatLng]) -> Vec<LegEstimate> {
        waypoints
            .windows(2)
            .map(|pair| self.estimate(pair[0], pair[1]))
            .collect()
    }
}

impl LegProvider for HaversineLegs {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        Ok(self.estimate_all(waypoints))
    }
}
