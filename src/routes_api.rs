//! HTTP adapter for the external routing service.
//!
//! One POST per day: origin, destination and the intermediate waypoints in
//! visiting order. The response carries one leg per consecutive pair.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, env_parse, env_string};
use crate::model::LatLng;
use crate::traits::{LegEstimate, LegProvider};

/// Longest plausible single leg. Anything above is treated as a malformed response.
pub const MAX_LEG_SECONDS: u64 = 24 * 60 * 60;
/// Half the Earth's circumference, in meters.
pub const MAX_LEG_METERS: u64 = 20_000_000;

const FIELD_MASK: &str = "routes.legs.duration,routes.legs.distanceMeters,routes.legs.polyline,routes.polyline.encodedPolyline";

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("at least two waypoints are required, got {0}")]
    TooFewWaypoints(usize),
    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("routing service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("routing response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("routing response contains no routes")]
    NoRoutes,
    #[error("expected {expected} legs, routing service returned {actual}")]
    LegCountMismatch { expected: usize, actual: usize },
    #[error("invalid leg duration {0:?}")]
    InvalidDuration(String),
    #[error("leg {index} is out of range: {reason}")]
    LegOutOfRange { index: usize, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidOptions {
    pub tolls: bool,
    pub highways: bool,
    pub ferries: bool,
}

impl Default for AvoidOptions {
    fn default() -> Self {
        Self {
            tolls: false,
            highways: false,
            ferries: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutesApiConfig {
    pub base_url: String,
    /// Sent as `X-Goog-Api-Key` when present.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub travel_mode: String,
    pub routing_preference: String,
    pub avoid: AvoidOptions,
}

impl Default for RoutesApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://routes.googleapis.com/directions/v2:computeRoutes".to_string(),
            api_key: None,
            timeout_secs: 10,
            travel_mode: "DRIVE".to_string(),
            routing_preference: "TRAFFIC_AWARE".to_string(),
            avoid: AvoidOptions::default(),
        }
    }
}

impl RoutesApiConfig {
    /// Reads `ROUTES_API_URL`, `ROUTES_API_KEY` and `ROUTES_API_TIMEOUT_SECS`,
    /// keeping defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env_string("ROUTES_API_URL").unwrap_or(defaults.base_url),
            api_key: env_string("ROUTES_API_KEY"),
            timeout_secs: env_parse("ROUTES_API_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
            ..defaults
        })
    }
}

#[derive(Debug, Clone)]
pub struct RoutesApiClient {
    config: RoutesApiConfig,
    client: reqwest::blocking::Client,
}

impl RoutesApiClient {
    pub fn new(config: RoutesApiConfig) -> Result<Self, RoutingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RoutesApiConfig {
        &self.config
    }

    /// Request body for an ordered list of waypoints.
    pub fn build_request(&self, waypoints: &[LatLng]) -> Result<RouteRequest, RoutingError> {
        let n = waypoints.len();
        if n < 2 {
            return Err(RoutingError::TooFewWaypoints(n));
        }

        Ok(RouteRequest {
            origin: waypoints[0],
            destination: waypoints[n - 1],
            intermediates: waypoints[1..n - 1].to_vec(),
            travel_mode: self.config.travel_mode.clone(),
            routing_preference: self.config.routing_preference.clone(),
            avoid: self.config.avoid,
        })
    }
}

impl LegProvider for RoutesApiClient {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError> {
        let request = self.build_request(waypoints)?;

        let mut builder = self
            .client
            .post(&self.config.base_url)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-Goog-Api-Key", key);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(RoutingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let legs = parse_routes_body(&body, waypoints.len() - 1)?;
        debug!(legs = legs.len(), "routing service returned legs");
        Ok(legs)
    }
}

/// Wire request, serialized in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub intermediates: Vec<LatLng>,
    pub travel_mode: String,
    pub routing_preference: String,
    pub avoid: AvoidOptions,
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    legs: Vec<LegBody>,
    polyline: Option<PolylineBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegBody {
    /// Omitted by the service for zero-length legs.
    #[serde(default)]
    distance_meters: u64,
    duration: String,
    polyline: Option<PolylineBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolylineBody {
    encoded_polyline: String,
}

/// Validate a response body and turn its first route into leg estimates.
///
/// Legs without their own polyline inherit the route-level one.
pub fn parse_routes_body(body: &str, expected_legs: usize) -> Result<Vec<LegEstimate>, RoutingError> {
    let response: RoutesResponse = serde_json::from_str(body)?;
    let route = response.routes.into_iter().next().ok_or(RoutingError::NoRoutes)?;

    if route.legs.len() != expected_legs {
        return Err(RoutingError::LegCountMismatch {
            expected: expected_legs,
            actual: route.legs.len(),
        });
    }

    let route_path = route.polyline.map(|p| p.encoded_polyline);
    route
        .legs
        .into_iter()
        .enumerate()
        .map(|(index, leg)| {
            let estimate = LegEstimate {
                distance_meters: leg.distance_meters,
                duration_seconds: parse_duration(&leg.duration)?,
                encoded_path: leg
                    .polyline
                    .map(|p| p.encoded_polyline)
                    .or_else(|| route_path.clone()),
            };
            check_leg(index, &estimate)?;
            Ok(estimate)
        })
        .collect()
}

/// Reject legs longer than [`MAX_LEG_METERS`] or [`MAX_LEG_SECONDS`].
pub fn check_leg(index: usize, leg: &LegEstimate) -> Result<(), RoutingError> {
    if leg.distance_meters > MAX_LEG_METERS {
        return Err(RoutingError::LegOutOfRange {
            index,
            reason: format!("{} meters", leg.distance_meters),
        });
    }
    if leg.duration_seconds > MAX_LEG_SECONDS {
        return Err(RoutingError::LegOutOfRange {
            index,
            reason: format!("{} seconds", leg.duration_seconds),
        });
    }
    Ok(())
}

/// Parse a protobuf-style duration such as `"1234s"` or `"12.5s"` into whole seconds.
pub fn parse_duration(value: &str) -> Result<u64, RoutingError> {
    let invalid = || RoutingError::InvalidDuration(value.to_string());
    let seconds: f64 = value
        .trim()
        .strip_suffix('s')
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 || seconds > MAX_LEG_SECONDS as f64 {
        return Err(invalid());
    }
    Ok(seconds.round() as u64)
}
