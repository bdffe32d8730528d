//! Seams to the external collaborators.
//!
//! These are intentionally minimal. The planner core never cares how legs
//! or place details are obtained, only about the shapes below.

use serde::{Deserialize, Serialize};

use crate::model::{LatLng, Stop};
use crate::places::PlaceError;
use crate::routes_api::RoutingError;

/// Distance, duration and optional geometry for one hop between waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegEstimate {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub encoded_path: Option<String>,
}

/// Provides per-leg travel data for an ordered list of waypoints.
///
/// A successful result holds exactly `waypoints.len() - 1` legs, in order.
pub trait LegProvider {
    fn legs_for(&self, waypoints: &[LatLng]) -> Result<Vec<LegEstimate>, RoutingError>;
}

/// Looks up the attributes of a single place by id.
pub trait PlaceDetailsProvider {
    fn place_details(&self, id: &str) -> Result<Stop, PlaceError>;
}
