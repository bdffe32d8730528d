//! Itinerary data model.
//!
//! All values are created fresh for a single planning request and never
//! mutated after they are returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::polyline::{Polyline, PolylineError};

/// A coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// A point of interest to visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub location: LatLng,
    /// Average rating, 0 to 5.
    pub rating: Option<f64>,
    /// Number of ratings behind `rating`.
    pub rating_count: Option<u32>,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: LatLng) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            rating: None,
            rating_count: None,
        }
    }

    pub fn with_rating(mut self, rating: f64, rating_count: u32) -> Self {
        self.rating = Some(rating);
        self.rating_count = Some(rating_count);
        self
    }
}

/// Where the traveller sleeps. Used as the start and end of every day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    pub name: String,
    pub location: LatLng,
}

impl Accommodation {
    pub fn new(name: impl Into<String>, location: LatLng) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// One end of a [`Leg`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Waypoint {
    Stop(Stop),
    Accommodation(Accommodation),
}

impl Waypoint {
    pub fn location(&self) -> LatLng {
        match self {
            Waypoint::Stop(stop) => stop.location,
            Waypoint::Accommodation(accommodation) => accommodation.location,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Waypoint::Stop(stop) => &stop.name,
            Waypoint::Accommodation(accommodation) => &accommodation.name,
        }
    }

    pub fn is_accommodation(&self) -> bool {
        matches!(self, Waypoint::Accommodation(_))
    }
}

/// Travel between two consecutive waypoints of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from: Waypoint,
    pub to: Waypoint,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    /// Encoded polyline, when the routing service returned one.
    pub encoded_path: Option<String>,
}

impl Leg {
    /// Decoded geometry of this leg.
    ///
    /// Legs without an encoded path are drawn as a straight segment.
    pub fn path(&self) -> Result<Polyline, PolylineError> {
        match &self.encoded_path {
            Some(encoded) => Polyline::decode(encoded),
            None => Ok(Polyline::straight(self.from.location(), self.to.location())),
        }
    }

    pub fn touches_accommodation(&self) -> bool {
        self.from.is_accommodation() || self.to.is_accommodation()
    }
}

/// Where a day's leg data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegSource {
    /// The external routing service answered.
    Provider,
    /// The routing service failed and legs were estimated from straight-line distance.
    Fallback,
    /// The day has fewer than two waypoints, so there are no legs to fetch.
    NotRequired,
}

/// One day of the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based, contiguous across the plan.
    pub day: usize,
    pub stops: Vec<Stop>,
    pub legs: Vec<Leg>,
    pub leg_source: LegSource,
    pub total_distance_meters: u64,
    pub total_duration_seconds: u64,
    pub start_time: String,
    pub end_time: String,
    /// True when the schedule overruns a fixed end time.
    pub runs_late: bool,
}

/// The full planning result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryPlan {
    pub city: Option<String>,
    pub total_days: usize,
    pub days: Vec<DayPlan>,
    pub total_stops: usize,
    pub total_distance_meters: u64,
    pub total_duration_seconds: u64,
    pub created_at: DateTime<Utc>,
}

impl ItineraryPlan {
    /// Day indices whose legs came from the fallback estimator.
    pub fn degraded_days(&self) -> Vec<usize> {
        self.days
            .iter()
            .filter(|day| day.leg_source == LegSource::Fallback)
            .map(|day| day.day)
            .collect()
    }
}
