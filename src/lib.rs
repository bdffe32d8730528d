//! itinerary-planner core
//!
//! Splits points of interest into days, orders each day, fetches leg data
//! (falling back to straight-line estimates) and schedules every day.

pub mod cluster;
pub mod config;
pub mod gateway;
pub mod haversine;
pub mod itinerary;
pub mod model;
pub mod places;
pub mod polyline;
pub mod routes_api;
pub mod schedule;
pub mod solver;
pub mod traits;
pub mod visit_duration;

pub use cluster::ClusteringStrategy;
pub use config::{EndTimePreference, ItineraryOptions};
pub use itinerary::{ItineraryAssembler, PlanError};
pub use model::{Accommodation, DayPlan, ItineraryPlan, LatLng, Leg, LegSource, Stop, Waypoint};
