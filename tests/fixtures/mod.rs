//! Test fixtures for itinerary-planner.
//!
//! Provides realistic test data:
//! - Real Varanasi / Sarnath temples and landmarks
//! - Helpers turning them into stops

pub mod varanasi_locations;

pub use varanasi_locations::*;
