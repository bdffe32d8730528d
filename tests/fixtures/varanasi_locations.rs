//! Varanasi and Sarnath points of interest for realistic fixtures.
//!
//! Coordinates are approximate building centroids. Ratings are rounded
//! public review figures, good enough to exercise the duration model.

#![allow(dead_code)]

use itinerary_planner::{Accommodation, LatLng, Stop};

/// A named place with coordinates and popularity signals.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub rating: f64,
    pub rating_count: u32,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64, rating: f64, rating_count: u32) -> Self {
        Self {
            name,
            lat,
            lng,
            rating,
            rating_count,
        }
    }

    pub fn coords(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn to_stop(&self, id: &str) -> Stop {
        Stop::new(id, self.name, self.coords()).with_rating(self.rating, self.rating_count)
    }
}

// ============================================================================
// Old City / Ghats
// ============================================================================

pub const OLD_CITY: &[Location] = &[
    Location::new("Kashi Vishwanath Temple", 25.3109, 83.0107, 4.7, 48000),
    Location::new("Annapurna Devi Temple", 25.3107, 83.0104, 4.6, 2100),
    Location::new("Kaal Bhairav Temple", 25.3224, 83.0136, 4.6, 9800),
    Location::new("Dashashwamedh Ghat", 25.3069, 83.0104, 4.6, 61000),
    Location::new("Manikarnika Ghat", 25.3108, 83.0138, 4.5, 12000),
];

// ============================================================================
// South Varanasi
// ============================================================================

pub const SOUTH: &[Location] = &[
    Location::new("Sankat Mochan Hanuman Temple", 25.2826, 82.9990, 4.8, 31000),
    Location::new("Durga Kund Temple", 25.2889, 83.0018, 4.6, 14000),
    Location::new("Tulsi Manas Temple", 25.2856, 83.0015, 4.5, 9000),
    Location::new("Shri Vishwanath Temple BHU", 25.2660, 82.9890, 4.7, 22000),
    Location::new("Ramnagar Fort", 25.2710, 83.0260, 3.9, 15000),
];

// ============================================================================
// Sarnath
// ============================================================================

pub const SARNATH: &[Location] = &[
    Location::new("Dhamek Stupa", 25.3811, 83.0245, 4.6, 11000),
    Location::new("Mulagandha Kuti Vihar", 25.3790, 83.0250, 4.6, 3200),
    Location::new("Thai Temple Sarnath", 25.3760, 83.0200, 4.5, 1800),
    Location::new("Tibetan Temple Sarnath", 25.3780, 83.0220, 4.4, 900),
];

pub const HOTEL: Location = Location::new("Hotel near Godowlia", 25.3085, 83.0060, 4.2, 500);

pub fn hotel() -> Accommodation {
    Accommodation::new(HOTEL.name, HOTEL.coords())
}

pub fn all_locations() -> Vec<Location> {
    OLD_CITY
        .iter()
        .chain(SOUTH)
        .chain(SARNATH)
        .cloned()
        .collect()
}

/// Every fixture location as a stop, with ids `poi-0`, `poi-1`, ...
pub fn all_stops() -> Vec<Stop> {
    all_locations()
        .iter()
        .enumerate()
        .map(|(i, loc)| loc.to_stop(&format!("poi-{}", i)))
        .collect()
}
