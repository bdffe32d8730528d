//! Suggested time to spend at a stop, from its popularity signals.

use crate::model::Stop;

const BASE_MINUTES: u32 = 45;
const MAX_MINUTES: u32 = 90;

/// Estimated visit length in minutes.
///
/// Better rated and more reviewed places get more time, capped at 90 minutes.
pub fn visit_minutes(stop: &Stop) -> u32 {
    let mut minutes = BASE_MINUTES;

    if let Some(rating) = stop.rating {
        minutes += if rating >= 4.5 {
            15
        } else if rating >= 4.0 {
            10
        } else if rating >= 3.5 {
            5
        } else {
            0
        };
    }

    if let Some(count) = stop.rating_count {
        minutes += if count > 1000 {
            15
        } else if count > 500 {
            10
        } else if count > 100 {
            5
        } else {
            0
        };
    }

    minutes.min(MAX_MINUTES)
}
