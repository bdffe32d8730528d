//! Turning an ordered day into start and end clock times.

use chrono::{NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EndTimePreference};
use crate::model::{Leg, Stop};
use crate::visit_duration::visit_minutes;

/// Parking and walking allowance added to every hop that ends at a stop.
pub const BUFFER_SECONDS: u64 = 10 * 60;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const CLOCK_FORMAT: &str = "%H:%M";
const RUNS_LATE_NOTE: &str = "(may run late)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub start_time: String,
    /// Computed end, or the fixed end annotated with "(may run late)" on overrun.
    pub end_time: String,
    pub runs_late: bool,
    /// Visits, travel and buffers, in seconds.
    pub elapsed_seconds: u64,
}

/// Schedule a day starting at `start`.
///
/// Every stop adds its visit duration. Each hop to the next stop adds the
/// leg duration plus [`BUFFER_SECONDS`]. When the legs start and end at an
/// accommodation, the outbound hop is counted like any other and the return
/// leg adds travel time only.
///
/// A day that overruns a fixed end time keeps all its stops; the overrun is
/// reported through `runs_late` and the end time string.
pub fn schedule(
    stops: &[Stop],
    legs: &[Leg],
    start: NaiveTime,
    end_time: EndTimePreference,
) -> DaySchedule {
    let anchored = legs.first().is_some_and(|leg| leg.from.is_accommodation());
    let offset = usize::from(anchored);
    let mut elapsed: u64 = 0;
    let hop = |leg: &Leg| leg.duration_seconds.saturating_add(BUFFER_SECONDS);

    if anchored && !stops.is_empty() {
        elapsed = elapsed.saturating_add(hop(&legs[0]));
    }

    for (i, stop) in stops.iter().enumerate() {
        elapsed = elapsed.saturating_add(visit_minutes(stop) as u64 * 60);
        if i + 1 < stops.len() {
            if let Some(leg) = legs.get(offset + i) {
                elapsed = elapsed.saturating_add(hop(leg));
            }
        }
    }

    if anchored && !stops.is_empty() {
        if let Some(leg) = legs.get(offset + stops.len() - 1) {
            elapsed = elapsed.saturating_add(leg.duration_seconds);
        }
    }

    // The clock wraps daily, so only the remainder moves the end time.
    let within_day = TimeDelta::seconds((elapsed % SECONDS_PER_DAY) as i64);
    let (finish, _) = start.overflowing_add_signed(within_day);
    let mut end = format_clock(finish);
    let mut runs_late = false;

    if let EndTimePreference::Fixed(fixed) = end_time {
        let finish_secs = (start.num_seconds_from_midnight() as u64).saturating_add(elapsed);
        if finish_secs > fixed.num_seconds_from_midnight() as u64 {
            end = format!("{} {}", format_clock(fixed), RUNS_LATE_NOTE);
            runs_late = true;
        }
    }

    DaySchedule {
        start_time: format_clock(start),
        end_time: end,
        runs_late,
        elapsed_seconds: elapsed,
    }
}

/// Parse an `HH:MM` clock time.
pub fn parse_clock_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), CLOCK_FORMAT)
        .map_err(|_| ConfigError::InvalidClockTime(value.to_string()))
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format(CLOCK_FORMAT).to_string()
}

/// `"2h 5m"`, or `"12m"` under an hour.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// `"3.4 km"`
pub fn format_distance(meters: u64) -> String {
    format!("{:.1} km", meters as f64 / 1000.0)
}
