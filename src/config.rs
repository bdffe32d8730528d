//! Planning options and environment loading.

use std::str::FromStr;

use chrono::NaiveTime;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::parse_clock_time;
use crate::solver::OptimizerOptions;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),
}

/// When a day is expected to end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndTimePreference {
    /// Days end whenever the last visit does.
    #[default]
    Flexible,
    /// Days should end by this time.
    Fixed(NaiveTime),
}

#[derive(Debug, Clone)]
pub struct ItineraryOptions {
    /// Label carried onto the plan.
    pub city: Option<String>,
    /// Start of every day.
    pub start_time: NaiveTime,
    pub end_time: EndTimePreference,
    /// Seed for k-means++ centroid selection. Unseeded runs draw from the OS.
    pub seed: Option<u64>,
    pub optimizer: OptimizerOptions,
}

impl Default for ItineraryOptions {
    fn default() -> Self {
        Self {
            city: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end_time: EndTimePreference::Flexible,
            seed: None,
            optimizer: OptimizerOptions::default(),
        }
    }
}

impl ItineraryOptions {
    /// Reads `ITINERARY_CITY`, `ITINERARY_START_TIME`, `ITINERARY_FIXED_END_TIME`,
    /// `ITINERARY_SEED` and `ITINERARY_MAX_TWO_OPT_PASSES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::default();

        options.city = env_string("ITINERARY_CITY");
        if let Some(start) = env_string("ITINERARY_START_TIME") {
            options.start_time = parse_clock_time(&start)?;
        }
        if let Some(end) = env_string("ITINERARY_FIXED_END_TIME") {
            options.end_time = EndTimePreference::Fixed(parse_clock_time(&end)?);
        }
        options.seed = env_parse("ITINERARY_SEED")?;
        if let Some(passes) = env_parse("ITINERARY_MAX_TWO_OPT_PASSES")? {
            options.optimizer.max_two_opt_passes = passes;
        }

        Ok(options)
    }

    /// Random source for clustering.
    pub fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    pub fn fixed_end_time(&self) -> Option<NaiveTime> {
        match self.end_time {
            EndTimePreference::Fixed(end) => Some(end),
            EndTimePreference::Flexible => None,
        }
    }
}

/// Non-empty value of an environment variable.
pub(crate) fn env_string(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn env_parse<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(var)
        .map(|value| {
            value.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
                var: var.to_string(),
                value: value.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}
