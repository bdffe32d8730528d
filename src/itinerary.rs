//! Top-level planning: cluster, order, route and schedule every day.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::cluster::ClusteringStrategy;
use crate::config::ItineraryOptions;
use crate::gateway::RoutingGateway;
use crate::model::{Accommodation, DayPlan, ItineraryPlan, LegSource, Stop};
use crate::places::{PlaceError, StopResolver};
use crate::schedule::{format_distance, format_duration, schedule};
use crate::solver::optimize;
use crate::traits::{LegProvider, PlaceDetailsProvider};

/// A plan could not be produced. Tagged by the stage that failed.
///
/// A degraded routing service is not an error; see [`ItineraryPlan::degraded_days`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("clustering failed: {0}")]
    Clustering(String),
    #[error("route optimization failed for day {day}: {reason}")]
    Optimization { day: usize, reason: String },
    #[error("aggregating day results failed: {0}")]
    Aggregation(String),
    #[error(transparent)]
    Places(#[from] PlaceError),
}

pub struct ItineraryAssembler<P> {
    gateway: RoutingGateway<P>,
    options: ItineraryOptions,
}

impl<P: LegProvider + Sync> ItineraryAssembler<P> {
    pub fn new(provider: P, options: ItineraryOptions) -> Self {
        Self {
            gateway: RoutingGateway::new(provider),
            options,
        }
    }

    pub fn options(&self) -> &ItineraryOptions {
        &self.options
    }

    /// Plan `stops` over `days` days, drawing randomness from the options' seed.
    pub fn plan(
        &self,
        stops: &[Stop],
        days: usize,
        strategy: ClusteringStrategy,
        accommodation: Option<&Accommodation>,
    ) -> Result<ItineraryPlan, PlanError> {
        let mut rng = self.options.rng();
        self.plan_with_rng(stops, days, strategy, accommodation, &mut rng)
    }

    /// Resolve `ids` through `resolver`, then plan the resulting stops.
    pub fn plan_from_ids<D: PlaceDetailsProvider + Sync>(
        &self,
        resolver: &mut StopResolver<D>,
        ids: &[String],
        days: usize,
        strategy: ClusteringStrategy,
        accommodation: Option<&Accommodation>,
    ) -> Result<ItineraryPlan, PlanError> {
        let stops = resolver.resolve(ids)?;
        self.plan(&stops, days, strategy, accommodation)
    }

    pub fn plan_with_rng<R: Rng + ?Sized>(
        &self,
        stops: &[Stop],
        days: usize,
        strategy: ClusteringStrategy,
        accommodation: Option<&Accommodation>,
        rng: &mut R,
    ) -> Result<ItineraryPlan, PlanError> {
        info!(
            stops = stops.len(),
            days,
            strategy = %strategy,
            "planning itinerary"
        );

        let groups = strategy.cluster(stops, days, &self.options, rng);
        check_partition(stops, &groups)?;

        let mut ordered = Vec::with_capacity(groups.len());
        for (idx, group) in groups.iter().enumerate() {
            let route = optimize(group, &self.options.optimizer);
            if !same_stops(group, &route) {
                return Err(PlanError::Optimization {
                    day: idx + 1,
                    reason: "optimized route is not a permutation of its day".to_string(),
                });
            }
            ordered.push(route);
        }

        let mut day_plans: Vec<DayPlan> = ordered
            .into_par_iter()
            .enumerate()
            .map(|(idx, route)| self.plan_day(idx + 1, route, accommodation))
            .collect();

        day_plans.sort_by_key(|day| day.day);
        aggregate(day_plans, stops.len(), self.options.city.clone())
    }

    fn plan_day(&self, day: usize, stops: Vec<Stop>, accommodation: Option<&Accommodation>) -> DayPlan {
        let day_legs = self.gateway.legs_for_day(&stops, accommodation);
        let timing = schedule(
            &stops,
            &day_legs.legs,
            self.options.start_time,
            self.options.end_time,
        );

        let total_distance_meters = day_legs
            .legs
            .iter()
            .fold(0u64, |total, leg| total.saturating_add(leg.distance_meters));
        let total_duration_seconds = day_legs
            .legs
            .iter()
            .fold(0u64, |total, leg| total.saturating_add(leg.duration_seconds));

        debug!(
            day,
            stops = stops.len(),
            legs = day_legs.legs.len(),
            fallback = day_legs.source == LegSource::Fallback,
            end = %timing.end_time,
            "planned day"
        );

        DayPlan {
            day,
            stops,
            legs: day_legs.legs,
            leg_source: day_legs.source,
            total_distance_meters,
            total_duration_seconds,
            start_time: timing.start_time,
            end_time: timing.end_time,
            runs_late: timing.runs_late,
        }
    }
}

/// Every input stop must appear in exactly one non-empty group.
fn check_partition(stops: &[Stop], groups: &[Vec<Stop>]) -> Result<(), PlanError> {
    if let Some(idx) = groups.iter().position(Vec::is_empty) {
        return Err(PlanError::Clustering(format!("day {} has no stops", idx + 1)));
    }
    let grouped: Vec<Stop> = groups.iter().flatten().cloned().collect();
    if !same_stops(stops, &grouped) {
        return Err(PlanError::Clustering(format!(
            "{} stops in, {} stops across days",
            stops.len(),
            grouped.len()
        )));
    }
    Ok(())
}

/// Same multiset of stop ids.
fn same_stops(a: &[Stop], b: &[Stop]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for stop in a {
        *counts.entry(stop.id.as_str()).or_default() += 1;
    }
    for stop in b {
        *counts.entry(stop.id.as_str()).or_default() -= 1;
    }
    counts.values().all(|count| *count == 0)
}

fn aggregate(days: Vec<DayPlan>, total_stops: usize, city: Option<String>) -> Result<ItineraryPlan, PlanError> {
    for (idx, day) in days.iter().enumerate() {
        if day.day != idx + 1 {
            return Err(PlanError::Aggregation(format!(
                "expected day {}, found day {}",
                idx + 1,
                day.day
            )));
        }
    }

    let planned_stops: usize = days.iter().map(|day| day.stops.len()).sum();
    if planned_stops != total_stops {
        return Err(PlanError::Aggregation(format!(
            "{} stops planned out of {}",
            planned_stops, total_stops
        )));
    }

    let mut total_distance_meters: u64 = 0;
    let mut total_duration_seconds: u64 = 0;
    for day in &days {
        total_distance_meters = total_distance_meters
            .checked_add(day.total_distance_meters)
            .ok_or_else(|| PlanError::Aggregation("total distance overflow".to_string()))?;
        total_duration_seconds = total_duration_seconds
            .checked_add(day.total_duration_seconds)
            .ok_or_else(|| PlanError::Aggregation("total duration overflow".to_string()))?;
    }

    info!(
        days = days.len(),
        stops = total_stops,
        distance = %format_distance(total_distance_meters),
        duration = %format_duration(total_duration_seconds),
        "itinerary planned"
    );

    Ok(ItineraryPlan {
        city,
        total_days: days.len(),
        days,
        total_stops,
        total_distance_meters,
        total_duration_seconds,
        created_at: Utc::now(),
    })
}
