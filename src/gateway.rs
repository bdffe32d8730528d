//! Leg data for an ordered day, from the routing service or its fallback.
//!
//! Failures of the routing service never reach the caller: any error is
//! logged and the day's legs are estimated from haversine distance instead.

use tracing::warn;

use crate::haversine::HaversineLegs;
use crate::model::{Accommodation, Leg, LegSource, Stop, Waypoint};
use crate::routes_api::{RoutingError, check_leg};
use crate::traits::{LegEstimate, LegProvider};

/// Legs for one day and where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DayLegs {
    pub legs: Vec<Leg>,
    pub source: LegSource,
}

#[derive(Debug, Clone)]
pub struct RoutingGateway<P> {
    provider: P,
    fallback: HaversineLegs,
}

impl<P: LegProvider> RoutingGateway<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            fallback: HaversineLegs,
        }
    }

    /// Legs through `stops` in order.
    ///
    /// With an accommodation the day starts and ends there, giving
    /// `stops + 1` legs; otherwise there are `stops - 1`.
    pub fn legs_for_day(&self, stops: &[Stop], accommodation: Option<&Accommodation>) -> DayLegs {
        let waypoints = waypoints(stops, accommodation);
        if waypoints.len() < 2 {
            return DayLegs {
                legs: Vec::new(),
                source: LegSource::NotRequired,
            };
        }

        let coords: Vec<_> = waypoints.iter().map(Waypoint::location).collect();
        let expected = waypoints.len() - 1;

        let provided = self.provider.legs_for(&coords).and_then(|estimates| {
            if estimates.len() != expected {
                return Err(RoutingError::LegCountMismatch {
                    expected,
                    actual: estimates.len(),
                });
            }
            for (index, estimate) in estimates.iter().enumerate() {
                check_leg(index, estimate)?;
            }
            Ok(estimates)
        });

        let (estimates, source) = match provided {
            Ok(estimates) => (estimates, LegSource::Provider),
            Err(err) => {
                warn!(
                    error = %err,
                    waypoints = waypoints.len(),
                    "routing service failed, estimating legs from straight-line distance"
                );
                (self.fallback.estimate_all(&coords), LegSource::Fallback)
            }
        };

        DayLegs {
            legs: attach_endpoints(&waypoints, estimates),
            source,
        }
    }
}

/// Stops in order, bracketed by the accommodation when there is one.
fn waypoints(stops: &[Stop], accommodation: Option<&Accommodation>) -> Vec<Waypoint> {
    let mut waypoints = Vec::with_capacity(stops.len() + 2);
    let anchor = accommodation.filter(|_| !stops.is_empty());

    if let Some(accommodation) = anchor {
        waypoints.push(Waypoint::Accommodation(accommodation.clone()));
    }
    waypoints.extend(stops.iter().cloned().map(Waypoint::Stop));
    if let Some(accommodation) = anchor {
        waypoints.push(Waypoint::Accommodation(accommodation.clone()));
    }

    waypoints
}

fn attach_endpoints(waypoints: &[Waypoint], estimates: Vec<LegEstimate>) -> Vec<Leg> {
    waypoints
        .windows(2)
        .zip(estimates)
        .map(|(pair, estimate)| Leg {
            from: pair[0].clone(),
            to: pair[1].clone(),
            distance_meters: estimate.distance_meters,
            duration_seconds: estimate.duration_seconds,
            encoded_path: estimate.encoded_path,
        })
        .collect()
}
