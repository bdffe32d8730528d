//! Partitioning stops into day-groups.
//!
//! Every strategy returns a partition: each input stop lands in exactly one
//! group, and no group is empty.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ItineraryOptions;
use crate::haversine::haversine_km;
use crate::model::{LatLng, Stop};
use crate::visit_duration::visit_minutes;

/// Hard cap on Lloyd iterations.
pub const MAX_KMEANS_ITERATIONS: usize = 100;

/// Transition allowance between two stops of the same day, in minutes.
const BUFFER_MINUTES: f64 = 10.0;
const DEFAULT_TARGET_DAY_MINUTES: f64 = 9.0 * 60.0;
const DEFAULT_MAX_DAY_MINUTES: f64 = 10.0 * 60.0;
const MIN_TARGET_DAY_MINUTES: f64 = 4.0 * 60.0;
/// Minutes per straight-line kilometer when sizing a day (30 km/h).
const CLUSTER_MINUTES_PER_KM: f64 = 2.0;

/// How stops are split into days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusteringStrategy {
    /// Pure k-means++ over coordinates. Days may be uneven.
    Geographical,
    /// k-means++ followed by rebalancing so no day carries more than one
    /// stop above the ideal share.
    #[default]
    Balanced,
    /// Greedy day-by-day filling against a time budget.
    TimeOptimized,
}

impl ClusteringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringStrategy::Geographical => "geographical",
            ClusteringStrategy::Balanced => "balanced",
            ClusteringStrategy::TimeOptimized => "time-optimized",
        }
    }

    /// Partition `stops` into at most `days` non-empty groups.
    ///
    /// When there are no more stops than days (or `days` is zero) every stop
    /// gets its own group.
    pub fn cluster<R: Rng + ?Sized>(
        &self,
        stops: &[Stop],
        days: usize,
        options: &ItineraryOptions,
        rng: &mut R,
    ) -> Vec<Vec<Stop>> {
        if days == 0 || days >= stops.len() {
            debug!(stops = stops.len(), days, "one stop per group");
            return stops.iter().map(|stop| vec![stop.clone()]).collect();
        }

        let points: Vec<LatLng> = stops.iter().map(|stop| stop.location).collect();
        let groups = match self {
            ClusteringStrategy::Geographical => geographical(&points, days, rng),
            ClusteringStrategy::Balanced => balanced(&points, days, rng),
            ClusteringStrategy::TimeOptimized => time_optimized(stops, days, options),
        };

        let groups: Vec<Vec<Stop>> = groups
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|group| group.into_iter().map(|idx| stops[idx].clone()).collect())
            .collect();

        info!(
            strategy = self.as_str(),
            sizes = ?groups.iter().map(Vec::len).collect::<Vec<_>>(),
            "clustered stops into days"
        );
        groups
    }
}

impl fmt::Display for ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geographical" => Ok(ClusteringStrategy::Geographical),
            "balanced" => Ok(ClusteringStrategy::Balanced),
            "time-optimized" | "time_optimized" => Ok(ClusteringStrategy::TimeOptimized),
            other => Err(format!("unknown clustering strategy: {}", other)),
        }
    }
}

// ============================================================================
// Geographical (k-means++)
// ============================================================================

fn geographical<R: Rng + ?Sized>(points: &[LatLng], k: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut centroids = seed_centroids(points, k, rng);
    let mut clusters = lloyd(points, &mut centroids);
    fill_empty_clusters(points, &mut clusters);
    clusters
}

/// k-means++ seeding: first centroid uniform, the rest weighted by squared
/// distance to the nearest centroid chosen so far.
fn seed_centroids<R: Rng + ?Sized>(points: &[LatLng], k: usize, rng: &mut R) -> Vec<LatLng> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|point| {
                let d = nearest_centroid(*point, &centroids).1;
                d * d
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = weights.iter().rposition(|w| *w > 0.0).unwrap_or(0);
            for (idx, weight) in weights.iter().enumerate() {
                if *weight <= 0.0 {
                    continue;
                }
                cumulative += weight;
                if cumulative >= target {
                    chosen = idx;
                    break;
                }
            }
            chosen
        } else {
            // Every point sits on a centroid already.
            rng.random_range(0..points.len())
        };

        centroids.push(points[next]);
    }

    centroids
}

/// Lloyd's iteration until centroids stop moving or the cap is reached.
fn lloyd(points: &[LatLng], centroids: &mut Vec<LatLng>) -> Vec<Vec<usize>> {
    let mut clusters = vec![Vec::new(); centroids.len()];

    for iteration in 0..MAX_KMEANS_ITERATIONS {
        clusters = vec![Vec::new(); centroids.len()];
        for (idx, point) in points.iter().enumerate() {
            let (closest, _) = nearest_centroid(*point, centroids);
            clusters[closest].push(idx);
        }

        let updated: Vec<LatLng> = clusters
            .iter()
            .zip(centroids.iter())
            .map(|(members, previous)| centroid_of(points, members).unwrap_or(*previous))
            .collect();

        let moved = updated != *centroids;
        *centroids = updated;
        if !moved {
            debug!(iterations = iteration + 1, "k-means converged");
            break;
        }
    }

    clusters
}

/// Index of and distance to the closest centroid. Ties keep the first.
fn nearest_centroid(point: LatLng, centroids: &[LatLng]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let distance = haversine_km(point, *centroid);
        if distance < best.1 {
            best = (idx, distance);
        }
    }
    best
}

fn centroid_of(points: &[LatLng], members: &[usize]) -> Option<LatLng> {
    if members.is_empty() {
        return None;
    }
    let n = members.len() as f64;
    let lat = members.iter().map(|&idx| points[idx].lat).sum::<f64>() / n;
    let lng = members.iter().map(|&idx| points[idx].lng).sum::<f64>() / n;
    Some(LatLng::new(lat, lng))
}

/// Give every empty cluster the outlying stop of the largest cluster.
fn fill_empty_clusters(points: &[LatLng], clusters: &mut [Vec<usize>]) {
    while let Some(empty) = clusters.iter().position(Vec::is_empty) {
        let Some(largest) = clusters
            .iter()
            .enumerate()
            .max_by_key(|(idx, members)| (members.len(), Reverse(*idx)))
            .map(|(idx, _)| idx)
        else {
            return;
        };
        if clusters[largest].len() < 2 {
            return;
        }

        let Some(center) = centroid_of(points, &clusters[largest]) else {
            return;
        };
        let farthest = farthest_member(points, &clusters[largest], center);
        let moved = clusters[largest].remove(farthest);
        clusters[empty].push(moved);
        debug!(from = largest, to = empty, "filled empty cluster");
    }
}

fn farthest_member(points: &[LatLng], members: &[usize], center: LatLng) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (pos, &idx) in members.iter().enumerate() {
        let distance = haversine_km(points[idx], center);
        if distance > best.1 {
            best = (pos, distance);
        }
    }
    best.0
}

fn closest_member(points: &[LatLng], members: &[usize], center: LatLng) -> usize {
    let mut best = (0, f64::INFINITY);
    for (pos, &idx) in members.iter().enumerate() {
        let distance = haversine_km(points[idx], center);
        if distance < best.1 {
            best = (pos, distance);
        }
    }
    best.0
}

// ============================================================================
// Balanced
// ============================================================================

fn balanced<R: Rng + ?Sized>(points: &[LatLng], k: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut clusters = geographical(points, k, rng);
    rebalance(points, &mut clusters);
    clusters
}

/// Move stops out of clusters larger than `ceil(n/k) + 1`.
///
/// Each move takes the stop of the oversized cluster nearest to the centroid
/// of the smallest cluster still below the ideal size. Stops when no such
/// target exists.
fn rebalance(points: &[LatLng], clusters: &mut [Vec<usize>]) {
    let k = clusters.len();
    if k == 0 {
        return;
    }
    let n: usize = clusters.iter().map(Vec::len).sum();
    let ideal = n.div_ceil(k);
    let max_allowed = ideal + 1;

    clusters.sort_by_key(|members| Reverse(members.len()));

    let mut moves = 0;
    for i in 0..k {
        while clusters[i].len() > max_allowed {
            let Some(target) = (0..k)
                .filter(|&j| j != i && clusters[j].len() < ideal)
                .min_by_key(|&j| clusters[j].len())
            else {
                break;
            };

            let pos = match centroid_of(points, &clusters[target]) {
                Some(center) => closest_member(points, &clusters[i], center),
                None => 0,
            };
            let moved = clusters[i].remove(pos);
            clusters[target].push(moved);
            moves += 1;
        }
    }

    if moves > 0 {
        debug!(
            moves,
            sizes = ?clusters.iter().map(Vec::len).collect::<Vec<_>>(),
            "rebalanced clusters"
        );
    }
}

// ============================================================================
// Time-optimized
// ============================================================================

/// Target and maximum minutes of activity per day.
fn day_budget(options: &ItineraryOptions) -> (f64, f64) {
    match options.fixed_end_time() {
        Some(end) => {
            let available = (end - options.start_time).num_minutes() as f64;
            ((available * 0.9).max(MIN_TARGET_DAY_MINUTES), available)
        }
        None => (DEFAULT_TARGET_DAY_MINUTES, DEFAULT_MAX_DAY_MINUTES),
    }
}

fn time_optimized(stops: &[Stop], k: usize, options: &ItineraryOptions) -> Vec<Vec<usize>> {
    let (target, cap) = day_budget(options);
    let mut remaining: Vec<usize> = (0..stops.len()).collect();
    let mut days: Vec<Vec<usize>> = Vec::with_capacity(k);

    for day in 0..k {
        if remaining.is_empty() {
            break;
        }

        let rating = |idx: usize| stops[idx].rating.unwrap_or(0.0);
        let seed_pos = (1..remaining.len()).fold(0, |best, pos| {
            if rating(remaining[pos]) > rating(remaining[best]) {
                pos
            } else {
                best
            }
        });
        let seed = remaining.remove(seed_pos);
        let mut members = vec![seed];
        let mut minutes = visit_minutes(&stops[seed]) as f64;

        // Keep one stop back for each day still to be seeded.
        let reserved = k - day - 1;
        while remaining.len() > reserved && minutes < target {
            let Some(&last) = members.last() else {
                break;
            };
            let mut closest = (0, f64::INFINITY);
            for (pos, &idx) in remaining.iter().enumerate() {
                let distance = haversine_km(stops[last].location, stops[idx].location);
                if distance < closest.1 {
                    closest = (pos, distance);
                }
            }

            let candidate = remaining[closest.0];
            let travel = (closest.1 * CLUSTER_MINUTES_PER_KM).round();
            let added = visit_minutes(&stops[candidate]) as f64 + travel + BUFFER_MINUTES;
            if minutes + added > cap {
                break;
            }
            remaining.remove(closest.0);
            members.push(candidate);
            minutes += added;
        }

        debug!(
            day = day + 1,
            stops = members.len(),
            minutes,
            "filled day against time budget"
        );
        days.push(members);
    }

    while let Some(idx) = remaining.pop() {
        let Some(lightest) = (0..days.len()).min_by_key(|&d| days[d].len()) else {
            break;
        };
        debug!(stop = %stops[idx].name, day = lightest + 1, "placed leftover stop");
        days[lightest].push(idx);
    }

    days
}
