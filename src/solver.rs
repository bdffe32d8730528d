//! Intra-day route ordering (nearest neighbour + 2-opt).
//!
//! The result is always a permutation of the input: no stop is added,
//! dropped or duplicated. The first stop stays first.

use tracing::debug;

use crate::haversine::haversine_km;
use crate::model::Stop;

/// Improvements smaller than this are treated as noise.
const EPSILON_KM: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct OptimizerOptions {
    /// Maximum full 2-opt passes over the route.
    pub max_two_opt_passes: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_two_opt_passes: 100,
        }
    }
}

/// Reorder `stops` to approximately minimize total path length.
pub fn optimize(stops: &[Stop], options: &OptimizerOptions) -> Vec<Stop> {
    if stops.len() <= 2 {
        return stops.to_vec();
    }

    let mut order = nearest_neighbor_order(stops);
    let passes = two_opt(stops, &mut order, options.max_two_opt_passes);
    debug!(stops = stops.len(), passes, "optimized day route");

    order.into_iter().map(|idx| stops[idx].clone()).collect()
}

/// Greedy tour: start at the first stop, always move to the closest unvisited one.
pub fn nearest_neighbor(stops: &[Stop]) -> Vec<Stop> {
    nearest_neighbor_order(stops)
        .into_iter()
        .map(|idx| stops[idx].clone())
        .collect()
}

/// Total length in kilometers of the open path through `stops`.
pub fn path_length_km(stops: &[Stop]) -> f64 {
    stops
        .windows(2)
        .map(|pair| haversine_km(pair[0].location, pair[1].location))
        .sum()
}

fn nearest_neighbor_order(stops: &[Stop]) -> Vec<usize> {
    if stops.is_empty() {
        return Vec::new();
    }

    let mut visited = vec![false; stops.len()];
    let mut order = Vec::with_capacity(stops.len());
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < stops.len() {
        let mut nearest: Option<(usize, f64)> = None;
        for (idx, stop) in stops.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let distance = haversine_km(stops[current].location, stop.location);
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((idx, distance));
            }
        }

        let Some((next, _)) = nearest else {
            break;
        };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}

/// 2-opt: reverse the segment `[i+1..=j]` whenever that shortens the path.
///
/// Only the two edges at the segment ends change, so each move is scored by
/// its length delta. Runs full passes until one finds no improving move or
/// `max_passes` is reached. Returns the number of passes made.
fn two_opt(stops: &[Stop], order: &mut [usize], max_passes: usize) -> usize {
    let n = order.len();
    if n < 3 {
        return 0;
    }

    let dist = |a: usize, b: usize| haversine_km(stops[a].location, stops[b].location);
    let mut passes = 0;

    while passes < max_passes {
        passes += 1;
        let mut improved = false;

        for i in 0..n - 1 {
            for j in i + 2..n {
                let mut delta = dist(order[i], order[j]) - dist(order[i], order[i + 1]);
                // The path is open: the last stop has no outgoing edge.
                if j + 1 < n {
                    delta += dist(order[i + 1], order[j + 1]) - dist(order[j], order[j + 1]);
                }
                if delta < -EPSILON_KM {
                    order[i + 1..=j].reverse();
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    passes
}
