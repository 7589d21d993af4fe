//! Shortest walked route along a recorded trail
//!
//! Trail points closer than the connectivity radius are adjacent, so a route
//! may cut across a place where the walker recrossed their own path, but it
//! never leaves ground that was actually walked.

use crate::config::PathConfig;
use crate::error::{TrailError, TrailResult};
use crate::geodesy::{self, EARTH_RADIUS_M};
use crate::types::{AcceptedPoint, Trail};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::PI;

/// How a walked path was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSource {
    /// Target is the trail origin
    Direct,
    /// Shortest path over the proximity graph
    Graph,
    /// Uniform down-sampling of the trail, used when the search fails
    Decimated,
}

/// Ordered trail indices from 0 to the requested target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkedPath {
    pub indices: Vec<usize>,
    pub source: PathSource,
    /// Sum of hop distances along `indices`
    pub length_meters: f64,
}

impl WalkedPath {
    fn new(indices: Vec<usize>, source: PathSource, points: &[AcceptedPoint]) -> Self {
        let length_meters = indices
            .windows(2)
            .map(|hop| geodesy::distance(points[hop[0]].position(), points[hop[1]].position()))
            .sum();
        WalkedPath {
            indices,
            source,
            length_meters,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_fallback(&self) -> bool {
        self.source == PathSource::Decimated
    }

    /// Coordinates of the path in order, for rendering
    pub fn positions(&self, trail: &Trail) -> Vec<(f64, f64)> {
        self.indices
            .iter()
            .filter_map(|&i| trail.get(i).map(AcceptedPoint::position))
            .collect()
    }
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Implicit proximity graph over trail points
///
/// Candidates come from an R-tree envelope query padded beyond the radius;
/// the exact haversine test decides adjacency.
struct ProximityGraph<'a> {
    points: &'a [AcceptedPoint],
    tree: RTree<IndexedPoint>,
    radius_m: f64,
}

impl<'a> ProximityGraph<'a> {
    fn build(points: &'a [AcceptedPoint], radius_m: f64) -> Self {
        let indexed: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new([p.lon, p.lat], i))
            .collect();
        ProximityGraph {
            points,
            tree: RTree::bulk_load(indexed),
            radius_m,
        }
    }

    fn neighbors(&self, node: usize) -> Vec<(usize, f64)> {
        let origin = self.points[node];
        let meters_per_degree = EARTH_RADIUS_M * PI / 180.0;
        // 10% slack covers the latitude change across the envelope
        let lat_pad = 1.1 * self.radius_m / meters_per_degree;
        let lon_pad = (lat_pad / origin.lat.to_radians().cos().abs().max(1e-6)).min(360.0);

        // envelopes copied one turn east or west catch points across the antimeridian
        let mut shifts = vec![0.0];
        if origin.lon - lon_pad < -180.0 {
            shifts.push(360.0);
        }
        if origin.lon + lon_pad > 180.0 {
            shifts.push(-360.0);
        }

        let mut candidates: Vec<usize> = shifts
            .iter()
            .flat_map(|shift| {
                let lon = origin.lon + shift;
                let envelope = AABB::from_corners(
                    [lon - lon_pad, origin.lat - lat_pad],
                    [lon + lon_pad, origin.lat + lat_pad],
                );
                self.tree
                    .locate_in_envelope(&envelope)
                    .map(|candidate| candidate.data)
                    .collect::<Vec<_>>()
            })
            .filter(|&i| i != node)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|i| {
                let d = geodesy::distance(origin.position(), self.points[i].position());
                (d < self.radius_m).then_some((i, d))
            })
            .collect()
    }

    fn is_edge(&self, a: usize, b: usize) -> bool {
        geodesy::distance(self.points[a].position(), self.points[b].position()) < self.radius_m
    }
}

/// Min-heap entry ordered by cost
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Walked-path reconstruction over a trail snapshot
///
/// # Usage
/// ```
/// use survey_trail::path::PathReconstructor;
/// use survey_trail::types::{AcceptedPoint, Trail};
///
/// let trail = Trail::from_points((0..5).map(|i| AcceptedPoint {
///     lat: 45.0 + i as f64 * 0.0001,
///     lon: 17.0,
///     accuracy: 5.0,
///     timestamp: i * 3000,
/// }));
/// let path = PathReconstructor::default().reconstruct(&trail, 4).unwrap();
/// assert_eq!(path.indices, vec![0, 1, 2, 3, 4]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathReconstructor {
    config: PathConfig,
}

impl PathReconstructor {
    pub fn new(config: PathConfig) -> Self {
        PathReconstructor { config }
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Route from trail index 0 to `target`.
    ///
    /// Fails only on precondition violations (empty trail, target past the
    /// end). When the graph search cannot produce a valid route the decimated
    /// fallback is returned instead.
    pub fn reconstruct(&self, trail: &Trail, target: usize) -> TrailResult<WalkedPath> {
        let points = trail.points();
        if points.is_empty() {
            return Err(TrailError::EmptyTrail);
        }
        if target >= points.len() {
            return Err(TrailError::TargetOutOfRange {
                target,
                len: points.len(),
            });
        }
        if target == 0 {
            return Ok(WalkedPath::new(vec![0], PathSource::Direct, points));
        }

        let graph = ProximityGraph::build(points, self.config.connectivity_radius_meters);
        match self.shortest_path(&graph, target) {
            Some(indices) if self.is_valid(&graph, &indices, target) => {
                Ok(WalkedPath::new(indices, PathSource::Graph, points))
            }
            _ => {
                log::warn!(
                    "No walked route to trail index {} of {}, using decimated path",
                    target,
                    points.len()
                );
                Ok(WalkedPath::new(
                    decimated_path(target, self.config.fallback_segments),
                    PathSource::Decimated,
                    points,
                ))
            }
        }
    }

    /// Dijkstra from index 0; None if the target is not settled within the
    /// iteration cap or predecessor links do not lead back to 0.
    fn shortest_path(&self, graph: &ProximityGraph, target: usize) -> Option<Vec<usize>> {
        let n = graph.points.len();
        let max_iterations = self.config.iteration_factor.saturating_mul(n);

        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();

        dist[0] = 0.0;
        heap.push(Frontier { cost: 0.0, node: 0 });

        let mut iterations = 0usize;
        let mut reached = false;

        while let Some(Frontier { cost, node }) = heap.pop() {
            // every pop counts, stale entries included
            iterations += 1;
            if iterations > max_iterations {
                log::debug!("Path search hit iteration cap {}", max_iterations);
                break;
            }
            if settled[node] {
                continue;
            }
            settled[node] = true;
            if node == target {
                reached = true;
                break;
            }

            for (next, weight) in graph.neighbors(node) {
                if settled[next] {
                    continue;
                }
                let candidate = cost + weight;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    prev[next] = Some(node);
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        if !reached {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while current != 0 {
            current = prev[current]?;
            path.push(current);
            if path.len() > n {
                // predecessor cycle
                return None;
            }
        }
        path.reverse();
        Some(path)
    }

    fn is_valid(&self, graph: &ProximityGraph, path: &[usize], target: usize) -> bool {
        path.first() == Some(&0)
            && path.last() == Some(&target)
            && path.len() <= graph.points.len()
            && path.windows(2).all(|hop| graph.is_edge(hop[0], hop[1]))
    }
}

/// Index 0, every `max(1, target / segments)`-th index below `target`, then `target`
pub fn decimated_path(target: usize, segments: usize) -> Vec<usize> {
    let step = (target / segments.max(1)).max(1);
    let mut indices: Vec<usize> = (0..target).step_by(step).collect();
    indices.push(target);
    indices
}

/// Reconstruct with the default configuration
pub fn reconstruct(trail: &Trail, target: usize) -> TrailResult<WalkedPath> {
    PathReconstructor::default().reconstruct(trail, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_meters;

    const ORIGIN: (f64, f64) = (45.0, 17.0);

    fn trail_from_meters(coords: &[(f64, f64)]) -> Trail {
        Trail::from_points(coords.iter().enumerate().map(|(i, (east, north))| {
            let (lat, lon) = offset_meters(ORIGIN, *east, *north);
            AcceptedPoint {
                lat,
                lon,
                accuracy: 5.0,
                timestamp: i as i64 * 10_000,
            }
        }))
    }

    fn assert_path_bounds(path: &WalkedPath, trail: &Trail, target: usize) {
        assert_eq!(path.indices.first(), Some(&0));
        assert_eq!(path.indices.last(), Some(&target));
        assert!(path.len() <= trail.len());
    }

    #[test]
    fn test_empty_trail() {
        let err = reconstruct(&Trail::new(), 0).unwrap_err();
        assert!(matches!(err, TrailError::EmptyTrail));
    }

    #[test]
    fn test_target_out_of_range() {
        let trail = trail_from_meters(&[(0.0, 0.0), (10.0, 0.0)]);
        let err = reconstruct(&trail, 2).unwrap_err();
        assert!(matches!(
            err,
            TrailError::TargetOutOfRange { target: 2, len: 2 }
        ));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_target_zero_is_direct() {
        let trail = trail_from_meters(&[(0.0, 0.0), (10.0, 0.0)]);
        let path = reconstruct(&trail, 0).unwrap();
        assert_eq!(path.indices, vec![0]);
        assert_eq!(path.source, PathSource::Direct);
        assert_eq!(path.length_meters, 0.0);
    }

    #[test]
    fn test_straight_walk_follows_trail() {
        let coords: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * 12.0, 0.0)).collect();
        let trail = trail_from_meters(&coords);
        let path = reconstruct(&trail, 9).unwrap();
        assert_eq!(path.indices, (0..10).collect::<Vec<_>>());
        assert_eq!(path.source, PathSource::Graph);
        assert!((path.length_meters - 108.0).abs() < 0.1);
    }

    #[test]
    fn test_dense_walk_skips_intermediate_points() {
        // 6 m spacing: every third point is still within 20 m
        let coords: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * 6.0, 0.0)).collect();
        let trail = trail_from_meters(&coords);
        let path = reconstruct(&trail, 9).unwrap();
        assert_eq!(path.source, PathSource::Graph);
        assert_path_bounds(&path, &trail, 9);
        assert!(path.len() < 10);
        assert!((path.length_meters - 54.0).abs() < 0.1);
    }

    // Scenario E
    #[test]
    fn test_loop_crossing_shortcut() {
        let trail = trail_from_meters(&[
            (0.0, 0.0),
            (12.0, 0.0),
            (24.0, 0.0),
            (36.0, 0.0), // 3
            (36.0, 12.0),
            (36.0, 24.0),
            (36.0, 36.0),
            (48.0, 36.0),
            (60.0, 36.0),
            (72.0, 36.0),
            (72.0, 24.0),
            (72.0, 12.0),
            (72.0, 0.0),
            (72.0, -12.0),
            (60.0, -12.0),
            (48.0, -12.0), // 15, back near 3
            (48.0, -24.0),
            (48.0, -36.0),
            (60.0, -36.0),
            (72.0, -36.0),
            (84.0, -36.0), // 20
            (96.0, -36.0),
            (108.0, -36.0),
            (120.0, -36.0),
            (132.0, -36.0),
        ]);
        assert_eq!(trail.len(), 25);

        let path = reconstruct(&trail, 20).unwrap();
        assert_eq!(path.source, PathSource::Graph);
        assert_eq!(path.indices, vec![0, 1, 2, 3, 15, 16, 18, 19, 20]);
        assert!(path.len() < 20);
        for hop in path.indices.windows(2) {
            let a = trail.get(hop[0]).unwrap().position();
            let b = trail.get(hop[1]).unwrap().position();
            assert!(geodesy::distance(a, b) < 20.0);
        }
    }

    #[test]
    fn test_edges_cross_antimeridian() {
        let trail = Trail::from_points(
            [179.99995, -179.99995, -179.9998]
                .iter()
                .enumerate()
                .map(|(i, lon)| AcceptedPoint {
                    lat: 0.0,
                    lon: *lon,
                    accuracy: 5.0,
                    timestamp: i as i64 * 10_000,
                }),
        );
        let path = reconstruct(&trail, 2).unwrap();
        assert_eq!(path.source, PathSource::Graph);
        assert_eq!(path.indices, vec![0, 1, 2]);
        // 11.1 m + 16.7 m, not a trip around the globe
        assert!((path.length_meters - 27.8).abs() < 0.1);
    }

    #[test]
    fn test_iteration_cap_counts_stale_pops() {
        // index 4 is first reached through 3 and later improved through 1,
        // leaving a stale heap entry; settling 5 takes 7 pops on 6 points
        let trail = trail_from_meters(&[
            (0.0, 0.0),
            (-12.0, 8.0),
            (-8.0, 16.0),
            (0.0, 8.0),
            (-16.0, 16.0),
            (17.0, 16.0),
        ]);

        let path = reconstruct(&trail, 5).unwrap();
        assert_eq!(path.source, PathSource::Graph);
        assert_eq!(path.indices, vec![0, 3, 5]);

        let capped = PathReconstructor::new(PathConfig {
            iteration_factor: 1,
            ..PathConfig::default()
        })
        .reconstruct(&trail, 5)
        .unwrap();
        assert_eq!(capped.source, PathSource::Decimated);
        assert_eq!(capped.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_disconnected_trail_falls_back_to_decimation() {
        // 100 m spacing: no edges at all
        let coords: Vec<(f64, f64)> = (0..25).map(|i| (i as f64 * 100.0, 0.0)).collect();
        let trail = trail_from_meters(&coords);
        let path = reconstruct(&trail, 20).unwrap();
        assert_eq!(path.source, PathSource::Decimated);
        assert!(path.is_fallback());
        assert_eq!(path.indices, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20]);
        assert_path_bounds(&path, &trail, 20);
    }

    #[test]
    fn test_gap_in_trail_falls_back() {
        // connected except for a 200 m gap between 4 and 5
        let mut coords: Vec<(f64, f64)> = (0..5).map(|i| (i as f64 * 10.0, 0.0)).collect();
        coords.extend((0..5).map(|i| (240.0 + i as f64 * 10.0, 0.0)));
        let trail = trail_from_meters(&coords);

        let near = reconstruct(&trail, 4).unwrap();
        assert_eq!(near.source, PathSource::Graph);

        let far = reconstruct(&trail, 7).unwrap();
        assert_eq!(far.source, PathSource::Decimated);
        assert_eq!(far.indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_decimated_path_shapes() {
        assert_eq!(decimated_path(1, 10), vec![0, 1]);
        assert_eq!(decimated_path(5, 10), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(decimated_path(30, 10), vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 27, 30]);
        assert_eq!(decimated_path(25, 10), vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 25]);
        assert_eq!(decimated_path(12, 4), vec![0, 3, 6, 9, 12]);
    }

    #[test]
    fn test_fallback_segments_configurable() {
        let coords: Vec<(f64, f64)> = (0..13).map(|i| (i as f64 * 100.0, 0.0)).collect();
        let trail = trail_from_meters(&coords);
        let reconstructor = PathReconstructor::new(PathConfig {
            fallback_segments: 4,
            ..PathConfig::default()
        });
        let path = reconstructor.reconstruct(&trail, 12).unwrap();
        assert_eq!(path.indices, vec![0, 3, 6, 9, 12]);
    }

    #[test]
    fn test_path_bounds_on_wandering_trail() {
        // deterministic pseudo-random walk with occasional long strides
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % 1000) as f64 / 1000.0
        };
        let mut coords = Vec::new();
        let (mut x, mut y) = (0.0, 0.0);
        for _ in 0..80 {
            let stride = if next() > 0.9 { 35.0 } else { 8.0 };
            let angle = next() * 2.0 * PI;
            x += stride * angle.cos();
            y += stride * angle.sin();
            coords.push((x, y));
        }
        let trail = trail_from_meters(&coords);

        for target in [1, 7, 20, 41, 63, 79] {
            let path = reconstruct(&trail, target).unwrap();
            assert_path_bounds(&path, &trail, target);
            if path.source == PathSource::Graph {
                for hop in path.indices.windows(2) {
                    let a = trail.get(hop[0]).unwrap().position();
                    let b = trail.get(hop[1]).unwrap().position();
                    assert!(geodesy::distance(a, b) < 20.0);
                }
            }
        }
    }

    #[test]
    fn test_positions_follow_indices() {
        let trail = trail_from_meters(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let path = reconstruct(&trail, 2).unwrap();
        let positions = path.positions(&trail);
        assert_eq!(positions.len(), path.len());
        assert_eq!(positions[0], trail.get(0).unwrap().position());
    }
}
