//! Route builders handed to the movement interpolator.
//!
//! Every builder returns an ordered list of waypoints with a heading at each
//! point. None of them avoid obstacles or look for short routes; they only
//! shape how an ant wanders and how it joins or follows an existing trail.

use rand::Rng;
use std::f64::consts::FRAC_PI_4;

use crate::geometry::{angular_midpoint, bearing, rotation_diff, target_point, BoundingBox, Location};
use crate::grid::TrailGrid;
use crate::pheromones::TrailId;

/// How far ahead of the ant the first point of a merge path is placed.
const MERGE_LEAD: f64 = 10.0;
/// Distance beyond the target node where a merge path ends.
const MERGE_REACH: f64 = 30.0;
/// Largest turn an ant accepts when following a trail segment.
const MAX_TRAIL_TURN: f64 = FRAC_PI_4;
/// Upper bound on nodes examined by a single trail walk.
const MAX_TRAIL_WALK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Length of each leg.
    pub magnitude: f64,
    /// Width of the uniform jitter added to each axis after the first leg.
    pub scale: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            magnitude: 50.0,
            scale: 40.0,
        }
    }
}

/// Random walk of `num_points` legs starting straight ahead of `start`.
pub fn build_search_path<R: Rng + ?Sized>(
    start: &Location,
    num_points: usize,
    bounds: &BoundingBox,
    rng: &mut R,
) -> Vec<Location> {
    build_search_path_with(start, num_points, bounds, SearchParams::default(), rng)
}

pub fn build_search_path_with<R: Rng + ?Sized>(
    start: &Location,
    num_points: usize,
    bounds: &BoundingBox,
    params: SearchParams,
    rng: &mut R,
) -> Vec<Location> {
    let mut path = Vec::with_capacity(num_points);
    if num_points == 0 {
        return path;
    }

    // The first leg keeps the ant moving the way it already faces.
    let mut previous = bounds.reflect(target_point(start, params.magnitude));
    path.push(previous);

    while path.len() < num_points {
        let ahead = target_point(&previous, params.magnitude);
        let jittered = Location {
            x: ahead.x + (rng.gen::<f64>() - 0.5) * params.scale,
            y: ahead.y + (rng.gen::<f64>() - 0.5) * params.scale,
            rotation: previous.rotation,
        };
        let mut point = bounds.reflect(jittered);
        point.rotation = bearing(&previous, &point).unwrap_or(previous.rotation);
        path.push(point);
        previous = point;
    }

    without_degenerate(path)
}

/// Two-point path that merges onto the trail at `target` instead of turning
/// sharply onto it.
pub fn path_to_trail(start: &Location, grid: &TrailGrid, target: TrailId) -> Vec<Location> {
    let Some(node) = grid.get(target) else {
        return Vec::new();
    };
    let lead = target_point(start, MERGE_LEAD);
    let node_location = node.location();

    let trail_heading = if let Some(previous) = grid.previous_of(target) {
        bearing(&node_location, &previous.location())
    } else if let Some(next) = grid.next_of(target) {
        bearing(&next.location(), &node_location)
    } else {
        None
    }
    .unwrap_or(lead.rotation);

    let heading = angular_midpoint(lead.rotation, trail_heading);
    let merge = target_point(&node_location.facing(heading), MERGE_REACH);

    without_degenerate(vec![lead, merge])
}

/// Walks the trail from `target` toward its origin, keeping only the points
/// that do not require turning more than 45 degrees from the current heading.
pub fn path_along_trail(
    start: &Location,
    grid: &TrailGrid,
    target: TrailId,
    num_points: usize,
    bounds: &BoundingBox,
) -> Vec<Location> {
    let mut path = Vec::with_capacity(num_points);
    let mut from = *start;

    for node in grid.chain(target).take(MAX_TRAIL_WALK) {
        if path.len() >= num_points {
            break;
        }
        let candidate = node.location();
        let heading = bearing(&from, &candidate).unwrap_or(from.rotation);
        if rotation_diff(from.rotation, heading).abs() > MAX_TRAIL_TURN {
            continue;
        }
        let point = bounds.reflect(candidate.facing(heading));
        path.push(point);
        from = point;
    }

    without_degenerate(path)
}

fn without_degenerate(path: Vec<Location>) -> Vec<Location> {
    path.into_iter().filter(|point| !point.is_degenerate()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{distance, unwrap};
    use crate::pheromones::TrailKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn grid() -> TrailGrid {
        let mut grid = TrailGrid::new(20.0, 100.0);
        grid.init(1000.0, 1000.0);
        grid
    }

    fn world() -> BoundingBox {
        BoundingBox::new(0.0, 1000.0, 0.0, 1000.0)
    }

    #[test]
    fn search_path_has_requested_length_inside_bounds() {
        let bounds = BoundingBox::new(0.0, 200.0, 0.0, 150.0);
        let mut rng = StdRng::seed_from_u64(42);
        for seed_heading in 0..16 {
            let start = Location::new(190.0, 10.0, seed_heading as f64 * PI / 8.0);
            for n in [1, 2, 10, 40] {
                let path = build_search_path(&start, n, &bounds, &mut rng);
                assert_eq!(path.len(), n);
                for point in &path {
                    assert!(bounds.contains(point.x, point.y), "{point:?} escaped {bounds:?}");
                }
            }
        }
    }

    #[test]
    fn search_path_starts_straight_ahead() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Location::new(500.0, 500.0, FRAC_PI_2);
        let path = build_search_path(&start, 5, &world(), &mut rng);
        assert!((path[0].x - 500.0).abs() < 1e-9);
        assert!((path[0].y - 550.0).abs() < 1e-9);
        assert_eq!(path[0].rotation, FRAC_PI_2);
    }

    #[test]
    fn search_path_headings_follow_the_legs() {
        let mut rng = StdRng::seed_from_u64(9);
        let start = Location::new(500.0, 500.0, 0.3);
        let path = build_search_path(&start, 8, &world(), &mut rng);
        for pair in path.windows(2) {
            let expected = bearing(&pair[0], &pair[1]).unwrap();
            assert!((pair[1].rotation - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn search_path_is_reproducible_with_a_seed() {
        let start = Location::new(300.0, 300.0, 1.0);
        let a = build_search_path(&start, 10, &world(), &mut StdRng::seed_from_u64(5));
        let b = build_search_path(&start, 10, &world(), &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn merge_path_bends_toward_the_trail_heading() {
        let mut grid = grid();
        // Trail runs from (300, 300) back toward (260, 300): heading west.
        let origin = grid.deposit(260.0, 300.0, TrailKind::Food, None, 1.0, false);
        let target = grid.deposit(300.0, 300.0, TrailKind::Food, Some(origin), 1.0, false);

        // Ant heads south toward the trail.
        let start = Location::new(300.0, 250.0, FRAC_PI_2);
        let path = path_to_trail(&start, &grid, target);
        assert_eq!(path.len(), 2);
        assert!((path[0].y - 260.0).abs() < 1e-9);

        let expected = angular_midpoint(FRAC_PI_2, PI);
        assert!((unwrap(path[1].rotation - expected)).abs() < 1e-9);
        assert!((distance(&path[1], &Location::new(300.0, 300.0, 0.0)) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn merge_path_uses_next_link_at_a_root() {
        let mut grid = grid();
        let root = grid.deposit(300.0, 300.0, TrailKind::Nest, None, 1.0, false);
        grid.deposit(300.0, 340.0, TrailKind::Nest, Some(root), 1.0, false);

        let start = Location::new(250.0, 300.0, 0.0);
        let path = path_to_trail(&start, &grid, root);
        // Inverse bearing from the successor points north (-π/2).
        let expected = angular_midpoint(0.0, -FRAC_PI_2);
        assert!((path[1].rotation - expected).abs() < 1e-9);
    }

    #[test]
    fn merge_path_to_evaporated_node_is_empty() {
        let mut grid = grid();
        let node = grid.deposit(300.0, 300.0, TrailKind::Nest, None, 1.0, false);
        grid.decay_column(node.col, 5.0);
        assert!(path_to_trail(&Location::new(10.0, 10.0, 0.0), &grid, node).is_empty());
    }

    #[test]
    fn stalled_search_legs_keep_their_heading() {
        let params = SearchParams {
            magnitude: 0.0,
            scale: 0.0,
        };
        let start = Location::new(300.0, 300.0, 0.7);
        let path = build_search_path_with(&start, 4, &world(), params, &mut StdRng::seed_from_u64(2));
        assert_eq!(path.len(), 4);
        for point in &path {
            assert_eq!((point.x, point.y, point.rotation), (300.0, 300.0, 0.7));
        }
    }

    #[test]
    fn merge_path_drops_a_lead_point_on_the_origin() {
        let mut grid = grid();
        let target = grid.deposit(20.0, 0.0, TrailKind::Food, None, 1.0, false);
        // Ten units ahead of the start is exactly (0, 0).
        let start = Location::new(-10.0, 0.0, 0.0);
        let path = path_to_trail(&start, &grid, target);
        assert_eq!(path.len(), 1);
        assert!(!path[0].is_degenerate());
        assert!((distance(&path[0], &Location::new(20.0, 0.0, 0.0)) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn trail_walk_drops_a_node_on_the_origin() {
        let mut grid = grid();
        let origin = grid.deposit(0.0, 0.0, TrailKind::Nest, None, 1.0, false);
        let tip = grid.deposit(20.0, 0.0, TrailKind::Nest, Some(origin), 1.0, false);
        let start = Location::new(40.0, 0.0, PI);
        let path = path_along_trail(&start, &grid, tip, 5, &world());
        assert_eq!(path.len(), 1);
        assert_eq!((path[0].x, path[0].y), (20.0, 0.0));
    }

    fn straight_trail(grid: &mut TrailGrid, len: usize) -> TrailId {
        // Origin at x = 100, tip at the far east end.
        let mut previous = None;
        let mut last = None;
        for i in 0..len {
            let id = grid.deposit(100.0 + i as f64 * 20.0, 500.0, TrailKind::Nest, previous, 1.0, false);
            previous = Some(id);
            last = Some(id);
        }
        last.unwrap()
    }

    #[test]
    fn trail_walk_heads_to_the_origin() {
        let mut grid = grid();
        let tip = straight_trail(&mut grid, 8);
        let start = Location::new(260.0, 500.0, PI);

        let path = path_along_trail(&start, &grid, tip, 5, &world());
        assert_eq!(path.len(), 5);
        for pair in path.windows(2) {
            assert!(pair[1].x < pair[0].x);
        }
        assert!((path[0].x - 240.0).abs() < 1e-9);
    }

    #[test]
    fn trail_walk_stops_when_chain_is_exhausted() {
        let mut grid = grid();
        let tip = straight_trail(&mut grid, 3);
        let start = Location::new(160.0, 500.0, PI);
        let path = path_along_trail(&start, &grid, tip, 10, &world());
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn trail_walk_refuses_to_reverse() {
        let mut grid = grid();
        let tip = straight_trail(&mut grid, 6);
        // Facing east, away from the trail origin.
        let start = Location::new(210.0, 500.0, 0.0);
        let path = path_along_trail(&start, &grid, tip, 5, &world());
        assert!(path.is_empty());
    }
}
