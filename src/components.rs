use bevy::log::debug;
use std::collections::HashMap;

use crate::geometry::Location;
use crate::grid::TrailGrid;
use crate::pheromones::{TrailId, TrailKind};

/// Anything with a place in the world.
pub trait Positioned {
    fn location(&self) -> Location;
}

pub type FoodSourceId = usize;

/// One harvested unit carried by an ant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    pub value: u32,
    pub source: FoodSourceId,
}

/// A pile of food that shrinks as ants harvest it. Exhausted piles stay in
/// place as inert markers.
#[derive(Debug, Clone)]
pub struct FoodSource {
    pub x: f64,
    pub y: f64,
    value: u32,
    initial_value: u32,
    size_ratio: f64,
    min_radius: f64,
}

impl FoodSource {
    pub fn new(x: f64, y: f64, value: u32, size_ratio: f64, min_radius: f64) -> Self {
        Self {
            x,
            y,
            value,
            initial_value: value,
            size_ratio,
            min_radius,
        }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn initial_value(&self) -> u32 {
        self.initial_value
    }

    pub fn is_exhausted(&self) -> bool {
        self.value == 0
    }

    /// Visual diameter, proportional to the food left.
    pub fn diameter(&self) -> f64 {
        self.value as f64 * self.size_ratio
    }

    /// Collision radius. Never smaller than the configured minimum while food
    /// remains, zero once exhausted.
    pub fn radius(&self) -> f64 {
        if self.is_exhausted() {
            0.0
        } else {
            (self.diameter() / 2.0).max(self.min_radius)
        }
    }

    /// Overlap test used by ants looking for something to pick up.
    pub fn is_hit_by(&self, agent: &Location) -> bool {
        !self.is_exhausted() && crate::geometry::hit(agent, &self.location(), self.radius())
    }

    /// Takes up to `amount` units. Returns `None` when nothing is left.
    pub fn harvest(&mut self, id: FoodSourceId, amount: u32) -> Option<Food> {
        let taken = amount.min(self.value);
        if taken == 0 {
            return None;
        }
        self.value -= taken;
        if self.value == 0 {
            debug!("Food source {} at ({:.0}, {:.0}) exhausted", id, self.x, self.y);
        }
        Some(Food { value: taken, source: id })
    }
}

impl Positioned for FoodSource {
    fn location(&self) -> Location {
        Location::new(self.x, self.y, 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct Nest {
    pub x: f64,
    pub y: f64,
    pub detect_radius: f64,
    pub food_stored: u64,
}

impl Nest {
    pub fn new(x: f64, y: f64, detect_radius: f64) -> Self {
        Self {
            x,
            y,
            detect_radius,
            food_stored: 0,
        }
    }

    pub fn is_hit_by(&self, agent: &Location) -> bool {
        crate::geometry::hit(agent, &self.location(), self.detect_radius)
    }

    pub fn store(&mut self, food: Food) {
        self.food_stored += u64::from(food.value);
    }

    /// Lays permanent Nest-kind markers on every cell within `radius` of the
    /// nest so that returning ants find their way in. Markers are laid ring by
    /// ring and each one links to its inward neighbour, so every chain ends
    /// at the marker on the nest itself. Returns the number of markers laid.
    pub fn seed_trails(&self, grid: &mut TrailGrid, radius: f64, strength: f64) -> usize {
        if radius <= 0.0 {
            return 0;
        }
        let step = grid.cell_size();
        let extent_x = grid.columns() as f64 * step;
        let extent_y = grid.rows() as f64 * step;
        let steps = (radius / step).floor() as i64;
        let mut markers: HashMap<(i64, i64), TrailId> = HashMap::new();

        for ring in 0..=steps {
            for i in -ring..=ring {
                for j in -ring..=ring {
                    if i.abs().max(j.abs()) != ring {
                        continue;
                    }
                    let x = self.x + i as f64 * step;
                    let y = self.y + j as f64 * step;
                    if x < 0.0 || y < 0.0 || x >= extent_x || y >= extent_y {
                        continue;
                    }
                    let inward = markers.get(&(i - i.signum(), j - j.signum())).copied();
                    let id = grid.deposit(x, y, TrailKind::Nest, inward, strength, true);
                    markers.insert((i, j), id);
                }
            }
        }
        debug!("Seeded {} nest trail markers around ({:.0}, {:.0})", markers.len(), self.x, self.y);
        markers.len()
    }
}

impl Positioned for Nest {
    fn location(&self) -> Location {
        Location::new(self.x, self.y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::DecayScheduler;

    #[test]
    fn harvest_shrinks_the_source() {
        let mut source = FoodSource::new(100.0, 100.0, 2, 0.01, 2.0);
        assert_eq!(source.harvest(0, 1), Some(Food { value: 1, source: 0 }));
        assert_eq!(source.value(), 1);
        assert_eq!(source.harvest(0, 5), Some(Food { value: 1, source: 0 }));
        assert!(source.is_exhausted());
        assert_eq!(source.harvest(0, 1), None);
        assert_eq!(source.initial_value(), 2);
    }

    #[test]
    fn radius_tracks_remaining_food() {
        let source = FoodSource::new(0.0, 0.0, 5000, 0.01, 2.0);
        assert!((source.diameter() - 50.0).abs() < 1e-9);
        assert!((source.radius() - 25.0).abs() < 1e-9);

        let small = FoodSource::new(0.0, 0.0, 1, 0.01, 2.0);
        assert_eq!(small.radius(), 2.0);
    }

    #[test]
    fn exhausted_sources_are_never_hit() {
        let mut source = FoodSource::new(50.0, 50.0, 1, 0.01, 2.0);
        let on_top = Location::new(50.0, 50.0, 0.0);
        assert!(source.is_hit_by(&on_top));
        source.harvest(0, 1);
        assert!(!source.is_hit_by(&on_top));
    }

    #[test]
    fn nest_stores_delivered_food() {
        let mut nest = Nest::new(500.0, 500.0, 30.0);
        nest.store(Food { value: 1, source: 0 });
        nest.store(Food { value: 2, source: 1 });
        assert_eq!(nest.food_stored, 3);
        assert!(nest.is_hit_by(&Location::new(520.0, 510.0, 0.0)));
        assert!(!nest.is_hit_by(&Location::new(540.0, 500.0, 0.0)));
    }

    #[test]
    fn seeded_markers_are_locked() {
        let mut grid = TrailGrid::new(20.0, 100.0);
        grid.init(1000.0, 1000.0);
        let nest = Nest::new(500.0, 500.0, 30.0);
        assert_eq!(nest.seed_trails(&mut grid, 60.0, 20.0), 49);
        assert_eq!(grid.live_count(TrailKind::Nest), 49);

        let mut decay = DecayScheduler::new(500.0);
        for i in 1..=200 {
            decay.tick(&mut grid, 1.0, i as f64 * 500.0);
        }
        assert_eq!(grid.live_count(TrailKind::Nest), 49);
        let marker = grid.query_at(500.0, 500.0, TrailKind::Nest).unwrap();
        assert_eq!(marker.strength(), 20.0);
        assert!(grid.bucket_at(500.0, 500.0).unwrap().locked);
    }

    #[test]
    fn seeded_chains_lead_into_the_nest() {
        let mut grid = TrailGrid::new(20.0, 100.0);
        grid.init(1000.0, 1000.0);
        let nest = Nest::new(500.0, 500.0, 30.0);
        nest.seed_trails(&mut grid, 60.0, 20.0);

        let corner = grid.query_at(560.0, 440.0, TrailKind::Nest).unwrap();
        let walked: Vec<(f64, f64)> = grid.chain(corner.id).map(|node| (node.x, node.y)).collect();
        assert_eq!(walked, vec![(560.0, 440.0), (540.0, 460.0), (520.0, 480.0), (500.0, 500.0)]);

        let edge = grid.query_at(440.0, 500.0, TrailKind::Nest).unwrap();
        assert_eq!(grid.chain(edge.id).last().map(|node| (node.x, node.y)), Some((500.0, 500.0)));
    }

    #[test]
    fn seeding_skips_cells_outside_the_world() {
        let mut grid = TrailGrid::new(20.0, 100.0);
        grid.init(1000.0, 1000.0);
        let corner = Nest::new(10.0, 10.0, 30.0);
        // Only offsets 0..=+3 on each axis land inside.
        assert_eq!(corner.seed_trails(&mut grid, 60.0, 20.0), 16);
    }
}
