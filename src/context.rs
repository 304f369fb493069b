use bevy::prelude::Resource;

use crate::components::{FoodSource, FoodSourceId, Nest};
use crate::config::SimConfig;
use crate::geometry::BoundingBox;
use crate::grid::TrailGrid;

/// Everything an ant needs to read or mutate during a tick.
#[derive(Resource, Debug, Clone)]
pub struct SimulationContext {
    pub config: SimConfig,
    pub grid: TrailGrid,
    pub bounds: BoundingBox,
    pub nest: Nest,
    pub food_sources: Vec<FoodSource>,
    now_ms: f64,
}

impl SimulationContext {
    /// Builds a context with an initialized grid covering the configured
    /// world and the nest at its centre. Nest trail markers are not laid;
    /// see [`SimulationContext::seed_nest_trails`].
    pub fn new(config: SimConfig) -> Self {
        let mut grid = TrailGrid::new(config.cell_size, config.max_strength);
        grid.init(config.world_width, config.world_height);
        let bounds = BoundingBox::new(0.0, config.world_width, 0.0, config.world_height);
        let nest = Nest::new(
            config.world_width / 2.0,
            config.world_height / 2.0,
            config.nest_detect_radius,
        );

        Self {
            config,
            grid,
            bounds,
            nest,
            food_sources: Vec::new(),
            now_ms: 0.0,
        }
    }

    pub fn seed_nest_trails(&mut self) -> usize {
        let (radius, strength) = (self.config.nest_trail_radius, self.config.nest_trail_strength);
        self.nest.seed_trails(&mut self.grid, radius, strength)
    }

    pub fn add_food_source(&mut self, x: f64, y: f64, value: u32) -> FoodSourceId {
        self.food_sources.push(FoodSource::new(
            x,
            y,
            value,
            self.config.food_to_size_ratio,
            self.config.min_food_radius,
        ));
        self.food_sources.len() - 1
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.now_ms += delta_ms;
    }

    pub fn food_remaining(&self) -> u64 {
        self.food_sources.iter().map(|source| u64::from(source.value())).sum()
    }
}
