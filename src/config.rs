use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Timing of one kind of movement handed to the interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveTiming {
    pub duration_ms: f64,
    pub delay_ms: f64,
}

impl MoveTiming {
    pub const fn new(duration_ms: f64, delay_ms: f64) -> Self {
        Self { duration_ms, delay_ms }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world_width: f64,
    pub world_height: f64,
    pub initial_ants: usize,
    pub food_sources: usize,
    pub seed: Option<u64>,

    // Trail grid
    pub cell_size: f64,
    pub max_strength: f64,
    pub decay_amount: f64,
    pub decay_interval_ms: f64,
    pub decay_sweeps_per_tick: usize,

    // Ant behavior
    pub deposit_amount: f64,
    pub deposit_interval_ms: f64,
    pub trail_check_interval_ms: f64,
    pub nest_deposit_budget: i32,
    pub search_points: usize,
    pub search_magnitude: f64,
    pub search_scale: f64,
    pub retreat_points: usize,
    pub follow_trail_points: usize,
    pub search_timing: MoveTiming,
    pub to_trail_timing: MoveTiming,
    pub retreat_timing: MoveTiming,
    pub follow_trail_delay_ms: f64,

    // Nest and food
    pub nest_detect_radius: f64,
    pub nest_trail_radius: f64,
    pub nest_trail_strength: f64,
    pub initial_food: u32,
    pub food_to_size_ratio: f64,
    pub min_food_radius: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 1000.0,
            world_height: 1000.0,
            initial_ants: 50,
            food_sources: 1,
            seed: None,

            cell_size: 20.0,
            max_strength: 100.0,
            decay_amount: 0.5,
            decay_interval_ms: 500.0,
            decay_sweeps_per_tick: 2,

            deposit_amount: 1.0,
            deposit_interval_ms: 100.0,
            trail_check_interval_ms: 200.0,
            nest_deposit_budget: 10,
            search_points: 10,
            search_magnitude: 50.0,
            search_scale: 40.0,
            retreat_points: 2,
            follow_trail_points: 5,
            search_timing: MoveTiming::new(3000.0, 10.0),
            to_trail_timing: MoveTiming::new(1000.0, 0.0),
            retreat_timing: MoveTiming::new(1000.0, 500.0),
            follow_trail_delay_ms: 500.0,

            nest_detect_radius: 30.0,
            nest_trail_radius: 60.0,
            nest_trail_strength: 20.0,
            initial_food: 5000,
            food_to_size_ratio: 0.01,
            min_food_radius: 2.0,
        }
    }
}

impl SimConfig {
    /// Loads a JSON config. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("world_width", self.world_width)?;
        positive("world_height", self.world_height)?;
        positive("cell_size", self.cell_size)?;
        positive("max_strength", self.max_strength)?;
        positive("decay_interval_ms", self.decay_interval_ms)?;
        positive("deposit_interval_ms", self.deposit_interval_ms)?;
        positive("trail_check_interval_ms", self.trail_check_interval_ms)?;
        positive("search_magnitude", self.search_magnitude)?;

        if self.search_points == 0 {
            return Err(ConfigError::Invalid {
                field: "search_points",
                reason: "must be at least 1".into(),
            });
        }
        if self.follow_trail_points == 0 {
            return Err(ConfigError::Invalid {
                field: "follow_trail_points",
                reason: "must be at least 1".into(),
            });
        }
        if self.decay_amount < 0.0 {
            return Err(ConfigError::Invalid {
                field: "decay_amount",
                reason: format!("must not be negative, got {}", self.decay_amount),
            });
        }
        Ok(())
    }

    /// Interpolator timing for a trail-following leg scales with its length.
    pub fn follow_trail_timing(&self) -> MoveTiming {
        MoveTiming::new(self.follow_trail_points as f64 / 3.0 * 1000.0, self.follow_trail_delay_ms)
    }
}
