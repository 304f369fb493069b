use bevy::log::trace;
use bevy::prelude::Resource;

use crate::grid::TrailGrid;

/// Sweeps decay across the grid one column at a time so that a full pass is
/// spread over many host ticks.
#[derive(Resource, Debug, Clone)]
pub struct DecayScheduler {
    next_column: usize,
    last_decay_ms: f64,
    interval_ms: f64,
}

impl Default for DecayScheduler {
    fn default() -> Self {
        Self::new(500.0)
    }
}

impl DecayScheduler {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            next_column: 0,
            last_decay_ms: 0.0,
            interval_ms,
        }
    }

    pub fn next_column(&self) -> usize {
        self.next_column
    }

    /// Decays the next column by `amount` if the interval has elapsed since
    /// the previous sweep. Returns the column that was decayed.
    pub fn tick(&mut self, grid: &mut TrailGrid, amount: f64, now_ms: f64) -> Option<usize> {
        let columns = grid.columns();
        if columns == 0 || now_ms - self.last_decay_ms < self.interval_ms {
            return None;
        }

        let column = self.next_column % columns;
        let evaporated = grid.decay_column(column, amount);
        if evaporated > 0 {
            trace!("Decayed column {}: {} nodes evaporated", column, evaporated);
        }

        self.next_column = (column + 1) % columns;
        self.last_decay_ms = now_ms;
        Some(column)
    }

    /// Like [`DecayScheduler::tick`] but decays up to `count` consecutive
    /// columns once the interval has elapsed. Returns how many were swept.
    pub fn sweep(&mut self, grid: &mut TrailGrid, amount: f64, now_ms: f64, count: usize) -> usize {
        if self.tick(grid, amount, now_ms).is_none() {
            return 0;
        }
        let extra = count.saturating_sub(1).min(grid.columns().saturating_sub(1));
        for _ in 0..extra {
            let column = self.next_column;
            grid.decay_column(column, amount);
            self.next_column = (column + 1) % grid.columns();
        }
        1 + extra
    }
}
