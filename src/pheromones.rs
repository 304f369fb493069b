use serde::{Deserialize, Serialize};

use crate::geometry::Location;

/// Strength below which a node is considered evaporated.
pub const DECAY_EPSILON: f64 = 1e-3;

/// The two independent scent layers sharing the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrailKind {
    /// Laid by carrying ants; chains lead back to where food was picked up.
    Food,
    /// Laid by foraging ants; chains lead back to the nest.
    Nest,
}

impl TrailKind {
    pub const ALL: [TrailKind; 2] = [TrailKind::Food, TrailKind::Nest];

    pub fn index(self) -> usize {
        match self {
            TrailKind::Food => 0,
            TrailKind::Nest => 1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            TrailKind::Food => TrailKind::Nest,
            TrailKind::Nest => TrailKind::Food,
        }
    }
}

/// Stable handle to a trail node. The bucket coordinate locates the slot and
/// the generation tells a live node apart from an evaporated predecessor that
/// once occupied the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrailId {
    pub col: usize,
    pub row: usize,
    pub kind: TrailKind,
    pub generation: u32,
}

/// A single decaying scent marker in a trail chain.
#[derive(Debug, Clone)]
pub struct PheromoneTrail {
    pub id: TrailId,
    pub x: f64,
    pub y: f64,
    strength: f64,
    pub(crate) previous: Option<TrailId>,
    pub(crate) next: Vec<TrailId>,
}

impl PheromoneTrail {
    pub(crate) fn new(id: TrailId, x: f64, y: f64, strength: f64, previous: Option<TrailId>) -> Self {
        Self {
            id,
            x,
            y,
            strength,
            previous,
            next: Vec::new(),
        }
    }

    pub fn kind(&self) -> TrailKind {
        self.id.kind
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Link toward the origin of the trail. May name a node that has since
    /// evaporated; resolve it through the grid.
    pub fn previous(&self) -> Option<TrailId> {
        self.previous
    }

    /// Every node that chained back to this one.
    pub fn next_links(&self) -> &[TrailId] {
        &self.next
    }

    pub fn is_root(&self) -> bool {
        self.previous.is_none()
    }

    pub fn location(&self) -> Location {
        Location::new(self.x, self.y, 0.0)
    }

    pub(crate) fn strengthen(&mut self, amount: f64, max: f64) {
        self.strength = (self.strength + amount).min(max);
    }

    /// Returns true while the node is still above the evaporation threshold.
    pub(crate) fn decay(&mut self, amount: f64) -> bool {
        self.strength -= amount;
        self.strength >= DECAY_EPSILON
    }
}
