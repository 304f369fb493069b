use bevy::log::{info, trace};
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::geometry::{rotation_diff_abs, Location};
use crate::pheromones::{PheromoneTrail, TrailId, TrailKind};

/// Half-width of the neighbourhood scanned by [`TrailGrid::query_nearby`].
const DETECT_RADIUS: isize = 1;

/// Buckets whose centre lies outside this cone ahead of the agent are ignored
/// by nearby queries.
const FORWARD_CONE: f64 = PI / 1.5;

/// One grid cell. Holds at most one live node per trail kind.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub x: f64,
    pub y: f64,
    pub locked: bool,
    trails: [Option<PheromoneTrail>; 2],
    generations: [u32; 2],
}

impl Bucket {
    fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            locked: false,
            trails: [None, None],
            generations: [0, 0],
        }
    }

    pub fn center(&self) -> Location {
        Location::new(self.x, self.y, 0.0)
    }

    pub fn trail(&self, kind: TrailKind) -> Option<&PheromoneTrail> {
        self.trails[kind.index()].as_ref()
    }

    fn trail_mut(&mut self, kind: TrailKind) -> Option<&mut PheromoneTrail> {
        self.trails[kind.index()].as_mut()
    }

    /// Decays every node in the bucket, evicting those that evaporate.
    /// Returns each evicted node with the predecessor it was linked to.
    pub(crate) fn decay_all(&mut self, amount: f64) -> Vec<(TrailId, Option<TrailId>)> {
        let mut evicted = Vec::new();
        for slot in self.trails.iter_mut() {
            let alive = match slot.as_mut() {
                Some(node) => node.decay(amount),
                None => continue,
            };
            if !alive {
                if let Some(node) = slot.take() {
                    evicted.push((node.id, node.previous));
                }
            }
        }
        evicted
    }
}

/// Uniform grid of buckets holding the two trail layers.
#[derive(Debug, Clone)]
pub struct TrailGrid {
    cell_size: f64,
    max_strength: f64,
    columns: Vec<Vec<Bucket>>,
    num_rows: usize,
}

impl TrailGrid {
    pub fn new(cell_size: f64, max_strength: f64) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive, got {cell_size}");
        Self {
            cell_size,
            max_strength,
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    /// Allocates the buckets for a world of the given size. Must be called
    /// exactly once.
    pub fn init(&mut self, width: f64, height: f64) {
        assert!(!self.is_initialized(), "trail grid initialized twice");
        let num_columns = (width / self.cell_size).ceil().max(1.0) as usize;
        let num_rows = (height / self.cell_size).ceil().max(1.0) as usize;
        let half = self.cell_size / 2.0;

        self.columns = (0..num_columns)
            .map(|col| {
                (0..num_rows)
                    .map(|row| {
                        Bucket::new(
                            col as f64 * self.cell_size + half,
                            row as f64 * self.cell_size + half,
                        )
                    })
                    .collect()
            })
            .collect();
        self.num_rows = num_rows;

        info!(
            "Initialized trail grid with {} columns and {} rows, cell size {}",
            num_columns, num_rows, self.cell_size
        );
    }

    pub fn is_initialized(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn max_strength(&self) -> f64 {
        self.max_strength
    }

    pub fn columns(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.num_rows
    }

    /// Maps a coordinate onto a bucket index along an axis with `count` cells.
    pub fn index_of(&self, coord: f64, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let raw = (coord / self.cell_size).floor();
        if raw.is_nan() || raw < 0.0 {
            0
        } else {
            (raw as usize).min(count - 1)
        }
    }

    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        (self.index_of(x, self.columns.len()), self.index_of(y, self.num_rows))
    }

    pub fn bucket(&self, col: usize, row: usize) -> Option<&Bucket> {
        self.columns.get(col).and_then(|column| column.get(row))
    }

    pub fn bucket_at(&self, x: f64, y: f64) -> Option<&Bucket> {
        if !self.is_initialized() {
            return None;
        }
        let (col, row) = self.cell_of(x, y);
        self.bucket(col, row)
    }

    /// Resolves a handle, returning `None` once the node has evaporated.
    pub fn get(&self, id: TrailId) -> Option<&PheromoneTrail> {
        self.bucket(id.col, id.row)
            .and_then(|bucket| bucket.trail(id.kind))
            .filter(|node| node.id == id)
    }

    fn get_mut(&mut self, id: TrailId) -> Option<&mut PheromoneTrail> {
        self.columns
            .get_mut(id.col)
            .and_then(|column| column.get_mut(id.row))
            .and_then(|bucket| bucket.trail_mut(id.kind))
            .filter(|node| node.id == id)
    }

    pub fn is_live(&self, id: TrailId) -> bool {
        self.get(id).is_some()
    }

    /// The live predecessor of a node, if any.
    pub fn previous_of(&self, id: TrailId) -> Option<&PheromoneTrail> {
        self.get(id)?.previous.and_then(|prev| self.get(prev))
    }

    /// The strongest live successor of a node.
    pub fn next_of(&self, id: TrailId) -> Option<&PheromoneTrail> {
        self.get(id)?
            .next
            .iter()
            .filter_map(|next| self.get(*next))
            .max_by(|a, b| a.strength().total_cmp(&b.strength()))
    }

    /// Walks the trail from `id` back toward its origin, stopping at a root
    /// or at the first evaporated link.
    pub fn chain(&self, id: TrailId) -> Chain<'_> {
        Chain {
            grid: self,
            cursor: self.get(id),
        }
    }

    /// Lays scent at `(x, y)`. An existing live node of the same kind in the
    /// bucket is strengthened instead of a second one being created.
    pub fn deposit(
        &mut self,
        x: f64,
        y: f64,
        kind: TrailKind,
        previous: Option<TrailId>,
        amount: f64,
        locked: bool,
    ) -> TrailId {
        assert!(self.is_initialized(), "deposit on a trail grid before init");
        let (col, row) = self.cell_of(x, y);
        let previous = previous.filter(|prev| self.is_live(*prev));
        let max_strength = self.max_strength;

        let bucket = &mut self.columns[col][row];
        bucket.locked |= locked;
        let bucket_locked = bucket.locked;

        if let Some(existing) = bucket.trail_mut(kind) {
            existing.strengthen(amount, max_strength);
            let id = existing.id;
            trace!("Strengthened {:?} to {:.3}", id, existing.strength());
            if let Some(incoming) = previous {
                if !bucket_locked && self.should_rewire(id, incoming) {
                    self.rewire(id, incoming);
                }
            }
            return id;
        }

        let slot = kind.index();
        bucket.generations[slot] = bucket.generations[slot].wrapping_add(1);
        let id = TrailId {
            col,
            row,
            kind,
            generation: bucket.generations[slot],
        };
        bucket.trails[slot] = Some(PheromoneTrail::new(
            id,
            x,
            y,
            amount.min(max_strength),
            previous,
        ));
        if let Some(prev) = previous {
            if let Some(prev_node) = self.get_mut(prev) {
                prev_node.next.push(id);
            }
        }
        trace!("Created {:?} at ({:.1}, {:.1}) previous {:?}", id, x, y, previous);
        id
    }

    /// A node is re-routed through a stronger predecessor only when it already
    /// has one (roots stay roots) and the new route does not loop back
    /// through the node itself.
    fn should_rewire(&self, id: TrailId, incoming: TrailId) -> bool {
        if incoming == id {
            return false;
        }
        let Some(node) = self.get(id) else {
            return false;
        };
        let Some(current) = node.previous else {
            return false;
        };
        if current == incoming {
            return false;
        }
        let current_strength = self.get(current).map_or(0.0, PheromoneTrail::strength);
        let incoming_strength = self.get(incoming).map_or(0.0, PheromoneTrail::strength);
        if incoming_strength <= current_strength {
            return false;
        }
        !self.chain(incoming).any(|link| link.id == id)
    }

    fn rewire(&mut self, id: TrailId, incoming: TrailId) {
        let old = self.get_mut(id).and_then(|node| node.previous.replace(incoming));
        if let Some(old) = old {
            if let Some(old_node) = self.get_mut(old) {
                old_node.next.retain(|next| *next != id);
            }
        }
        if let Some(new_prev) = self.get_mut(incoming) {
            new_prev.next.push(id);
        }
        trace!("Rewired {:?} through {:?}", id, incoming);
    }

    /// The live node of `kind` in the bucket containing `(x, y)`.
    pub fn query_at(&self, x: f64, y: f64, kind: TrailKind) -> Option<&PheromoneTrail> {
        self.bucket_at(x, y).and_then(|bucket| bucket.trail(kind))
    }

    /// Live nodes of `kind` in the 3x3 block around `origin` whose bucket lies
    /// roughly ahead of it, strongest first.
    pub fn query_nearby(&self, origin: &Location, kind: TrailKind) -> Vec<&PheromoneTrail> {
        if !self.is_initialized() {
            return Vec::new();
        }
        let (col, row) = self.cell_of(origin.x, origin.y);
        let mut nearby = Vec::new();

        for dc in -DETECT_RADIUS..=DETECT_RADIUS {
            for dr in -DETECT_RADIUS..=DETECT_RADIUS {
                let (Some(c), Some(r)) = (col.checked_add_signed(dc), row.checked_add_signed(dr)) else {
                    continue;
                };
                let Some(bucket) = self.bucket(c, r) else {
                    continue;
                };
                if let Some(node) = bucket.trail(kind) {
                    if rotation_diff_abs(origin, &bucket.center()) < FORWARD_CONE {
                        nearby.push(node);
                    }
                }
            }
        }

        nearby.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
        nearby
    }

    /// Decays every unlocked bucket in a column. Evaporated nodes are also
    /// unlinked from their predecessors. Returns how many nodes evaporated.
    pub fn decay_column(&mut self, column: usize, amount: f64) -> usize {
        let Some(buckets) = self.columns.get_mut(column) else {
            return 0;
        };
        let evicted: Vec<(TrailId, Option<TrailId>)> = buckets
            .par_iter_mut()
            .filter(|bucket| !bucket.locked)
            .flat_map_iter(|bucket| bucket.decay_all(amount))
            .collect();

        for (id, previous) in &evicted {
            if let Some(prev_node) = previous.and_then(|prev| self.get_mut(prev)) {
                prev_node.next.retain(|next| next != id);
            }
        }
        evicted.len()
    }

    pub fn live_count(&self, kind: TrailKind) -> usize {
        self.columns
            .iter()
            .flatten()
            .filter(|bucket| bucket.trail(kind).is_some())
            .count()
    }
}

/// Iterator over a trail chain, from a node toward its origin.
pub struct Chain<'a> {
    grid: &'a TrailGrid,
    cursor: Option<&'a PheromoneTrail>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a PheromoneTrail;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = current.previous.and_then(|prev| self.grid.get(prev));
        Some(current)
    }
}
