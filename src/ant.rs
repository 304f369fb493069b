use bevy::log::{debug, trace};
use bevy::prelude::Component;
use rand::Rng;
use std::f64::consts::PI;

use crate::components::{Food, FoodSourceId, Nest, Positioned};
use crate::config::MoveTiming;
use crate::context::SimulationContext;
use crate::geometry::{unwrap, Location};
use crate::pheromones::{TrailId, TrailKind};
use crate::planner::{build_search_path_with, path_along_trail, path_to_trail, SearchParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorState {
    Idle,       // Not yet activated
    Searching,  // Random walk laying scent
    TargetMove, // Merging onto a nearby trail
    Moving,     // A path is being interpolated
    PickupFood, // Standing on food with empty jaws
    FollowingTrail,
}

/// What an ant is heading for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Food(FoodSourceId),
    Trail(TrailId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    Search,
    ToTrail,
    PickupRetreat,
    AlongTrail,
}

/// A path handed to the interpolator. Starting a new plan cancels whatever
/// plan the ant had before.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPlan {
    pub id: u64,
    pub kind: MovementKind,
    pub path: Vec<Location>,
    pub duration_ms: f64,
    pub delay_ms: f64,
}

/// Messages from the interpolator back into the ant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementEvent {
    Tick { id: u64, location: Location },
    Completed { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveMovement {
    id: u64,
    kind: MovementKind,
}

pub trait Behavioral {
    fn behavior_state(&self) -> BehaviorState;

    /// Declarative transitions driven by collisions with food and the nest.
    fn determine_state(&mut self, ctx: &mut SimulationContext) -> BehaviorState;

    /// Acts on `state`, returning a new movement if one was started.
    fn evaluate<R: Rng + ?Sized>(
        &mut self,
        state: BehaviorState,
        ctx: &mut SimulationContext,
        rng: &mut R,
    ) -> Option<MovementPlan>;
}

pub trait TrailDepositor {
    /// The layer this ant writes to.
    fn output_kind(&self) -> TrailKind;

    /// The layer this ant looks for.
    fn input_kind(&self) -> TrailKind {
        self.output_kind().opposite()
    }

    fn deposit_trail(&mut self, ctx: &mut SimulationContext) -> Option<TrailId>;
}

#[derive(Component, Debug, Clone)]
pub struct Agent {
    pub name: String,
    location: Location,
    state: BehaviorState,
    carrying: Option<Food>,
    target: Option<Target>,
    current_trail: Option<TrailId>,
    last_deposit: Option<TrailId>,
    last_deposit_ms: f64,
    last_trail_check_ms: f64,
    nest_deposit_budget: i32,
    movement: Option<ActiveMovement>,
    next_movement_id: u64,
    deliveries: u32,
}

impl Agent {
    pub fn new(name: impl Into<String>, location: Location, nest_deposit_budget: i32) -> Self {
        Self {
            name: name.into(),
            location,
            state: BehaviorState::Searching,
            carrying: None,
            target: None,
            current_trail: None,
            last_deposit: None,
            last_deposit_ms: f64::NEG_INFINITY,
            last_trail_check_ms: f64::NEG_INFINITY,
            nest_deposit_budget,
            movement: None,
            next_movement_id: 0,
            deliveries: 0,
        }
    }

    /// A fresh ant on the nest facing a random direction.
    pub fn spawn_at<R: Rng + ?Sized>(
        name: impl Into<String>,
        nest: &Nest,
        nest_deposit_budget: i32,
        rng: &mut R,
    ) -> Self {
        let rotation = (rng.gen::<f64>() - 0.5) * PI * 2.0;
        Self::new(name, nest.location().facing(rotation), nest_deposit_budget)
    }

    /// An ant that ignores updates until [`Agent::activate`] is called.
    pub fn idle(name: impl Into<String>, location: Location, nest_deposit_budget: i32) -> Self {
        Self {
            state: BehaviorState::Idle,
            ..Self::new(name, location, nest_deposit_budget)
        }
    }

    pub fn activate(&mut self) {
        if self.state == BehaviorState::Idle {
            self.state = BehaviorState::Searching;
        }
    }

    pub fn carrying(&self) -> Option<Food> {
        self.carrying
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn current_trail(&self) -> Option<TrailId> {
        self.current_trail
    }

    pub fn last_deposit(&self) -> Option<TrailId> {
        self.last_deposit
    }

    pub fn nest_deposit_budget(&self) -> i32 {
        self.nest_deposit_budget
    }

    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    pub fn active_movement(&self) -> Option<u64> {
        self.movement.map(|movement| movement.id)
    }

    /// One host tick: re-evaluate the state, then act on it.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        ctx: &mut SimulationContext,
        rng: &mut R,
    ) -> Option<MovementPlan> {
        let state = self.determine_state(ctx);
        self.evaluate(state, ctx, rng)
    }

    /// Cancels the in-flight movement, if any.
    pub fn stop(&mut self) {
        if self.movement.take().is_some() && self.state == BehaviorState::Moving {
            self.state = BehaviorState::Searching;
        }
    }

    pub fn on_movement(&mut self, event: MovementEvent, ctx: &mut SimulationContext) {
        let Some(active) = self.movement else {
            return;
        };

        match event {
            MovementEvent::Tick { id, location } => {
                if id != active.id {
                    return;
                }
                self.location = location;
                self.deposit_trail(ctx);
                if active.kind == MovementKind::Search && self.state == BehaviorState::Moving {
                    self.check_trails(ctx, false);
                }
            }
            MovementEvent::Completed { id } => {
                if id != active.id {
                    return;
                }
                self.movement = None;
                if self.state != BehaviorState::Moving {
                    return;
                }
                match active.kind {
                    MovementKind::Search | MovementKind::PickupRetreat => {
                        self.state = BehaviorState::Searching;
                    }
                    MovementKind::ToTrail | MovementKind::AlongTrail => {
                        if !self.check_trails(ctx, true) {
                            self.state = BehaviorState::Searching;
                        }
                    }
                }
            }
        }
    }

    fn can_deposit(&self) -> bool {
        self.carrying.is_some() || self.nest_deposit_budget >= 0
    }

    /// Looks for the input layer under and around the ant. A node in the
    /// ant's own cell starts trail following, a node nearby starts a merge.
    fn check_trails(&mut self, ctx: &SimulationContext, force: bool) -> bool {
        let now = ctx.now_ms();
        if !force && now - self.last_trail_check_ms < ctx.config.trail_check_interval_ms {
            return false;
        }
        self.last_trail_check_ms = now;
        let kind = self.input_kind();

        if let Some(node) = ctx.grid.query_at(self.location.x, self.location.y, kind) {
            let id = node.id;
            self.stop();
            self.current_trail = Some(id);
            self.state = BehaviorState::FollowingTrail;
            debug!("{} found {:?} trail underfoot", self.name, kind);
            return true;
        }

        let nearby = ctx
            .grid
            .query_nearby(&self.location, kind)
            .first()
            .map(|node| node.id);
        if let Some(id) = nearby {
            self.stop();
            self.target = Some(Target::Trail(id));
            self.state = BehaviorState::TargetMove;
            debug!("{} heading for nearby {:?} trail", self.name, kind);
            return true;
        }
        false
    }

    fn begin_movement(&mut self, kind: MovementKind, path: Vec<Location>, timing: MoveTiming) -> MovementPlan {
        self.stop();
        self.next_movement_id += 1;
        let id = self.next_movement_id;
        self.movement = Some(ActiveMovement { id, kind });
        self.state = BehaviorState::Moving;
        MovementPlan {
            id,
            kind,
            path,
            duration_ms: timing.duration_ms,
            delay_ms: timing.delay_ms,
        }
    }

    fn begin_search<R: Rng + ?Sized>(
        &mut self,
        ctx: &SimulationContext,
        rng: &mut R,
        num_points: usize,
        kind: MovementKind,
        timing: MoveTiming,
    ) -> MovementPlan {
        let params = SearchParams {
            magnitude: ctx.config.search_magnitude,
            scale: ctx.config.search_scale,
        };
        let path = build_search_path_with(&self.location, num_points, &ctx.bounds, params, rng);
        self.begin_movement(kind, path, timing)
    }

    fn begin_default_search<R: Rng + ?Sized>(&mut self, ctx: &SimulationContext, rng: &mut R) -> MovementPlan {
        let (points, timing) = (ctx.config.search_points, ctx.config.search_timing);
        self.begin_search(ctx, rng, points, MovementKind::Search, timing)
    }

    fn begin_target_move<R: Rng + ?Sized>(&mut self, ctx: &SimulationContext, rng: &mut R) -> MovementPlan {
        let path: Vec<Location> = match self.target {
            Some(Target::Trail(id)) => path_to_trail(&self.location, &ctx.grid, id)
                .into_iter()
                .map(|point| ctx.bounds.reflect(point))
                .collect(),
            _ => Vec::new(),
        };
        if path.is_empty() {
            self.target = None;
            return self.begin_default_search(ctx, rng);
        }
        self.begin_movement(MovementKind::ToTrail, path, ctx.config.to_trail_timing)
    }

    fn begin_follow_trail<R: Rng + ?Sized>(&mut self, ctx: &SimulationContext, rng: &mut R) -> MovementPlan {
        let start = self
            .current_trail
            .and_then(|id| ctx.grid.previous_of(id))
            .map(|node| node.id);
        let path = match start {
            Some(start) => path_along_trail(
                &self.location,
                &ctx.grid,
                start,
                ctx.config.follow_trail_points,
                &ctx.bounds,
            ),
            None => Vec::new(),
        };
        if path.is_empty() {
            self.current_trail = None;
            return self.begin_default_search(ctx, rng);
        }
        self.begin_movement(MovementKind::AlongTrail, path, ctx.config.follow_trail_timing())
    }

    fn pickup_food<R: Rng + ?Sized>(&mut self, ctx: &mut SimulationContext, rng: &mut R) -> MovementPlan {
        self.stop();
        self.location.rotation = unwrap(self.location.rotation + PI);

        let harvested = match self.target.take() {
            Some(Target::Food(id)) => ctx.food_sources.get_mut(id).and_then(|source| source.harvest(id, 1)),
            _ => None,
        };
        let Some(food) = harvested else {
            return self.begin_default_search(ctx, rng);
        };

        debug!("{} picked up food from source {}", self.name, food.source);
        self.carrying = Some(food);
        self.last_deposit = None;
        self.nest_deposit_budget = 0;

        let underfoot = ctx
            .grid
            .query_at(self.location.x, self.location.y, self.input_kind())
            .map(|node| node.id);
        if let Some(id) = underfoot {
            self.current_trail = Some(id);
            self.state = BehaviorState::FollowingTrail;
            return self.begin_follow_trail(ctx, rng);
        }

        let (points, timing) = (ctx.config.retreat_points, ctx.config.retreat_timing);
        self.begin_search(ctx, rng, points, MovementKind::PickupRetreat, timing)
    }

    fn deliver(&mut self, ctx: &mut SimulationContext) {
        let Some(food) = self.carrying.take() else {
            return;
        };
        ctx.nest.store(food);
        self.stop();
        self.location.rotation = unwrap(self.location.rotation + PI);
        self.nest_deposit_budget = ctx.config.nest_deposit_budget;
        self.last_deposit = None;
        self.target = None;
        self.current_trail = None;
        self.deliveries += 1;
        debug!("{} delivered food, nest holds {}", self.name, ctx.nest.food_stored);
    }
}

impl Positioned for Agent {
    fn location(&self) -> Location {
        self.location
    }
}

impl Behavioral for Agent {
    fn behavior_state(&self) -> BehaviorState {
        self.state
    }

    fn determine_state(&mut self, ctx: &mut SimulationContext) -> BehaviorState {
        if self.state == BehaviorState::Idle {
            return self.state;
        }

        if self.carrying.is_none() && self.state != BehaviorState::PickupFood {
            let hit = ctx
                .food_sources
                .iter()
                .position(|source| source.is_hit_by(&self.location));
            if let Some(id) = hit {
                debug!("{} hit food source {}", self.name, id);
                self.state = BehaviorState::PickupFood;
                self.target = Some(Target::Food(id));
            }
        }

        if self.carrying.is_some() && ctx.nest.is_hit_by(&self.location) {
            self.deliver(ctx);
            self.state = BehaviorState::Searching;
        }

        self.state
    }

    fn evaluate<R: Rng + ?Sized>(
        &mut self,
        state: BehaviorState,
        ctx: &mut SimulationContext,
        rng: &mut R,
    ) -> Option<MovementPlan> {
        match state {
            BehaviorState::Searching => Some(self.begin_default_search(ctx, rng)),
            BehaviorState::TargetMove => Some(self.begin_target_move(ctx, rng)),
            BehaviorState::PickupFood => Some(self.pickup_food(ctx, rng)),
            BehaviorState::FollowingTrail => Some(self.begin_follow_trail(ctx, rng)),
            BehaviorState::Moving | BehaviorState::Idle => None,
        }
    }
}

impl TrailDepositor for Agent {
    fn output_kind(&self) -> TrailKind {
        if self.carrying.is_some() {
            TrailKind::Food
        } else {
            TrailKind::Nest
        }
    }

    /// Lays scent at the ant's position at most once per deposit interval,
    /// chaining it to the previous deposit. Nest scent draws on the per-trip
    /// budget; once it runs out the chain is cut and no more is laid until the
    /// ant is back at the nest.
    fn deposit_trail(&mut self, ctx: &mut SimulationContext) -> Option<TrailId> {
        let now = ctx.now_ms();
        if now - self.last_deposit_ms < ctx.config.deposit_interval_ms || !self.can_deposit() {
            return None;
        }

        let kind = self.output_kind();
        let id = ctx.grid.deposit(
            self.location.x,
            self.location.y,
            kind,
            self.last_deposit,
            ctx.config.deposit_amount,
            false,
        );
        self.last_deposit = Some(id);
        self.last_deposit_ms = now;

        if kind == TrailKind::Nest {
            self.nest_deposit_budget -= 1;
            if self.nest_deposit_budget < 0 {
                self.last_deposit = None;
            }
        }
        trace!("{} laid {:?} scent at {:?}", self.name, kind, id);
        Some(id)
    }
}
