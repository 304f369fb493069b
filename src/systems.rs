use bevy::app::AppExit;
use bevy::log::{info, warn};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::ant::{Agent, Behavioral, BehaviorState, MovementEvent, MovementPlan};
use crate::components::Positioned;
use crate::config::SimConfig;
use crate::context::SimulationContext;
use crate::decay::DecayScheduler;
use crate::geometry::{distance, Location};
use crate::pheromones::TrailKind;

/// Shared random source so a seeded run is reproducible end to end.
#[derive(Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

/// Fixed-length host clock. Every update advances simulated time by `tick_ms`
/// regardless of wall time.
#[derive(Resource, Debug, Clone)]
pub struct SimClock {
    pub tick_ms: f64,
    pub ticks: u64,
}

impl SimClock {
    pub fn new(tick_ms: f64) -> Self {
        Self { tick_ms, ticks: 0 }
    }
}

/// Stop after this many host ticks. Zero runs forever.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct TickLimit(pub u64);

#[derive(Resource, Debug, Clone)]
pub struct ColonyReport {
    pub interval_ms: f64,
    last_report_ms: f64,
}

impl Default for ColonyReport {
    fn default() -> Self {
        Self {
            interval_ms: 10_000.0,
            last_report_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct ActivePath {
    id: u64,
    waypoints: Vec<Location>,
    // Distance travelled when reaching each waypoint.
    travelled: Vec<f64>,
    duration_ms: f64,
    delay_ms: f64,
    elapsed_ms: f64,
}

impl ActivePath {
    fn total_length(&self) -> f64 {
        self.travelled.last().copied().unwrap_or(0.0)
    }

    fn end(&self) -> Location {
        self.waypoints.last().copied().unwrap_or_default()
    }

    /// Position after covering `fraction` of the path at constant speed.
    fn sample(&self, fraction: f64) -> Location {
        let total = self.total_length();
        if total <= 0.0 {
            return self.end();
        }
        let covered = fraction.clamp(0.0, 1.0) * total;
        for i in 1..self.waypoints.len() {
            if covered <= self.travelled[i] {
                let (from, to) = (self.waypoints[i - 1], self.waypoints[i]);
                let span = self.travelled[i] - self.travelled[i - 1];
                let t = if span > 0.0 {
                    (covered - self.travelled[i - 1]) / span
                } else {
                    1.0
                };
                return Location::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t, to.rotation);
            }
        }
        self.end()
    }
}

/// Reference movement interpolator. Walks a [`MovementPlan`] at constant
/// speed over its duration after its start delay and reports progress as
/// [`MovementEvent`]s.
#[derive(Component, Debug, Clone, Default)]
pub struct Motion {
    active: Option<ActivePath>,
}

impl Motion {
    /// Replaces any running path with `plan`, starting from `from`.
    pub fn start(&mut self, plan: MovementPlan, from: Location) {
        let mut waypoints = Vec::with_capacity(plan.path.len() + 1);
        waypoints.push(from);
        waypoints.extend(plan.path);

        let mut travelled = Vec::with_capacity(waypoints.len());
        let mut sum = 0.0;
        travelled.push(sum);
        for pair in waypoints.windows(2) {
            sum += distance(&pair[0], &pair[1]);
            travelled.push(sum);
        }

        self.active = Some(ActivePath {
            id: plan.id,
            waypoints,
            travelled,
            duration_ms: plan.duration_ms.max(0.0),
            delay_ms: plan.delay_ms.max(0.0),
            elapsed_ms: 0.0,
        });
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn plan_id(&self) -> Option<u64> {
        self.active.as_ref().map(|path| path.id)
    }

    /// Drops the running path when the ant no longer expects it.
    pub fn sync(&mut self, expected: Option<u64>) {
        if self.plan_id().is_some() && self.plan_id() != expected {
            self.active = None;
        }
    }

    pub fn advance(&mut self, delta_ms: f64) -> Vec<MovementEvent> {
        let Some(path) = self.active.as_mut() else {
            return Vec::new();
        };

        let mut remaining = delta_ms.max(0.0);
        if path.delay_ms > 0.0 {
            let waited = remaining.min(path.delay_ms);
            path.delay_ms -= waited;
            remaining -= waited;
            if path.delay_ms > 0.0 {
                return Vec::new();
            }
        }

        path.elapsed_ms += remaining;
        let id = path.id;
        if path.elapsed_ms >= path.duration_ms {
            let location = path.end();
            self.active = None;
            return vec![MovementEvent::Tick { id, location }, MovementEvent::Completed { id }];
        }

        let location = path.sample(path.elapsed_ms / path.duration_ms);
        vec![MovementEvent::Tick { id, location }]
    }
}

/// Counts reported by the periodic colony log line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColonySummary {
    pub by_state: HashMap<BehaviorState, usize>,
    pub carrying: usize,
    pub deliveries: u64,
    pub food_stored: u64,
    pub food_remaining: u64,
    pub food_trails: usize,
    pub nest_trails: usize,
}

impl ColonySummary {
    pub fn collect<'a>(ants: impl IntoIterator<Item = &'a Agent>, ctx: &SimulationContext) -> Self {
        let mut summary = Self {
            food_stored: ctx.nest.food_stored,
            food_remaining: ctx.food_remaining(),
            food_trails: ctx.grid.live_count(TrailKind::Food),
            nest_trails: ctx.grid.live_count(TrailKind::Nest),
            ..Self::default()
        };
        for ant in ants {
            *summary.by_state.entry(ant.behavior_state()).or_default() += 1;
            summary.carrying += usize::from(ant.carrying().is_some());
            summary.deliveries += u64::from(ant.deliveries());
        }
        summary
    }

    pub fn count(&self, state: BehaviorState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Registers the simulation resources and the chained host systems.
pub struct SimulationPlugin {
    pub config: SimConfig,
    pub tick_ms: f64,
    pub max_ticks: u64,
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SimRng::from_seed(self.config.seed))
            .insert_resource(DecayScheduler::new(self.config.decay_interval_ms))
            .insert_resource(SimulationContext::new(self.config.clone()))
            .insert_resource(SimClock::new(self.tick_ms))
            .insert_resource(TickLimit(self.max_ticks))
            .insert_resource(ColonyReport::default())
            .add_systems(Startup, setup_colony)
            .add_systems(
                Update,
                (
                    clock_system,
                    agent_update_system,
                    motion_system,
                    decay_system,
                    report_system,
                    tick_limit_system,
                )
                    .chain(),
            );
    }
}

pub fn setup_colony(mut commands: Commands, mut ctx: ResMut<SimulationContext>, mut rng: ResMut<SimRng>) {
    let ctx = &mut *ctx;
    let rng = &mut rng.0;
    let markers = ctx.seed_nest_trails();
    let config = ctx.config.clone();

    // Food lands between a third and a half of the world away from the nest.
    let reach = config.world_width.min(config.world_height);
    for _ in 0..config.food_sources {
        let angle = rng.gen::<f64>() * TAU;
        let range = reach / 3.0 + rng.gen::<f64>() * reach / 6.0;
        let spot = ctx.bounds.reflect(Location::new(
            ctx.nest.x + angle.cos() * range,
            ctx.nest.y + angle.sin() * range,
            0.0,
        ));
        let id = ctx.add_food_source(spot.x, spot.y, config.initial_food);
        info!("Food source {} placed at ({:.0}, {:.0})", id, spot.x, spot.y);
    }

    for i in 0..config.initial_ants {
        let ant = Agent::spawn_at(format!("ant-{i}"), &ctx.nest, config.nest_deposit_budget, rng);
        commands.spawn((ant, Motion::default()));
    }

    info!(
        "Colony ready: {} ants, {} food sources, {} nest markers",
        config.initial_ants, config.food_sources, markers
    );
}

pub fn clock_system(mut clock: ResMut<SimClock>, mut ctx: ResMut<SimulationContext>) {
    clock.ticks += 1;
    ctx.advance(clock.tick_ms);
}

pub fn agent_update_system(
    mut ants: Query<(&mut Agent, &mut Motion)>,
    mut ctx: ResMut<SimulationContext>,
    mut rng: ResMut<SimRng>,
) {
    let ctx = &mut *ctx;
    let rng = &mut rng.0;
    for (mut ant, mut motion) in ants.iter_mut() {
        if let Some(plan) = ant.update(ctx, rng) {
            let from = ant.location();
            motion.start(plan, from);
        }
    }
}

pub fn motion_system(
    mut ants: Query<(&mut Agent, &mut Motion)>,
    mut ctx: ResMut<SimulationContext>,
    clock: Res<SimClock>,
) {
    let ctx = &mut *ctx;
    for (mut ant, mut motion) in ants.iter_mut() {
        for event in motion.advance(clock.tick_ms) {
            ant.on_movement(event, ctx);
        }
        motion.sync(ant.active_movement());
    }
}

pub fn decay_system(mut decay: ResMut<DecayScheduler>, mut ctx: ResMut<SimulationContext>) {
    let ctx = &mut *ctx;
    let now = ctx.now_ms();
    decay.sweep(&mut ctx.grid, ctx.config.decay_amount, now, ctx.config.decay_sweeps_per_tick);
}

pub fn report_system(ants: Query<&Agent>, ctx: Res<SimulationContext>, mut report: ResMut<ColonyReport>) {
    let now = ctx.now_ms();
    if now - report.last_report_ms < report.interval_ms {
        return;
    }
    report.last_report_ms = now;

    let summary = ColonySummary::collect(ants.iter(), &ctx);
    info!(
        "t={:.1}s searching={} moving={} following={} carrying={} | nest stored={} food left={} | trails food={} nest={}",
        now / 1000.0,
        summary.count(BehaviorState::Searching),
        summary.count(BehaviorState::Moving),
        summary.count(BehaviorState::FollowingTrail),
        summary.carrying,
        summary.food_stored,
        summary.food_remaining,
        summary.food_trails,
        summary.nest_trails,
    );
    if summary.food_remaining == 0 && summary.carrying == 0 {
        warn!("All food sources are exhausted");
    }
}

pub fn tick_limit_system(
    clock: Res<SimClock>,
    limit: Res<TickLimit>,
    ctx: Res<SimulationContext>,
    mut exit: EventWriter<AppExit>,
) {
    if limit.0 == 0 || clock.ticks < limit.0 {
        return;
    }
    info!(
        "Stopping after {} ticks ({:.1}s simulated), nest stored {}",
        clock.ticks,
        ctx.now_ms() / 1000.0,
        ctx.nest.food_stored
    );
    exit.send(AppExit::Success);
}
