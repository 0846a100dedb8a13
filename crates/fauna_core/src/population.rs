//! Composition root: owns the agents, the grid and every collaborator, and
//! drives the per-tick update order.

use crate::arena::AgentArena;
use crate::config::AppConfig;
use crate::error::SpawnError;
use crate::events::{EffectSink, EventBus, NoEffects};
use crate::food::{FoodField, Resources};
use crate::genetics::{Genetics, MendelianGenetics};
use crate::lifecycle::LifecycleManager;
use crate::lineage_registry::{Lineage, LineageRegistry};
use crate::metrics::{counter, Metrics};
use crate::movement::MovementController;
use crate::spatial_grid::{Rect, SpatialGrid};
use crate::systems::behavior::{self, Outcome};
use crate::systems::reproduction::{self, BirthPlan, ReproductionCoordinator};
use crate::systems::TickContext;
use fauna_data::{Agent, AgentId, SimEvent, Sex, Traits};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// The simulated population and everything it interacts with.
///
/// Only this type inserts, moves or removes agents; systems receive a
/// [`TickContext`] and hand position changes and births back as an
/// [`Outcome`].
pub struct PopulationManager<R: Resources = FoodField> {
    config: AppConfig,
    arena: AgentArena,
    grid: SpatialGrid<AgentId>,
    resources: R,
    genetics: Box<dyn Genetics>,
    lineage: Box<dyn Lineage>,
    effects: Box<dyn EffectSink>,
    coordinator: ReproductionCoordinator,
    lifecycle: LifecycleManager,
    bus: EventBus,
    metrics: Metrics,
    rng: ChaCha8Rng,
    logic_zone: Option<Rect>,
    scratch: Vec<AgentId>,
    clock_ms: f64,
    tick: u64,
}

impl<R: Resources> std::fmt::Debug for PopulationManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopulationManager")
            .field("tick", &self.tick)
            .field("alive", &self.alive_count())
            .field("food", &self.resources.food_count())
            .field("pairings", &self.coordinator.len())
            .finish()
    }
}

impl PopulationManager<FoodField> {
    /// Validates the config, scatters the initial food and spawns the
    /// founding population.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let mut rng = seeded_rng(&config);
        let food = FoodField::from_config(&config, &mut rng);
        let mut manager = Self::with_parts(config, food, rng)?;
        manager.spawn_founders();
        Ok(manager)
    }
}

fn seeded_rng(config: &AppConfig) -> ChaCha8Rng {
    match config.world.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

impl<R: Resources> PopulationManager<R> {
    /// Manager over caller-supplied resources, with no agents yet.
    pub fn with_resources(config: AppConfig, resources: R) -> anyhow::Result<Self> {
        let rng = seeded_rng(&config);
        Self::with_parts(config, resources, rng)
    }

    fn with_parts(config: AppConfig, resources: R, rng: ChaCha8Rng) -> anyhow::Result<Self> {
        config.validate()?;
        tracing::debug!(fingerprint = %config.fingerprint(), "Population manager configured");
        Ok(Self {
            grid: SpatialGrid::new(config.grid.cell_size),
            lifecycle: LifecycleManager::new(&config.world),
            config,
            arena: AgentArena::new(),
            resources,
            genetics: Box::new(MendelianGenetics::new()),
            lineage: Box::new(LineageRegistry::new()),
            effects: Box::new(NoEffects),
            coordinator: ReproductionCoordinator::new(),
            bus: EventBus::new(),
            metrics: Metrics::new(),
            rng,
            logic_zone: None,
            scratch: Vec::new(),
            clock_ms: 0.0,
            tick: 0,
        })
    }

    #[must_use]
    pub fn with_genetics(mut self, genetics: Box<dyn Genetics>) -> Self {
        self.genetics = genetics;
        self
    }

    #[must_use]
    pub fn with_lineage(mut self, lineage: Box<dyn Lineage>) -> Self {
        self.lineage = lineage;
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Box<dyn EffectSink>) -> Self {
        self.effects = effects;
        self
    }

    fn spawn_founders(&mut self) {
        for i in 0..self.config.world.initial_population {
            let sex = if i % 2 == 0 { Sex::Male } else { Sex::Female };
            if self.spawn_founder(sex).is_err() {
                break;
            }
        }
        // Founding events predate any subscriber.
        self.bus.drain();
    }

    /// Spawns an adult founder with random traits at a sampled position.
    pub fn spawn_founder(&mut self, sex: Sex) -> Result<AgentId, SpawnError> {
        let (x, y) = self
            .lifecycle
            .sample_position(&self.arena, &self.grid, &mut self.rng);
        let traits = self.genetics.random(sex, &mut self.rng);
        let met = &self.config.metabolism;
        let floor = self.config.behavior.hunger_threshold.min(met.max_energy);
        let energy = self.rng.gen_range(floor..=met.max_energy);
        let age = met.maturity_age;
        let id = self.spawn(x, y, traits, energy)?;
        if let Some(agent) = self.arena.get_mut(id) {
            agent.vitals.age = age;
        }
        Ok(id)
    }

    /// Adds an agent with the given traits, enforcing the population ceiling.
    pub fn spawn(&mut self, x: f64, y: f64, traits: Traits, energy: f64) -> Result<AgentId, SpawnError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(SpawnError::InvalidPosition { x, y });
        }
        let alive = self.arena.alive_count();
        if let Err(e) = self.lifecycle.check_capacity(alive) {
            tracing::warn!(population = alive, error = %e, "Spawn rejected");
            self.metrics.increment(counter::SPAWN_REJECTIONS);
            self.bus.publish(SimEvent::SpawnRejected {
                population: alive,
                max: self.lifecycle.max_population,
                tick: self.tick,
            });
            return Err(e);
        }

        let max_energy = self.config.metabolism.max_energy;
        let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let born_at = self.clock_ms;
        let traits = Arc::new(traits);
        let id = self.arena.spawn_with(|id| {
            let mut agent = Agent::new(id, x, y, traits, energy, max_energy);
            agent.physics.heading = heading;
            agent.identity.born_at_ms = born_at;
            agent
        });
        self.grid.insert(id, x, y);
        self.metrics.increment(counter::SPAWNS);
        self.bus.publish(SimEvent::AgentSpawned {
            id,
            tick: self.tick,
            x,
            y,
        });
        Ok(id)
    }

    /// Offspring spawn: same ceiling as any other spawn.
    pub fn spawn_with_genetics(&mut self, x: f64, y: f64, traits: Traits) -> Result<AgentId, SpawnError> {
        let energy = self.config.metabolism.offspring_energy;
        self.spawn(x, y, traits, energy)
    }

    /// Marks an agent dead and takes it out of the grid and the pairing book
    /// at once. Its slot is freed at the next cleanup.
    pub fn kill(&mut self, id: AgentId, cause: &str) -> bool {
        let Some(agent) = self.arena.get_mut(id) else {
            return false;
        };
        if !agent.is_alive() {
            return false;
        }
        agent.vitals.alive = false;
        agent.physics.speed = 0.0;
        let (x, y) = agent.position();
        let age = agent.vitals.age;
        let offspring = agent.kinship.children.len();

        self.grid.remove(id, x, y);
        self.coordinator.release(id);
        self.metrics.increment(counter::DEATHS);
        tracing::debug!(agent = %id, cause, age, "Agent died");
        self.bus.publish(SimEvent::AgentDied {
            id,
            age,
            offspring,
            cause: cause.to_string(),
            tick: self.tick,
        });
        true
    }

    /// Restricts evaluation to agents near `zone` (the viewport, usually).
    pub fn set_logic_zone(&mut self, zone: Option<Rect>) {
        self.logic_zone = zone;
    }

    /// Moves an agent and keeps the grid in step.
    pub fn set_position(&mut self, id: AgentId, x: f64, y: f64) -> bool {
        let Some(agent) = self.arena.get_mut(id) else {
            return false;
        };
        let (ox, oy) = agent.position();
        agent.physics.x = x;
        agent.physics.y = y;
        if agent.is_alive() {
            self.grid.move_entity(id, ox, oy, x, y);
        }
        true
    }

    /// Advances the simulation by `dt` seconds and returns the tick's events.
    pub fn tick(&mut self, dt: f64) -> Vec<SimEvent> {
        let started = Instant::now();
        self.tick += 1;
        self.clock_ms += dt * 1000.0;

        for id in self.evaluation_order() {
            self.step_agent(id, dt);
        }

        if self.lifecycle.cleanup_due(self.tick) {
            self.cleanup_and_respawn();
        }
        self.resources.replenish(self.tick, &mut self.rng);

        self.metrics.record_tick(
            started.elapsed(),
            self.arena.alive_count(),
            self.resources.food_count(),
            self.config.world.metrics_interval,
        );
        self.bus.drain()
    }

    /// Live agents to evaluate this tick, in spawn order.
    fn evaluation_order(&mut self) -> Vec<AgentId> {
        let ids = self.arena.ids();
        let Some(zone) = self.logic_zone else {
            return ids;
        };
        let padded = zone.expanded(self.config.world.logic_zone_padding);
        self.grid.query_rect_into(padded, &mut self.scratch);
        let in_zone: HashSet<AgentId> = self.scratch.iter().copied().collect();
        ids.into_iter().filter(|id| in_zone.contains(id)).collect()
    }

    fn context(&mut self, dt: f64) -> TickContext<'_> {
        TickContext {
            config: &self.config,
            arena: &mut self.arena,
            grid: &self.grid,
            resources: &mut self.resources,
            genetics: &*self.genetics,
            lineage: &mut *self.lineage,
            effects: &mut *self.effects,
            coordinator: &mut self.coordinator,
            metrics: &mut self.metrics,
            rng: &mut self.rng,
            events: Vec::new(),
            scratch: std::mem::take(&mut self.scratch),
            now_ms: self.clock_ms,
            tick: self.tick,
            dt,
        }
    }

    fn step_agent(&mut self, id: AgentId, dt: f64) {
        if !self.arena.is_alive(id) {
            return;
        }

        let mut ctx = self.context(dt);
        let outcome: Outcome = behavior::evaluate(&mut ctx, id);
        let TickContext {
            events, scratch, ..
        } = ctx;
        self.scratch = scratch;
        self.bus.publish_all(events);

        let starved = self.apply_movement(id, outcome.steering, dt);
        if starved {
            self.kill(id, "starvation");
        }
        if let Some(plan) = outcome.birth {
            self.deliver(plan, dt);
        }
    }

    /// Moves the agent, updates the grid and charges metabolism. Returns true
    /// when the agent has run out of energy.
    fn apply_movement(&mut self, id: AgentId, steering: crate::movement::Steering, dt: f64) -> bool {
        let Some(agent) = self.arena.get_mut(id) else {
            return false;
        };
        if !agent.is_alive() {
            return false;
        }
        let controller = MovementController::new(&self.config.movement, &self.config.world);
        let (ox, oy) = controller.apply(agent, steering, dt, &mut self.rng);
        let (nx, ny) = agent.position();
        self.grid.move_entity(id, ox, oy, nx, ny);

        let met = &self.config.metabolism;
        let cost = (met.idle_cost + met.move_cost * controller.speed_fraction(agent)) * dt;
        agent.vitals.energy = (agent.vitals.energy - cost).max(0.0);
        agent.vitals.energy <= 0.0
    }

    /// Spawns the planned offspring and settles the mating either way.
    fn deliver(&mut self, plan: BirthPlan, dt: f64) {
        let parents_alive = self.arena.is_alive(plan.mother) && self.arena.is_alive(plan.father);
        let offspring = if parents_alive {
            self.spawn_with_genetics(plan.x, plan.y, plan.traits.clone()).ok()
        } else {
            None
        };
        if offspring.is_some() {
            self.metrics.increment(counter::BIRTHS);
        }

        let mut ctx = self.context(dt);
        reproduction::complete_mating(&mut ctx, &plan, offspring);
        let TickContext {
            events, scratch, ..
        } = ctx;
        self.scratch = scratch;
        self.bus.publish_all(events);
    }

    fn cleanup_and_respawn(&mut self) {
        self.lifecycle.cleanup(
            &mut self.arena,
            &mut self.grid,
            &mut *self.lineage,
            &mut self.coordinator,
        );
        for sex in self.lifecycle.respawn_plan(&self.arena) {
            if self.spawn_founder(sex).is_err() {
                break;
            }
        }
    }

    /// Subscriber registration and event access.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.arena.get(id)
    }

    /// Mutable access for set-up and inspection. Position changes must go
    /// through [`set_position`](Self::set_position) to keep the grid in step.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.arena.get_mut(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.arena.iter()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.arena.alive_count()
    }

    #[must_use]
    pub fn arena(&self) -> &AgentArena {
        &self.arena
    }

    #[must_use]
    pub fn grid(&self) -> &SpatialGrid<AgentId> {
        &self.grid
    }

    #[must_use]
    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut R {
        &mut self.resources
    }

    #[must_use]
    pub fn coordinator(&self) -> &ReproductionCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut ReproductionCoordinator {
        &mut self.coordinator
    }

    #[must_use]
    pub fn lineage(&self) -> &dyn Lineage {
        &*self.lineage
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
