use crate::arena::AgentArena;
use crate::config::WorldConfig;
use crate::error::SpawnError;
use crate::lineage_registry::Lineage;
use crate::spatial_grid::SpatialGrid;
use crate::systems::reproduction::ReproductionCoordinator;
use fauna_data::{AgentId, Sex};
use rand::{Rng, RngCore};

/// Population bounds, spawn placement and dead-agent cleanup.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    pub target_population: usize,
    pub max_population: usize,
    pub cleanup_interval: u64,
    spawn_attempts: usize,
    spawn_clearance: f64,
    world: WorldConfig,
    scratch: Vec<AgentId>,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(world: &WorldConfig) -> Self {
        Self {
            target_population: world.target_population,
            max_population: world.max_population,
            cleanup_interval: world.cleanup_interval,
            spawn_attempts: world.spawn_attempts,
            spawn_clearance: world.spawn_clearance,
            world: world.clone(),
            scratch: Vec::new(),
        }
    }

    /// Refuses a spawn once `alive` agents have reached the ceiling.
    pub fn check_capacity(&self, alive: usize) -> Result<(), SpawnError> {
        if alive >= self.max_population {
            Err(SpawnError::CapacityExceeded {
                max: self.max_population,
            })
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn cleanup_due(&self, tick: u64) -> bool {
        self.cleanup_interval > 0 && tick % self.cleanup_interval == 0
    }

    #[must_use]
    fn in_margin_band(&self, x: f64, y: f64) -> bool {
        let w = &self.world;
        x < w.margin || y < w.margin || x > w.width - w.margin || y > w.height - w.margin
    }

    /// Uniform sample over the world, rejecting the margin band and spots too
    /// close to a live agent. Falls back to the world centre after
    /// `spawn_attempts` misses.
    pub fn sample_position(
        &mut self,
        arena: &AgentArena,
        grid: &SpatialGrid<AgentId>,
        rng: &mut dyn RngCore,
    ) -> (f64, f64) {
        for _ in 0..self.spawn_attempts {
            let x = rng.gen_range(0.0..self.world.width);
            let y = rng.gen_range(0.0..self.world.height);
            if self.in_margin_band(x, y) {
                continue;
            }
            grid.query_radius_into(x, y, self.spawn_clearance, &mut self.scratch);
            let crowded = self.scratch.iter().any(|&id| {
                arena
                    .get(id)
                    .is_some_and(|a| a.is_alive() && a.distance_to_point(x, y) < self.spawn_clearance)
            });
            if !crowded {
                return (x, y);
            }
        }
        tracing::debug!(attempts = self.spawn_attempts, "Spawn sampling fell back to world centre");
        (self.world.width * 0.5, self.world.height * 0.5)
    }

    /// Sexes of the agents needed to top the population up to target, each
    /// one chosen to even out the current split.
    #[must_use]
    pub fn respawn_plan(&self, arena: &AgentArena) -> Vec<Sex> {
        let (mut males, mut females) = (0usize, 0usize);
        for agent in arena.iter_alive() {
            match agent.traits.sex {
                Sex::Male => males += 1,
                Sex::Female => females += 1,
            }
        }
        let alive = males + females;
        let deficit = self
            .target_population
            .min(self.max_population)
            .saturating_sub(alive);
        (0..deficit)
            .map(|_| {
                if males <= females {
                    males += 1;
                    Sex::Male
                } else {
                    females += 1;
                    Sex::Female
                }
            })
            .collect()
    }

    /// Frees the slots of dead agents after deregistering them from the grid,
    /// the lineage records and the pairing book. Returns the released ids.
    pub fn cleanup(
        &mut self,
        arena: &mut AgentArena,
        grid: &mut SpatialGrid<AgentId>,
        lineage: &mut dyn Lineage,
        coordinator: &mut ReproductionCoordinator,
    ) -> Vec<AgentId> {
        let dead = arena.dead_ids();
        for &id in &dead {
            if let Some(agent) = arena.get(id) {
                let (x, y) = agent.position();
                grid.remove(id, x, y);
                lineage.record_death(agent);
            }
            coordinator.release(id);
            arena.release(id);
        }
        if !dead.is_empty() {
            tracing::debug!(released = dead.len(), remaining = arena.len(), "Dead agents cleaned up");
        }
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage_registry::LineageRegistry;
    use fauna_data::{Agent, Traits};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn spawn(arena: &mut AgentArena, grid: &mut SpatialGrid<AgentId>, sex: Sex, x: f64, y: f64) -> AgentId {
        let id = arena.spawn_with(|id| Agent::new(id, x, y, Arc::new(Traits::neutral(sex)), 50.0, 100.0));
        grid.insert(id, x, y);
        id
    }

    #[test]
    fn test_capacity_check() {
        let lifecycle = LifecycleManager::new(&WorldConfig::default());
        assert!(lifecycle.check_capacity(49).is_ok());
        assert_eq!(
            lifecycle.check_capacity(50),
            Err(SpawnError::CapacityExceeded { max: 50 })
        );
    }

    #[test]
    fn test_sampled_positions_avoid_margin() {
        let world = WorldConfig::default();
        let mut lifecycle = LifecycleManager::new(&world);
        let arena = AgentArena::new();
        let grid = SpatialGrid::new(100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..200 {
            let (x, y) = lifecycle.sample_position(&arena, &grid, &mut rng);
            assert!(x >= world.margin && x <= world.width - world.margin);
            assert!(y >= world.margin && y <= world.height - world.margin);
        }
    }

    #[test]
    fn test_sampling_falls_back_to_centre() {
        let world = WorldConfig {
            width: 100.0,
            height: 100.0,
            margin: 10.0,
            spawn_clearance: 500.0,
            ..WorldConfig::default()
        };
        let mut lifecycle = LifecycleManager::new(&world);
        let mut arena = AgentArena::new();
        let mut grid = SpatialGrid::new(50.0);
        spawn(&mut arena, &mut grid, Sex::Male, 50.0, 50.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(lifecycle.sample_position(&arena, &grid, &mut rng), (50.0, 50.0));
    }

    #[test]
    fn test_respawn_plan_balances_sexes() {
        let world = WorldConfig {
            target_population: 5,
            ..WorldConfig::default()
        };
        let lifecycle = LifecycleManager::new(&world);
        let mut arena = AgentArena::new();
        let mut grid = SpatialGrid::new(100.0);
        spawn(&mut arena, &mut grid, Sex::Female, 100.0, 100.0);
        spawn(&mut arena, &mut grid, Sex::Female, 200.0, 100.0);

        let plan = lifecycle.respawn_plan(&arena);
        assert_eq!(plan, vec![Sex::Male, Sex::Male, Sex::Male]);
    }

    #[test]
    fn test_cleanup_releases_only_dead() {
        let lifecycle_world = WorldConfig::default();
        let mut lifecycle = LifecycleManager::new(&lifecycle_world);
        let mut arena = AgentArena::new();
        let mut grid = SpatialGrid::new(100.0);
        let mut lineage = LineageRegistry::new();
        let mut coordinator = ReproductionCoordinator::new();
        let alive = spawn(&mut arena, &mut grid, Sex::Male, 100.0, 100.0);
        let dead = spawn(&mut arena, &mut grid, Sex::Female, 300.0, 300.0);
        coordinator.pair(alive, dead, 0.0).expect("pairing");
        if let Some(agent) = arena.get_mut(dead) {
            agent.vitals.alive = false;
        }

        let released = lifecycle.cleanup(&mut arena, &mut grid, &mut lineage, &mut coordinator);
        assert_eq!(released, vec![dead]);
        assert!(arena.get(dead).is_none());
        assert!(arena.get(alive).is_some());
        assert!(!grid.contains(dead, 300.0, 300.0));
        assert!(coordinator.is_empty());
        assert!(lifecycle.cleanup_due(lifecycle_world.cleanup_interval));
    }
}
