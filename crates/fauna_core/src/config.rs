//! Configuration management for simulation parameters.
//!
//! Strongly-typed sections that map onto a `config.toml` file. Every section
//! has defaults, so a file only needs to list the values it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 1600.0
//! height = 1200.0
//! max_population = 50
//! seed = 42
//!
//! [reproduction]
//! energy_threshold = 60.0
//! mating_distance = 40.0
//! ```

use serde::{Deserialize, Serialize};

/// World bounds, population limits and food supply.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    /// Inset band that agents bounce off and spawns avoid.
    pub margin: f64,
    pub initial_population: usize,
    /// Population the lifecycle manager tops up to after cleanup.
    pub target_population: usize,
    pub max_population: usize,
    pub initial_food: usize,
    pub max_food: usize,
    pub food_energy: f64,
    /// Ticks between food replenishment passes.
    pub food_respawn_interval: u64,
    pub seed: Option<u64>,
    /// Ticks between dead-agent cleanup passes.
    pub cleanup_interval: u64,
    pub spawn_attempts: usize,
    /// Minimum distance between a fresh spawn and any live agent.
    pub spawn_clearance: f64,
    pub logic_zone_padding: f64,
    /// Ticks between population summaries in the log.
    pub metrics_interval: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1200.0,
            margin: 40.0,
            initial_population: 20,
            target_population: 12,
            max_population: 50,
            initial_food: 60,
            max_food: 120,
            food_energy: 30.0,
            food_respawn_interval: 30,
            seed: None,
            cleanup_interval: 60,
            spawn_attempts: 12,
            spawn_clearance: 20.0,
            logic_zone_padding: 200.0,
            metrics_interval: 600,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GridConfig {
    pub cell_size: f64,
    pub food_cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            food_cell_size: 80.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct VisionConfig {
    pub fov_degrees: f64,
    /// Baseline range, scaled by each agent's vision multiplier.
    pub range: f64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 120.0,
            range: 250.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MovementConfig {
    /// World units per second at speed multiplier 1.0.
    pub base_speed: f64,
    /// Radians per second.
    pub max_turn_rate: f64,
    /// Maximum random heading change per second while wandering.
    pub wander_jitter: f64,
    pub wander_speed_factor: f64,
    pub orbit_speed_factor: f64,
    /// Distance a juvenile keeps from the mother it follows.
    pub follow_distance: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 60.0,
            max_turn_rate: 4.0,
            wander_jitter: 2.5,
            wander_speed_factor: 0.5,
            orbit_speed_factor: 0.8,
            follow_distance: 25.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MetabolismConfig {
    pub max_energy: f64,
    /// Energy per second spent regardless of movement.
    pub idle_cost: f64,
    /// Energy per second spent at full speed.
    pub move_cost: f64,
    pub offspring_energy: f64,
    /// Seconds until an agent is sexually mature.
    pub maturity_age: f64,
}

impl Default for MetabolismConfig {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            idle_cost: 0.4,
            move_cost: 0.6,
            offspring_energy: 35.0,
            maturity_age: 30.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Minimum time between two behavior-driven state changes.
    pub state_cooldown_ms: f64,
    pub hunger_threshold: f64,
    pub seek_timeout_ms: f64,
    pub eating_duration_ms: f64,
    /// Distance at which a seeking agent starts eating.
    pub reach_distance: f64,
    pub nursing_duration_ms: f64,
    /// Energy per second passed from mother to child.
    pub nursing_rate: f64,
    /// Energy the mother never nurses below.
    pub nursing_reserve: f64,
    pub mate_search_interval_ms: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            state_cooldown_ms: 200.0,
            hunger_threshold: 45.0,
            seek_timeout_ms: 8000.0,
            eating_duration_ms: 1500.0,
            reach_distance: 15.0,
            nursing_duration_ms: 10000.0,
            nursing_rate: 4.0,
            nursing_reserve: 30.0,
            mate_search_interval_ms: 500.0,
        }
    }
}

/// Weights of the female's suitor score. Must sum to 1.0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct SuitorWeights {
    pub distance: f64,
    pub speed: f64,
    pub size: f64,
    pub vision: f64,
}

impl Default for SuitorWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            speed: 0.2,
            size: 0.2,
            vision: 0.2,
        }
    }
}

impl SuitorWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.distance + self.speed + self.size + self.vision
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReproductionConfig {
    pub energy_threshold: f64,
    /// Energy each parent pays on a successful mating.
    pub energy_cost: f64,
    pub cooldown_ms: f64,
    /// Cooldown applied to a suitor whose courtship was not selected.
    pub rejection_cooldown_ms: f64,
    pub search_radius: f64,
    pub mating_distance: f64,
    pub courtship_timeout_ms: f64,
    pub initial_orbit_radius: f64,
    /// Orbit shrink rate, world units per second of courtship.
    pub approach_rate: f64,
    pub mating_duration_ms: f64,
    pub min_genetic_distance: f64,
    pub max_genetic_distance: f64,
    pub suitor_weights: SuitorWeights,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 60.0,
            energy_cost: 20.0,
            cooldown_ms: 15000.0,
            rejection_cooldown_ms: 3000.0,
            search_radius: 300.0,
            mating_distance: 40.0,
            courtship_timeout_ms: 12000.0,
            initial_orbit_radius: 120.0,
            approach_rate: 25.0,
            mating_duration_ms: 2000.0,
            min_genetic_distance: 0.0,
            max_genetic_distance: 0.6,
            suitor_weights: SuitorWeights::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub grid: GridConfig,
    pub vision: VisionConfig,
    pub movement: MovementConfig,
    pub metabolism: MetabolismConfig,
    pub behavior: BehaviorConfig,
    pub reproduction: ReproductionConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        let w = &self.world;
        anyhow::ensure!(w.width > 0.0, "World width must be positive");
        anyhow::ensure!(w.height > 0.0, "World height must be positive");
        anyhow::ensure!(w.margin >= 0.0, "World margin must be non-negative");
        anyhow::ensure!(
            w.margin * 2.0 < w.width && w.margin * 2.0 < w.height,
            "World margin must be less than half of each dimension"
        );
        anyhow::ensure!(
            w.target_population <= w.max_population,
            "Target population cannot exceed max population"
        );
        anyhow::ensure!(
            w.initial_population <= w.max_population,
            "Initial population cannot exceed max population"
        );
        anyhow::ensure!(w.initial_food <= w.max_food, "Initial food cannot exceed max food");
        anyhow::ensure!(w.food_energy >= 0.0, "Food energy must be non-negative");
        anyhow::ensure!(w.cleanup_interval > 0, "Cleanup interval must be positive");
        anyhow::ensure!(w.spawn_attempts > 0, "Spawn attempts must be positive");

        anyhow::ensure!(self.grid.cell_size > 0.0, "Grid cell size must be positive");
        anyhow::ensure!(
            self.grid.food_cell_size > 0.0,
            "Food grid cell size must be positive"
        );

        anyhow::ensure!(
            self.vision.fov_degrees > 0.0 && self.vision.fov_degrees <= 360.0,
            "Field of view must be in (0, 360] degrees"
        );
        anyhow::ensure!(self.vision.range > 0.0, "Vision range must be positive");

        let m = &self.movement;
        anyhow::ensure!(m.base_speed >= 0.0, "Base speed must be non-negative");
        anyhow::ensure!(m.max_turn_rate > 0.0, "Max turn rate must be positive");

        let met = &self.metabolism;
        anyhow::ensure!(met.max_energy > 0.0, "Max energy must be positive");
        anyhow::ensure!(
            met.idle_cost >= 0.0 && met.move_cost >= 0.0,
            "Metabolic costs must be non-negative"
        );
        anyhow::ensure!(met.maturity_age >= 0.0, "Maturity age must be non-negative");

        let b = &self.behavior;
        anyhow::ensure!(b.state_cooldown_ms >= 0.0, "State cooldown must be non-negative");
        anyhow::ensure!(
            b.hunger_threshold >= 0.0 && b.hunger_threshold <= met.max_energy,
            "Hunger threshold must be in [0, max_energy]"
        );
        anyhow::ensure!(b.reach_distance > 0.0, "Reach distance must be positive");
        anyhow::ensure!(b.nursing_rate >= 0.0, "Nursing rate must be non-negative");

        let r = &self.reproduction;
        anyhow::ensure!(
            r.energy_threshold >= 0.0 && r.energy_threshold <= met.max_energy,
            "Reproduction threshold must be in [0, max_energy]"
        );
        anyhow::ensure!(r.energy_cost >= 0.0, "Reproduction cost must be non-negative");
        anyhow::ensure!(r.search_radius > 0.0, "Search radius must be positive");
        anyhow::ensure!(r.mating_distance > 0.0, "Mating distance must be positive");
        anyhow::ensure!(r.approach_rate >= 0.0, "Approach rate must be non-negative");
        anyhow::ensure!(
            r.min_genetic_distance < r.max_genetic_distance,
            "Genetic distance window is empty"
        );
        let sw = &r.suitor_weights;
        anyhow::ensure!(
            sw.distance >= 0.0 && sw.speed >= 0.0 && sw.size >= 0.0 && sw.vision >= 0.0,
            "Suitor weights must be non-negative"
        );
        anyhow::ensure!(
            (sw.total() - 1.0).abs() < 1e-6,
            "Suitor weights must sum to 1.0 (got {})",
            sw.total()
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Digest of the tuning sections; identical tuning gives identical output.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.vision).as_bytes());
        hasher.update(format!("{:?}", self.movement).as_bytes());
        hasher.update(format!("{:?}", self.metabolism).as_bytes());
        hasher.update(format!("{:?}", self.behavior).as_bytes());
        hasher.update(format!("{:?}", self.reproduction).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_above_max_rejected() {
        let config = AppConfig {
            world: WorldConfig {
                target_population: 60,
                max_population: 50,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_suitor_weights_must_sum_to_one() {
        let mut config = AppConfig::default();
        config.reproduction.suitor_weights.distance = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_fov() {
        let mut config = AppConfig::default();
        config.vision.fov_degrees = 0.0;
        assert!(config.validate().is_err());
        config.vision.fov_degrees = 361.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_genetic_window_rejected() {
        let mut config = AppConfig::default();
        config.reproduction.min_genetic_distance = 0.5;
        config.reproduction.max_genetic_distance = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [world]
            max_population = 30
            target_population = 10

            [reproduction]
            mating_distance = 25.0
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.world.max_population, 30);
        assert_eq!(config.reproduction.mating_distance, 25.0);
        assert_eq!(config.vision.range, VisionConfig::default().range);
    }

    #[test]
    fn test_fingerprint_consistency() {
        let config1 = AppConfig::default();
        let config2 = AppConfig::default();
        assert_eq!(config1.fingerprint(), config2.fingerprint());

        let mut config3 = AppConfig::default();
        config3.reproduction.energy_cost += 1.0;
        assert_ne!(config1.fingerprint(), config3.fingerprint());
    }
}
