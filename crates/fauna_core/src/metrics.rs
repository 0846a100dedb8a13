//! Simulation counters and logging setup.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Named counters the engine bumps as things happen.
pub mod counter {
    pub const BIRTHS: &str = "births";
    pub const DEATHS: &str = "deaths";
    pub const MATINGS: &str = "matings";
    pub const FAILED_MATINGS: &str = "failed_matings";
    pub const COURTSHIPS: &str = "courtships";
    pub const ABORTED_COURTSHIPS: &str = "aborted_courtships";
    pub const REJECTED_TRANSITIONS: &str = "rejected_transitions";
    pub const MEALS: &str = "meals";
    pub const SPAWNS: &str = "spawns";
    pub const SPAWN_REJECTIONS: &str = "spawn_rejections";
}

/// Metrics collector owned by the population manager.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    tick_count: u64,
    population: usize,
    food: usize,
    counters: BTreeMap<&'static str, u64>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed tick; logs a summary every `interval` ticks.
    pub fn record_tick(&mut self, duration: Duration, population: usize, food: usize, interval: u64) {
        self.tick_count += 1;
        self.population = population;
        self.food = food;

        if interval > 0 && self.tick_count % interval == 0 {
            tracing::info!(
                tick = self.tick_count,
                population,
                food,
                births = self.get(counter::BIRTHS),
                deaths = self.get(counter::DEATHS),
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    pub fn increment(&mut self, name: &'static str) {
        *self.counters.entry(name).or_insert(0) += 1;
    }

    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[must_use]
    pub fn population(&self) -> usize {
        self.population
    }

    #[must_use]
    pub fn counters(&self) -> &BTreeMap<&'static str, u64> {
        &self.counters
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .finish(),
    )
    .ok();
}
