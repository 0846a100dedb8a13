use anyhow::Context;
use fauna_core::config::AppConfig;
use fauna_core::events::json_lines_subscriber;
use fauna_core::metrics::counter;
use fauna_core::PopulationManager;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// End-of-run totals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub population: usize,
    pub births: u64,
    pub deaths: u64,
    pub matings: u64,
    pub failed_matings: u64,
    pub meals: u64,
    pub families: usize,
    pub events: u64,
}

/// Steps a [`PopulationManager`] at a fixed rate with no rendering.
pub struct HeadlessRunner {
    world: PopulationManager,
    dt: f64,
    events_seen: u64,
}

impl HeadlessRunner {
    pub fn new(config: AppConfig, dt: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(dt.is_finite() && dt > 0.0, "Step length must be positive, got {dt}");
        let world = PopulationManager::new(config)?;
        Ok(Self {
            world,
            dt,
            events_seen: 0,
        })
    }

    /// Streams every subsequent event to `path` as JSON Lines.
    pub fn record_events_to<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        self.world
            .events_mut()
            .subscribe_all(json_lines_subscriber(BufWriter::new(file)));
        tracing::info!(path = %path.display(), "Recording events");
        Ok(())
    }

    /// Runs up to `ticks` steps, stopping early if the population dies out.
    pub fn run(&mut self, ticks: u64) -> RunSummary {
        for _ in 0..ticks {
            let events = self.world.tick(self.dt);
            self.events_seen += events.len() as u64;
            if self.world.alive_count() == 0 {
                tracing::warn!(tick = self.world.tick_count(), "Population extinct, stopping early");
                break;
            }
        }
        self.summary()
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let metrics = self.world.metrics();
        RunSummary {
            ticks: self.world.tick_count(),
            population: self.world.alive_count(),
            births: metrics.get(counter::BIRTHS),
            deaths: metrics.get(counter::DEATHS),
            matings: metrics.get(counter::MATINGS),
            failed_matings: metrics.get(counter::FAILED_MATINGS),
            meals: metrics.get(counter::MEALS),
            families: self.world.lineage().family_count(),
            events: self.events_seen,
        }
    }

    #[must_use]
    pub fn world(&self) -> &PopulationManager {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PopulationManager {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> AppConfig {
        let mut config = AppConfig::default();
        config.world.seed = Some(seed);
        config
    }

    #[test]
    fn test_rejects_bad_step() {
        assert!(HeadlessRunner::new(seeded(1), 0.0).is_err());
        assert!(HeadlessRunner::new(seeded(1), f64::NAN).is_err());
    }

    #[test]
    fn test_run_counts_ticks() {
        let mut runner = HeadlessRunner::new(seeded(3), 1.0 / 30.0).expect("valid runner");
        let summary = runner.run(90);
        assert_eq!(summary.ticks, 90);
        assert!(summary.population > 0);
    }

    #[test]
    fn test_same_seed_same_summary() {
        let a = HeadlessRunner::new(seeded(11), 0.05).expect("valid runner").run(200);
        let b = HeadlessRunner::new(seeded(11), 0.05).expect("valid runner").run(200);
        assert_eq!(a, b);
    }

    #[test]
    fn test_records_json_lines() {
        let path = std::env::temp_dir().join(format!("fauna_events_{}.jsonl", std::process::id()));
        {
            let mut runner = HeadlessRunner::new(seeded(5), 0.1).expect("valid runner");
            runner.record_events_to(&path).expect("event log");
            runner
                .world_mut()
                .spawn_founder(fauna_data::Sex::Female)
                .expect("room for one more");
            runner.run(20);
        }
        let content = std::fs::read_to_string(&path).expect("event log written");
        let first = content.lines().next().expect("at least one event");
        let value: serde_json::Value = serde_json::from_str(first).expect("valid json");
        assert!(value.get("event").is_some());
        let _ = std::fs::remove_file(&path);
    }
}
