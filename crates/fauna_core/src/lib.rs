//! # Fauna Core
//!
//! Agent population engine for a 2-D creature simulation.
//!
//! This crate contains the deterministic per-tick logic:
//! - A generational agent arena and a uniform-grid spatial index
//! - Vision cones and steering-based movement
//! - A guarded behavior state machine (forage, court, mate, nurse)
//! - Two-phase reproduction with a pairing book and lineage tracking
//! - Population bounds, cleanup and respawn
//! - Event publishing, metrics and structured logging
//!
//! ## Architecture
//!
//! [`PopulationManager`] is the composition root. It owns every agent and
//! collaborator and runs each live agent through the behavior system once
//! per tick. Systems see the world through a [`systems::TickContext`] and
//! hand movement and births back to the manager, which is the only place
//! the spatial grid is written.
//!
//! ## Example
//!
//! ```
//! use fauna_core::config::AppConfig;
//! use fauna_core::PopulationManager;
//!
//! let mut config = AppConfig::default();
//! config.world.seed = Some(42);
//!
//! let mut world = PopulationManager::new(config).expect("default config is valid");
//! for _ in 0..10 {
//!     world.tick(1.0 / 60.0);
//! }
//! assert_eq!(world.tick_count(), 10);
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod events;
pub mod food;
pub mod fsm;
pub mod genetics;
pub mod lifecycle;
pub mod lineage_registry;
pub mod metrics;
pub mod movement;
pub mod population;
pub mod spatial_grid;
pub mod systems;
pub mod vision;

pub use arena::AgentArena;
pub use config::AppConfig;
pub use error::{PairingError, SpawnError, TransitionError};
pub use events::{EffectSink, EventBus, NoEffects};
pub use food::{FoodField, Resources};
pub use genetics::{Genetics, MendelianGenetics};
pub use lineage_registry::{Lineage, LineageRegistry};
pub use metrics::Metrics;
pub use population::PopulationManager;
pub use spatial_grid::{Rect, SpatialGrid};
