//! Error types for the fauna engine.
//!
//! None of these reach the tick loop as failures: callers treat a rejected
//! transition, spawn or pairing as "nothing happened" and carry on.

use fauna_data::{AgentId, BehaviorState};
use thiserror::Error;

/// Why a state-machine transition request was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("state change cooldown active ({remaining_ms:.0} ms left)")]
    Cooldown { remaining_ms: f64 },

    #[error("transition {from} -> {to} is not allowed")]
    NotAllowed {
        from: BehaviorState,
        to: BehaviorState,
    },

    #[error("agent is dead")]
    Dead,
}

/// Why a spawn request produced no agent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpawnError {
    #[error("population at capacity ({max})")]
    CapacityExceeded { max: usize },

    #[error("spawn position ({x}, {y}) is not finite")]
    InvalidPosition { x: f64, y: f64 },
}

/// Pairing book refusals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairingError {
    #[error("agent {0} already holds a pairing")]
    AlreadyPaired(AgentId),

    #[error("agents are not paired with each other")]
    NotPaired,
}
