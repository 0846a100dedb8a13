use super::agent::{AgentId, BehaviorState};
use super::food::FoodId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification names subscribers can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    StateChanged,
    CourtshipStarted,
    CourtshipAborted,
    PairCommitted,
    MatingStarted,
    OffspringBorn,
    FoodConsumed,
    AgentSpawned,
    AgentDied,
    SpawnRejected,
}

/// Typed payloads emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SimEvent {
    StateChanged {
        id: AgentId,
        from: BehaviorState,
        to: BehaviorState,
        tick: u64,
    },
    CourtshipStarted {
        male: AgentId,
        female: AgentId,
        tick: u64,
    },
    CourtshipAborted {
        id: AgentId,
        partner: Option<AgentId>,
        reason: String,
        tick: u64,
    },
    PairCommitted {
        male: AgentId,
        female: AgentId,
        score: f64,
        tick: u64,
    },
    MatingStarted {
        male: AgentId,
        female: AgentId,
        tick: u64,
    },
    OffspringBorn {
        id: AgentId,
        mother: AgentId,
        father: AgentId,
        generation: u32,
        family_id: Option<Uuid>,
        tick: u64,
        x: f64,
        y: f64,
    },
    FoodConsumed {
        id: AgentId,
        food: FoodId,
        energy: f64,
        tick: u64,
    },
    AgentSpawned {
        id: AgentId,
        tick: u64,
        x: f64,
        y: f64,
    },
    AgentDied {
        id: AgentId,
        age: f64,
        offspring: usize,
        cause: String,
        tick: u64,
    },
    SpawnRejected {
        population: usize,
        max: usize,
        tick: u64,
    },
}

impl SimEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::StateChanged { .. } => EventKind::StateChanged,
            SimEvent::CourtshipStarted { .. } => EventKind::CourtshipStarted,
            SimEvent::CourtshipAborted { .. } => EventKind::CourtshipAborted,
            SimEvent::PairCommitted { .. } => EventKind::PairCommitted,
            SimEvent::MatingStarted { .. } => EventKind::MatingStarted,
            SimEvent::OffspringBorn { .. } => EventKind::OffspringBorn,
            SimEvent::FoodConsumed { .. } => EventKind::FoodConsumed,
            SimEvent::AgentSpawned { .. } => EventKind::AgentSpawned,
            SimEvent::AgentDied { .. } => EventKind::AgentDied,
            SimEvent::SpawnRejected { .. } => EventKind::SpawnRejected,
        }
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            SimEvent::StateChanged { tick, .. }
            | SimEvent::CourtshipStarted { tick, .. }
            | SimEvent::CourtshipAborted { tick, .. }
            | SimEvent::PairCommitted { tick, .. }
            | SimEvent::MatingStarted { tick, .. }
            | SimEvent::OffspringBorn { tick, .. }
            | SimEvent::FoodConsumed { tick, .. }
            | SimEvent::AgentSpawned { tick, .. }
            | SimEvent::AgentDied { tick, .. }
            | SimEvent::SpawnRejected { tick, .. } => *tick,
        }
    }
}
