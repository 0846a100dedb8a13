use super::food::FoodId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Generational handle to an agent slot.
///
/// A handle resolves only while its slot still carries the same generation, so
/// a handle kept past the agent's removal can never alias a newer agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    pub index: u32,
    pub generation: u32,
}

impl AgentId {
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Immutable heritable trait set. Multipliers are relative to the configured
/// baseline (1.0 = average).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub sex: Sex,
    pub speed: f32,
    pub size: f32,
    pub vision: f32,
    /// Body colour on the hue circle, degrees in `[0, 360)`.
    pub hue: f32,
}

impl Traits {
    pub const SPEED_RANGE: (f32, f32) = (0.6, 1.4);
    pub const SIZE_RANGE: (f32, f32) = (0.7, 1.3);
    pub const VISION_RANGE: (f32, f32) = (0.7, 1.3);

    #[must_use]
    pub fn neutral(sex: Sex) -> Self {
        Self {
            sex,
            speed: 1.0,
            size: 1.0,
            vision: 1.0,
            hue: 0.0,
        }
    }
}

/// Behavior states of the per-agent state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviorState {
    Idle,
    Seeking,
    Eating,
    Courting,
    Committed,
    Mating,
    Nursing,
}

impl BehaviorState {
    pub const ALL: [BehaviorState; 7] = [
        BehaviorState::Idle,
        BehaviorState::Seeking,
        BehaviorState::Eating,
        BehaviorState::Courting,
        BehaviorState::Committed,
        BehaviorState::Mating,
        BehaviorState::Nursing,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorState::Idle => "IDLE",
            BehaviorState::Seeking => "SEEKING",
            BehaviorState::Eating => "EATING",
            BehaviorState::Courting => "COURTING",
            BehaviorState::Committed => "COMMITTED",
            BehaviorState::Mating => "MATING",
            BehaviorState::Nursing => "NURSING",
        }
    }

    /// States that belong to the reproduction protocol.
    #[must_use]
    pub fn is_reproductive(self) -> bool {
        matches!(
            self,
            BehaviorState::Courting | BehaviorState::Committed | BehaviorState::Mating
        )
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent is currently attending to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Agent(AgentId),
    Food(FoodId),
}

impl Target {
    #[must_use]
    pub fn as_agent(self) -> Option<AgentId> {
        match self {
            Target::Agent(id) => Some(id),
            Target::Food(_) => None,
        }
    }

    #[must_use]
    pub fn as_food(self) -> Option<FoodId> {
        match self {
            Target::Food(id) => Some(id),
            Target::Agent(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: AgentId,
    pub generation: u32,
    /// Family line; founders have none until their first offspring.
    pub family_id: Option<Uuid>,
    pub born_at_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physics {
    pub x: f64,
    pub y: f64,
    /// Facing direction in radians.
    pub heading: f64,
    /// Speed applied during the last movement step, world units per second.
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
    pub energy: f64,
    pub max_energy: f64,
    pub alive: bool,
    /// Accumulated simulated seconds.
    pub age: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Kinship {
    pub mother: Option<AgentId>,
    pub father: Option<AgentId>,
    pub children: Vec<AgentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub state: BehaviorState,
    pub target: Option<Target>,
    pub time_in_state_ms: f64,
    /// Simulation clock of the last state change; `None` until the first one.
    pub last_state_change_ms: Option<f64>,
    /// Simulation clock before which the agent may not reproduce.
    pub reproduction_ready_at_ms: f64,
    pub last_mate_search_ms: Option<f64>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            state: BehaviorState::Idle,
            target: None,
            time_in_state_ms: 0.0,
            last_state_change_ms: None,
            reproduction_ready_at_ms: 0.0,
            last_mate_search_ms: None,
        }
    }
}

/// A simulated creature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub identity: Identity,
    pub physics: Physics,
    pub vitals: Vitals,
    pub kinship: Kinship,
    pub behavior: Behavior,
    pub traits: Arc<Traits>,
}

impl Agent {
    #[must_use]
    pub fn new(id: AgentId, x: f64, y: f64, traits: Arc<Traits>, energy: f64, max_energy: f64) -> Self {
        Self {
            identity: Identity {
                id,
                generation: 0,
                family_id: None,
                born_at_ms: 0.0,
            },
            physics: Physics {
                x,
                y,
                heading: 0.0,
                speed: 0.0,
            },
            vitals: Vitals {
                energy: energy.clamp(0.0, max_energy),
                max_energy,
                alive: true,
                age: 0.0,
            },
            kinship: Kinship::default(),
            behavior: Behavior::default(),
            traits,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.identity.id
    }

    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.vitals.alive
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> BehaviorState {
        self.behavior.state
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.physics.x, self.physics.y)
    }

    #[must_use]
    pub fn distance_to_point(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.physics.x;
        let dy = y - self.physics.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[must_use]
    pub fn distance_to(&self, other: &Agent) -> f64 {
        self.distance_to_point(other.physics.x, other.physics.y)
    }

    #[must_use]
    pub fn is_mature(&self, maturity_age: f64) -> bool {
        self.vitals.age >= maturity_age
    }

    #[must_use]
    pub fn target_agent(&self) -> Option<AgentId> {
        self.behavior.target.and_then(Target::as_agent)
    }

    #[must_use]
    pub fn target_food(&self) -> Option<FoodId> {
        self.behavior.target.and_then(Target::as_food)
    }

    /// True when this agent is in `state` and targets `other`.
    #[must_use]
    pub fn is_engaged_with(&self, state: BehaviorState, other: AgentId) -> bool {
        self.is_alive() && self.behavior.state == state && self.target_agent() == Some(other)
    }

    #[must_use]
    pub fn is_child_of(&self, parent: AgentId) -> bool {
        self.kinship.mother == Some(parent) || self.kinship.father == Some(parent)
    }
}
