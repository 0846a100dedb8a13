//! Plain data shared by the fauna engine and its callers.

pub mod data;

pub use data::agent::{
    Agent, AgentId, Behavior, BehaviorState, Identity, Kinship, Physics, Sex, Target, Traits,
    Vitals,
};
pub use data::event::{EventKind, SimEvent};
pub use data::food::{FoodId, FoodItem, Position};
