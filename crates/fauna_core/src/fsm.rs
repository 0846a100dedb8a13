//! Transition table and guarded state changes for the agent state machine.

use crate::error::TransitionError;
use fauna_data::{Agent, BehaviorState, Target};

use fauna_data::BehaviorState::{Committed, Courting, Eating, Idle, Mating, Nursing, Seeking};

/// Destinations reachable from `from`.
#[must_use]
pub fn allowed_targets(from: BehaviorState) -> &'static [BehaviorState] {
    match from {
        Idle => &[Seeking, Courting, Committed],
        Seeking => &[Idle, Eating, Courting],
        Eating => &[Idle],
        Courting => &[Mating, Idle],
        Committed => &[Mating, Idle],
        Mating => &[Nursing, Idle],
        Nursing => &[Idle],
    }
}

#[must_use]
pub fn is_allowed(from: BehaviorState, to: BehaviorState) -> bool {
    allowed_targets(from).contains(&to)
}

/// A successful state change, for event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BehaviorState,
    pub to: BehaviorState,
}

/// Behavior-driven transition: honours the table and the state-change cooldown.
pub fn transition(
    agent: &mut Agent,
    to: BehaviorState,
    target: Option<Target>,
    now_ms: f64,
    cooldown_ms: f64,
) -> Result<Transition, TransitionError> {
    if let Some(last) = agent.behavior.last_state_change_ms {
        let elapsed = now_ms - last;
        if elapsed < cooldown_ms {
            return Err(TransitionError::Cooldown {
                remaining_ms: cooldown_ms - elapsed,
            });
        }
    }
    force_transition(agent, to, target, now_ms)
}

/// Protocol-driven transition and liveness abort: skips the cooldown but
/// still refuses moves the table does not list.
pub fn force_transition(
    agent: &mut Agent,
    to: BehaviorState,
    target: Option<Target>,
    now_ms: f64,
) -> Result<Transition, TransitionError> {
    if !agent.is_alive() {
        return Err(TransitionError::Dead);
    }
    let from = agent.behavior.state;
    if !is_allowed(from, to) {
        return Err(TransitionError::NotAllowed { from, to });
    }
    enter(agent, to, target, now_ms);
    Ok(Transition { from, to })
}

fn enter(agent: &mut Agent, to: BehaviorState, target: Option<Target>, now_ms: f64) {
    let behavior = &mut agent.behavior;
    behavior.state = to;
    behavior.target = target;
    behavior.time_in_state_ms = 0.0;
    behavior.last_state_change_ms = Some(now_ms);
}

/// Accumulates simulated time in the current state.
pub fn advance(agent: &mut Agent, dt_ms: f64) {
    agent.behavior.time_in_state_ms += dt_ms;
}

#[cfg(test)]
mod tests {
    use super::*;
    use fauna_data::{AgentId, FoodId, Sex, Traits};
    use std::sync::Arc;

    fn idle_agent() -> Agent {
        Agent::new(
            AgentId::new(1, 0),
            0.0,
            0.0,
            Arc::new(Traits::neutral(Sex::Male)),
            80.0,
            100.0,
        )
    }

    #[test]
    fn test_table_matches_protocol() {
        assert!(is_allowed(Idle, Seeking));
        assert!(is_allowed(Idle, Courting));
        assert!(is_allowed(Committed, Mating));
        assert!(is_allowed(Mating, Nursing));
        assert!(!is_allowed(Eating, Courting));
        assert!(!is_allowed(Nursing, Mating));
        assert!(!is_allowed(Idle, Mating));
        assert!(!is_allowed(Idle, Idle));
    }

    #[test]
    fn test_every_state_can_return_to_idle() {
        for state in BehaviorState::ALL {
            if state != Idle {
                assert!(is_allowed(state, Idle), "{state} has no way back to IDLE");
            }
        }
    }

    #[test]
    fn test_first_transition_has_no_cooldown() {
        let mut agent = idle_agent();
        let food = Some(Target::Food(FoodId(3)));
        let t = transition(&mut agent, Seeking, food, 0.0, 200.0).expect("allowed");
        assert_eq!(t, Transition { from: Idle, to: Seeking });
        assert_eq!(agent.behavior.target, food);
        assert_eq!(agent.behavior.last_state_change_ms, Some(0.0));
    }

    #[test]
    fn test_cooldown_rejects_rapid_changes() {
        let mut agent = idle_agent();
        transition(&mut agent, Seeking, None, 1000.0, 200.0).expect("allowed");
        let err = transition(&mut agent, Idle, None, 1100.0, 200.0).unwrap_err();
        assert!(matches!(err, TransitionError::Cooldown { .. }));
        assert_eq!(agent.state(), Seeking);

        transition(&mut agent, Idle, None, 1200.0, 200.0).expect("cooldown elapsed");
        assert_eq!(agent.state(), Idle);
    }

    #[test]
    fn test_rejected_transition_leaves_agent_untouched() {
        let mut agent = idle_agent();
        advance(&mut agent, 500.0);
        let err = transition(&mut agent, Nursing, None, 0.0, 0.0).unwrap_err();
        assert_eq!(err, TransitionError::NotAllowed { from: Idle, to: Nursing });
        assert_eq!(agent.behavior.time_in_state_ms, 500.0);
        assert!(agent.behavior.last_state_change_ms.is_none());
    }

    #[test]
    fn test_force_skips_cooldown_but_not_table() {
        let mut agent = idle_agent();
        transition(&mut agent, Courting, None, 0.0, 200.0).expect("allowed");
        force_transition(&mut agent, Mating, None, 10.0).expect("forced");
        assert_eq!(agent.state(), Mating);
        assert!(force_transition(&mut agent, Seeking, None, 20.0).is_err());
    }

    #[test]
    fn test_dead_agent_cannot_transition() {
        let mut agent = idle_agent();
        agent.vitals.alive = false;
        assert_eq!(
            force_transition(&mut agent, Seeking, None, 0.0),
            Err(TransitionError::Dead)
        );
    }
}
