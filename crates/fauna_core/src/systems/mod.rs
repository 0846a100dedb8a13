//! Per-agent systems run by the population manager each tick.

pub mod behavior;
pub mod reproduction;

use crate::arena::AgentArena;
use crate::config::AppConfig;
use crate::events::EffectSink;
use crate::food::Resources;
use crate::fsm;
use crate::genetics::Genetics;
use crate::lineage_registry::Lineage;
use crate::metrics::{counter, Metrics};
use crate::spatial_grid::SpatialGrid;
use fauna_data::{AgentId, BehaviorState, SimEvent, Target};
use rand::RngCore;
use reproduction::ReproductionCoordinator;

/// Everything a system may read or write while evaluating one agent.
///
/// Built fresh by the population manager for every agent step. The grid is
/// read-only here: position changes flow back through the manager.
pub struct TickContext<'a> {
    pub config: &'a AppConfig,
    pub arena: &'a mut AgentArena,
    pub grid: &'a SpatialGrid<AgentId>,
    pub resources: &'a mut dyn Resources,
    pub genetics: &'a dyn Genetics,
    pub lineage: &'a mut dyn Lineage,
    pub effects: &'a mut dyn EffectSink,
    pub coordinator: &'a mut ReproductionCoordinator,
    pub metrics: &'a mut Metrics,
    pub rng: &'a mut dyn RngCore,
    pub events: Vec<SimEvent>,
    pub scratch: Vec<AgentId>,
    pub now_ms: f64,
    pub tick: u64,
    /// Step length in seconds.
    pub dt: f64,
}

impl TickContext<'_> {
    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Requests a state change and reports whether it happened.
    ///
    /// `forced` skips the state-change cooldown; the transition table still
    /// applies. Rejections are counted and otherwise ignored.
    pub fn change_state(
        &mut self,
        id: AgentId,
        to: BehaviorState,
        target: Option<Target>,
        forced: bool,
    ) -> bool {
        let Some(agent) = self.arena.get_mut(id) else {
            return false;
        };
        let result = if forced {
            fsm::force_transition(agent, to, target, self.now_ms)
        } else {
            fsm::transition(
                agent,
                to,
                target,
                self.now_ms,
                self.config.behavior.state_cooldown_ms,
            )
        };
        match result {
            Ok(t) => {
                tracing::trace!(agent = %id, from = %t.from, to = %t.to, "State changed");
                self.emit(SimEvent::StateChanged {
                    id,
                    from: t.from,
                    to: t.to,
                    tick: self.tick,
                });
                true
            }
            Err(e) => {
                tracing::trace!(agent = %id, %to, reason = %e, "Transition rejected");
                self.metrics.increment(counter::REJECTED_TRANSITIONS);
                false
            }
        }
    }

    /// Returns the agent to IDLE after a failed or abandoned interaction.
    ///
    /// Drops any pairing the agent holds and, when `cooldown_ms` is given,
    /// pushes back its next reproduction attempt.
    pub fn abort_to_idle(&mut self, id: AgentId, reason: &str, cooldown_ms: Option<f64>) {
        let Some(agent) = self.arena.get_mut(id) else {
            return;
        };
        let state = agent.state();
        let partner = agent.target_agent();
        if let Some(cooldown) = cooldown_ms {
            let ready = self.now_ms + cooldown;
            agent.behavior.reproduction_ready_at_ms = agent.behavior.reproduction_ready_at_ms.max(ready);
        }
        self.coordinator.release(id);
        if state == BehaviorState::Idle {
            return;
        }
        if state.is_reproductive() {
            tracing::debug!(agent = %id, %state, reason, "Courtship aborted");
            self.metrics.increment(counter::ABORTED_COURTSHIPS);
            self.emit(SimEvent::CourtshipAborted {
                id,
                partner,
                reason: reason.to_string(),
                tick: self.tick,
            });
        }
        self.change_state(id, BehaviorState::Idle, None, true);
    }
}
