//! Per-state behavior of the agent state machine.
//!
//! [`evaluate`] runs once per tick for each live agent in the logic zone. It
//! re-validates whatever the agent is attending to, may request a state
//! change, and returns the steering the movement controller should apply.

use super::reproduction::{self, BirthPlan};
use super::TickContext;
use crate::fsm;
use crate::metrics::counter;
use crate::movement::Steering;
use crate::vision::VisionCone;
use fauna_data::{AgentId, BehaviorState, SimEvent, Target};

/// Result of evaluating one agent for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub steering: Steering,
    pub birth: Option<BirthPlan>,
}

impl Outcome {
    fn steer(steering: Steering) -> Self {
        Self {
            steering,
            birth: None,
        }
    }

    fn hold() -> Self {
        Self::steer(Steering::Hold { face: None })
    }

    fn face(x: f64, y: f64) -> Self {
        Self::steer(Steering::Hold { face: Some((x, y)) })
    }
}

/// Runs the agent's current state for one tick.
pub fn evaluate(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let dt = ctx.dt;
    let Some(agent) = ctx.arena.get_mut(id) else {
        return Outcome::hold();
    };
    if !agent.is_alive() {
        return Outcome::hold();
    }
    agent.vitals.age += dt;
    fsm::advance(agent, dt * 1000.0);

    match agent.state() {
        BehaviorState::Idle => idle(ctx, id),
        BehaviorState::Seeking => seeking(ctx, id),
        BehaviorState::Eating => eating(ctx, id),
        BehaviorState::Courting => courting(ctx, id),
        BehaviorState::Committed => committed(ctx, id),
        BehaviorState::Mating => mating(ctx, id),
        BehaviorState::Nursing => nursing(ctx, id),
    }
}

fn position_of(ctx: &TickContext<'_>, id: AgentId) -> Option<(f64, f64)> {
    ctx.arena.get(id).map(|a| a.position())
}

/// Nearest active food inside the agent's vision cone.
fn visible_food(ctx: &TickContext<'_>, id: AgentId) -> Option<(Target, f64, f64)> {
    let agent = ctx.arena.get(id)?;
    let cone = VisionCone::for_agent(agent, &ctx.config.vision);
    let bounds = cone.bounds();
    let (cx, cy) = bounds.center();
    let half_diagonal = bounds.width().hypot(bounds.height()) * 0.5;
    let food = ctx.resources.nearby_food(cx, cy, half_diagonal);
    let nearest = cone.nearest(
        food.iter()
            .filter(|item| item.active)
            .map(|item| (item.id, item.position.x, item.position.y)),
    )?;
    let item = food.iter().find(|item| item.id == nearest.entity)?;
    Some((Target::Food(item.id), item.position.x, item.position.y))
}

/// The mother of `id`, if she is alive and currently nursing it.
fn nursing_mother(ctx: &TickContext<'_>, id: AgentId) -> Option<AgentId> {
    let mother_id = ctx.arena.get(id)?.kinship.mother?;
    let mother = ctx.arena.get(mother_id)?;
    mother
        .is_engaged_with(BehaviorState::Nursing, id)
        .then_some(mother_id)
}

fn mate_search_due(ctx: &TickContext<'_>, id: AgentId) -> bool {
    let interval = ctx.config.behavior.mate_search_interval_ms;
    ctx.arena
        .get(id)
        .and_then(|a| a.behavior.last_mate_search_ms)
        .map_or(true, |last| ctx.now_ms - last >= interval)
}

fn idle(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let hungry = agent.vitals.energy < ctx.config.behavior.hunger_threshold;
    let mature = agent.is_mature(ctx.config.metabolism.maturity_age);
    let eligible = reproduction::is_eligible(ctx, agent);
    let is_male = ctx.genetics.is_male(&agent.traits);
    let is_female = ctx.genetics.is_female(&agent.traits);

    if hungry {
        if let Some((target, fx, fy)) = visible_food(ctx, id) {
            if ctx.change_state(id, BehaviorState::Seeking, Some(target), false) {
                return Outcome::steer(Steering::Seek { x: fx, y: fy });
            }
        }
    }

    if !mature {
        if let Some(mother) = nursing_mother(ctx, id) {
            if ctx.change_state(id, BehaviorState::Seeking, Some(Target::Agent(mother)), false) {
                return follow(ctx, mother);
            }
        }
        return Outcome::steer(Steering::Wander);
    }

    if eligible && is_male && mate_search_due(ctx, id) {
        let now = ctx.now_ms;
        if let Some(agent) = ctx.arena.get_mut(id) {
            agent.behavior.last_mate_search_ms = Some(now);
        }
        ctx.effects.search_pulse(id);
        if let Some(female) = reproduction::find_mate(ctx, id) {
            if ctx.change_state(id, BehaviorState::Courting, Some(Target::Agent(female)), false) {
                tracing::debug!(male = %id, %female, "Courtship started");
                ctx.metrics.increment(counter::COURTSHIPS);
                ctx.effects.courtship_link(id, female);
                ctx.emit(SimEvent::CourtshipStarted {
                    male: id,
                    female,
                    tick: ctx.tick,
                });
                return courting_steering(ctx, id, female);
            }
        }
    } else if eligible && is_female {
        if let Some((male, score)) = reproduction::select_suitor(ctx, id) {
            if reproduction::commit(ctx, male, id, score) {
                return position_of(ctx, male).map_or_else(Outcome::hold, |(x, y)| Outcome::face(x, y));
            }
        }
    }

    Outcome::steer(Steering::Wander)
}

fn follow(ctx: &TickContext<'_>, leader: AgentId) -> Outcome {
    match position_of(ctx, leader) {
        Some((x, y)) => Outcome::steer(Steering::Follow {
            x,
            y,
            stop_distance: ctx.config.movement.follow_distance,
        }),
        None => Outcome::hold(),
    }
}

fn seeking(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    if agent.behavior.time_in_state_ms >= ctx.config.behavior.seek_timeout_ms {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::steer(Steering::Wander);
    }

    let target = agent.behavior.target;
    match target {
        Some(Target::Food(food)) => {
            let Some(item) = ctx.resources.food(food).filter(|item| item.active) else {
                ctx.change_state(id, BehaviorState::Idle, None, true);
                return Outcome::steer(Steering::Wander);
            };
            let (fx, fy) = (item.position.x, item.position.y);
            if agent.distance_to_point(fx, fy) <= ctx.config.behavior.reach_distance
                && ctx.change_state(id, BehaviorState::Eating, Some(Target::Food(food)), false)
            {
                return Outcome::face(fx, fy);
            }
            Outcome::steer(Steering::Seek { x: fx, y: fy })
        }
        Some(Target::Agent(mother)) => {
            let still_nursing = agent.kinship.mother == Some(mother)
                && nursing_mother(ctx, id) == Some(mother);
            if still_nursing {
                follow(ctx, mother)
            } else {
                ctx.change_state(id, BehaviorState::Idle, None, true);
                Outcome::steer(Steering::Wander)
            }
        }
        None => {
            ctx.change_state(id, BehaviorState::Idle, None, true);
            Outcome::steer(Steering::Wander)
        }
    }
}

fn eating(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let Some(food) = agent.target_food() else {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::hold();
    };
    let Some(item) = ctx.resources.food(food).filter(|item| item.active) else {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::hold();
    };
    let face = Outcome::face(item.position.x, item.position.y);
    if agent.behavior.time_in_state_ms < ctx.config.behavior.eating_duration_ms {
        return face;
    }

    let reach = ctx.config.behavior.reach_distance;
    let consumable = ctx.resources.check_consumption(agent, reach).is_some();
    let gained = if consumable {
        ctx.resources.remove_food(food)
    } else {
        None
    };
    let Some(item) = gained else {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::hold();
    };

    if let Some(agent) = ctx.arena.get_mut(id) {
        agent.vitals.energy = (agent.vitals.energy + item.energy).min(agent.vitals.max_energy);
    }
    ctx.metrics.increment(counter::MEALS);
    ctx.emit(SimEvent::FoodConsumed {
        id,
        food,
        energy: item.energy,
        tick: ctx.tick,
    });
    if !ctx.change_state(id, BehaviorState::Idle, None, false) {
        // The food is gone; next tick's check sends the agent back to IDLE.
        tracing::trace!(agent = %id, "Leaving EATING deferred by cooldown");
    }
    Outcome::hold()
}

/// Orbit around the courted female, tightening with time spent courting.
fn courting_steering(ctx: &TickContext<'_>, id: AgentId, female: AgentId) -> Outcome {
    let (Some(agent), Some((fx, fy))) = (ctx.arena.get(id), position_of(ctx, female)) else {
        return Outcome::hold();
    };
    let r = &ctx.config.reproduction;
    let elapsed_s = agent.behavior.time_in_state_ms / 1000.0;
    let radius = (r.initial_orbit_radius - r.approach_rate * elapsed_s).max(0.0);
    Outcome::steer(Steering::Orbit {
        cx: fx,
        cy: fy,
        radius,
    })
}

fn courting(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let timed_out = agent.behavior.time_in_state_ms >= ctx.config.reproduction.courtship_timeout_ms;
    let rejection = Some(ctx.config.reproduction.rejection_cooldown_ms);
    let Some(female_id) = agent.target_agent() else {
        ctx.abort_to_idle(id, "no courtship target", None);
        return Outcome::steer(Steering::Wander);
    };
    let Some(female) = ctx
        .arena
        .get(female_id)
        .filter(|f| f.is_alive() && ctx.genetics.is_female(&f.traits))
    else {
        ctx.abort_to_idle(id, "courted female gone", None);
        return Outcome::steer(Steering::Wander);
    };

    let taken = ctx
        .coordinator
        .partner_of(female_id)
        .is_some_and(|partner| partner != id)
        || (matches!(female.state(), BehaviorState::Committed | BehaviorState::Mating)
            && female.target_agent() != Some(id));
    if taken {
        ctx.abort_to_idle(id, "rejected", rejection);
        return Outcome::steer(Steering::Wander);
    }
    if female.state() == BehaviorState::Nursing {
        ctx.abort_to_idle(id, "female unavailable", rejection);
        return Outcome::steer(Steering::Wander);
    }
    if timed_out {
        ctx.abort_to_idle(id, "courtship timeout", rejection);
        return Outcome::steer(Steering::Wander);
    }

    let close = agent.distance_to(female) <= ctx.config.reproduction.mating_distance;
    if close && reproduction::try_synchronize(ctx, id, female_id) {
        return position_of(ctx, female_id).map_or_else(Outcome::hold, |(x, y)| Outcome::face(x, y));
    }
    courting_steering(ctx, id, female_id)
}

fn committed(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let timed_out = agent.behavior.time_in_state_ms >= ctx.config.reproduction.courtship_timeout_ms;
    let Some(male) = agent.target_agent() else {
        ctx.abort_to_idle(id, "no committed partner", None);
        return Outcome::steer(Steering::Wander);
    };
    if !reproduction::commitment_holds(ctx, id, male) {
        ctx.abort_to_idle(id, "partner stopped courting", None);
        return Outcome::steer(Steering::Wander);
    }
    if timed_out {
        ctx.abort_to_idle(id, "courtship timeout", None);
        return Outcome::steer(Steering::Wander);
    }
    position_of(ctx, male).map_or_else(Outcome::hold, |(x, y)| Outcome::face(x, y))
}

fn mating(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let Some(agent) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let elapsed = agent.behavior.time_in_state_ms;
    let is_male = ctx.genetics.is_male(&agent.traits);
    let cooldown = Some(ctx.config.reproduction.cooldown_ms);
    let duration = ctx.config.reproduction.mating_duration_ms;
    let Some(partner) = agent.target_agent() else {
        ctx.abort_to_idle(id, "no mating partner", cooldown);
        return Outcome::hold();
    };
    if !reproduction::mating_holds(ctx, id, partner) {
        ctx.abort_to_idle(id, "mating partner lost", cooldown);
        return Outcome::hold();
    }

    let face = position_of(ctx, partner).map_or_else(Outcome::hold, |(x, y)| Outcome::face(x, y));
    if is_male && elapsed >= duration {
        return Outcome {
            birth: reproduction::consummate(ctx, id, partner),
            ..face
        };
    }
    if !is_male && elapsed > duration * 2.0 {
        ctx.abort_to_idle(id, "mating timeout", cooldown);
        return Outcome::hold();
    }
    face
}

fn nursing(ctx: &mut TickContext<'_>, id: AgentId) -> Outcome {
    let b = &ctx.config.behavior;
    let (rate, reserve, duration) = (b.nursing_rate, b.nursing_reserve, b.nursing_duration_ms);
    let Some(mother) = ctx.arena.get(id) else {
        return Outcome::hold();
    };
    let elapsed = mother.behavior.time_in_state_ms;
    let mother_energy = mother.vitals.energy;
    let child_id = mother.target_agent();

    let child = child_id
        .and_then(|c| ctx.arena.get(c))
        .filter(|c| c.is_alive() && c.kinship.mother == Some(id));
    let Some(child) = child else {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::steer(Steering::Wander);
    };
    let child_id = child.id();
    let (cx, cy) = child.position();
    let headroom = (child.vitals.max_energy - child.vitals.energy).max(0.0);

    if elapsed >= duration || mother_energy <= reserve {
        ctx.change_state(id, BehaviorState::Idle, None, true);
        return Outcome::steer(Steering::Wander);
    }

    let amount = (rate * ctx.dt).min(mother_energy - reserve).min(headroom).max(0.0);
    if amount > 0.0 {
        if let Some((mother, child)) = ctx.arena.get_pair_mut(id, child_id) {
            mother.vitals.energy -= amount;
            child.vitals.energy += amount;
        }
    }
    Outcome::face(cx, cy)
}
