//! Mate search, suitor selection and the synchronized move into MATING.
//!
//! The protocol has four phases:
//!
//! 1. **Search** (male, unilateral): an eligible male in IDLE picks the
//!    nearest compatible female in range and starts COURTING her.
//! 2. **Commitment** (female): an eligible female in IDLE scores the males
//!    courting her, commits to one and a [`Pairing`] is recorded.
//! 3. **Synchronization** (driven by the male): once within mating distance of
//!    a female committed to him, both agents are moved into MATING in one call.
//! 4. **Consummation** (driven by the male): after the mating duration the male
//!    returns a [`BirthPlan`]; the population manager spawns the offspring and
//!    hands the result to [`complete_mating`].
//!
//! Any counterpart that disappears or changes its mind sends the affected
//! agent back to IDLE; nothing here fails loudly.

use super::TickContext;
use crate::error::PairingError;
use crate::metrics::counter;
use crate::vision::VisionCone;
use fauna_data::{Agent, AgentId, BehaviorState, SimEvent, Target, Traits};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Distance from the mother an offspring appears at, per unit of her size.
const BIRTH_OFFSET: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingPhase {
    Committed,
    Mating,
}

/// A female's commitment to one male, held until the pair mates or splits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub male: AgentId,
    pub female: AgentId,
    pub phase: PairingPhase,
    pub since_ms: f64,
}

impl Pairing {
    #[must_use]
    pub fn involves(&self, id: AgentId) -> bool {
        self.male == id || self.female == id
    }

    #[must_use]
    pub fn partner_of(&self, id: AgentId) -> Option<AgentId> {
        if self.male == id {
            Some(self.female)
        } else if self.female == id {
            Some(self.male)
        } else {
            None
        }
    }
}

/// Process-wide pairing book. An agent appears in at most one pairing.
#[derive(Debug, Clone, Default)]
pub struct ReproductionCoordinator {
    pairings: Vec<Pairing>,
}

impl ReproductionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pair(&mut self, male: AgentId, female: AgentId, now_ms: f64) -> Result<(), PairingError> {
        for id in [male, female] {
            if self.is_paired(id) {
                return Err(PairingError::AlreadyPaired(id));
            }
        }
        self.pairings.push(Pairing {
            male,
            female,
            phase: PairingPhase::Committed,
            since_ms: now_ms,
        });
        Ok(())
    }

    #[must_use]
    pub fn pairing_of(&self, id: AgentId) -> Option<&Pairing> {
        self.pairings.iter().find(|p| p.involves(id))
    }

    #[must_use]
    pub fn partner_of(&self, id: AgentId) -> Option<AgentId> {
        self.pairing_of(id).and_then(|p| p.partner_of(id))
    }

    #[must_use]
    pub fn is_paired(&self, id: AgentId) -> bool {
        self.pairing_of(id).is_some()
    }

    #[must_use]
    pub fn pairing_between(&self, male: AgentId, female: AgentId) -> Option<&Pairing> {
        self.pairings
            .iter()
            .find(|p| p.male == male && p.female == female)
    }

    pub fn set_phase(&mut self, male: AgentId, female: AgentId, phase: PairingPhase) -> Result<(), PairingError> {
        let pairing = self
            .pairings
            .iter_mut()
            .find(|p| p.male == male && p.female == female)
            .ok_or(PairingError::NotPaired)?;
        pairing.phase = phase;
        Ok(())
    }

    /// Drops the pairing `id` belongs to, if any. Idempotent.
    pub fn release(&mut self, id: AgentId) -> Option<Pairing> {
        let index = self.pairings.iter().position(|p| p.involves(id))?;
        Some(self.pairings.swap_remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

/// Offspring the male's consummation asks the population manager to create.
#[derive(Debug, Clone, PartialEq)]
pub struct BirthPlan {
    pub mother: AgentId,
    pub father: AgentId,
    pub traits: Traits,
    pub x: f64,
    pub y: f64,
    pub energy: f64,
}

/// Mature, fed, off cooldown and not already spoken for.
#[must_use]
pub fn is_eligible(ctx: &TickContext<'_>, agent: &Agent) -> bool {
    let config = ctx.config;
    agent.is_alive()
        && agent.is_mature(config.metabolism.maturity_age)
        && agent.vitals.energy >= config.reproduction.energy_threshold
        && ctx.now_ms >= agent.behavior.reproduction_ready_at_ms
        && !ctx.coordinator.is_paired(agent.id())
}

fn within_genetic_window(ctx: &TickContext<'_>, a: &Agent, b: &Agent) -> bool {
    let r = &ctx.config.reproduction;
    let distance = ctx.genetics.genetic_distance(&a.traits, &b.traits);
    distance >= r.min_genetic_distance && distance <= r.max_genetic_distance
}

/// Phase 1: nearest compatible, eligible, unclaimed female within the
/// search radius of `male`.
pub fn find_mate(ctx: &mut TickContext<'_>, male: AgentId) -> Option<AgentId> {
    let seeker = ctx.arena.get(male)?;
    let (x, y) = seeker.position();
    let radius = ctx.config.reproduction.search_radius;

    let mut nearby = std::mem::take(&mut ctx.scratch);
    ctx.grid.query_radius_into(x, y, radius, &mut nearby);

    let ctx_ref: &TickContext<'_> = ctx;
    let candidates = nearby.iter().filter_map(|&id| {
        let female = ctx_ref.arena.get(id)?;
        let available = matches!(female.state(), BehaviorState::Idle | BehaviorState::Seeking);
        let suitable = id != male
            && available
            && ctx_ref.genetics.is_female(&female.traits)
            && is_eligible(ctx_ref, female)
            && ctx_ref.lineage.can_mate(seeker, female)
            && within_genetic_window(ctx_ref, seeker, female);
        suitable.then(|| (id, female.physics.x, female.physics.y))
    });
    let found = VisionCone::omnidirectional(x, y, radius)
        .nearest(candidates)
        .map(|d| d.entity);

    ctx.scratch = nearby;
    found
}

/// Weighted suitor score in `[0, 1]`.
#[must_use]
pub fn suitor_score(ctx: &TickContext<'_>, female: &Agent, male: &Agent) -> f64 {
    let r = &ctx.config.reproduction;
    let w = r.suitor_weights;
    let unit = |value: f32, range: (f32, f32)| {
        let span = f64::from(range.1 - range.0);
        if span <= 0.0 {
            0.0
        } else {
            (f64::from(value - range.0) / span).clamp(0.0, 1.0)
        }
    };
    let closeness = if r.search_radius > 0.0 {
        (1.0 - female.distance_to(male) / r.search_radius).clamp(0.0, 1.0)
    } else {
        0.0
    };
    w.distance * closeness
        + w.speed * unit(male.traits.speed, Traits::SPEED_RANGE)
        + w.size * unit(male.traits.size, Traits::SIZE_RANGE)
        + w.vision * unit(male.traits.vision, Traits::VISION_RANGE)
}

/// Phase 2: best-scoring male currently courting `female`. Equal scores go
/// to the lowest id.
pub fn select_suitor(ctx: &mut TickContext<'_>, female: AgentId) -> Option<(AgentId, f64)> {
    let chooser = ctx.arena.get(female)?;
    let (x, y) = chooser.position();

    let mut nearby = std::mem::take(&mut ctx.scratch);
    ctx.grid
        .query_radius_into(x, y, ctx.config.reproduction.search_radius, &mut nearby);
    nearby.sort_unstable();

    let ctx_ref: &TickContext<'_> = ctx;
    let mut best: Option<(AgentId, f64)> = None;
    for &id in &nearby {
        let Some(male) = ctx_ref.arena.get(id) else {
            continue;
        };
        if !male.is_engaged_with(BehaviorState::Courting, female)
            || !ctx_ref.genetics.is_male(&male.traits)
            || ctx_ref.coordinator.is_paired(id)
            || !ctx_ref.lineage.can_mate(chooser, male)
        {
            continue;
        }
        let score = suitor_score(ctx_ref, chooser, male);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((id, score));
        }
    }

    ctx.scratch = nearby;
    best
}

/// Phase 2 outcome: record the pairing and move the female to COMMITTED.
pub fn commit(ctx: &mut TickContext<'_>, male: AgentId, female: AgentId, score: f64) -> bool {
    if ctx.coordinator.is_paired(male) || ctx.coordinator.is_paired(female) {
        return false;
    }
    if !ctx.change_state(female, BehaviorState::Committed, Some(Target::Agent(male)), false) {
        return false;
    }
    if let Err(e) = ctx.coordinator.pair(male, female, ctx.now_ms) {
        tracing::warn!(%male, %female, error = %e, "Pairing refused after commitment");
        ctx.abort_to_idle(female, "pairing refused", None);
        return false;
    }
    tracing::debug!(%male, %female, score, "Pair committed");
    ctx.effects.courtship_link(male, female);
    ctx.emit(SimEvent::PairCommitted {
        male,
        female,
        score,
        tick: ctx.tick,
    });
    true
}

/// Adopts a pairing both agents already act out (male courting her, female
/// committed to him) when the book has no record of it.
fn ensure_pairing(ctx: &mut TickContext<'_>, male: AgentId, female: AgentId) -> bool {
    if ctx.coordinator.pairing_between(male, female).is_some() {
        return true;
    }
    ctx.coordinator.pair(male, female, ctx.now_ms).is_ok()
}

/// Re-validates a COMMITTED female's side of the pairing.
#[must_use]
pub fn commitment_holds(ctx: &mut TickContext<'_>, female: AgentId, male: AgentId) -> bool {
    let male_side = ctx.arena.get(male).is_some_and(|m| {
        m.is_engaged_with(BehaviorState::Courting, female)
            || m.is_engaged_with(BehaviorState::Mating, female)
    });
    male_side && ensure_pairing(ctx, male, female)
}

/// Phase 3: moves both agents to MATING if the female is committed to this
/// male and the two are within mating distance. Returns whether it did.
pub fn try_synchronize(ctx: &mut TickContext<'_>, male: AgentId, female: AgentId) -> bool {
    let (Some(m), Some(f)) = (ctx.arena.get(male), ctx.arena.get(female)) else {
        return false;
    };
    if !m.is_engaged_with(BehaviorState::Courting, female)
        || !f.is_engaged_with(BehaviorState::Committed, male)
        || m.distance_to(f) > ctx.config.reproduction.mating_distance
    {
        return false;
    }
    if !ensure_pairing(ctx, male, female) {
        return false;
    }

    let male_moved = ctx.change_state(male, BehaviorState::Mating, Some(Target::Agent(female)), true);
    let female_moved = ctx.change_state(female, BehaviorState::Mating, Some(Target::Agent(male)), true);
    if !(male_moved && female_moved) {
        tracing::warn!(%male, %female, "Mating synchronization split; aborting both");
        ctx.abort_to_idle(male, "synchronization failed", None);
        ctx.abort_to_idle(female, "synchronization failed", None);
        return false;
    }
    // Both transitions went through, so the pairing exists.
    let _ = ctx.coordinator.set_phase(male, female, PairingPhase::Mating);
    tracing::debug!(%male, %female, "Mating started");
    ctx.emit(SimEvent::MatingStarted {
        male,
        female,
        tick: ctx.tick,
    });
    true
}

/// True while both agents are MATING with each other under a mating pairing.
#[must_use]
pub fn mating_holds(ctx: &TickContext<'_>, id: AgentId, partner: AgentId) -> bool {
    let partner_ok = ctx
        .arena
        .get(partner)
        .is_some_and(|p| p.is_engaged_with(BehaviorState::Mating, id));
    let booked = ctx
        .coordinator
        .pairing_of(id)
        .is_some_and(|p| p.partner_of(id) == Some(partner) && p.phase == PairingPhase::Mating);
    partner_ok && booked
}

/// Phase 4: offspring plan for a pair that has mated long enough. No energy
/// or cooldown is charged here; see [`complete_mating`].
pub fn consummate(ctx: &mut TickContext<'_>, father: AgentId, mother: AgentId) -> Option<BirthPlan> {
    if !mating_holds(ctx, father, mother) {
        return None;
    }
    let m = ctx.arena.get(mother)?;
    let f = ctx.arena.get(father)?;
    let traits = ctx.genetics.mix(&m.traits, &f.traits, &mut *ctx.rng);

    let angle = ctx.rng.gen_range(0.0..TAU);
    let offset = BIRTH_OFFSET * f64::from(m.traits.size);
    let world = &ctx.config.world;
    let x = (m.physics.x + offset * angle.cos()).clamp(world.margin, world.width - world.margin);
    let y = (m.physics.y + offset * angle.sin()).clamp(world.margin, world.height - world.margin);

    Some(BirthPlan {
        mother,
        father,
        traits,
        x,
        y,
        energy: ctx.config.metabolism.offspring_energy,
    })
}

/// Settles a consummation after the spawn attempt.
///
/// With an offspring: both parents pay the energy cost (never below zero), the
/// offspring gets its lineage, the mother starts NURSING it and the father
/// returns to IDLE. Without one: no energy is charged and both go back to IDLE.
/// The reproduction cooldown applies either way.
pub fn complete_mating(ctx: &mut TickContext<'_>, plan: &BirthPlan, offspring: Option<AgentId>) {
    let r = &ctx.config.reproduction;
    let (cost, ready_at) = (r.energy_cost, ctx.now_ms + r.cooldown_ms);
    ctx.coordinator.release(plan.father);
    ctx.coordinator.release(plan.mother);

    for parent in [plan.mother, plan.father] {
        if let Some(agent) = ctx.arena.get_mut(parent) {
            agent.behavior.reproduction_ready_at_ms = ready_at;
            if offspring.is_some() {
                agent.vitals.energy = (agent.vitals.energy - cost).max(0.0);
            }
        }
    }

    let Some(child) = offspring else {
        ctx.metrics.increment(counter::FAILED_MATINGS);
        tracing::debug!(mother = %plan.mother, father = %plan.father, "Mating produced no offspring");
        ctx.change_state(plan.mother, BehaviorState::Idle, None, true);
        ctx.change_state(plan.father, BehaviorState::Idle, None, true);
        return;
    };

    let parentage = match (ctx.arena.get(plan.mother), ctx.arena.get(plan.father)) {
        (Some(mother), Some(father)) => Some(ctx.lineage.assign_parentage(
            child,
            mother,
            father,
            &mut *ctx.rng,
            ctx.tick,
        )),
        _ => None,
    };

    let mut born = None;
    if let Some(agent) = ctx.arena.get_mut(child) {
        agent.kinship.mother = Some(plan.mother);
        agent.kinship.father = Some(plan.father);
        if let Some(p) = parentage {
            agent.identity.generation = p.generation;
            agent.identity.family_id = Some(p.family_id);
        }
        born = Some((agent.identity.generation, agent.identity.family_id));
    }
    for parent in [plan.mother, plan.father] {
        if let Some(agent) = ctx.arena.get_mut(parent) {
            agent.kinship.children.push(child);
            if let Some(p) = parentage.filter(|p| p.founded) {
                agent.identity.family_id.get_or_insert(p.family_id);
            }
        }
    }

    ctx.change_state(plan.mother, BehaviorState::Nursing, Some(Target::Agent(child)), true);
    ctx.change_state(plan.father, BehaviorState::Idle, None, true);

    ctx.metrics.increment(counter::MATINGS);
    ctx.effects.birth(plan.x, plan.y);
    let (generation, family_id) = born.unwrap_or((0, None));
    tracing::debug!(%child, mother = %plan.mother, father = %plan.father, generation, "Offspring born");
    ctx.emit(SimEvent::OffspringBorn {
        id: child,
        mother: plan.mother,
        father: plan.father,
        generation,
        family_id,
        tick: ctx.tick,
        x: plan.x,
        y: plan.y,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> AgentId {
        AgentId::new(index, 0)
    }

    #[test]
    fn test_pair_refuses_second_pairing() {
        let mut book = ReproductionCoordinator::new();
        book.pair(id(1), id(2), 0.0).expect("first pairing");
        assert_eq!(
            book.pair(id(3), id(2), 0.0),
            Err(PairingError::AlreadyPaired(id(2)))
        );
        assert_eq!(
            book.pair(id(1), id(4), 0.0),
            Err(PairingError::AlreadyPaired(id(1)))
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_partner_lookup_both_ways() {
        let mut book = ReproductionCoordinator::new();
        book.pair(id(1), id(2), 5.0).expect("pairing");
        assert_eq!(book.partner_of(id(1)), Some(id(2)));
        assert_eq!(book.partner_of(id(2)), Some(id(1)));
        assert_eq!(book.partner_of(id(3)), None);
        assert!(book.pairing_between(id(1), id(2)).is_some());
        assert!(book.pairing_between(id(2), id(1)).is_none());
    }

    #[test]
    fn test_phase_change_requires_pairing() {
        let mut book = ReproductionCoordinator::new();
        assert_eq!(
            book.set_phase(id(1), id(2), PairingPhase::Mating),
            Err(PairingError::NotPaired)
        );
        book.pair(id(1), id(2), 0.0).expect("pairing");
        book.set_phase(id(1), id(2), PairingPhase::Mating).expect("phase");
        assert_eq!(book.pairing_of(id(2)).map(|p| p.phase), Some(PairingPhase::Mating));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut book = ReproductionCoordinator::new();
        book.pair(id(1), id(2), 0.0).expect("pairing");
        assert!(book.release(id(2)).is_some());
        assert!(book.release(id(2)).is_none());
        assert!(book.release(id(1)).is_none());
        assert!(book.is_empty());
    }
}
