use fauna_data::{Agent, AgentId};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lineage values an offspring receives at birth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parentage {
    pub generation: u32,
    pub family_id: Uuid,
    /// True when this birth opened a new family; both parents join it.
    pub founded: bool,
}

/// Lineage collaborator: parentage bookkeeping and kinship exclusion.
pub trait Lineage {
    fn assign_parentage(
        &mut self,
        offspring: AgentId,
        mother: &Agent,
        father: &Agent,
        rng: &mut dyn RngCore,
        tick: u64,
    ) -> Parentage;

    fn can_mate(&self, a: &Agent, b: &Agent) -> bool;

    fn record_death(&mut self, agent: &Agent);

    fn family(&self, id: Uuid) -> Option<&FamilyRecord>;

    fn family_count(&self) -> usize;
}

/// Aggregate numbers for one family line.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FamilyRecord {
    pub id: Uuid,
    pub name: String,
    pub total_produced: usize,
    pub current_population: usize,
    pub peak_population: usize,
    pub max_generation: u32,
    pub first_appearance_tick: u64,
    pub is_extinct: bool,
}

impl FamilyRecord {
    fn new(id: Uuid, tick: u64) -> Self {
        Self {
            id,
            name: format!("Family-{}", &id.simple().to_string()[..6]),
            total_produced: 0,
            current_population: 0,
            peak_population: 0,
            max_generation: 0,
            first_appearance_tick: tick,
            is_extinct: false,
        }
    }

    fn join(&mut self, generation: u32) {
        self.current_population += 1;
        self.peak_population = self.peak_population.max(self.current_population);
        self.max_generation = self.max_generation.max(generation);
        self.is_extinct = false;
    }
}

/// Registry of every family that has ever existed in the world.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LineageRegistry {
    pub families: HashMap<Uuid, FamilyRecord>,
}

impl LineageRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_birth(&mut self, id: Uuid, generation: u32, tick: u64) {
        let entry = self
            .families
            .entry(id)
            .or_insert_with(|| FamilyRecord::new(id, tick));
        entry.total_produced += 1;
        entry.join(generation);
    }

    fn record_founder(&mut self, id: Uuid, generation: u32, tick: u64) {
        self.families
            .entry(id)
            .or_insert_with(|| FamilyRecord::new(id, tick))
            .join(generation);
    }
}

fn shares_parent(a: &Agent, b: &Agent) -> bool {
    let shared = |x: Option<AgentId>, y: Option<AgentId>| matches!((x, y), (Some(p), Some(q)) if p == q);
    shared(a.kinship.mother, b.kinship.mother)
        || shared(a.kinship.father, b.kinship.father)
        || shared(a.kinship.mother, b.kinship.father)
        || shared(a.kinship.father, b.kinship.mother)
}

impl Lineage for LineageRegistry {
    fn assign_parentage(
        &mut self,
        _offspring: AgentId,
        mother: &Agent,
        father: &Agent,
        rng: &mut dyn RngCore,
        tick: u64,
    ) -> Parentage {
        let generation = mother.identity.generation.max(father.identity.generation) + 1;
        let inherited = mother.identity.family_id.or(father.identity.family_id);
        let (family_id, founded) = match inherited {
            Some(id) => (id, false),
            None => (Uuid::from_u128(rng.gen::<u128>()), true),
        };
        if founded {
            self.record_founder(family_id, mother.identity.generation, tick);
            self.record_founder(family_id, father.identity.generation, tick);
        }
        self.record_birth(family_id, generation, tick);
        Parentage {
            generation,
            family_id,
            founded,
        }
    }

    fn can_mate(&self, a: &Agent, b: &Agent) -> bool {
        if a.id() == b.id() {
            return false;
        }
        if a.is_child_of(b.id()) || b.is_child_of(a.id()) {
            return false;
        }
        !shares_parent(a, b)
    }

    fn record_death(&mut self, agent: &Agent) {
        let Some(id) = agent.identity.family_id else {
            return;
        };
        if let Some(record) = self.families.get_mut(&id) {
            record.current_population = record.current_population.saturating_sub(1);
            if record.current_population == 0 {
                record.is_extinct = true;
            }
        }
    }

    fn family(&self, id: Uuid) -> Option<&FamilyRecord> {
        self.families.get(&id)
    }

    fn family_count(&self) -> usize {
        self.families.len()
    }
}
