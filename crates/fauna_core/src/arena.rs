use fauna_data::{Agent, AgentId};

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    agent: Option<Agent>,
}

/// Slot storage for agents addressed by generational [`AgentId`]s.
///
/// Dead agents keep their slot (with `alive == false`) until [`release`]
/// frees it; releasing bumps the slot generation so every handle to the old
/// occupant stops resolving. Iteration follows spawn order.
///
/// [`release`]: AgentArena::release
#[derive(Debug, Clone, Default)]
pub struct AgentArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    order: Vec<AgentId>,
}

impl AgentArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh id and stores the agent built for it.
    pub fn spawn_with<F>(&mut self, build: F) -> AgentId
    where
        F: FnOnce(AgentId) -> Agent,
    {
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = AgentId::new(index, slot.generation);
        let mut agent = build(id);
        agent.identity.id = id;
        slot.agent = Some(agent);
        self.order.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.agent.as_ref()
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.agent.as_mut()
    }

    /// Mutable access to two distinct agents at once.
    pub fn get_pair_mut(&mut self, a: AgentId, b: AgentId) -> Option<(&mut Agent, &mut Agent)> {
        if a.index == b.index {
            return None;
        }
        self.get(a)?;
        self.get(b)?;
        let (lo, hi, swapped) = if a.index < b.index {
            (a.index as usize, b.index as usize, false)
        } else {
            (b.index as usize, a.index as usize, true)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let first = head[lo].agent.as_mut()?;
        let second = tail[0].agent.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Live-and-present check used to re-validate stored targets.
    #[must_use]
    pub fn is_alive(&self, id: AgentId) -> bool {
        self.get(id).is_some_and(Agent::is_alive)
    }

    /// Frees the slot; the id (and every copy of it) stops resolving.
    pub fn release(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let agent = slot.agent.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.order.retain(|&other| other != id);
        Some(agent)
    }

    /// Ids in spawn order, dead ones included.
    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.order.iter().filter_map(move |&id| self.get(id))
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = &Agent> {
        self.iter().filter(|agent| agent.is_alive())
    }

    #[must_use]
    pub fn dead_ids(&self) -> Vec<AgentId> {
        self.iter()
            .filter(|agent| !agent.is_alive())
            .map(Agent::id)
            .collect()
    }

    /// Occupied slots, dead agents awaiting cleanup included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.iter_alive().count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
