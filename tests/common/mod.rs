pub mod macros;

use fauna_core::config::AppConfig;
use fauna_core::PopulationManager;
use fauna_data::{AgentId, FoodId, Sex, SimEvent, Traits};

#[allow(dead_code)]
pub struct Scenario {
    pub world: PopulationManager,
    pub agents: Vec<AgentId>,
    pub food: Vec<FoodId>,
    pub events: Vec<SimEvent>,
}

#[allow(dead_code)]
impl Scenario {
    /// Ticks once and keeps the events.
    pub fn step(&mut self, dt: f64) -> &[SimEvent] {
        let start = self.events.len();
        let events = self.world.tick(dt);
        self.events.extend(events);
        &self.events[start..]
    }

    /// Ticks until `done` holds or `limit` ticks have passed. Returns the
    /// number of ticks run when `done` held.
    pub fn run_until<F>(&mut self, dt: f64, limit: usize, mut done: F) -> Option<usize>
    where
        F: FnMut(&PopulationManager, &[SimEvent]) -> bool,
    {
        for i in 1..=limit {
            let start = self.events.len();
            let events = self.world.tick(dt);
            self.events.extend(events);
            if done(&self.world, &self.events[start..]) {
                return Some(i);
            }
        }
        None
    }

    pub fn agent(&self, index: usize) -> AgentId {
        self.agents[index]
    }
}

#[allow(dead_code)]
pub struct WorldBuilder {
    config: AppConfig,
    agents: Vec<AgentBuilder>,
    food: Vec<(f64, f64, f64)>,
}

#[allow(dead_code)]
impl WorldBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.world.initial_population = 0;
        config.world.initial_food = 0;
        config.world.max_food = 0;
        config.world.target_population = 0;
        config.world.seed = Some(42);
        Self {
            config,
            agents: Vec::new(),
            food: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.world.seed = Some(seed);
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Turns off every passive energy flow so energy changes only through
    /// eating and mating.
    pub fn without_metabolism(self) -> Self {
        self.with_config(|c| {
            c.metabolism.idle_cost = 0.0;
            c.metabolism.move_cost = 0.0;
            c.behavior.nursing_rate = 0.0;
        })
    }

    pub fn with_agent(mut self, agent: AgentBuilder) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_food(mut self, x: f64, y: f64, energy: f64) -> Self {
        self.food.push((x, y, energy));
        self
    }

    pub fn build(self) -> Scenario {
        let maturity = self.config.metabolism.maturity_age;
        let mut world =
            PopulationManager::new(self.config).expect("Failed to create world in test builder");

        let food = self
            .food
            .into_iter()
            .map(|(x, y, energy)| world.resources_mut().spawn_food(x, y, energy))
            .collect();

        let mut agents = Vec::new();
        for builder in self.agents {
            let id = world
                .spawn(builder.x, builder.y, builder.traits, builder.energy)
                .expect("Failed to spawn agent in test builder");
            if let Some(agent) = world.agent_mut(id) {
                agent.physics.heading = builder.heading;
                agent.vitals.age = if builder.adult { maturity } else { 0.0 };
            }
            agents.push(id);
        }
        world.events_mut().drain();

        Scenario {
            world,
            agents,
            food,
            events: Vec::new(),
        }
    }
}

#[allow(dead_code)]
pub struct AgentBuilder {
    x: f64,
    y: f64,
    heading: f64,
    energy: f64,
    adult: bool,
    traits: Traits,
}

#[allow(dead_code)]
impl AgentBuilder {
    pub fn new(sex: Sex) -> Self {
        Self {
            x: 400.0,
            y: 400.0,
            heading: 0.0,
            energy: 90.0,
            adult: true,
            traits: Traits::neutral(sex),
        }
    }

    pub fn male() -> Self {
        Self::new(Sex::Male)
    }

    pub fn female() -> Self {
        Self::new(Sex::Female)
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn heading(mut self, radians: f64) -> Self {
        self.heading = radians;
        self
    }

    pub fn energy(mut self, amount: f64) -> Self {
        self.energy = amount;
        self
    }

    pub fn juvenile(mut self) -> Self {
        self.adult = false;
        self
    }

    pub fn traits(mut self, traits: Traits) -> Self {
        self.traits = traits;
        self
    }
}
