//! Food supply: the `Resources` collaborator and its ECS-backed field.

use crate::config::{AppConfig, WorldConfig};
use crate::spatial_grid::{Rect, SpatialGrid};
use fauna_data::{Agent, FoodId, FoodItem, Position};
use hecs::{Entity, World};
use rand::{Rng, RngCore};

/// Food collaborator consulted by the behavior engine.
pub trait Resources {
    /// Active food within `range` of `(x, y)`, in no particular order.
    fn nearby_food(&self, x: f64, y: f64, range: f64) -> Vec<FoodItem>;

    fn food(&self, id: FoodId) -> Option<FoodItem>;

    /// Takes the item out of the world.
    fn remove_food(&mut self, id: FoodId) -> Option<FoodItem>;

    /// Energy the agent would gain from its targeted food, if the food still
    /// exists and lies within `reach`.
    fn check_consumption(&self, agent: &Agent, reach: f64) -> Option<f64> {
        let item = self.food(agent.target_food()?)?;
        (item.active && agent.distance_to_point(item.position.x, item.position.y) <= reach)
            .then_some(item.energy)
    }

    fn food_count(&self) -> usize;

    /// Periodic top-up; returns how many items were added.
    fn replenish(&mut self, _tick: u64, _rng: &mut dyn RngCore) -> usize {
        0
    }
}

/// Food items stored as `(Position, FoodItem)` entities, indexed by a grid.
pub struct FoodField {
    world: World,
    grid: SpatialGrid<FoodId>,
    bounds: Rect,
    max_food: usize,
    food_energy: f64,
    respawn_interval: u64,
}

impl std::fmt::Debug for FoodField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoodField")
            .field("count", &self.world.len())
            .field("max_food", &self.max_food)
            .finish()
    }
}

fn entity_of(id: FoodId) -> Option<Entity> {
    Entity::from_bits(id.0)
}

impl FoodField {
    #[must_use]
    pub fn new(world: &WorldConfig, food_cell_size: f64) -> Self {
        Self {
            world: World::new(),
            grid: SpatialGrid::new(food_cell_size),
            bounds: Rect::new(
                world.margin,
                world.margin,
                world.width - world.margin,
                world.height - world.margin,
            ),
            max_food: world.max_food,
            food_energy: world.food_energy,
            respawn_interval: world.food_respawn_interval,
        }
    }

    /// Field sized from the application config, scattered with the initial food.
    pub fn from_config(config: &AppConfig, rng: &mut dyn RngCore) -> Self {
        let mut field = Self::new(&config.world, config.grid.food_cell_size);
        field.scatter(config.world.initial_food, rng);
        field
    }

    pub fn spawn_food(&mut self, x: f64, y: f64, energy: f64) -> FoodId {
        let position = Position { x, y };
        let entity = self.world.spawn((
            position,
            FoodItem {
                id: FoodId(0),
                position,
                energy,
                active: true,
            },
        ));
        let id = FoodId(entity.to_bits().get());
        if let Ok(mut item) = self.world.get::<&mut FoodItem>(entity) {
            item.id = id;
        }
        self.grid.insert(id, x, y);
        id
    }

    /// Places up to `count` items at random positions, never past `max_food`.
    pub fn scatter(&mut self, count: usize, rng: &mut dyn RngCore) -> usize {
        let room = self.max_food.saturating_sub(self.world.len() as usize);
        let count = count.min(room);
        for _ in 0..count {
            let x = rng.gen_range(self.bounds.min_x..=self.bounds.max_x);
            let y = rng.gen_range(self.bounds.min_y..=self.bounds.max_y);
            self.spawn_food(x, y, self.food_energy);
        }
        count
    }

    /// Snapshot of every item in the field.
    #[must_use]
    pub fn items(&self) -> Vec<FoodItem> {
        let mut query = self.world.query::<&FoodItem>();
        query.iter().map(|(_, item)| *item).collect()
    }
}

impl Resources for FoodField {
    fn nearby_food(&self, x: f64, y: f64, range: f64) -> Vec<FoodItem> {
        self.grid
            .query_rect(Rect::around(x, y, range))
            .into_iter()
            .filter_map(|id| self.food(id))
            .filter(|item| {
                let dx = item.position.x - x;
                let dy = item.position.y - y;
                item.active && (dx * dx + dy * dy).sqrt() <= range
            })
            .collect()
    }

    fn food(&self, id: FoodId) -> Option<FoodItem> {
        let entity = entity_of(id)?;
        let item = self.world.get::<&FoodItem>(entity).ok()?;
        Some(*item)
    }

    fn remove_food(&mut self, id: FoodId) -> Option<FoodItem> {
        let entity = entity_of(id)?;
        let item = self.food(id)?;
        self.world.despawn(entity).ok()?;
        self.grid.remove(id, item.position.x, item.position.y);
        Some(item)
    }

    fn food_count(&self) -> usize {
        self.world.len() as usize
    }

    fn replenish(&mut self, tick: u64, rng: &mut dyn RngCore) -> usize {
        if self.respawn_interval == 0 || tick % self.respawn_interval != 0 {
            return 0;
        }
        let missing = self.max_food.saturating_sub(self.world.len() as usize);
        let added = self.scatter(missing, rng);
        if added > 0 {
            tracing::trace!(tick, added, "Food replenished");
        }
        added
    }
}
