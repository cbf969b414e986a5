//! World state management.
//!
//! Owns every live cell and food pellet plus the spatial index. All
//! mutation goes through this type so the index never drifts from the maps.

use crate::config::{Config, FoodConfig};
use crate::entity::{mass_to_radius, BotBrain, Cell, Food};
use crate::spatial::SpatialIndex;
use glam::Vec2;
use protocol::Color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// The game world containing all cells and food.
#[derive(Debug)]
pub struct World {
    /// Next ID to assign (shared by cells and food).
    next_id: u32,
    pub width: f32,
    pub height: f32,
    cells: HashMap<u32, Cell>,
    food: HashMap<u32, Food>,
    index: SpatialIndex,
    /// Simulated time in milliseconds.
    clock: u64,
    rng: StdRng,
}

impl World {
    /// Create an empty world sized by the config.
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create an empty world with a fixed seed.
    pub fn seeded(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, rng: StdRng) -> Self {
        let width = config.border.width;
        let height = config.border.height;
        Self {
            next_id: 1,
            width,
            height,
            cells: HashMap::with_capacity(256),
            food: HashMap::with_capacity(config.food.count),
            index: SpatialIndex::new(width, height, config.spatial.bucket_size),
            clock: 0,
            rng,
        }
    }

    /// Get the next ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1; // Skip 0
        }
        id
    }

    #[inline]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    #[inline]
    pub fn advance_clock(&mut self, ms: u64) {
        self.clock += ms;
    }

    #[inline]
    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.get(&id)
    }

    #[inline]
    pub fn cell_mut(&mut self, id: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    #[inline]
    pub fn food_item(&self, id: u32) -> Option<&Food> {
        self.food.get(&id)
    }

    #[inline]
    pub fn is_live(&self, id: u32) -> bool {
        self.cells.contains_key(&id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn food(&self) -> impl Iterator<Item = &Food> {
        self.food.values()
    }

    /// Live cell IDs in ascending order.
    pub fn cell_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.cells.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    #[inline]
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    #[inline]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generate a random color.
    pub fn random_color(&mut self) -> Color {
        Color::new(
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
        )
    }

    /// Random point at least `margin` away from every edge.
    pub fn random_position(&mut self, margin: f32) -> Vec2 {
        let x = random_axis(&mut self.rng, margin, self.width);
        let y = random_axis(&mut self.rng, margin, self.height);
        Vec2::new(x, y)
    }

    /// Add a cell to the world and file it in the index.
    pub fn add_cell(&mut self, mut cell: Cell) -> u32 {
        let id = cell.id;
        cell.bucket = self.index.insert_cell(id, cell.position);
        self.cells.insert(id, cell);
        id
    }

    /// Spawn a top-level cell at a random position.
    pub fn spawn_cell(&mut self, name: String, mass: f32, connection: Option<u32>) -> u32 {
        let position = self.random_position(mass_to_radius(mass));
        self.spawn_cell_at(name, mass, position, connection)
    }

    /// Spawn a top-level cell at a given position.
    pub fn spawn_cell_at(&mut self, name: String, mass: f32, position: Vec2, connection: Option<u32>) -> u32 {
        let id = self.next_id();
        let color = self.random_color();
        let position = Cell::clamp_to_border(position, mass_to_radius(mass), self.width, self.height);
        let mut cell = Cell::new(id, position, mass, color, name);
        cell.connection = connection;
        cell.last_move = self.clock;
        self.add_cell(cell)
    }

    /// Spawn a bot cell at a random position.
    pub fn spawn_bot(&mut self, name: String, mass: f32, update_interval: u64) -> u32 {
        let id = self.spawn_cell(name, mass, None);
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.bot = Some(BotBrain::new(id, update_interval));
        }
        id
    }

    /// Add a food pellet to the world and file it in the index.
    pub fn add_food(&mut self, mut food: Food) -> u32 {
        let id = food.id;
        food.bucket = self.index.insert_food(id, food.position);
        self.food.insert(id, food);
        id
    }

    /// Spawn one food pellet at a random position.
    pub fn spawn_food(&mut self, config: &FoodConfig) -> u32 {
        let radius = if config.max_radius > config.min_radius {
            self.rng.random_range(config.min_radius..config.max_radius)
        } else {
            config.min_radius
        };
        let position = self.random_position(radius);
        self.spawn_food_at(position, radius)
    }

    /// Spawn one food pellet at a given position.
    pub fn spawn_food_at(&mut self, position: Vec2, radius: f32) -> u32 {
        let id = self.next_id();
        let color = self.random_color();
        self.add_food(Food::new(id, position, radius, color))
    }

    /// Remove a food pellet.
    pub fn remove_food(&mut self, id: u32) -> Option<Food> {
        let food = self.food.remove(&id)?;
        self.index.remove_food(id, food.bucket);
        Some(food)
    }

    /// Remove a cell from the world.
    ///
    /// Removing a top-level cell removes all of its fragments; removing a
    /// fragment unlinks it from its parent.
    pub fn remove_cell(&mut self, id: u32) -> Option<Cell> {
        let cell = self.cells.remove(&id)?;
        self.index.remove_cell(id, cell.bucket);

        match cell.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.cells.get_mut(&parent_id) {
                    parent.fragments.retain(|&f| f != id);
                }
            }
            None => {
                for &fragment_id in &cell.fragments {
                    if let Some(fragment) = self.cells.remove(&fragment_id) {
                        self.index.remove_cell(fragment_id, fragment.bucket);
                    }
                }
            }
        }

        Some(cell)
    }

    /// Reset a top-level cell in place: new position, base mass, no score,
    /// no fragments and no targets.
    pub fn respawn_cell(&mut self, id: u32, base_mass: f32) {
        let fragments = match self.cells.get_mut(&id) {
            Some(cell) if !cell.is_fragment() => std::mem::take(&mut cell.fragments),
            _ => return,
        };
        for fragment_id in fragments {
            self.remove_cell(fragment_id);
        }

        let position = self.random_position(mass_to_radius(base_mass));
        let clock = self.clock;
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.set_mass(base_mass);
            cell.score = 0.0;
            cell.target = None;
            cell.last_move = clock;
            if let Some(brain) = cell.bot.as_mut() {
                brain.reset();
            }
        }
        self.set_position(id, position);
    }

    /// Move a cell and keep its bucket in sync.
    #[inline]
    pub fn set_position(&mut self, id: u32, position: Vec2) {
        if let Some(cell) = self.cells.get_mut(&id) {
            cell.position = position;
            cell.bucket = self.index.relocate_cell(id, cell.bucket, position);
        }
    }

    /// Pull a cell back inside the border after it grew.
    pub fn clamp_cell(&mut self, id: u32) {
        let Some(cell) = self.cells.get(&id) else {
            return;
        };
        let position = Cell::clamp_to_border(cell.position, cell.radius(), self.width, self.height);
        if position != cell.position {
            self.set_position(id, position);
        }
    }

    /// Rebuild the entire spatial index from the entity maps.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for (&id, cell) in self.cells.iter_mut() {
            cell.bucket = self.index.insert_cell(id, cell.position);
        }
        for (&id, food) in self.food.iter_mut() {
            food.bucket = self.index.insert_food(id, food.position);
        }
    }

    /// IDs of cells whose center is within `radius` of `center`.
    pub fn cells_within(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut ids = self.index.cell_candidates(center, radius);
        ids.retain(|id| {
            self.cells
                .get(id)
                .is_some_and(|c| c.position.distance(center) <= radius)
        });
        ids
    }

    /// IDs of food pellets whose center is within `radius` of `center`.
    pub fn food_within(&self, center: Vec2, radius: f32) -> Vec<u32> {
        let mut ids = self.index.food_candidates(center, radius);
        ids.retain(|id| {
            self.food
                .get(id)
                .is_some_and(|f| f.position.distance(center) <= radius)
        });
        ids
    }

    /// Largest radius among live cells.
    pub fn max_cell_radius(&self) -> f32 {
        self.cells.values().map(Cell::radius).fold(0.0, f32::max)
    }

    /// Remove fragments whose parent is gone. Returns how many were removed.
    pub fn prune_orphans(&mut self) -> usize {
        let orphans: Vec<u32> = self
            .cells
            .values()
            .filter(|c| c.parent_id.is_some_and(|p| !self.cells.contains_key(&p)))
            .map(|c| c.id)
            .collect();
        for &id in &orphans {
            self.remove_cell(id);
        }
        orphans.len()
    }
}

/// Uniform coordinate in `[margin, size - margin)`, or the middle if the
/// range is empty.
fn random_axis(rng: &mut StdRng, margin: f32, size: f32) -> f32 {
    if margin * 2.0 >= size {
        size / 2.0
    } else {
        rng.random_range(margin..size - margin)
    }
}
