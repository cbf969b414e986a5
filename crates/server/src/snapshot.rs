//! World snapshots for broadcasting.

use crate::entity::{Cell, Food};
use crate::world::World;
use protocol::{CellView, FoodView, ServerMessage};
use std::time::Instant;

/// Round to one decimal place.
#[inline]
pub fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

pub fn cell_view(cell: &Cell) -> CellView {
    CellView {
        id: cell.id,
        x: round1(cell.position.x),
        y: round1(cell.position.y),
        radius: round1(cell.radius()),
        mass: cell.mass().round(),
        color: cell.color,
        name: cell.name.clone(),
        is_bot: cell.is_bot(),
        parent_id: cell.parent_id,
        score: cell.score.round(),
    }
}

pub fn food_view(food: &Food) -> FoodView {
    FoodView {
        id: food.id,
        x: round1(food.position.x),
        y: round1(food.position.y),
        radius: round1(food.radius),
        color: food.color,
    }
}

/// Project every live cell and food pellet into a `gameUpdate` event.
pub fn build(world: &World, timestamp: u64, total_players: usize) -> ServerMessage {
    let mut players: Vec<CellView> = world.cells().map(cell_view).collect();
    players.sort_unstable_by_key(|c| c.id);
    let mut food: Vec<FoodView> = world.food().map(food_view).collect();
    food.sort_unstable_by_key(|f| f.id);

    ServerMessage::GameUpdate {
        timestamp,
        players,
        food,
        total_players,
    }
}

/// Millisecond timestamps since server start that never repeat.
#[derive(Debug)]
pub struct SnapshotClock {
    start: Instant,
    last: Option<u64>,
}

impl SnapshotClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: None,
        }
    }

    /// Next timestamp, strictly greater than the previous one.
    pub fn next(&mut self) -> u64 {
        let elapsed = self.start.elapsed().as_millis() as u64;
        let timestamp = match self.last {
            Some(last) => elapsed.max(last + 1),
            None => elapsed,
        };
        self.last = Some(timestamp);
        timestamp
    }
}

impl Default for SnapshotClock {
    fn default() -> Self {
        Self::new()
    }
}
