//! Movement integration.
//!
//! Advances every cell one step toward its target: human cells toward the
//! last cursor position, fragments toward the same point shifted by their
//! formation offset, bots toward the target picked by the bot controller.

use crate::config::Config;
use crate::entity::Cell;
use crate::world::World;
use glam::Vec2;

/// Per-tick speed for a cell of the given mass. Larger cells move slower.
#[inline]
pub fn speed_for_mass(mass: f32, config: &Config) -> f32 {
    let player = &config.player;
    (player.base_speed - mass / player.speed_divisor).max(player.min_speed)
}

/// Position after one step from `from` toward `target`.
///
/// Returns `None` when the target is inside the dead zone.
#[inline]
pub fn step_toward(from: Vec2, target: Vec2, speed: f32, dead_zone: f32) -> Option<Vec2> {
    let delta = target - from;
    let dist = delta.length();
    if dist <= dead_zone {
        return None;
    }
    Some(from + delta / dist * dist.min(speed))
}

/// Where a cell wants to go this tick, and its speed multiplier.
fn desired_target(world: &World, cell: &Cell, config: &Config) -> Option<(Vec2, f32)> {
    if let Some(brain) = &cell.bot {
        return brain.target.map(|t| (t, config.bots.speed_factor));
    }
    match cell.parent_id {
        Some(parent_id) => {
            let parent = world.cell(parent_id)?;
            let owner_target = match &parent.bot {
                Some(brain) => brain.target?,
                None => parent.target?,
            };
            Some((owner_target + cell.offset, 1.0))
        }
        None => cell.target.map(|t| (t, 1.0)),
    }
}

/// Move every cell one step. Returns the number of cells that moved.
pub fn integrate(world: &mut World, config: &Config) -> usize {
    let dead_zone = config.player.dead_zone;
    let (width, height) = (world.width, world.height);

    let mut steps: Vec<(u32, Vec2)> = Vec::with_capacity(world.cell_count());
    for cell in world.cells() {
        let Some((target, factor)) = desired_target(world, cell, config) else {
            continue;
        };
        let speed = speed_for_mass(cell.mass(), config) * factor;
        if let Some(next) = step_toward(cell.position, target, speed, dead_zone) {
            steps.push((cell.id, Cell::clamp_to_border(next, cell.radius(), width, height)));
        }
    }

    let now = world.clock();
    for &(id, position) in &steps {
        world.set_position(id, position);
        if let Some(cell) = world.cell_mut(id) {
            cell.last_move = now;
        }
    }
    steps.len()
}
