//! Collision detection and resolution.
//!
//! This module handles:
//! - Food consumption (with one respawn per pellet eaten)
//! - Eating logic (when one cell consumes another)
//! - Death records for eaten player cells

use crate::config::Config;
use crate::world::World;
use fixedbitset::FixedBitSet;
use glam::Vec2;
use std::collections::HashSet;
use tracing::debug;

/// A player cell that was eaten and reset during a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Death {
    /// Session that owned the eaten cell.
    pub connection: u32,
    pub player_id: u32,
    pub eaten_by: u32,
    pub final_mass: f32,
    pub final_score: f32,
}

/// Whether two circles overlap (sum of radii).
#[inline]
pub fn overlaps(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    a.distance(b) < a_radius + b_radius
}

/// Whether a cell of `predator` mass may eat one of `prey` mass.
#[inline]
pub fn can_eat(predator: f32, prey: f32, eat_ratio: f32) -> bool {
    predator > prey * eat_ratio
}

/// Cells eaten or reset during one pass.
///
/// Bits are indexed by position in the sorted live ID list, so the set is
/// sized by the live cell count rather than by the ID counter.
struct Removed {
    ids: Vec<u32>,
    bits: FixedBitSet,
}

impl Removed {
    fn new(ids: Vec<u32>) -> Self {
        let bits = FixedBitSet::with_capacity(ids.len());
        Self { ids, bits }
    }

    #[inline]
    fn mark(&mut self, id: u32) {
        if let Ok(idx) = self.ids.binary_search(&id) {
            self.bits.insert(idx);
        }
    }

    #[inline]
    fn contains(&self, id: u32) -> bool {
        self.ids
            .binary_search(&id)
            .is_ok_and(|idx| self.bits.contains(idx))
    }
}

/// Run one resolution pass over every live cell.
///
/// Returns a death record for every eaten top-level cell owned by a session.
pub fn resolve(world: &mut World, config: &Config) -> Vec<Death> {
    let eat_ratio = config.player.eat_ratio;
    let mut deaths = Vec::new();
    let ids = world.cell_ids();
    let mut gone = Removed::new(ids.clone());
    let mut processed: HashSet<(u32, u32)> = HashSet::new();
    let mut max_radius = world.max_cell_radius();

    for cell_id in ids {
        if gone.contains(cell_id) || !world.is_live(cell_id) {
            continue;
        }

        eat_food(world, cell_id, config);

        let (position, radius, lineage) = match world.cell(cell_id) {
            Some(cell) => (cell.position, cell.radius(), cell.lineage()),
            None => continue,
        };
        max_radius = max_radius.max(radius);

        let nearby = world.cells_within(position, radius + max_radius);
        for check_id in nearby {
            if check_id == cell_id || gone.contains(check_id) {
                continue;
            }
            let pair = (cell_id.min(check_id), cell_id.max(check_id));
            if !processed.insert(pair) {
                continue;
            }

            let (Some(cell), Some(check)) = (world.cell(cell_id), world.cell(check_id)) else {
                continue;
            };
            if check.lineage() == lineage {
                continue;
            }
            if !overlaps(cell.position, cell.radius(), check.position, check.radius()) {
                continue;
            }

            let (cell_mass, check_mass) = (cell.mass(), check.mass());
            if can_eat(cell_mass, check_mass, eat_ratio) {
                deaths.extend(consume(world, cell_id, check_id, config, &mut gone));
                if let Some(cell) = world.cell(cell_id) {
                    max_radius = max_radius.max(cell.radius());
                }
            } else if can_eat(check_mass, cell_mass, eat_ratio) {
                deaths.extend(consume(world, check_id, cell_id, config, &mut gone));
                if let Some(check) = world.cell(check_id) {
                    max_radius = max_radius.max(check.radius());
                }
                break;
            }
        }
    }

    deaths
}

/// Eat every pellet whose center lies inside the cell.
fn eat_food(world: &mut World, cell_id: u32, config: &Config) -> usize {
    let (position, radius) = match world.cell(cell_id) {
        Some(cell) => (cell.position, cell.radius()),
        None => return 0,
    };

    let mut eaten = 0;
    for food_id in world.food_within(position, radius) {
        let inside = world
            .food_item(food_id)
            .is_some_and(|f| f.position.distance(position) < radius);
        if !inside {
            continue;
        }
        let Some(food) = world.remove_food(food_id) else {
            continue;
        };
        if let Some(cell) = world.cell_mut(cell_id) {
            cell.gain(food.radius * config.food.mass_gain, 1.0);
        }
        world.spawn_food(&config.food);
        eaten += 1;
    }
    if eaten > 0 {
        world.clamp_cell(cell_id);
    }
    eaten
}

/// `eater_id` eats `prey_id`. Fragments are removed; top-level cells are
/// reset in place along with their fragments.
fn consume(
    world: &mut World,
    eater_id: u32,
    prey_id: u32,
    config: &Config,
    gone: &mut Removed,
) -> Option<Death> {
    let prey = world.cell(prey_id)?;
    let (prey_mass, prey_score) = (prey.mass(), prey.score);
    let is_fragment = prey.is_fragment();
    let is_bot = prey.is_bot();
    let connection = prey.connection;
    let fragments = prey.fragments.clone();

    let gain = prey_mass * config.player.eat_mass_gain;
    world.cell_mut(eater_id)?.gain(gain, gain);
    world.clamp_cell(eater_id);
    gone.mark(prey_id);

    if is_fragment {
        debug!("Cell {} ate fragment {} ({:.1} mass)", eater_id, prey_id, prey_mass);
        world.remove_cell(prey_id);
        return None;
    }

    for fragment_id in fragments {
        gone.mark(fragment_id);
    }
    let base_mass = if is_bot {
        config.bots.base_mass
    } else {
        config.player.base_mass
    };
    world.respawn_cell(prey_id, base_mass);
    debug!("Cell {} ate cell {} ({:.1} mass)", eater_id, prey_id, prey_mass);

    connection.map(|connection| Death {
        connection,
        player_id: prey_id,
        eaten_by: eater_id,
        final_mass: prey_mass,
        final_score: prey_score,
    })
}
