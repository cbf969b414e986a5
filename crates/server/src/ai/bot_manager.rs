use super::bot_player::{bot_name, think};
use crate::config::Config;
use crate::world::World;
use tracing::info;

/// Spawn the configured number of bots. Returns their cell IDs.
pub fn spawn_bots(world: &mut World, config: &Config) -> Vec<u32> {
    let bots = &config.bots;
    info!("Spawning {} bots", bots.count);

    let mut ids = Vec::with_capacity(bots.count);
    for _ in 0..bots.count {
        let id = world.spawn_bot(String::new(), bots.base_mass, bots.update_interval_ticks);
        let name = bot_name(world.rng(), id);
        if let Some(cell) = world.cell_mut(id) {
            cell.name = name;
        }
        ids.push(id);
    }
    ids
}

/// Run the bots whose phase matches this tick. Returns how many re-evaluated.
pub fn update_bots(world: &mut World, config: &Config, tick: u64) -> usize {
    let interval = config.bots.update_interval_ticks.max(1);
    let due: Vec<u32> = world
        .cells()
        .filter(|c| c.bot.as_ref().is_some_and(|b| tick % interval == b.phase))
        .map(|c| c.id)
        .collect();

    for &id in &due {
        think(world, id, config);
    }
    due.len()
}
