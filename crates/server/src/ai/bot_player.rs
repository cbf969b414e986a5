use crate::collision::can_eat;
use crate::config::{BotConfig, Config};
use crate::entity::{Behavior, BotBrain};
use crate::world::World;
use glam::Vec2;
use rand::Rng;

/// Bot names to use.
const BOT_NAMES: &[&str] = &[
    "Bot", "Hunter", "Hungry", "Nomnom", "Blob", "Cell", "Eater", "Seeker",
    "Roamer", "Wanderer", "Ghost", "Shadow", "Swift", "Tiny", "Big", "Mega",
];

/// Pick a display name for the bot with the given ID.
pub fn bot_name<R: Rng>(rng: &mut R, id: u32) -> String {
    let name_idx = rng.random_range(0..BOT_NAMES.len());
    format!("{}{}", BOT_NAMES[name_idx], id % 100)
}

/// Update behavior and aggression from the bot's current mass.
pub fn classify(brain: &mut BotBrain, mass: f32, config: &BotConfig) {
    if mass > config.hunter_mass {
        brain.behavior = Behavior::Hunter;
        brain.aggression = (brain.aggression + config.aggression_step).min(1.0);
    } else if mass < config.prey_mass {
        brain.behavior = Behavior::Prey;
    } else {
        brain.behavior = Behavior::Neutral;
    }
}

/// How far a bot with this brain can see.
#[inline]
pub fn vision_range(brain: &BotBrain, config: &BotConfig) -> f32 {
    match brain.behavior {
        Behavior::Hunter => config.hunter_vision,
        _ => config.vision,
    }
}

/// Priority of chasing a cell. Cells the bot cannot eat score zero.
pub fn score_cell(brain: &BotBrain, bot_mass: f32, other_mass: f32, distance: f32, config: &Config) -> f32 {
    if !can_eat(bot_mass, other_mass, config.player.eat_ratio) {
        return 0.0;
    }
    let bots = &config.bots;
    let mut size_bonus = (bot_mass / other_mass) * bots.size_bonus;
    if brain.behavior == Behavior::Hunter {
        size_bonus *= 1.0 + brain.aggression;
    }
    bots.cell_base - distance * bots.distance_penalty + size_bonus
}

/// Priority of chasing a food pellet.
#[inline]
pub fn score_food(radius: f32, distance: f32, config: &BotConfig) -> f32 {
    config.food_base - distance * config.distance_penalty + radius * config.radius_bonus
}

/// Re-evaluate one bot: classify it, scan its vision range and pick a target.
///
/// Returns true if the target changed.
pub fn think(world: &mut World, id: u32, config: &Config) -> bool {
    let (position, mass, radius, lineage, mut brain) = match world.cell(id) {
        Some(cell) => match &cell.bot {
            Some(brain) => (cell.position, cell.mass(), cell.radius(), cell.lineage(), brain.clone()),
            None => return false,
        },
        None => return false,
    };

    classify(&mut brain, mass, &config.bots);
    let vision = vision_range(&brain, &config.bots);
    let now = world.clock();

    let mut best: Option<(f32, Vec2)> = None;
    let mut consider = |score: f32, target: Vec2| {
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, target));
        }
    };

    for other_id in world.cells_within(position, vision) {
        let Some(other) = world.cell(other_id) else {
            continue;
        };
        if other.lineage() == lineage {
            continue;
        }
        let distance = other.position.distance(position);
        consider(score_cell(&brain, mass, other.mass(), distance, config), other.position);
    }

    for food_id in world.food_within(position, vision) {
        let Some(food) = world.food_item(food_id) else {
            continue;
        };
        let distance = food.position.distance(position);
        consider(score_food(food.radius, distance, &config.bots), food.position);
    }

    let changed = match best.filter(|&(score, _)| score >= config.bots.min_priority) {
        Some((_, target)) => {
            brain.target = Some(target);
            brain.last_target_change = now;
            true
        }
        None => {
            let wander = brain.target.is_none_or(|target| {
                now.saturating_sub(brain.last_target_change) >= config.bots.target_timeout_ms
                    || target.distance(position) <= radius
            });
            if wander {
                brain.target = Some(world.random_position(0.0));
                brain.last_target_change = now;
            }
            wander
        }
    };

    if let Some(cell) = world.cell_mut(id) {
        cell.bot = Some(brain);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, Config) {
        let config = Config::default();
        (World::seeded(&config, 11), config)
    }

    fn place_bot(world: &mut World, config: &Config, mass: f32, position: Vec2) -> u32 {
        let id = world.spawn_bot("bot".into(), mass, config.bots.update_interval_ticks);
        world.set_position(id, position);
        id
    }

    fn brain(world: &World, id: u32) -> &BotBrain {
        world.cell(id).unwrap().bot.as_ref().unwrap()
    }

    #[test]
    fn test_classify() {
        let config = BotConfig::default();
        let mut brain = BotBrain::default();

        classify(&mut brain, 150.0, &config);
        assert_eq!(brain.behavior, Behavior::Hunter);
        assert_eq!(brain.aggression, config.aggression_step);

        classify(&mut brain, 30.0, &config);
        assert_eq!(brain.behavior, Behavior::Prey);

        classify(&mut brain, 80.0, &config);
        assert_eq!(brain.behavior, Behavior::Neutral);

        for _ in 0..100 {
            classify(&mut brain, 500.0, &config);
        }
        assert_eq!(brain.aggression, 1.0);
    }

    #[test]
    fn test_vision_range() {
        let config = BotConfig::default();
        let mut brain = BotBrain::default();
        assert_eq!(vision_range(&brain, &config), config.vision);
        brain.behavior = Behavior::Hunter;
        assert_eq!(vision_range(&brain, &config), config.hunter_vision);
    }

    #[test]
    fn test_larger_cells_are_never_chased() {
        let config = Config::default();
        let brain = BotBrain::default();
        assert_eq!(score_cell(&brain, 100.0, 100.0, 10.0, &config), 0.0);
        assert_eq!(score_cell(&brain, 50.0, 300.0, 10.0, &config), 0.0);
        assert!(score_cell(&brain, 200.0, 100.0, 10.0, &config) > config.bots.min_priority);
    }

    #[test]
    fn test_hunter_targets_smaller_player() {
        let (mut world, config) = setup();
        let bot = place_bot(&mut world, &config, 150.0, Vec2::new(1000.0, 1000.0));
        let player = world.spawn_cell_at("p".into(), 100.0, Vec2::new(1300.0, 1000.0), Some(1));

        assert!(think(&mut world, bot, &config));
        let brain = brain(&world, bot);
        assert_eq!(brain.behavior, Behavior::Hunter);
        assert_eq!(brain.target, Some(world.cell(player).unwrap().position));
    }

    #[test]
    fn test_prefers_food_over_nothing() {
        let (mut world, config) = setup();
        let bot = place_bot(&mut world, &config, 30.0, Vec2::new(2000.0, 2000.0));
        world.spawn_food_at(Vec2::new(2050.0, 2000.0), 6.0);

        think(&mut world, bot, &config);
        assert_eq!(brain(&world, bot).target, Some(Vec2::new(2050.0, 2000.0)));
    }

    #[test]
    fn test_wanders_without_candidates() {
        let (mut world, config) = setup();
        let bot = place_bot(&mut world, &config, 60.0, Vec2::new(2500.0, 2500.0));

        assert!(think(&mut world, bot, &config));
        let first = brain(&world, bot).target.unwrap();
        assert!(first.x >= 0.0 && first.x <= world.width);
        assert!(first.y >= 0.0 && first.y <= world.height);

        // A fresh, unreached wander target is kept.
        assert!(!think(&mut world, bot, &config));
        assert_eq!(brain(&world, bot).target, Some(first));

        // Once stale it is replaced.
        world.advance_clock(config.bots.target_timeout_ms);
        assert!(think(&mut world, bot, &config));
    }

    #[test]
    fn test_ignores_own_fragments() {
        let (mut world, config) = setup();
        let bot = place_bot(&mut world, &config, 300.0, Vec2::new(1000.0, 1000.0));
        let fragment_id = world.next_id();
        let mut fragment = crate::entity::Cell::new(
            fragment_id,
            Vec2::new(1100.0, 1000.0),
            30.0,
            protocol::Color::default(),
            "bot".into(),
        );
        fragment.parent_id = Some(bot);
        world.add_cell(fragment);
        world.cell_mut(bot).unwrap().fragments.push(fragment_id);

        think(&mut world, bot, &config);
        assert_ne!(brain(&world, bot).target, Some(Vec2::new(1100.0, 1000.0)));
    }

    #[test]
    fn test_bot_name() {
        let mut rng = rand::rng();
        let name = bot_name(&mut rng, 142);
        assert!(name.ends_with("42"));
    }
}
