//! Splitting and merging.

use crate::config::Config;
use crate::entity::{mass_to_radius, Cell};
use crate::world::World;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::debug;

/// Split a top-level cell in two. Returns the new fragment's ID.
///
/// Does nothing if the cell is a fragment, is below the minimum split mass
/// or already has the maximum number of fragments.
pub fn split(world: &mut World, config: &Config, owner_id: u32) -> Option<u32> {
    let player = &config.player;
    let owner = world.cell(owner_id)?;
    if owner.is_fragment()
        || owner.mass() < player.min_split_mass
        || owner.fragments.len() >= player.max_fragments
    {
        return None;
    }

    let mass = owner.mass() / 2.0;
    let origin = owner.position;
    let color = owner.color;
    let name = owner.name.clone();
    let connection = owner.connection;

    let radius = mass_to_radius(mass);
    let distance = radius * 2.0;
    let angle = world.rng().random_range(0.0..TAU);
    let mut direction = Vec2::from_angle(angle);

    // Mirror away from the border so the full distance fits.
    let landing = origin + direction * distance;
    if landing.x < radius || landing.x > world.width - radius {
        direction.x = -direction.x;
    }
    if landing.y < radius || landing.y > world.height - radius {
        direction.y = -direction.y;
    }
    let position = Cell::clamp_to_border(origin + direction * distance, radius, world.width, world.height);

    if let Some(owner) = world.cell_mut(owner_id) {
        owner.set_mass(mass);
    }

    let id = world.next_id();
    let mut fragment = Cell::new(id, position, mass, color, name);
    fragment.parent_id = Some(owner_id);
    fragment.connection = connection;
    fragment.offset = position - origin;
    fragment.last_move = world.clock();
    world.add_cell(fragment);
    if let Some(owner) = world.cell_mut(owner_id) {
        owner.fragments.push(id);
    }

    debug!("Cell {} split off fragment {} ({:.1} mass each)", owner_id, id, mass);
    Some(id)
}

/// Absorb fragments that came close enough to their parent or a sibling.
///
/// Returns the number of fragments merged.
pub fn check_merge(world: &mut World, config: &Config) -> usize {
    let factor = config.player.merge_factor;
    let mut merged = 0;

    for id in world.cell_ids() {
        let Some(fragment) = world.cell(id) else {
            continue;
        };
        let Some(parent_id) = fragment.parent_id else {
            continue;
        };
        let Some(parent) = world.cell(parent_id) else {
            continue;
        };

        let position = fragment.position;
        let threshold = parent.radius() * factor;
        let into = if parent.position.distance(position) < threshold {
            Some(parent_id)
        } else {
            parent.fragments.iter().copied().find(|&sibling| {
                sibling != id
                    && world
                        .cell(sibling)
                        .is_some_and(|s| s.position.distance(position) < threshold)
            })
        };
        let Some(into) = into else {
            continue;
        };

        let Some(fragment) = world.remove_cell(id) else {
            continue;
        };
        if let Some(target) = world.cell_mut(into) {
            target.gain(fragment.mass(), fragment.score);
        }
        world.clamp_cell(into);
        debug!("Fragment {} merged into {}", id, into);
        merged += 1;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (World, Config) {
        let config = Config::default();
        (World::seeded(&config, 21), config)
    }

    #[test]
    fn test_split_halves_mass() {
        let (mut world, config) = setup();
        let owner = world.spawn_cell_at("a".into(), 100.0, Vec2::new(1000.0, 1000.0), Some(4));
        let fragment = split(&mut world, &config, owner).unwrap();

        let parent = world.cell(owner).unwrap();
        let child = world.cell(fragment).unwrap();
        assert_eq!(parent.mass(), 50.0);
        assert_eq!(child.mass(), 50.0);
        assert_eq!(parent.radius(), mass_to_radius(50.0));
        assert_eq!(child.parent_id, Some(owner));
        assert_eq!(child.connection, Some(4));
        assert_eq!(child.color, parent.color);
        assert_eq!(child.name, parent.name);
        assert_eq!(child.score, 0.0);
        assert_eq!(parent.fragments, vec![fragment]);
        assert!((parent.position.distance(child.position) - 2.0 * mass_to_radius(50.0)).abs() < 1e-3);
        assert_eq!(child.offset, child.position - parent.position);
        assert!(world.index().contains_cell(fragment));
    }

    #[test]
    fn test_split_mass_sixty() {
        for seed in 0..50 {
            let config = Config::default();
            let mut world = World::seeded(&config, seed);
            let owner = world.spawn_cell_at("a".into(), 60.0, Vec2::new(2500.0, 2500.0), Some(1));
            let fragment = split(&mut world, &config, owner).unwrap();

            let parent = world.cell(owner).unwrap();
            let child = world.cell(fragment).unwrap();
            assert_eq!(parent.mass(), 30.0);
            assert_eq!(child.mass(), 30.0);
            assert_eq!(child.parent_id, Some(owner));
            assert!(parent.position.distance(child.position) >= 2.0 * mass_to_radius(30.0) - 1e-3);
        }
    }

    #[test]
    fn test_fresh_fragment_does_not_merge() {
        let (mut world, config) = setup();
        let owner = world.spawn_cell_at("a".into(), 100.0, Vec2::new(1000.0, 1000.0), Some(4));
        let fragment = split(&mut world, &config, owner).unwrap();

        assert_eq!(check_merge(&mut world, &config), 0);
        assert!(world.is_live(fragment));
    }

    #[test]
    fn test_split_rejected() {
        let (mut world, mut config) = setup();
        let small = world.spawn_cell_at("s".into(), 40.0, Vec2::new(500.0, 500.0), Some(1));
        assert_eq!(split(&mut world, &config, small), None);
        assert_eq!(world.cell(small).unwrap().mass(), 40.0);

        config.player.max_fragments = 2;
        let big = world.spawn_cell_at("b".into(), 1000.0, Vec2::new(2500.0, 2500.0), Some(2));
        let first = split(&mut world, &config, big).unwrap();
        assert!(split(&mut world, &config, big).is_some());
        assert_eq!(split(&mut world, &config, big), None);
        assert_eq!(world.cell(big).unwrap().mass(), 250.0);

        // Fragments cannot split themselves.
        assert_eq!(split(&mut world, &config, first), None);
        assert_eq!(split(&mut world, &config, 9999), None);
    }

    #[test]
    fn test_split_near_border_stays_inside() {
        let (mut world, config) = setup();
        for i in 0..20 {
            let owner = world.spawn_cell_at(format!("c{i}"), 200.0, Vec2::new(0.0, 0.0), Some(i));
            let fragment = split(&mut world, &config, owner).unwrap();
            let parent = world.cell(owner).unwrap();
            let child = world.cell(fragment).unwrap();
            assert!(child.position.x >= child.radius() && child.position.y >= child.radius());
            assert!((parent.position.distance(child.position) - 2.0 * child.radius()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_merge_into_parent() {
        let (mut world, config) = setup();
        let owner = world.spawn_cell_at("a".into(), 100.0, Vec2::new(1000.0, 1000.0), Some(4));
        let fragment = split(&mut world, &config, owner).unwrap();
        world.cell_mut(fragment).unwrap().score = 7.0;
        world.set_position(fragment, Vec2::new(1002.0, 1000.0));

        assert_eq!(check_merge(&mut world, &config), 1);
        let parent = world.cell(owner).unwrap();
        assert_eq!(parent.mass(), 100.0);
        assert_eq!(parent.score, 7.0);
        assert!(parent.fragments.is_empty());
        assert!(!world.is_live(fragment));
        assert!(!world.index().contains_cell(fragment));
    }

    #[test]
    fn test_merge_into_sibling() {
        let (mut world, config) = setup();
        let owner = world.spawn_cell_at("a".into(), 400.0, Vec2::new(1000.0, 1000.0), Some(4));
        let f1 = split(&mut world, &config, owner).unwrap();
        let f2 = split(&mut world, &config, owner).unwrap();
        world.set_position(f1, Vec2::new(2000.0, 2000.0));
        world.set_position(f2, Vec2::new(2003.0, 2000.0));

        assert_eq!(check_merge(&mut world, &config), 1);
        assert!(!world.is_live(f1));
        assert_eq!(world.cell(f2).unwrap().mass(), 300.0);
        assert_eq!(world.cell(owner).unwrap().fragments, vec![f2]);
    }
}
