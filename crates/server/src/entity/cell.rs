//! Cell type and mass/radius bookkeeping.

use glam::Vec2;
use protocol::Color;

/// Radius per square root of mass.
const RADIUS_FACTOR: f32 = 1.5;

/// Radius of a cell with the given mass.
///
/// This is the only place the radius is derived; every mass change goes
/// through [`Cell::set_mass`].
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    RADIUS_FACTOR * mass.max(0.0).sqrt()
}

/// Bot behavior tag, derived from the bot's current mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    Hunter,
    Prey,
    #[default]
    Neutral,
}

/// Decision state carried by bot cells.
#[derive(Debug, Clone, Default)]
pub struct BotBrain {
    pub behavior: Behavior,
    /// In `[0, 1]`; grows while the bot is a hunter.
    pub aggression: f32,
    /// Current movement target.
    pub target: Option<Vec2>,
    /// World time (ms) of the last target change.
    pub last_target_change: u64,
    /// The bot re-evaluates on ticks where `tick % interval == phase`.
    pub phase: u64,
}

impl BotBrain {
    /// Brain for a bot with the given cell ID.
    pub fn new(id: u32, update_interval: u64) -> Self {
        Self {
            phase: id as u64 % update_interval.max(1),
            ..Self::default()
        }
    }

    /// Forget everything but the phase (used on respawn).
    pub fn reset(&mut self) {
        *self = Self {
            phase: self.phase,
            ..Self::default()
        };
    }
}

/// A controllable mass unit: a player body, a split fragment or a bot.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Unique ID.
    pub id: u32,
    /// Position in world coordinates.
    pub position: Vec2,
    mass: f32,
    radius: f32,
    pub color: Color,
    pub name: String,
    /// Session that controls this cell (None for bots).
    pub connection: Option<u32>,
    /// Top-level cell this fragment was split from.
    pub parent_id: Option<u32>,
    /// Fragments split from this cell (top-level cells only).
    pub fragments: Vec<u32>,
    /// Fragment position relative to its parent at split time.
    pub offset: Vec2,
    /// Last cursor target received for this cell.
    pub target: Option<Vec2>,
    pub bot: Option<BotBrain>,
    pub score: f32,
    /// World time (ms) of the last movement step.
    pub last_move: u64,
    /// Spatial bucket the cell is currently filed under.
    pub bucket: usize,
}

impl Cell {
    /// Create a new top-level cell.
    pub fn new(id: u32, position: Vec2, mass: f32, color: Color, name: String) -> Self {
        Self {
            id,
            position,
            mass,
            radius: mass_to_radius(mass),
            color,
            name,
            connection: None,
            parent_id: None,
            fragments: Vec::new(),
            offset: Vec2::ZERO,
            target: None,
            bot: None,
            score: 0.0,
            last_move: 0,
            bucket: 0,
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Set the mass and update the radius.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.radius = mass_to_radius(self.mass);
    }

    /// Called when this cell absorbs mass (food, prey or a merging fragment).
    #[inline]
    pub fn gain(&mut self, mass: f32, score: f32) {
        self.set_mass(self.mass + mass);
        self.score += score;
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }

    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.parent_id.is_some()
    }

    /// ID of the top-level cell this cell belongs to.
    #[inline]
    pub fn lineage(&self) -> u32 {
        self.parent_id.unwrap_or(self.id)
    }

    /// Clamp a position so a circle of `radius` stays inside the world.
    #[inline]
    pub fn clamp_to_border(position: Vec2, radius: f32, width: f32, height: f32) -> Vec2 {
        Vec2::new(clamp_axis(position.x, radius, width), clamp_axis(position.y, radius, height))
    }
}

/// Keep `[radius, size - radius]`; a cell wider than the world sits in the middle.
#[inline]
fn clamp_axis(value: f32, radius: f32, size: f32) -> f32 {
    if radius * 2.0 >= size {
        size / 2.0
    } else {
        value.clamp(radius, size - radius)
    }
}
