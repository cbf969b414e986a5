//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub collision: CollisionConfig,
    #[serde(default)]
    pub bots: BotConfig,
}

/// A configuration value that would break the simulation.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("broadcast interval ({broadcast}ms) must be longer than the tick interval ({tick}ms)")]
    BroadcastTooFast { tick: u64, broadcast: u64 },
    #[error("eat ratio must be greater than 1.0, got {0}")]
    EatRatio(f32),
    #[error("merge factor must be below 2.0, got {0}")]
    MergeFactor(f32),
    #[error("food radius range is inverted ({min} > {max})")]
    FoodRadius { min: f32, max: f32 },
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the values the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.border.width <= 0.0 {
            return Err(ConfigError::NotPositive("border.width"));
        }
        if self.border.height <= 0.0 {
            return Err(ConfigError::NotPositive("border.height"));
        }
        if self.spatial.bucket_size <= 0.0 {
            return Err(ConfigError::NotPositive("spatial.bucket_size"));
        }
        if self.server.tick_interval_ms == 0 {
            return Err(ConfigError::NotPositive("server.tick_interval_ms"));
        }
        if self.collision.resolve_every_ticks == 0 {
            return Err(ConfigError::NotPositive("collision.resolve_every_ticks"));
        }
        if self.bots.update_interval_ticks == 0 {
            return Err(ConfigError::NotPositive("bots.update_interval_ticks"));
        }
        if self.player.base_mass <= 0.0 {
            return Err(ConfigError::NotPositive("player.base_mass"));
        }
        if self.bots.base_mass <= 0.0 {
            return Err(ConfigError::NotPositive("bots.base_mass"));
        }
        if self.server.broadcast_interval_ms <= self.server.tick_interval_ms {
            return Err(ConfigError::BroadcastTooFast {
                tick: self.server.tick_interval_ms,
                broadcast: self.server.broadcast_interval_ms,
            });
        }
        if self.player.eat_ratio <= 1.0 {
            return Err(ConfigError::EatRatio(self.player.eat_ratio));
        }
        if self.player.merge_factor >= 2.0 {
            return Err(ConfigError::MergeFactor(self.player.merge_factor));
        }
        if self.food.min_radius > self.food.max_radius {
            return Err(ConfigError::FoodRadius {
                min: self.food.min_radius,
                max: self.food.max_radius,
            });
        }
        Ok(())
    }
}

/// Server networking and loop cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Simulation tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Snapshot broadcast interval in milliseconds.
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ms: u64,
    /// Hard cap on joined players.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_max_nick_length")]
    pub max_nick_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            tick_interval_ms: default_tick_interval(),
            broadcast_interval_ms: default_broadcast_interval(),
            max_players: default_max_players(),
            max_nick_length: default_max_nick_length(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_tick_interval() -> u64 {
    16
}
fn default_broadcast_interval() -> u64 {
    50
}
fn default_max_players() -> usize {
    100
}
fn default_max_nick_length() -> usize {
    24
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f32,
    #[serde(default = "default_border_size")]
    pub height: f32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f32 {
    5000.0
}

/// Player cell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_base_mass")]
    pub base_mass: f32,
    #[serde(default = "default_min_split_mass")]
    pub min_split_mass: f32,
    #[serde(default = "default_max_fragments")]
    pub max_fragments: usize,
    /// A cell must exceed the other's mass by this factor to eat it.
    #[serde(default = "default_eat_ratio")]
    pub eat_ratio: f32,
    /// Share of the prey's mass gained by the eater.
    #[serde(default = "default_eat_mass_gain")]
    pub eat_mass_gain: f32,
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    #[serde(default = "default_speed_divisor")]
    pub speed_divisor: f32,
    /// Targets closer than this are considered reached.
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,
    /// Fragments merge when closer than `parent.radius * merge_factor`.
    #[serde(default = "default_merge_factor")]
    pub merge_factor: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_mass: default_base_mass(),
            min_split_mass: default_min_split_mass(),
            max_fragments: default_max_fragments(),
            eat_ratio: default_eat_ratio(),
            eat_mass_gain: default_eat_mass_gain(),
            base_speed: default_base_speed(),
            min_speed: default_min_speed(),
            speed_divisor: default_speed_divisor(),
            dead_zone: default_dead_zone(),
            merge_factor: default_merge_factor(),
        }
    }
}

fn default_base_mass() -> f32 {
    20.0
}
fn default_min_split_mass() -> f32 {
    50.0
}
fn default_max_fragments() -> usize {
    15
}
fn default_eat_ratio() -> f32 {
    1.15
}
fn default_eat_mass_gain() -> f32 {
    0.8
}
fn default_base_speed() -> f32 {
    6.0
}
fn default_min_speed() -> f32 {
    1.5
}
fn default_speed_divisor() -> f32 {
    100.0
}
fn default_dead_zone() -> f32 {
    2.0
}
fn default_merge_factor() -> f32 {
    1.0
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Constant food population.
    #[serde(default = "default_food_count")]
    pub count: usize,
    #[serde(default = "default_food_min_radius")]
    pub min_radius: f32,
    #[serde(default = "default_food_max_radius")]
    pub max_radius: f32,
    /// Mass gained per unit of food radius.
    #[serde(default = "default_food_mass_gain")]
    pub mass_gain: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            count: default_food_count(),
            min_radius: default_food_min_radius(),
            max_radius: default_food_max_radius(),
            mass_gain: default_food_mass_gain(),
        }
    }
}

fn default_food_count() -> usize {
    600
}
fn default_food_min_radius() -> f32 {
    4.0
}
fn default_food_max_radius() -> f32 {
    8.0
}
fn default_food_mass_gain() -> f32 {
    1.0
}

/// Spatial index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpatialConfig {
    /// Side length of a grid bucket.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            bucket_size: default_bucket_size(),
        }
    }
}

fn default_bucket_size() -> f32 {
    200.0
}

/// Collision resolver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollisionConfig {
    /// Run the resolver every N ticks.
    #[serde(default = "default_resolve_every")]
    pub resolve_every_ticks: u64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            resolve_every_ticks: default_resolve_every(),
        }
    }
}

fn default_resolve_every() -> u64 {
    1
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Number of bots spawned at startup.
    #[serde(default = "default_bot_count")]
    pub count: usize,
    #[serde(default = "default_base_mass")]
    pub base_mass: f32,
    /// Bots re-evaluate their target once every N ticks, staggered by phase.
    #[serde(default = "default_update_interval")]
    pub update_interval_ticks: u64,
    #[serde(default = "default_hunter_mass")]
    pub hunter_mass: f32,
    #[serde(default = "default_prey_mass")]
    pub prey_mass: f32,
    #[serde(default = "default_vision")]
    pub vision: f32,
    #[serde(default = "default_hunter_vision")]
    pub hunter_vision: f32,
    #[serde(default = "default_aggression_step")]
    pub aggression_step: f32,
    #[serde(default = "default_bot_speed_factor")]
    pub speed_factor: f32,
    #[serde(default = "default_target_timeout")]
    pub target_timeout_ms: u64,
    #[serde(default = "default_min_priority")]
    pub min_priority: f32,
    #[serde(default = "default_cell_base")]
    pub cell_base: f32,
    #[serde(default = "default_food_base")]
    pub food_base: f32,
    #[serde(default = "default_distance_penalty")]
    pub distance_penalty: f32,
    #[serde(default = "default_size_bonus")]
    pub size_bonus: f32,
    #[serde(default = "default_radius_bonus")]
    pub radius_bonus: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: default_bot_count(),
            base_mass: default_base_mass(),
            update_interval_ticks: default_update_interval(),
            hunter_mass: default_hunter_mass(),
            prey_mass: default_prey_mass(),
            vision: default_vision(),
            hunter_vision: default_hunter_vision(),
            aggression_step: default_aggression_step(),
            speed_factor: default_bot_speed_factor(),
            target_timeout_ms: default_target_timeout(),
            min_priority: default_min_priority(),
            cell_base: default_cell_base(),
            food_base: default_food_base(),
            distance_penalty: default_distance_penalty(),
            size_bonus: default_size_bonus(),
            radius_bonus: default_radius_bonus(),
        }
    }
}

fn default_bot_count() -> usize {
    12
}
fn default_update_interval() -> u64 {
    6
}
fn default_hunter_mass() -> f32 {
    120.0
}
fn default_prey_mass() -> f32 {
    40.0
}
fn default_vision() -> f32 {
    400.0
}
fn default_hunter_vision() -> f32 {
    600.0
}
fn default_aggression_step() -> f32 {
    0.05
}
fn default_bot_speed_factor() -> f32 {
    0.9
}
fn default_target_timeout() -> u64 {
    5000
}
fn default_min_priority() -> f32 {
    5.0
}
fn default_cell_base() -> f32 {
    50.0
}
fn default_food_base() -> f32 {
    20.0
}
fn default_distance_penalty() -> f32 {
    0.05
}
fn default_size_bonus() -> f32 {
    10.0
}
fn default_radius_bonus() -> f32 {
    1.0
}
