//! Bot controller.

mod bot_manager;
mod bot_player;

pub use bot_manager::{spawn_bots, update_bots};
pub use bot_player::{classify, score_cell, score_food, think, vision_range};
