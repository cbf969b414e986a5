//! Game state and main loop.

use crate::ai;
use crate::collision::{self, Death};
use crate::config::Config;
use crate::movement;
use crate::snapshot::{self, SnapshotClock};
use crate::split;
use crate::world::World;
use glam::Vec2;
use protocol::ServerMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::session::{sanitize_name, Session};
use super::{Command, Inbound, Outbound};

/// Main game state. Owned by the game loop task.
pub struct GameState {
    pub config: Config,
    pub tick_count: u64,

    // Connected sessions
    pub sessions: HashMap<u32, Session>,

    // Game world (entities)
    pub world: World,

    // Snapshot broadcast channel (pre-encoded JSON)
    snapshot_tx: broadcast::Sender<Arc<str>>,
    snapshot_clock: SnapshotClock,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,
}

impl GameState {
    /// Create a new game state with an empty world.
    pub fn new(config: Config, snapshot_tx: broadcast::Sender<Arc<str>>) -> Self {
        let world = World::new(&config);
        Self::with_world(config, world, snapshot_tx)
    }

    /// Create a game state around an existing world.
    pub fn with_world(config: Config, world: World, snapshot_tx: broadcast::Sender<Arc<str>>) -> Self {
        Self {
            config,
            tick_count: 0,
            sessions: HashMap::new(),
            world,
            snapshot_tx,
            snapshot_clock: SnapshotClock::new(),
            update_time_avg: 0.0,
        }
    }

    /// Fill the world with food and bots.
    pub fn init_world(&mut self) {
        for _ in 0..self.config.food.count {
            self.world.spawn_food(&self.config.food);
        }
        info!(
            "World initialized: {}x{}, {} food",
            self.world.width,
            self.world.height,
            self.world.food_count()
        );
        ai::spawn_bots(&mut self.world, &self.config);
    }

    /// Number of sessions that have joined the game.
    pub fn joined_players(&self) -> usize {
        self.sessions.values().filter(|s| s.is_playing()).count()
    }

    /// Apply one gateway event.
    pub fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Connected { session, addr, outbox } => self.add_session(session, addr, outbox),
            Inbound::Command { session, command } => match command {
                Command::Join { name } => self.handle_join(session, &name),
                Command::Move { x, y } => self.handle_move(session, x, y),
                Command::Split => self.handle_split(session),
                Command::Disconnect => self.remove_session(session),
            },
        }
    }

    fn add_session(&mut self, id: u32, addr: SocketAddr, outbox: mpsc::UnboundedSender<Outbound>) {
        self.sessions.insert(id, Session::new(id, addr, outbox));
        info!("Session {} connected from {}", id, addr);
    }

    /// Remove a session and every cell it controls.
    pub fn remove_session(&mut self, id: u32) {
        if let Some(session) = self.sessions.remove(&id) {
            info!("Session {} ({}) disconnected", id, session.addr);
            if let Some(cell_id) = session.cell {
                self.world.remove_cell(cell_id);
            }
        }
    }

    fn handle_join(&mut self, id: u32, name: &str) {
        let joined = self.joined_players();
        let max_players = self.config.server.max_players;

        let Some(session) = self.sessions.get(&id) else {
            debug!("Join from unknown session {}", id);
            return;
        };
        if session.is_playing() {
            debug!("Session {} is already playing, ignoring join", id);
            return;
        }
        if joined >= max_players {
            info!("Session {} rejected: server full ({} players)", id, max_players);
            session.send(ServerMessage::ServerFull { max_players });
            session.close();
            return;
        }

        let name = sanitize_name(name, self.config.server.max_nick_length);
        let cell_id = self.world.spawn_cell(name.clone(), self.config.player.base_mass, Some(id));
        let Some(cell) = self.world.cell(cell_id) else {
            return;
        };
        let init = ServerMessage::Init {
            cell: snapshot::cell_view(cell),
            world_width: self.world.width,
            world_height: self.world.height,
        };

        if let Some(session) = self.sessions.get_mut(&id) {
            session.cell = Some(cell_id);
            session.name = Some(name.clone());
            session.send(init);
        }
        info!("Session {} joined as '{}' (cell {})", id, name, cell_id);
    }

    fn handle_move(&mut self, id: u32, x: f32, y: f32) {
        let Some(cell_id) = self.sessions.get(&id).and_then(|s| s.cell) else {
            debug!("Move from session {} without a cell", id);
            return;
        };
        let target = Vec2::new(x.clamp(0.0, self.world.width), y.clamp(0.0, self.world.height));
        if let Some(cell) = self.world.cell_mut(cell_id) {
            cell.target = Some(target);
        }
    }

    fn handle_split(&mut self, id: u32) {
        let Some(cell_id) = self.sessions.get(&id).and_then(|s| s.cell) else {
            debug!("Split from session {} without a cell", id);
            return;
        };
        if split::split(&mut self.world, &self.config, cell_id).is_none() {
            debug!("Split rejected for session {}", id);
        }
    }

    /// Run one simulation step. Returns the deaths that happened in it.
    pub fn tick(&mut self) -> Vec<Death> {
        let tick_start = std::time::Instant::now();

        self.tick_count += 1;
        self.world.advance_clock(self.config.server.tick_interval_ms);

        let index_start = std::time::Instant::now();
        self.world.rebuild_index();
        let index_time = index_start.elapsed();

        let movement_start = std::time::Instant::now();
        movement::integrate(&mut self.world, &self.config);
        let movement_time = movement_start.elapsed();

        let ai_start = std::time::Instant::now();
        ai::update_bots(&mut self.world, &self.config, self.tick_count);
        let ai_time = ai_start.elapsed();

        let collision_start = std::time::Instant::now();
        let resolve_every = self.config.collision.resolve_every_ticks.max(1);
        let deaths = if self.tick_count % resolve_every == 0 {
            collision::resolve(&mut self.world, &self.config)
        } else {
            Vec::new()
        };
        let collision_time = collision_start.elapsed();

        split::check_merge(&mut self.world, &self.config);
        let orphans = self.world.prune_orphans();
        if orphans > 0 {
            debug!("Pruned {} orphaned fragments", orphans);
        }

        for death in &deaths {
            debug!(
                "Cell {} eaten by {} ({:.0} mass, {:.0} score)",
                death.player_id, death.eaten_by, death.final_mass, death.final_score
            );
            if let Some(session) = self.sessions.get(&death.connection) {
                session.send(ServerMessage::PlayerDeath {
                    player_id: death.player_id,
                    eaten_by: death.eaten_by,
                    final_mass: death.final_mass,
                    final_score: death.final_score,
                });
            }
        }

        if self.tick_count % 400 == 0 {
            debug!(
                "Tick #{} perf: total={:?} avg={:.3}ms index={:?} movement={:?} ai={:?} collision={:?} ({} cells, {} food)",
                self.tick_count,
                tick_start.elapsed(),
                self.update_time_avg,
                index_time,
                movement_time,
                ai_time,
                collision_time,
                self.world.cell_count(),
                self.world.food_count()
            );
        }

        deaths
    }

    /// Project the world into a `gameUpdate` event.
    pub fn snapshot(&mut self) -> ServerMessage {
        let timestamp = self.snapshot_clock.next();
        snapshot::build(&self.world, timestamp, self.joined_players())
    }

    /// Encode a snapshot once and publish it. Returns the number of receivers.
    pub fn broadcast_snapshot(&mut self) -> usize {
        let json: Arc<str> = self.snapshot().to_json().into();
        // No receivers is not an error; nobody is connected yet.
        self.snapshot_tx.send(json).unwrap_or(0)
    }
}

/// Run the game loop until the gateway goes away.
///
/// The tick and broadcast timers are each re-armed only after their work is
/// done, so a slow tick delays the next one instead of queuing ticks.
pub async fn run_game_loop(mut game: GameState, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
    game.init_world();

    let tick_interval_ms = game.config.server.tick_interval_ms;
    let tick_every = Duration::from_millis(tick_interval_ms);
    let broadcast_every = Duration::from_millis(game.config.server.broadcast_interval_ms);

    let tick_timer = sleep(tick_every);
    let broadcast_timer = sleep(broadcast_every);
    tokio::pin!(tick_timer);
    tokio::pin!(broadcast_timer);

    loop {
        tokio::select! {
            event = inbound.recv() => {
                match event {
                    Some(event) => game.handle_inbound(event),
                    None => {
                        info!("Gateway closed, stopping game loop");
                        break;
                    }
                }
            }
            () = &mut tick_timer => {
                let tick_start = std::time::Instant::now();
                game.tick();
                let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

                // Exponential moving average (weight 0.5)
                game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

                let tick_budget = tick_interval_ms as f64 * 0.9;
                if tick_ms > tick_budget {
                    warn!(
                        "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} cells total",
                        game.tick_count,
                        tick_ms,
                        tick_budget,
                        game.joined_players(),
                        game.world.cell_count()
                    );
                }

                tick_timer.as_mut().reset(Instant::now() + tick_every);
            }
            () = &mut broadcast_timer => {
                game.broadcast_snapshot();
                broadcast_timer.as_mut().reset(Instant::now() + broadcast_every);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::mass_to_radius;
    use crate::server::session::DEFAULT_NAME;
    use tokio::sync::mpsc::error::TryRecvError;

    fn config() -> Config {
        let mut config = Config::default();
        config.bots.count = 0;
        config.food.count = 50;
        config
    }

    fn game(config: Config) -> GameState {
        let (snapshot_tx, _) = broadcast::channel(4);
        let world = World::seeded(&config, 17);
        GameState::with_world(config, world, snapshot_tx)
    }

    fn connect(game: &mut GameState, session: u32) -> mpsc::UnboundedReceiver<Outbound> {
        let (outbox, rx) = mpsc::unbounded_channel();
        let addr: SocketAddr = format!("127.0.0.1:{}", 9000 + session).parse().unwrap();
        game.handle_inbound(Inbound::Connected { session, addr, outbox });
        rx
    }

    fn command(game: &mut GameState, session: u32, command: Command) {
        game.handle_inbound(Inbound::Command { session, command });
    }

    fn join(game: &mut GameState, session: u32, name: &str) -> u32 {
        command(game, session, Command::Join { name: name.to_string() });
        game.sessions[&session].cell.unwrap()
    }

    #[test]
    fn test_join_sends_init() {
        let mut game = game(config());
        let mut rx = connect(&mut game, 1);
        let cell_id = join(&mut game, 1, "  Alice ");

        let Ok(Outbound::Event(ServerMessage::Init { cell, world_width, world_height })) = rx.try_recv() else {
            panic!("expected init");
        };
        assert_eq!(cell.id, cell_id);
        assert_eq!(cell.name, "Alice");
        assert_eq!(cell.mass, game.config.player.base_mass);
        assert_eq!(world_width, game.config.border.width);
        assert_eq!(world_height, game.config.border.height);

        let body = game.world.cell(cell_id).unwrap();
        assert_eq!(body.connection, Some(1));
        assert_eq!(body.radius(), mass_to_radius(game.config.player.base_mass));
        assert_eq!(game.joined_players(), 1);
    }

    #[test]
    fn test_empty_name_gets_default() {
        let mut game = game(config());
        let _rx = connect(&mut game, 1);
        let cell_id = join(&mut game, 1, "");
        assert_eq!(game.world.cell(cell_id).unwrap().name, DEFAULT_NAME);
    }

    #[test]
    fn test_duplicate_join_ignored() {
        let mut game = game(config());
        let mut rx = connect(&mut game, 1);
        let first = join(&mut game, 1, "a");
        let second = join(&mut game, 1, "b");

        assert_eq!(first, second);
        assert_eq!(game.world.cell_count(), 1);
        assert!(rx.try_recv().is_ok());
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_server_full() {
        let mut config = config();
        config.server.max_players = 1;
        let mut game = game(config);
        let _rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        join(&mut game, 1, "a");

        command(&mut game, 2, Command::Join { name: "b".into() });
        assert_eq!(
            rx2.try_recv().unwrap(),
            Outbound::Event(ServerMessage::ServerFull { max_players: 1 })
        );
        assert_eq!(rx2.try_recv().unwrap(), Outbound::Close);
        assert!(game.sessions[&2].cell.is_none());
        assert_eq!(game.world.cell_count(), 1);
    }

    #[test]
    fn test_move_target_clamped() {
        let mut game = game(config());
        let _rx = connect(&mut game, 1);
        let cell_id = join(&mut game, 1, "a");

        command(&mut game, 1, Command::Move { x: -100.0, y: 99_999.0 });
        assert_eq!(
            game.world.cell(cell_id).unwrap().target,
            Some(Vec2::new(0.0, game.world.height))
        );
    }

    #[test]
    fn test_commands_without_cell_ignored() {
        let mut game = game(config());
        let _rx = connect(&mut game, 1);
        command(&mut game, 1, Command::Move { x: 10.0, y: 10.0 });
        command(&mut game, 1, Command::Split);
        command(&mut game, 7, Command::Split);
        assert_eq!(game.world.cell_count(), 0);
    }

    #[test]
    fn test_disconnect_removes_cells() {
        let mut game = game(config());
        let _rx = connect(&mut game, 1);
        let cell_id = join(&mut game, 1, "a");
        game.world.cell_mut(cell_id).unwrap().set_mass(200.0);
        command(&mut game, 1, Command::Split);
        let fragment = game.world.cell(cell_id).unwrap().fragments[0];

        command(&mut game, 1, Command::Disconnect);
        assert!(!game.sessions.contains_key(&1));
        assert!(!game.world.is_live(cell_id));
        assert!(!game.world.is_live(fragment));
        assert!(!game.world.index().contains_cell(cell_id));
        assert!(!game.world.index().contains_cell(fragment));
        assert_eq!(game.world.index().cell_entries(), 0);
    }

    #[test]
    fn test_death_notice_goes_to_victim_only() {
        let mut game = game(config());
        let mut rx1 = connect(&mut game, 1);
        let mut rx2 = connect(&mut game, 2);
        let a = join(&mut game, 1, "a");
        let b = join(&mut game, 2, "b");
        rx1.try_recv().unwrap();
        rx2.try_recv().unwrap();

        game.world.cell_mut(a).unwrap().set_mass(200.0);
        game.world.cell_mut(b).unwrap().set_mass(100.0);
        game.world.set_position(a, Vec2::new(2500.0, 2500.0));
        game.world.set_position(b, Vec2::new(2520.0, 2500.0));

        let deaths = game.tick();
        assert_eq!(deaths.len(), 1);
        assert_eq!(
            rx2.try_recv().unwrap(),
            Outbound::Event(ServerMessage::PlayerDeath {
                player_id: b,
                eaten_by: a,
                final_mass: 100.0,
                final_score: 0.0,
            })
        );
        assert_eq!(rx1.try_recv().unwrap_err(), TryRecvError::Empty);
        // The victim keeps playing with a fresh cell.
        assert_eq!(game.sessions[&2].cell, Some(b));
        assert_eq!(game.world.cell(b).unwrap().mass(), game.config.player.base_mass);
    }

    #[test]
    fn test_tick_keeps_invariants() {
        let mut config = config();
        config.bots.count = 8;
        config.food.count = 300;
        let mut game = game(config);
        game.init_world();
        let _rx = connect(&mut game, 1);
        let cell_id = join(&mut game, 1, "a");
        command(&mut game, 1, Command::Move { x: 4000.0, y: 4000.0 });

        for _ in 0..200 {
            game.tick();
            assert_eq!(game.world.food_count(), 300);
            for cell in game.world.cells() {
                assert_eq!(cell.radius(), mass_to_radius(cell.mass()));
                assert!(cell.position.x >= cell.radius() && cell.position.x <= game.world.width - cell.radius());
                assert!(cell.position.y >= cell.radius() && cell.position.y <= game.world.height - cell.radius());
                assert_eq!(cell.bucket, game.world.index().bucket_of(cell.position));
                if let Some(parent) = cell.parent_id {
                    assert!(game.world.is_live(parent));
                }
            }
        }
        assert_eq!(game.world.clock(), 200 * game.config.server.tick_interval_ms);
        assert!(game.world.is_live(cell_id));
    }

    #[test]
    fn test_snapshot_counts_joined_players() {
        let mut game = game(config());
        let _rx1 = connect(&mut game, 1);
        let _rx2 = connect(&mut game, 2);
        join(&mut game, 1, "a");

        let ServerMessage::GameUpdate { total_players, players, food, .. } = game.snapshot() else {
            panic!("expected gameUpdate");
        };
        assert_eq!(total_players, 1);
        assert_eq!(players.len(), 1);
        assert!(food.is_empty());
    }

    #[tokio::test]
    async fn test_game_loop_serves_sessions() {
        let mut config = config();
        config.server.tick_interval_ms = 5;
        config.server.broadcast_interval_ms = 10;
        let (snapshot_tx, mut snapshots) = broadcast::channel(16);
        let game = GameState::new(config, snapshot_tx);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_game_loop(game, inbound_rx));

        let (outbox, mut rx) = mpsc::unbounded_channel();
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        inbound_tx.send(Inbound::Connected { session: 1, addr, outbox }).unwrap();
        inbound_tx
            .send(Inbound::Command { session: 1, command: Command::Join { name: "loop".into() } })
            .unwrap();

        let init = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(init, Outbound::Event(ServerMessage::Init { .. })));

        let first = tokio::time::timeout(Duration::from_secs(2), snapshots.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(Duration::from_secs(2), snapshots.recv()).await.unwrap().unwrap();
        let first: serde_json::Value = serde_json::from_str(&first).unwrap();
        let second: serde_json::Value = serde_json::from_str(&second).unwrap();
        assert_eq!(first["type"], "gameUpdate");
        assert_eq!(first["food"].as_array().unwrap().len(), 50);
        assert!(second["timestamp"].as_u64().unwrap() > first["timestamp"].as_u64().unwrap());

        drop(inbound_tx);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
