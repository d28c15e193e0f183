//! The host's event loop: lobby, authoritative simulation and round cycle

use crate::network::{listen, HostTransport, NetworkEvent};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::input::Autopilot;
use shared::{
    now_millis, Communication, Game, GameEvent, GameSettings, Role, TransportEvent,
};
use std::cell::RefCell;
use std::future::Future;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the lobby listens on
    pub bind: String,
    pub frame_rate: u32,
    pub user_name: String,
    /// Peers to wait for before moving the lobby to the game screen
    pub wait_for: usize,
    pub max_peers: usize,
    /// Pause between the end of a round and the next one
    pub round_restart_delay: Duration,
    pub settings: GameSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9000".to_string(),
            frame_rate: 60,
            user_name: "host".to_string(),
            wait_for: 1,
            max_peers: 7,
            round_restart_delay: Duration::from_secs(3),
            settings: GameSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Lobby,
    Playing,
    RoundOver { restart_at: u64 },
}

pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    game: Rc<RefCell<Game>>,
    comm: Communication<HostTransport>,
    events: UnboundedReceiver<NetworkEvent>,
    autopilot: Autopilot,
    rng: StdRng,
    phase: Phase,
    frames: u64,
    rounds: u32,
}

impl Server {
    /// Opens the lobby and wires the session callbacks into the game
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.settings.validate()?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let local_addr = listen(&config.bind, events_tx).await?;

        let game = Rc::new(RefCell::new(Game::new(
            config.settings.clone(),
            Some(Role::Host),
            StdRng::from_entropy(),
        )));

        let mut comm = Communication::open_lobby(HostTransport::new(config.max_peers));
        comm.on_lobby_id(|id| info!("Share this lobby id with players: {}", id));
        comm.on_lobby_users(|users| {
            let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
            info!("Lobby: {:?}", names);
        });
        comm.on_go_to_game_screen(|| info!("Moving lobby to the game screen"));
        {
            let game = Rc::clone(&game);
            comm.on_start_game(move || game.borrow_mut().start());
        }
        {
            let game = Rc::clone(&game);
            comm.on_player_input(move |player, input| game.borrow_mut().set_input(player, input));
        }

        comm.change_user_name(&config.user_name);
        comm.handle_event(TransportEvent::RendezvousOpened(local_addr.to_string()));

        Ok(Self {
            config,
            local_addr,
            game,
            comm,
            events,
            autopilot: Autopilot::default(),
            rng: StdRng::from_entropy(),
            phase: Phase::Lobby,
            frames: 0,
            rounds: 0,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds
    }

    pub fn game(&self) -> Rc<RefCell<Game>> {
        Rc::clone(&self.game)
    }

    pub fn session(&self) -> &Communication<HostTransport> {
        &self.comm
    }

    /// Runs until ctrl-c
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the loop until `shutdown` completes
    pub async fn run_until<F: Future<Output = ()>>(
        &mut self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let frame = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1) as f64);
        let mut frame_interval = interval(frame);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            "Waiting for {} peer(s) at {} fps",
            self.config.wait_for, self.config.frame_rate
        );

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_network_event(event),
                    None => {
                        warn!("Network tasks stopped");
                        break;
                    }
                },
                _ = frame_interval.tick() => self.frame(now_millis()),
                _ = &mut shutdown => {
                    info!("Shutting down after {} round(s)", self.rounds);
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected {
                channel,
                outbound,
                admit,
            } => {
                let admitted = self.comm.transport_mut().attach(channel.clone(), outbound);
                // The accept loop only reads from admitted peers
                let _ = admit.send(admitted);
                if !admitted {
                    warn!("Lobby full, turning away {}", channel);
                    return;
                }
                if self.phase != Phase::Lobby {
                    info!("{} joined mid-game and will spectate", channel);
                }
                self.comm.handle_event(TransportEvent::Opened { channel });
            }
            NetworkEvent::Transport(event) => {
                if let TransportEvent::Closed { channel } | TransportEvent::Error { channel, .. } =
                    &event
                {
                    self.comm.transport_mut().detach(channel);
                }
                self.comm.handle_event(event);
            }
        }
    }

    fn frame(&mut self, now: u64) {
        self.frames += 1;

        match self.phase {
            Phase::Lobby => {
                if self.comm.peer_count() >= self.config.wait_for {
                    self.comm.trigger_go_to_game_screen();
                    self.new_round(now);
                    self.phase = Phase::Playing;
                    // Starts right away if every peer is already staged
                    self.comm.sync_start();
                }
                return;
            }
            Phase::RoundOver { restart_at } if now >= restart_at => {
                self.new_round(now);
                self.game.borrow_mut().start();
                self.phase = Phase::Playing;
            }
            _ => {}
        }

        if let Some(player) = self.comm.local_player() {
            let input = self.autopilot.sample(now, &mut self.rng);
            self.game.borrow_mut().set_input(player, input);
        }

        let events = self.game.borrow_mut().tick(now, Some(&mut self.comm));
        for event in events {
            self.log_event(&event);
            if let GameEvent::RoundOver { .. } = event {
                self.rounds += 1;
                self.phase = Phase::RoundOver {
                    restart_at: now + self.config.round_restart_delay.as_millis() as u64,
                };
            }
        }

        if self.frames % (self.config.frame_rate.max(1) as u64 * 5) == 0 {
            let game = self.game.borrow();
            let state = game.state();
            debug!(
                "Frame {}: {} peer(s), {}/{} alive, {} power-up(s)",
                self.frames,
                self.comm.peer_count(),
                state.alive_count(),
                state.players.len(),
                state.power_ups.len()
            );
        }
    }

    fn new_round(&mut self, now: u64) {
        let player_count = self.comm.peer_count() + 1;
        let ids = self.game.borrow_mut().reset(player_count, now);
        let local = self.comm.assign_players(&ids);
        info!(
            "Round {} with players {:?}, host plays {:?}",
            self.rounds + 1,
            ids,
            local
        );
    }

    fn log_event(&self, event: &GameEvent) {
        match event {
            GameEvent::PlayerCrashed { player_id, .. } => {
                debug!("Player {} crashed", player_id)
            }
            GameEvent::ScoreChanged { player_id, score } => {
                debug!("Player {} now has {} points", player_id, score)
            }
            GameEvent::PowerUpPickedUp {
                player_id, kind, ..
            } => debug!("Player {} took {}", player_id, kind),
            GameEvent::EffectExpired { player_id, kind } => {
                debug!("{} wore off for player {}", kind, player_id)
            }
            GameEvent::PowerUpSpawned(_) => {}
            GameEvent::RoundOver { winner } => {
                let game = self.game.borrow();
                let scores: Vec<(u32, u32)> = game
                    .state()
                    .players
                    .values()
                    .map(|p| (p.id, p.score))
                    .collect();
                info!("Round over (winner {:?}), scores {:?}", winner, scores);
            }
        }
    }
}
