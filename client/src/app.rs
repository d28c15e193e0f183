//! The client's event loop: joining a lobby and mirroring the host's world

use crate::input::InputManager;
use crate::network::ClientTransport;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::input::Autopilot;
use shared::{now_millis, Communication, Game, GameSettings, Role, TransportEvent};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Lobby id published by the host, i.e. its address
    pub lobby: String,
    pub user_name: String,
    pub frame_rate: u32,
    /// Longest gap between two input messages while nothing changes
    pub input_keep_alive: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            lobby: "127.0.0.1:9000".to_string(),
            user_name: "player".to_string(),
            frame_rate: 60,
            input_keep_alive: Duration::from_millis(250),
        }
    }
}

pub struct ClientApp {
    config: ClientConfig,
    game: Rc<RefCell<Game>>,
    comm: Communication<ClientTransport>,
    events: UnboundedReceiver<TransportEvent>,
    input_manager: InputManager,
    autopilot: Autopilot,
    rng: StdRng,
    on_game_screen: Rc<Cell<bool>>,
    staged: bool,
    frames: u64,
    snapshots: Rc<Cell<u64>>,
}

impl ClientApp {
    /// Connects to the lobby and wires the session callbacks into the
    /// mirrored game
    pub async fn connect(config: ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let transport = ClientTransport::connect(&config.lobby, events_tx).await?;

        let game = Rc::new(RefCell::new(Game::new(
            GameSettings::default(),
            Some(Role::Client),
            StdRng::from_entropy(),
        )));
        let on_game_screen = Rc::new(Cell::new(false));
        let snapshots = Rc::new(Cell::new(0));

        let mut comm = Communication::join_lobby(transport, config.lobby.clone());
        comm.on_lobby_users(|users| {
            let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
            info!("Lobby: {:?}", names);
        });
        {
            let flag = Rc::clone(&on_game_screen);
            comm.on_go_to_game_screen(move || {
                info!("Host moved the lobby to the game screen");
                flag.set(true);
            });
        }
        {
            let game = Rc::clone(&game);
            comm.on_start_game(move || game.borrow_mut().start());
        }
        {
            let game = Rc::clone(&game);
            let snapshots = Rc::clone(&snapshots);
            comm.on_game_state(move |snapshot| {
                snapshots.set(snapshots.get() + 1);
                game.borrow_mut().apply_snapshot(snapshot);
            });
        }
        {
            let game = Rc::clone(&game);
            comm.on_power_up_added(move |power_up| game.borrow_mut().power_up_added(power_up));
        }
        {
            let game = Rc::clone(&game);
            comm.on_power_up_removed(move |id| game.borrow_mut().power_up_removed(id));
        }

        // Announced to the host once the channel opens
        comm.change_user_name(&config.user_name);

        Ok(Self {
            input_manager: InputManager::new(config.input_keep_alive.as_millis() as u64),
            config,
            game,
            comm,
            events,
            autopilot: Autopilot::default(),
            rng: StdRng::from_entropy(),
            on_game_screen,
            staged: false,
            frames: 0,
            snapshots,
        })
    }

    pub fn game(&self) -> Rc<RefCell<Game>> {
        Rc::clone(&self.game)
    }

    pub fn session(&self) -> &Communication<ClientTransport> {
        &self.comm
    }

    pub fn is_staged(&self) -> bool {
        self.staged
    }

    /// Number of world snapshots received from the host so far
    pub fn snapshots_received(&self) -> u64 {
        self.snapshots.get()
    }

    /// Runs until ctrl-c or until the host goes away
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs the loop until `shutdown` completes or the host goes away
    pub async fn run_until<F: Future<Output = ()>>(
        &mut self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let frame = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1) as f64);
        let mut frame_interval = interval(frame);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        if !self.handle_transport_event(event) {
                            info!("Host left the lobby");
                            break;
                        }
                    }
                    None => {
                        warn!("Network tasks stopped");
                        break;
                    }
                },
                _ = frame_interval.tick() => self.frame(now_millis()),
                _ = &mut shutdown => {
                    info!("Leaving lobby {}", self.config.lobby);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Returns false once the host channel is gone
    fn handle_transport_event(&mut self, event: TransportEvent) -> bool {
        let lost = matches!(
            event,
            TransportEvent::Closed { .. } | TransportEvent::Error { .. }
        );
        self.comm.handle_event(event);
        !(lost && self.comm.peer_count() == 0)
    }

    fn frame(&mut self, now: u64) {
        self.frames += 1;

        if self.on_game_screen.get() && !self.staged {
            self.staged = true;
            info!("Staged, waiting for the host to start");
            self.comm.sync_start();
        }

        let running = self.game.borrow().is_running();
        if running {
            let keys = self.autopilot.sample(now, &mut self.rng);
            if let Some(input) = self.input_manager.update(keys, now) {
                self.comm.send_input(input);
            }
        }

        // A mirrored game never simulates; this only tracks frame timing
        self.game.borrow_mut().tick(now, None);

        if self.frames % (self.config.frame_rate.max(1) as u64 * 5) == 0 {
            let game = self.game.borrow();
            let state = game.state();
            let scores: Vec<(u32, u32)> = state.players.values().map(|p| (p.id, p.score)).collect();
            debug!(
                "Frame {}: {} snapshot(s), {}/{} alive, {} power-up(s), scores {:?}",
                self.frames,
                self.snapshots.get(),
                state.alive_count(),
                state.players.len(),
                state.power_ups.len(),
                scores
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{decode, encode};
    use shared::transport::{read_frame, write_frame};
    use shared::world::GameState;
    use shared::Message;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected() -> (ClientApp, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig {
            lobby: listener.local_addr().unwrap().to_string(),
            user_name: "alice".to_string(),
            ..ClientConfig::default()
        };
        let app = ClientApp::connect(config).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        (app, stream)
    }

    async fn next_message(stream: &mut TcpStream) -> Message {
        let frame = read_frame(stream).await.unwrap().unwrap();
        decode(&String::from_utf8(frame).unwrap()).unwrap()
    }

    async fn pump(app: &mut ClientApp) -> bool {
        let event = app.events.recv().await.unwrap();
        app.handle_transport_event(event)
    }

    #[tokio::test]
    async fn test_name_is_announced_on_open() {
        let (mut app, mut stream) = connected().await;
        assert!(pump(&mut app).await);
        assert_eq!(app.session().peer_count(), 1);
        assert_eq!(
            next_message(&mut stream).await,
            Message::SetUserName("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_game_screen_stages_and_start_runs_game() {
        let (mut app, mut stream) = connected().await;
        pump(&mut app).await;
        next_message(&mut stream).await;

        let go = encode(&Message::GoToGameScreen).unwrap();
        write_frame(&mut stream, go.as_bytes()).await.unwrap();
        pump(&mut app).await;
        assert!(!app.is_staged());

        app.frame(0);
        assert!(app.is_staged());
        assert_eq!(next_message(&mut stream).await, Message::ClientGameStaged);

        let start = encode(&Message::StartGame).unwrap();
        write_frame(&mut stream, start.as_bytes()).await.unwrap();
        pump(&mut app).await;
        assert!(app.game().borrow().is_running());

        app.frame(16);
        assert!(matches!(
            next_message(&mut stream).await,
            Message::PlayerInput(_)
        ));
    }

    #[tokio::test]
    async fn test_snapshot_replaces_mirrored_world() {
        let (mut app, mut stream) = connected().await;
        pump(&mut app).await;

        let mut rng = StdRng::seed_from_u64(5);
        let mut state = GameState::new();
        state.reset(3, 0, &GameSettings::default(), &mut rng);
        let message = encode(&Message::ShareGameState(state.snapshot())).unwrap();
        write_frame(&mut stream, message.as_bytes()).await.unwrap();
        pump(&mut app).await;

        assert_eq!(app.snapshots_received(), 1);
        assert_eq!(app.game().borrow().state().players.len(), 3);
    }

    #[tokio::test]
    async fn test_host_leaving_ends_session() {
        let (mut app, stream) = connected().await;
        assert!(pump(&mut app).await);
        drop(stream);

        assert!(!pump(&mut app).await);
        assert_eq!(app.session().peer_count(), 0);
    }
}
