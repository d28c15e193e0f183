//! Host/client synchronization on top of a [`Transport`].
//!
//! [`Communication`] owns the peer channels and, on the host, the lobby
//! membership directory. Transport events are fed in through
//! [`Communication::handle_event`]; decoded messages are routed to callback
//! slots registered by the game and UI layers. Every slot holds at most one
//! callback, a later registration replaces the earlier one, and an empty slot
//! turns the message into a no-op.

use crate::directory::MemberDirectory;
use crate::engine::WorldSync;
use crate::input::InputState;
use crate::player::PlayerId;
use crate::powerup::{PowerUp, PowerUpId};
use crate::protocol::{decode, encode, LobbyUser, Message};
use crate::transport::{ChannelId, Transport, TransportEvent};
use crate::world::GameSnapshot;
use log::{debug, error, info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Runs the authoritative simulation and owns the lobby
    Host,
    /// Mirrors the host over a single channel
    Client,
}

/// One optional handler per message kind the session surfaces
#[derive(Default)]
struct Callbacks {
    /// The rendezvous published the lobby id (host)
    lobby_id: Option<Box<dyn FnMut(&str)>>,
    /// The local user name changed
    user_name: Option<Box<dyn FnMut(&str)>>,
    /// The membership list changed, host first
    lobby_users: Option<Box<dyn FnMut(&[LobbyUser])>>,
    /// Time to switch to the game screen; the receiver should stage next
    go_to_game_screen: Option<Box<dyn FnMut()>>,
    /// Everyone expected is staged and the round is on
    start_game: Option<Box<dyn FnMut()>>,
    /// A full world snapshot from the host (client)
    game_state: Option<Box<dyn FnMut(GameSnapshot)>>,
    /// Power-up hints between snapshots (client)
    power_up_added: Option<Box<dyn FnMut(PowerUp)>>,
    power_up_removed: Option<Box<dyn FnMut(PowerUpId)>>,
    /// Steering from the peer controlling a player (host)
    player_input: Option<Box<dyn FnMut(PlayerId, InputState)>>,
}

/// One side of a lobby session: the host with many channels or a client
/// with the single channel to its host
pub struct Communication<T: Transport> {
    role: Role,
    transport: T,
    /// Known once the rendezvous opened (host) or from the start (client)
    lobby_id: Option<String>,
    user_name: String,
    /// Open peer channels in the order they opened
    channels: Vec<ChannelId>,
    /// Host only; stays empty on a client
    directory: MemberDirectory,
    /// Which remote channel steers which player
    players: HashMap<ChannelId, PlayerId>,
    /// The host's own player in the current round
    local_player: Option<PlayerId>,
    /// Set by [`Communication::trigger_go_to_game_screen`]; from then on the
    /// start only waits for the peers that were summoned
    game_screen_sent: bool,
    /// `START_GAME` goes out at most once per session
    start_sent: bool,
    callbacks: Callbacks,
}

impl<T: Transport> Communication<T> {
    /// Host side. The lobby id arrives later as
    /// [`TransportEvent::RendezvousOpened`].
    pub fn open_lobby(transport: T) -> Self {
        Self::new(Role::Host, transport, None)
    }

    /// Client side, for a transport connecting to `lobby_id`
    pub fn join_lobby(transport: T, lobby_id: impl Into<String>) -> Self {
        Self::new(Role::Client, transport, Some(lobby_id.into()))
    }

    fn new(role: Role, transport: T, lobby_id: Option<String>) -> Self {
        Self {
            role,
            transport,
            lobby_id,
            user_name: String::new(),
            channels: Vec::new(),
            directory: MemberDirectory::new(),
            players: HashMap::new(),
            local_player: None,
            game_screen_sent: false,
            start_sent: false,
            callbacks: Callbacks::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn lobby_id(&self) -> Option<&str> {
        self.lobby_id.as_deref()
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn members(&self) -> &MemberDirectory {
        &self.directory
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn peer_count(&self) -> usize {
        self.channels.len()
    }

    /// True once the host has sent `START_GAME`
    pub fn is_started(&self) -> bool {
        self.start_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn on_lobby_id(&mut self, f: impl FnMut(&str) + 'static) {
        self.callbacks.lobby_id = Some(Box::new(f));
    }

    pub fn on_user_name(&mut self, f: impl FnMut(&str) + 'static) {
        self.callbacks.user_name = Some(Box::new(f));
    }

    pub fn on_lobby_users(&mut self, f: impl FnMut(&[LobbyUser]) + 'static) {
        self.callbacks.lobby_users = Some(Box::new(f));
    }

    pub fn on_go_to_game_screen(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.go_to_game_screen = Some(Box::new(f));
    }

    pub fn on_start_game(&mut self, f: impl FnMut() + 'static) {
        self.callbacks.start_game = Some(Box::new(f));
    }

    pub fn on_game_state(&mut self, f: impl FnMut(GameSnapshot) + 'static) {
        self.callbacks.game_state = Some(Box::new(f));
    }

    pub fn on_power_up_added(&mut self, f: impl FnMut(PowerUp) + 'static) {
        self.callbacks.power_up_added = Some(Box::new(f));
    }

    pub fn on_power_up_removed(&mut self, f: impl FnMut(PowerUpId) + 'static) {
        self.callbacks.power_up_removed = Some(Box::new(f));
    }

    /// Host only: steering received from the peer assigned to a player
    pub fn on_player_input(&mut self, f: impl FnMut(PlayerId, InputState) + 'static) {
        self.callbacks.player_input = Some(Box::new(f));
    }

    /// Feeds one transport event through the session
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::RendezvousOpened(id) => {
                info!("Lobby open as {}", id);
                if let Some(cb) = self.callbacks.lobby_id.as_mut() {
                    cb(&id);
                }
                self.lobby_id = Some(id);
            }
            TransportEvent::Opened { channel } => self.channel_opened(channel),
            TransportEvent::Data { channel, payload } => match decode(&payload) {
                Ok(message) => self.dispatch(&channel, message),
                Err(e) => debug!("Ignoring message from {}: {}", channel, e),
            },
            TransportEvent::Closed { channel } => {
                info!("Channel {} closed", channel);
                self.channel_lost(&channel);
            }
            TransportEvent::Error { channel, reason } => {
                warn!("Channel {} failed: {}", channel, reason);
                self.channel_lost(&channel);
            }
        }
    }

    fn channel_opened(&mut self, channel: ChannelId) {
        if self.channels.contains(&channel) {
            return;
        }
        self.channels.push(channel.clone());

        match self.role {
            Role::Host => {
                self.directory.add(channel);
                self.update_members_list();
            }
            Role::Client => {
                info!("Connected to lobby via {}", channel);
                if !self.user_name.is_empty() {
                    let message = Message::SetUserName(self.user_name.clone());
                    self.send_to_host(&message);
                }
            }
        }
    }

    fn channel_lost(&mut self, channel: &str) {
        let before = self.channels.len();
        self.channels.retain(|c| c != channel);
        if self.channels.len() == before {
            return;
        }

        match self.role {
            Role::Host => {
                if let Some(player) = self.players.remove(channel) {
                    debug!("Player {} no longer has a controller", player);
                }
                self.directory.remove(channel);
                self.update_members_list();
                // The peer that left may have been the last one not staged
                if self.game_screen_sent || self.directory.staged_count() > 0 {
                    self.check_for_game_start();
                }
            }
            Role::Client => warn!("Lost connection to host"),
        }
    }

    fn dispatch(&mut self, channel: &str, message: Message) {
        debug!("{} from {}", message.tag(), channel);
        match (self.role, message) {
            (Role::Host, Message::SetUserName(name)) => {
                if self.directory.set_username(channel, &name) {
                    info!("{} is now known as {:?}", channel, name);
                    self.update_members_list();
                }
            }
            (Role::Host, Message::ClientGameStaged) => {
                if self.directory.set_staged(channel) {
                    info!(
                        "{} staged ({}/{})",
                        channel,
                        self.directory.staged_count(),
                        self.directory.len()
                    );
                    self.check_for_game_start();
                }
            }
            (Role::Host, Message::PlayerInput(input)) => {
                let Some(&player) = self.players.get(channel) else {
                    debug!("Input from {} has no player", channel);
                    return;
                };
                if let Some(cb) = self.callbacks.player_input.as_mut() {
                    cb(player, input);
                }
            }
            (Role::Client, Message::SetUserList(users)) => {
                if let Some(cb) = self.callbacks.lobby_users.as_mut() {
                    cb(&users);
                }
            }
            (Role::Client, Message::GoToGameScreen) => {
                if let Some(cb) = self.callbacks.go_to_game_screen.as_mut() {
                    cb();
                }
            }
            (Role::Client, Message::StartGame) => {
                if let Some(cb) = self.callbacks.start_game.as_mut() {
                    cb();
                }
            }
            (Role::Client, Message::ShareGameState(snapshot)) => {
                if let Some(cb) = self.callbacks.game_state.as_mut() {
                    cb(snapshot);
                }
            }
            (Role::Client, Message::PowerUpAdded(power_up)) => {
                if let Some(cb) = self.callbacks.power_up_added.as_mut() {
                    cb(power_up);
                }
            }
            (Role::Client, Message::PowerUpRemoved(id)) => {
                if let Some(cb) = self.callbacks.power_up_removed.as_mut() {
                    cb(id);
                }
            }
            (role, message) => {
                debug!("{:?} ignoring {} from {}", role, message.tag(), channel);
            }
        }
    }

    /// Sets the local user name. A client forwards it to the host; the host
    /// republishes the membership list.
    pub fn change_user_name(&mut self, username: &str) {
        self.user_name = username.to_string();
        if let Some(cb) = self.callbacks.user_name.as_mut() {
            cb(username);
        }

        match self.role {
            Role::Host => self.update_members_list(),
            Role::Client => self.send_to_host(&Message::SetUserName(username.to_string())),
        }
    }

    /// Host only: moves every peer, and the host itself, to the game screen.
    /// The start then waits for exactly the peers present now; later joiners
    /// spectate.
    pub fn trigger_go_to_game_screen(&mut self) {
        if self.role != Role::Host {
            warn!("Only the host can move the lobby to the game screen");
            return;
        }
        let summoned = self.directory.summon_all();
        self.game_screen_sent = true;
        debug!("Waiting for {} peer(s) to stage", summoned);
        self.broadcast(&Message::GoToGameScreen);
        if let Some(cb) = self.callbacks.go_to_game_screen.as_mut() {
            cb();
        }
    }

    /// Reports the local side as ready. A client tells the host; the host
    /// starts the game if every peer is already staged.
    pub fn sync_start(&mut self) {
        match self.role {
            Role::Host => self.check_for_game_start(),
            Role::Client => self.send_to_host(&Message::ClientGameStaged),
        }
    }

    /// Client only: current steering for the local player
    pub fn send_input(&mut self, input: InputState) {
        if self.role == Role::Client {
            self.send_to_host(&Message::PlayerInput(input));
        }
    }

    /// Host only: maps freshly created players onto participants. The first
    /// id goes to the host, the rest to open channels in join order. Returns
    /// the host's own player.
    pub fn assign_players(&mut self, player_ids: &[PlayerId]) -> Option<PlayerId> {
        self.players.clear();
        let mut ids = player_ids.iter().copied();
        self.local_player = ids.next();

        for (channel, id) in self.channels.iter().zip(ids) {
            debug!("Player {} assigned to {}", id, channel);
            self.players.insert(channel.clone(), id);
        }
        self.local_player
    }

    pub fn local_player(&self) -> Option<PlayerId> {
        self.local_player
    }

    pub fn player_for_channel(&self, channel: &str) -> Option<PlayerId> {
        self.players.get(channel).copied()
    }

    /// Sends to every open channel. A failing channel is logged and skipped.
    /// Returns how many channels accepted the message.
    pub fn broadcast(&mut self, message: &Message) -> usize {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Dropping {}: {}", message.tag(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        for channel in &self.channels {
            match self.transport.send(channel, &payload) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to send {} to {}: {}", message.tag(), channel, e),
            }
        }
        delivered
    }

    fn send_to_host(&mut self, message: &Message) {
        let Some(host) = self.channels.first() else {
            debug!("Not connected, dropping {}", message.tag());
            return;
        };
        let result = encode(message)
            .map_err(|e| e.to_string())
            .and_then(|payload| {
                self.transport
                    .send(host, &payload)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!("Failed to send {} to host: {}", message.tag(), e);
        }
    }

    fn update_members_list(&mut self) {
        let users = self.directory.users(&self.user_name);
        if let Some(cb) = self.callbacks.lobby_users.as_mut() {
            cb(&users);
        }
        self.broadcast(&Message::SetUserList(users));
    }

    fn check_for_game_start(&mut self) {
        let ready = if self.game_screen_sent {
            self.directory.summoned_staged()
        } else {
            self.directory.all_staged()
        };
        if self.start_sent || !ready {
            return;
        }
        self.start_sent = true;
        info!("Everyone is staged, starting game");
        self.broadcast(&Message::StartGame);
        if let Some(cb) = self.callbacks.start_game.as_mut() {
            cb();
        }
    }
}

impl<T: Transport> WorldSync for Communication<T> {
    fn share_game_state(&mut self, snapshot: GameSnapshot) {
        if self.is_host() {
            self.broadcast(&Message::ShareGameState(snapshot));
        }
    }

    fn power_up_added(&mut self, power_up: &PowerUp) {
        if self.is_host() {
            self.broadcast(&Message::PowerUpAdded(power_up.clone()));
        }
    }

    fn power_up_removed(&mut self, id: PowerUpId) {
        if self.is_host() {
            self.broadcast(&Message::PowerUpRemoved(id));
        }
    }
}
