//! The game loop step.
//!
//! An authoritative [`Game`] (host, or no networking at all) moves players,
//! spawns power-ups and detects collisions on every tick, then hands the
//! outcome to a [`WorldSync`] sink. A client [`Game`] never simulates; its
//! world changes only through [`Game::apply_snapshot`] and the power-up hints.

use crate::collision::{detect_players_crashing, detect_power_up_pickup};
use crate::input::InputState;
use crate::player::PlayerId;
use crate::powerup::{PowerUp, PowerUpId};
use crate::session::Role;
use crate::settings::GameSettings;
use crate::world::{GameEvent, GameSnapshot, GameState};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;

/// Outbound side of the host's synchronization
pub trait WorldSync {
    fn share_game_state(&mut self, snapshot: GameSnapshot);
    fn power_up_added(&mut self, power_up: &PowerUp);
    fn power_up_removed(&mut self, id: PowerUpId);
}

pub struct Game<R: Rng = StdRng> {
    settings: GameSettings,
    state: GameState,
    networking: Option<Role>,
    rng: R,
}

impl<R: Rng> Game<R> {
    /// `networking` is `None` for a local game, which simulates like a host
    /// but never shares anything.
    pub fn new(settings: GameSettings, networking: Option<Role>, rng: R) -> Self {
        Self {
            settings,
            state: GameState::new(),
            networking,
            rng,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        self.networking != Some(Role::Client)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn start(&mut self) {
        if !self.state.running {
            info!("Game started");
        }
        self.state.running = true;
    }

    pub fn pause(&mut self) {
        if self.state.running {
            info!("Game paused");
        }
        self.state.running = false;
    }

    /// Starts a new round with `player_count` players. The world is stopped
    /// afterwards; returns the ids of the new players.
    pub fn reset(&mut self, player_count: usize, now: u64) -> Vec<PlayerId> {
        let count = player_count.min(self.settings.max_players);
        if count < player_count {
            warn!(
                "Requested {} players, capped at {}",
                player_count, self.settings.max_players
            );
        }
        self.state.reset(count, now, &self.settings, &mut self.rng);
        info!("New round with {} players", count);
        self.state.player_ids()
    }

    /// Steering for one player, held until replaced
    pub fn set_input(&mut self, player_id: PlayerId, input: InputState) {
        self.state.inputs.insert(player_id, input);
    }

    /// Runs one frame at `now` (milliseconds). Simulation happens only while
    /// running and authoritative; `last_tick_at` is recorded either way.
    pub fn tick(&mut self, now: u64, sync: Option<&mut dyn WorldSync>) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if self.state.running && self.is_authoritative() {
            let dt = self.delta_seconds(now);
            events = self.step(now, dt);

            if let Some(sync) = sync {
                self.synchronize(now, &events, sync);
            }
        }

        self.state.last_tick_at = Some(now);
        events
    }

    /// One simulation step of `dt` seconds: players move, then the spawn
    /// timer, then crashes, then pickups.
    pub fn step(&mut self, now: u64, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let state = &mut self.state;

        for player in state.players.values_mut() {
            let input = state.inputs.get(&player.id).copied().unwrap_or_default();
            let expired = player.update(dt, now, input, &self.settings, &mut self.rng);
            events.extend(expired.into_iter().map(|effect| GameEvent::EffectExpired {
                player_id: player.id,
                kind: effect.kind,
            }));
        }

        if now > state.next_power_up_at {
            let power_up = state.spawn_power_up(now, &self.settings, &mut self.rng);
            debug!(
                "Spawned {} power-up {} at ({:.0}, {:.0})",
                power_up.kind, power_up.id, power_up.bounding_box.x, power_up.bounding_box.y
            );
            events.push(GameEvent::PowerUpSpawned(power_up));
        }

        events.extend(detect_players_crashing(
            &mut state.players,
            &self.settings,
            now,
        ));
        events.extend(detect_power_up_pickup(
            &mut state.players,
            &mut state.power_ups,
            &self.settings,
            now,
        ));

        if let Some(round_over) = state.check_round_over() {
            if let GameEvent::RoundOver { winner } = &round_over {
                match winner {
                    Some(id) => info!("Round over, player {} wins", id),
                    None => info!("Round over, nobody survived"),
                }
            }
            events.push(round_over);
        }

        events
    }

    /// Replaces the world with the host's snapshot. Ignored when this game
    /// is authoritative.
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) {
        if self.is_authoritative() {
            warn!("Ignoring snapshot on an authoritative game");
            return;
        }
        self.state.apply_snapshot(snapshot);
    }

    pub fn power_up_added(&mut self, power_up: PowerUp) {
        if self.is_authoritative() {
            return;
        }
        self.state.upsert_power_up(power_up);
    }

    pub fn power_up_removed(&mut self, id: PowerUpId) {
        if self.is_authoritative() {
            return;
        }
        if !self.state.remove_power_up(id) {
            debug!("Power-up {} already gone", id);
        }
    }

    fn delta_seconds(&self, now: u64) -> f32 {
        let Some(last) = self.state.last_tick_at else {
            return 0.0;
        };
        let dt = now.saturating_sub(last) as f32 / 1000.0;
        if dt > self.settings.max_tick_delta {
            warn!(
                "Frame took {:.3}s, simulating {:.3}s",
                dt, self.settings.max_tick_delta
            );
            return self.settings.max_tick_delta;
        }
        dt
    }

    fn synchronize(&mut self, now: u64, events: &[GameEvent], sync: &mut dyn WorldSync) {
        for event in events {
            match event {
                GameEvent::PowerUpSpawned(power_up) => sync.power_up_added(power_up),
                GameEvent::PowerUpPickedUp { power_up_id, .. } => {
                    sync.power_up_removed(*power_up_id)
                }
                _ => {}
            }
        }

        let due = self
            .state
            .last_sync_at
            .map_or(true, |last| now.saturating_sub(last) >= self.settings.sync_interval_ms);
        if due {
            sync.share_game_state(self.state.snapshot());
            self.state.last_sync_at = Some(now);
        }
    }
}
