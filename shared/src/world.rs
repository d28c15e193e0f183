//! World state owned by the simulation engine and the snapshot it shares

use crate::input::InputState;
use crate::player::{Player, PlayerId, PlayerTransferData};
use crate::powerup::{PowerUp, PowerUpId, PowerUpKind};
use crate::random::{
    random_angle, random_power_up_kind, random_power_up_position, random_spawn_delay,
    random_start_position,
};
use crate::settings::{GameSettings, PLAYER_COLORS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Things that happened during one tick, for whoever draws the game
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerCrashed {
        player_id: PlayerId,
        at: u64,
    },
    ScoreChanged {
        player_id: PlayerId,
        score: u32,
    },
    PowerUpSpawned(PowerUp),
    PowerUpPickedUp {
        player_id: PlayerId,
        power_up_id: PowerUpId,
        kind: PowerUpKind,
    },
    EffectExpired {
        player_id: PlayerId,
        kind: PowerUpKind,
    },
    /// Emitted once per round. `None` when nobody survived.
    RoundOver {
        winner: Option<PlayerId>,
    },
}

/// Everything a client needs to replace its mirror of the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Every player of the round, crashed ones included, in id order
    pub players: Vec<PlayerTransferData>,
    /// Power-ups still on the field
    pub power_ups: Vec<PowerUp>,
    /// Host clock time (ms) of the next spawn
    pub next_power_up_at: u64,
}

/// The mutable world of one round.
///
/// On the host this is the authority; on a client it is only ever replaced
/// by snapshots and patched by power-up hints.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    /// Ticks only advance the world while set
    pub running: bool,
    pub players: BTreeMap<PlayerId, Player>,
    pub power_ups: Vec<PowerUp>,
    pub next_power_up_at: u64,
    /// Clock of the previous tick, used to derive the time step
    pub last_tick_at: Option<u64>,
    /// When the last snapshot went out, for throttling
    pub last_sync_at: Option<u64>,
    /// Latest steering per player; a player without an entry flies straight
    pub inputs: HashMap<PlayerId, InputState>,
    next_power_up_id: PowerUpId,
    round_over: bool,
}

impl GameState {
    /// Empty, stopped world. Clients start here and wait for snapshots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the world with a fresh round of `player_count` randomly
    /// placed players. The world is left stopped.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        player_count: usize,
        now: u64,
        settings: &GameSettings,
        rng: &mut R,
    ) {
        let players = (0..player_count)
            .map(|index| {
                let id = index as PlayerId + 1;
                let color = PLAYER_COLORS[index % PLAYER_COLORS.len()];
                let position = random_start_position(rng, settings);
                let angle = random_angle(rng);
                (id, Player::new(id, color, position, angle, now, settings, rng))
            })
            .collect();

        *self = Self {
            players,
            next_power_up_at: now + random_spawn_delay(rng, settings),
            ..Self::default()
        };
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_crashed()).count()
    }

    pub fn is_round_over(&self) -> bool {
        self.round_over
    }

    /// Places a new power-up and schedules the following spawn
    pub fn spawn_power_up<R: Rng + ?Sized>(
        &mut self,
        now: u64,
        settings: &GameSettings,
        rng: &mut R,
    ) -> PowerUp {
        self.next_power_up_id += 1;
        let kind = random_power_up_kind(rng);
        let position = random_power_up_position(rng, settings);
        let power_up = PowerUp::new(self.next_power_up_id, kind, position, settings);

        self.power_ups.push(power_up.clone());
        self.next_power_up_at = now + random_spawn_delay(rng, settings);
        power_up
    }

    /// Inserts the power-up, replacing any live one with the same id
    pub fn upsert_power_up(&mut self, power_up: PowerUp) {
        match self.power_ups.iter_mut().find(|p| p.id == power_up.id) {
            Some(existing) => *existing = power_up,
            None => self.power_ups.push(power_up),
        }
    }

    /// Returns false when no power-up had that id
    pub fn remove_power_up(&mut self, id: PowerUpId) -> bool {
        let before = self.power_ups.len();
        self.power_ups.retain(|p| p.id != id);
        self.power_ups.len() != before
    }

    /// Flags the round as over the first time at most one player (none in a
    /// single-player round) is left alive.
    pub fn check_round_over(&mut self) -> Option<GameEvent> {
        if self.round_over || self.players.is_empty() {
            return None;
        }

        let threshold = if self.players.len() > 1 { 1 } else { 0 };
        if self.alive_count() > threshold {
            return None;
        }

        let winner = self
            .players
            .values()
            .find(|p| !p.is_crashed())
            .map(|p| p.id);
        self.round_over = true;
        Some(GameEvent::RoundOver { winner })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.players.values().map(Player::transfer_data).collect(),
            power_ups: self.power_ups.clone(),
            next_power_up_at: self.next_power_up_at,
        }
    }

    /// Overwrites players, power-ups and the spawn timer wholesale
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) {
        self.players = snapshot
            .players
            .into_iter()
            .map(|data| (data.id, Player::from_transfer_data(data)))
            .collect();
        self.power_ups = snapshot.power_ups;
        self.next_power_up_at = snapshot.next_power_up_at;
    }
}
