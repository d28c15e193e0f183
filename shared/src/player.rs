//! Player entity: kinematics, the grounded/flying/crashed state machine and
//! the transfer data shared with clients

use crate::geometry::{degree_to_rad, Point, Triangle};
use crate::input::InputState;
use crate::powerup::Effect;
use crate::random::random_gap_timing;
use crate::settings::GameSettings;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type PlayerId = u32;

/// Exactly one of these holds for a player at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    /// Drawing a solid trail until `grounded_until`
    Grounded { grounded_until: u64 },
    /// Leaving a gap until `flying_until`
    Flying { flying_until: u64 },
    /// Terminal
    Crashed { crashed_at: u64 },
}

impl PlayerState {
    /// State for a freshly spawned player
    pub fn initial<R: Rng + ?Sized>(now: u64, settings: &GameSettings, rng: &mut R) -> Self {
        PlayerState::Grounded {
            grounded_until: now + random_gap_timing(rng, settings),
        }
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self, PlayerState::Crashed { .. })
    }

    /// Samples laid in this state are excluded from collision tests
    pub fn is_gap(&self) -> bool {
        matches!(self, PlayerState::Flying { .. })
    }

    /// Time-driven transition. Crashed never changes.
    pub fn next<R: Rng + ?Sized>(self, now: u64, settings: &GameSettings, rng: &mut R) -> Self {
        match self {
            PlayerState::Grounded { grounded_until } if now > grounded_until => {
                PlayerState::Flying {
                    flying_until: now + settings.gap_duration_ms,
                }
            }
            PlayerState::Flying { flying_until } if now > flying_until => PlayerState::Grounded {
                grounded_until: now + random_gap_timing(rng, settings),
            },
            state => state,
        }
    }
}

/// One trail sample, laid once per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
    /// Laid while flying; drawn as empty space and never collides
    pub is_gap: bool,
    /// Trail width at the time the sample was laid
    pub line_width: f32,
}

impl PathPoint {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pure movement step: applies steering, then moves along the new heading.
/// Returns the next position and the heading in degrees, kept in `[0, 360)`.
pub fn advance(
    position: Point,
    angle: f32,
    speed: f32,
    rotation_speed: f32,
    input: InputState,
    dt: f32,
) -> (Point, f32) {
    let angle = (angle + input.steering() * rotation_speed * dt).rem_euclid(360.0);
    let rotation = degree_to_rad(angle);
    let next = Point::new(
        position.x + rotation.cos() * speed * dt,
        position.y + rotation.sin() * speed * dt,
    );
    (next, angle)
}

/// Equilateral hitbox around the player's nose.
///
/// The centroid is pushed forward by `(radius + 0.1) / 2`, which puts the
/// back edge just ahead of `position`. The sample laid at `position` on this
/// tick therefore never counts as a self-collision.
pub fn hit_box(position: Point, angle: f32, radius: f32) -> Triangle {
    let rotation = degree_to_rad(angle);
    let shift = (radius + 0.1) / 2.0;
    let center = Point::new(
        position.x + rotation.cos() * shift,
        position.y + rotation.sin() * shift,
    );
    let step = std::f32::consts::TAU / 3.0;

    let vertex = |i: f32| {
        Point::new(
            center.x + radius * (step * i + rotation).cos(),
            center.y + radius * (step * i + rotation).sin(),
        )
    };
    [vertex(0.0), vertex(1.0), vertex(2.0)]
}

/// A player as simulated by the host
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    /// CSS color of the trail
    pub color: String,
    pub state: PlayerState,
    /// Units per second, after speed effects
    pub speed: f32,
    pub position: Point,
    /// Heading in degrees
    pub angle: f32,
    /// Every sample laid this round, oldest first
    pub path: Vec<PathPoint>,
    pub hit_box: Triangle,
    /// Size multiplier from grow/shrink effects; scales the hitbox and the
    /// width of new samples
    pub scale_factor: f32,
    pub score: u32,
    /// Host-local; never leaves the authoritative instance
    pub effects: Vec<Effect>,
}

impl Player {
    pub fn new<R: Rng + ?Sized>(
        id: PlayerId,
        color: impl Into<String>,
        position: Point,
        angle: f32,
        now: u64,
        settings: &GameSettings,
        rng: &mut R,
    ) -> Self {
        let state = PlayerState::initial(now, settings, rng);
        Self::with_state(id, color, position, angle, state, settings)
    }

    /// Builds a player in a known state, mainly for scripted rounds and tests
    pub fn with_state(
        id: PlayerId,
        color: impl Into<String>,
        position: Point,
        angle: f32,
        state: PlayerState,
        settings: &GameSettings,
    ) -> Self {
        Self {
            id,
            color: color.into(),
            state,
            speed: settings.player_speed,
            position,
            angle,
            path: Vec::new(),
            hit_box: hit_box(position, angle, settings.player_size / 2.0),
            scale_factor: 1.0,
            score: 0,
            effects: Vec::new(),
        }
    }

    pub fn is_crashed(&self) -> bool {
        self.state.is_crashed()
    }

    /// Circumradius of the hitbox, including grow/shrink effects
    pub fn radius(&self, settings: &GameSettings) -> f32 {
        settings.player_size / 2.0 * self.scale_factor
    }

    /// Advances the player by `dt` seconds. Returns the effects that expired
    /// during this tick, already reverted. A crashed player is left untouched.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        now: u64,
        input: InputState,
        settings: &GameSettings,
        rng: &mut R,
    ) -> Vec<Effect> {
        if self.is_crashed() {
            return Vec::new();
        }

        let expired = self.expire_effects(now);

        let (position, angle) = advance(
            self.position,
            self.angle,
            self.speed,
            settings.rotation_speed,
            input,
            dt,
        );
        self.position = position;
        self.angle = angle;
        self.hit_box = hit_box(position, angle, self.radius(settings));

        self.path.push(PathPoint {
            x: position.x,
            y: position.y,
            is_gap: self.state.is_gap(),
            line_width: settings.line_width * self.scale_factor,
        });

        let next = self.state.next(now, settings, rng);
        if next != self.state {
            debug!("Player {} {:?} -> {:?}", self.id, self.state, next);
        }
        self.state = next;

        expired
    }

    /// Reverts and removes every effect whose expiry has passed. The list is
    /// partitioned first so reverting never touches an effect being scanned.
    pub fn expire_effects(&mut self, now: u64) -> Vec<Effect> {
        let (expired, active): (Vec<Effect>, Vec<Effect>) = std::mem::take(&mut self.effects)
            .into_iter()
            .partition(|effect| effect.is_expired(now));
        self.effects = active;

        for effect in &expired {
            effect.revert(self);
        }
        expired
    }

    /// Freezes the player. Scoring for the others is the caller's job.
    pub fn handle_crash(&mut self, now: u64) {
        if !self.is_crashed() {
            self.state = PlayerState::Crashed { crashed_at: now };
        }
    }

    pub fn transfer_data(&self) -> PlayerTransferData {
        PlayerTransferData {
            id: self.id,
            color: self.color.clone(),
            state: self.state,
            speed: self.speed,
            position: self.position,
            angle: self.angle,
            path: self.path.clone(),
            hit_box: self.hit_box,
            scale_factor: self.scale_factor,
            score: self.score,
        }
    }

    pub fn from_transfer_data(data: PlayerTransferData) -> Self {
        Self {
            id: data.id,
            color: data.color,
            state: data.state,
            speed: data.speed,
            position: data.position,
            angle: data.angle,
            path: data.path,
            hit_box: data.hit_box,
            scale_factor: data.scale_factor,
            score: data.score,
            effects: Vec::new(),
        }
    }
}

/// Wire form of a player: [`Player`] without its effects, which only the
/// host needs to expire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTransferData {
    pub id: PlayerId,
    pub color: String,
    pub state: PlayerState,
    pub speed: f32,
    pub position: Point,
    pub angle: f32,
    pub path: Vec<PathPoint>,
    pub hit_box: Triangle,
    pub scale_factor: f32,
    pub score: u32,
}
