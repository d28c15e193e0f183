//! Power-ups and the reversible effects they leave on players

use crate::error::ConfigError;
use crate::geometry::{point_in_circle, Circle, Point, Triangle};
use crate::player::Player;
use crate::settings::GameSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type PowerUpId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerUpKind {
    /// Faster movement
    Speed,
    /// Slower movement
    Slow,
    /// Larger hitbox and thicker trail
    Grow,
    /// Smaller hitbox and thinner trail
    Shrink,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Speed,
        PowerUpKind::Slow,
        PowerUpKind::Grow,
        PowerUpKind::Shrink,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerUpKind::Speed => "SPEED",
            PowerUpKind::Slow => "SLOW",
            PowerUpKind::Grow => "GROW",
            PowerUpKind::Shrink => "SHRINK",
        }
    }

    /// Multiplier this kind applies on pickup
    pub fn factor(self, settings: &GameSettings) -> f32 {
        match self {
            PowerUpKind::Speed => settings.speed_boost,
            PowerUpKind::Slow => settings.slow_penalty,
            PowerUpKind::Grow => settings.grow_factor,
            PowerUpKind::Shrink => settings.shrink_factor,
        }
    }
}

impl fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PowerUpKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PowerUpKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownPowerUpKind(s.to_string()))
    }
}

/// A modifier attached to a player until `expires_at`.
///
/// The factor is captured at pickup time so reverting always undoes exactly
/// what was applied, even when several effects of one kind are stacked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: PowerUpKind,
    pub factor: f32,
    pub expires_at: u64,
}

impl Effect {
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    pub fn revert(&self, player: &mut Player) {
        match self.kind {
            PowerUpKind::Speed | PowerUpKind::Slow => player.speed /= self.factor,
            PowerUpKind::Grow | PowerUpKind::Shrink => player.scale_factor /= self.factor,
        }
    }
}

/// A pickup lying on the field. Transfer data is the struct itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: PowerUpId,
    pub kind: PowerUpKind,
    pub bounding_box: Circle,
    pub effect_duration: u64,
}

impl PowerUp {
    pub fn new(id: PowerUpId, kind: PowerUpKind, position: Point, settings: &GameSettings) -> Self {
        Self {
            id,
            kind,
            bounding_box: Circle::new(position.x, position.y, settings.power_up_radius),
            effect_duration: settings.power_up_duration_ms,
        }
    }

    /// True when any hitbox vertex lies within the bounding circle
    pub fn is_touched_by(&self, hit_box: &Triangle) -> bool {
        hit_box
            .iter()
            .any(|vertex| point_in_circle(*vertex, &self.bounding_box))
    }

    /// Applies this power-up's modifier to the player and records the effect
    /// so it can be reverted once it expires.
    pub fn apply_to(&self, player: &mut Player, now: u64, settings: &GameSettings) -> Effect {
        let factor = self.kind.factor(settings);
        match self.kind {
            PowerUpKind::Speed | PowerUpKind::Slow => player.speed *= factor,
            PowerUpKind::Grow | PowerUpKind::Shrink => player.scale_factor *= factor,
        }

        let effect = Effect {
            kind: self.kind,
            factor,
            expires_at: now + self.effect_duration,
        };
        player.effects.push(effect);
        effect
    }
}
