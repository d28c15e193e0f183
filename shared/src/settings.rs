//! Game tuning parameters
//!
//! Every value has a default, so a settings file only needs to list the
//! fields it overrides. Distances are field units, headings are degrees,
//! durations ending in `_ms` are milliseconds and `max_tick_delta` is seconds.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Colors handed out to players in id order.
pub const PLAYER_COLORS: [&str; 8] = [
    "blue",
    "red",
    "green",
    "rebeccapurple",
    "orange",
    "hotpink",
    "black",
    "gray",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub field_width: f32,
    pub field_height: f32,
    pub max_players: usize,

    /// Default player speed in units per second
    pub player_speed: f32,
    /// Rotation speed in degrees per second
    pub rotation_speed: f32,
    /// Diameter of the player's triangle
    pub player_size: f32,
    pub line_width: f32,
    /// Minimum distance between a start position and the field edge
    pub start_edge_margin: f32,

    /// Window from which the time between two gaps is drawn
    pub gap_interval_min_ms: u64,
    pub gap_interval_max_ms: u64,
    /// How long a gap lasts
    pub gap_duration_ms: u64,

    /// Window from which the time between two power-up spawns is drawn
    pub power_up_spawn_min_ms: u64,
    pub power_up_spawn_max_ms: u64,
    pub power_up_radius: f32,
    pub power_up_duration_ms: u64,
    pub speed_boost: f32,
    pub slow_penalty: f32,
    pub grow_factor: f32,
    pub shrink_factor: f32,

    /// Points every surviving player gains when someone crashes
    pub crash_score: u32,
    /// Minimum time between two snapshots; zero shares every tick. Snapshots
    /// carry whole trails, so sharing every tick can outrun slow peers
    pub sync_interval_ms: u64,
    /// Upper bound for the simulated time step
    pub max_tick_delta: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            field_width: 1000.0,
            field_height: 800.0,
            max_players: PLAYER_COLORS.len(),
            player_speed: 100.0,
            rotation_speed: 180.0,
            player_size: 15.0,
            line_width: 3.0,
            start_edge_margin: 150.0,
            gap_interval_min_ms: 6000,
            gap_interval_max_ms: 10000,
            gap_duration_ms: 250,
            power_up_spawn_min_ms: 2000,
            power_up_spawn_max_ms: 4000,
            power_up_radius: 15.0,
            power_up_duration_ms: 1500,
            speed_boost: 1.5,
            slow_penalty: 0.5,
            grow_factor: 2.0,
            shrink_factor: 0.5,
            crash_score: 10,
            sync_interval_ms: 50,
            max_tick_delta: 0.25,
        }
    }
}

impl GameSettings {
    /// Parses settings from JSON text and validates them
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: GameSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and validates a JSON settings file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects settings that would make the simulation misbehave, such as a
    /// degenerate hitbox or an inverted timing window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width <= 0.0 || self.field_height <= 0.0 {
            return Err(ConfigError::Invalid("field size must be positive".into()));
        }
        if self.start_edge_margin < 0.0
            || self.start_edge_margin * 2.0 >= self.field_width.min(self.field_height)
        {
            return Err(ConfigError::Invalid(format!(
                "start edge margin {} does not fit a {}x{} field",
                self.start_edge_margin, self.field_width, self.field_height
            )));
        }
        if self.max_players == 0 || self.max_players > PLAYER_COLORS.len() {
            return Err(ConfigError::Invalid(format!(
                "max players must be between 1 and {}",
                PLAYER_COLORS.len()
            )));
        }
        if self.player_size <= 0.0 || self.power_up_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "player size and power-up radius must be positive".into(),
            ));
        }
        if self.player_speed < 0.0 || self.rotation_speed < 0.0 || self.line_width < 0.0 {
            return Err(ConfigError::Invalid(
                "speeds and line width cannot be negative".into(),
            ));
        }
        if self.gap_interval_min_ms > self.gap_interval_max_ms {
            return Err(ConfigError::Invalid("gap interval window is inverted".into()));
        }
        if self.power_up_spawn_min_ms > self.power_up_spawn_max_ms {
            return Err(ConfigError::Invalid(
                "power-up spawn window is inverted".into(),
            ));
        }
        let factors = [
            ("speed_boost", self.speed_boost),
            ("slow_penalty", self.slow_penalty),
            ("grow_factor", self.grow_factor),
            ("shrink_factor", self.shrink_factor),
        ];
        for (name, factor) in factors {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.max_tick_delta <= 0.0 {
            return Err(ConfigError::Invalid("max tick delta must be positive".into()));
        }
        Ok(())
    }
}
