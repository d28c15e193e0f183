//! # Kurve Shared Library
//!
//! Everything the host and the clients agree on: the playing field geometry,
//! the player and power-up entities, the simulation step, the wire protocol
//! and the session layer that keeps a lobby in sync.
//!
//! ## Authority
//!
//! Only the host simulates. It advances the world with [`engine::Game::tick`]
//! and shares a full [`world::GameSnapshot`] with every peer; clients replace
//! their mirror wholesale and never run physics themselves.
//!
//! ## Layers
//!
//! - [`geometry`], [`player`], [`powerup`], [`collision`]: pure game rules
//! - [`world`], [`engine`]: the mutable world and the per-frame step
//! - [`protocol`], [`directory`], [`session`]: messages, lobby membership and
//!   callback dispatch
//! - [`transport`]: the channel abstraction and stream framing

pub mod collision;
pub mod directory;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod input;
pub mod player;
pub mod powerup;
pub mod protocol;
pub mod random;
pub mod session;
pub mod settings;
pub mod transport;
pub mod world;

pub use engine::{Game, WorldSync};
pub use error::{ConfigError, ProtocolError, TransportError};
pub use input::InputState;
pub use protocol::{LobbyUser, Message};
pub use session::{Communication, Role};
pub use settings::GameSettings;
pub use transport::{ChannelId, Transport, TransportEvent};
pub use world::{GameEvent, GameSnapshot, GameState};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock time in milliseconds, the time base of every game timestamp
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_unix_time() {
        assert!(now_millis() > 1_600_000_000_000);
    }
}
