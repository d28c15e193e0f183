//! Wire messages exchanged between host and clients.
//!
//! Every message is a JSON envelope `{"type": "<TAG>", "data": <payload>}`.
//! Messages without a payload omit `data`.

use crate::error::ProtocolError;
use crate::input::InputState;
use crate::powerup::{PowerUp, PowerUpId};
use crate::world::GameSnapshot;
use serde::{Deserialize, Serialize};

/// One row of the lobby membership list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyUser {
    pub username: String,
    pub host: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Client → host: the sender's new username
    SetUserName(String),
    /// Host → clients: full membership list, host first
    SetUserList(Vec<LobbyUser>),
    /// Client → host: the sender is on the game screen and ready
    ClientGameStaged,
    /// Host → clients
    #[serde(rename = "GO_TO_GAMESCREEN")]
    GoToGameScreen,
    /// Host → clients: everyone is staged
    StartGame,
    /// Host → clients: full world replacement
    ShareGameState(GameSnapshot),
    PowerUpAdded(PowerUp),
    PowerUpRemoved(PowerUpId),
    /// Client → host: current steering of the sender's player
    PlayerInput(InputState),
}

impl Message {
    /// The `type` tag this message travels under
    pub fn tag(&self) -> &'static str {
        match self {
            Message::SetUserName(_) => "SET_USER_NAME",
            Message::SetUserList(_) => "SET_USER_LIST",
            Message::ClientGameStaged => "CLIENT_GAME_STAGED",
            Message::GoToGameScreen => "GO_TO_GAMESCREEN",
            Message::StartGame => "START_GAME",
            Message::ShareGameState(_) => "SHARE_GAME_STATE",
            Message::PowerUpAdded(_) => "POWER_UP_ADDED",
            Message::PowerUpRemoved(_) => "POWER_UP_REMOVED",
            Message::PlayerInput(_) => "PLAYER_INPUT",
        }
    }
}

pub fn encode(message: &Message) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

/// Fails for malformed JSON and for unknown `type` tags alike
pub fn decode(payload: &str) -> Result<Message, ProtocolError> {
    serde_json::from_str(payload).map_err(ProtocolError::Decode)
}
