//! Game lifecycle vocabulary carried over the relay channels.
//!
//! Two logical channels exist per bot: a "state" channel carrying
//! [`StateMessage`] lifecycle events and a "game update" channel carrying
//! per-turn [`GameUpdate`] payloads. Both serialize as self-describing JSON;
//! state messages use the externally tagged `{"kind": {payload}}` shape so
//! producers in other languages can emit them without schema tooling.

use serde::{Deserialize, Serialize};

/// Phase of the bot's session as observed from the state channel.
///
/// This is local bookkeeping, never sent on the wire by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Not yet connected to the game server
    Initializing,
    /// Connected to the game server, not in a lobby
    Connected,
    /// Waiting in a game lobby
    JoinedLobby,
    /// A game is in progress
    Playing,
}

impl Default for GamePhase {
    fn default() -> Self {
        Self::Initializing
    }
}

/// Kind of game being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Custom,
    #[serde(rename = "1v1")]
    Duel,
    Ffa,
}

impl Default for GameType {
    fn default() -> Self {
        Self::Custom
    }
}

/// Payload of a `game_start` state message.
///
/// Field casing follows the wire format emitted by the game server bridge
/// (`playerIndex` is camelCase there).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStart {
    pub game_type: GameType,
    pub replay_id: String,
    #[serde(rename = "playerIndex")]
    pub player_index: u32,
    pub usernames: Vec<String>,
}

/// One scoreboard row from a game update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// Total unit count
    pub total: i64,
    /// Tiles held
    pub tiles: i64,
    /// Player index this row belongs to
    pub i: u32,
    /// Whether the player has been eliminated
    pub dead: bool,
}

/// Per-turn payload from the "game update" channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub turn: u32,
    pub scores: Vec<PlayerScore>,
}

/// Lifecycle message from the "state" channel.
///
/// Externally tagged: every message is a single-key JSON object whose key
/// names the kind, e.g. `{"game_lost":{}}` or `{"game_start":{...}}`.
/// Matching on this enum is exhaustive, so adding a kind forces every
/// consumer to decide how to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMessage {
    /// Bot connected to the game server
    Connected {},
    /// Bot lost its game-server connection
    Disconnected {},
    /// Bot joined a lobby
    Joined {},
    /// Bot left a lobby
    Left {},
    /// A game began without start details (resumed session)
    Playing {},
    /// Game over, bot lost
    GameLost {},
    /// Game over, bot won
    GameWon {},
    /// A game began, with its identifying details
    GameStart(GameStart),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn state_message_uses_single_key_wire_shape() {
        let json = serde_json::to_string(&StateMessage::GameLost {}).unwrap();
        assert_eq!(json, r#"{"game_lost":{}}"#);

        let json = serde_json::to_string(&StateMessage::Connected {}).unwrap();
        assert_eq!(json, r#"{"connected":{}}"#);
    }

    #[test]
    fn game_start_round_trips_with_camel_case_player_index() {
        let msg = StateMessage::GameStart(GameStart {
            game_type: GameType::Custom,
            replay_id: "R1".to_string(),
            player_index: 0,
            usernames: vec!["a".to_string(), "b".to_string()],
        });

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""playerIndex":0"#), "wire json: {json}");

        let back: StateMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn game_update_round_trips() {
        let update = GameUpdate {
            turn: 42,
            scores: vec![
                PlayerScore {
                    total: 120,
                    tiles: 30,
                    i: 0,
                    dead: false,
                },
                PlayerScore {
                    total: 0,
                    tiles: 0,
                    i: 1,
                    dead: true,
                },
            ],
        };

        let json = serde_json::to_string(&update).unwrap();
        let back: GameUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn game_type_wire_names() {
        assert_eq!(serde_json::to_string(&GameType::Duel).unwrap(), r#""1v1""#);
        assert_eq!(
            serde_json::to_string(&GameType::Custom).unwrap(),
            r#""custom""#
        );
    }
}
