use gamewire_domain::GamePhase;

use crate::state::GameSnapshot;

/// Change notification emitted by [`crate::GameState`].
///
/// Every state-channel message produces its specific event first, then a
/// [`GameEvent::Phase`], then a [`GameEvent::Update`] carrying the new
/// snapshot. Game-update messages produce an [`GameEvent::Update`] only.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Bot connected to the game server
    Connected,
    /// Bot lost its game-server connection
    Disconnected,
    /// Bot joined a lobby
    Joined,
    /// Bot left a lobby
    Left,
    /// A game is underway without start details
    Playing,
    /// A game began; carries the replay id identifying it
    GameStart { replay_id: String },
    /// The game ended
    Ended { won: bool },
    /// Phase after folding the latest state message
    Phase(GamePhase),
    /// Snapshot after folding any message
    Update(GameSnapshot),
}
