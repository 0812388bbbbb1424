//! Observable game state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use gamewire_domain::{BotId, GamePhase, GameType, GameUpdate, PlayerScore, StateMessage};
use gamewire_relay::{ChannelKind, RelayError, TopicRouter};

use crate::events::GameEvent;

/// Capacity of the event broadcast channel. A consumer that lags behind by
/// more than this many events observes a `Lagged` error instead of blocking
/// delivery to others.
const EVENT_BUFFER: usize = 64;

/// Local view of one bot's game, folded from relay messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameSnapshot {
    pub game_type: GameType,
    pub phase: GamePhase,
    pub replay_id: Option<String>,
    pub player_index: Option<u32>,
    pub turn: u32,
    pub usernames: Option<Vec<String>>,
    pub scores: Option<Vec<PlayerScore>>,
    pub won: Option<bool>,
}

/// Subscribes to a bot's channels and maintains an observable snapshot.
///
/// Cloning is cheap; clones share the same snapshot and event stream.
#[derive(Clone)]
pub struct GameState {
    snapshot: Arc<RwLock<GameSnapshot>>,
    events: broadcast::Sender<GameEvent>,
}

impl GameState {
    /// Subscribe to the bot's "state" channel, and its "game update"
    /// channel when `turn_by_turn_updates` is set.
    pub async fn subscribe(
        router: &TopicRouter,
        bot: &BotId,
        turn_by_turn_updates: bool,
    ) -> Result<Self, RelayError> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let state = Self {
            snapshot: Arc::new(RwLock::new(GameSnapshot::default())),
            events,
        };

        let folder = state.clone();
        router
            .subscribe(bot, ChannelKind::State, move |msg: StateMessage| {
                folder.fold_state(msg);
            })
            .await?;

        if turn_by_turn_updates {
            let folder = state.clone();
            router
                .subscribe(bot, ChannelKind::GameUpdate, move |update: GameUpdate| {
                    folder.fold_update(update);
                })
                .await?;
        }

        Ok(state)
    }

    /// Current snapshot (a copy; it does not track later changes).
    pub fn snapshot(&self) -> GameSnapshot {
        self.read().clone()
    }

    /// New subscription to the event stream. Only events emitted after this
    /// call are delivered.
    pub fn events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, GameSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GameSnapshot> {
        self.snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: GameEvent) {
        // A send error just means nobody is listening right now.
        let _ = self.events.send(event);
    }

    fn fold_state(&self, msg: StateMessage) {
        tracing::debug!(message = ?msg, "state channel message");

        let (specific, phase) = {
            let mut snapshot = self.write();
            let specific = match msg {
                StateMessage::Connected {} => {
                    snapshot.phase = GamePhase::Connected;
                    GameEvent::Connected
                }
                StateMessage::Disconnected {} => {
                    snapshot.phase = GamePhase::Initializing;
                    GameEvent::Disconnected
                }
                StateMessage::Joined {} => {
                    snapshot.phase = GamePhase::JoinedLobby;
                    GameEvent::Joined
                }
                StateMessage::Left {} => {
                    snapshot.phase = GamePhase::Connected;
                    GameEvent::Left
                }
                StateMessage::Playing {} => {
                    snapshot.phase = GamePhase::Playing;
                    GameEvent::Playing
                }
                StateMessage::GameLost {} => {
                    snapshot.phase = GamePhase::Connected;
                    snapshot.won = Some(false);
                    GameEvent::Ended { won: false }
                }
                StateMessage::GameWon {} => {
                    snapshot.phase = GamePhase::Connected;
                    snapshot.won = Some(true);
                    GameEvent::Ended { won: true }
                }
                StateMessage::GameStart(start) => {
                    snapshot.phase = GamePhase::Playing;
                    snapshot.game_type = start.game_type;
                    snapshot.replay_id = Some(start.replay_id.clone());
                    snapshot.player_index = Some(start.player_index);
                    snapshot.turn = 0;
                    snapshot.usernames = Some(start.usernames);
                    snapshot.scores = None;
                    snapshot.won = None;
                    GameEvent::GameStart {
                        replay_id: start.replay_id,
                    }
                }
            };
            (specific, snapshot.phase)
        };

        self.emit(specific);
        self.emit(GameEvent::Phase(phase));
        self.emit(GameEvent::Update(self.snapshot()));
    }

    fn fold_update(&self, update: GameUpdate) {
        {
            let mut snapshot = self.write();
            snapshot.turn = update.turn;
            snapshot.scores = Some(update.scores);
        }
        self.emit(GameEvent::Update(self.snapshot()));
    }
}
