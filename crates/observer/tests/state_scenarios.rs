//! Scenario tests: channel messages folded into the observed snapshot,
//! with exact notification counts.

#![allow(clippy::unwrap_used)]

use tokio::sync::broadcast::error::TryRecvError;

use gamewire_domain::{
    BotId, GamePhase, GameStart, GameType, GameUpdate, PlayerScore, StateMessage,
};
use gamewire_observer::{GameEvent, GameState};
use gamewire_relay::transport::memory::MemoryBroker;
use gamewire_relay::{ChannelKind, TopicRouter};

async fn setup(turn_by_turn: bool) -> (TopicRouter, BotId, GameState) {
    let broker = MemoryBroker::new();
    let (publisher, subscriber) = broker.sessions();
    let router = TopicRouter::new(publisher, subscriber);
    let bot = BotId::new("bot-1");
    let state = GameState::subscribe(&router, &bot, turn_by_turn)
        .await
        .unwrap();
    (router, bot, state)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

#[tokio::test]
async fn game_start_captures_details_and_fires_one_notification() {
    let (router, bot, state) = setup(false).await;
    let mut rx = state.events();

    router
        .publish(
            &bot,
            ChannelKind::State,
            &StateMessage::GameStart(GameStart {
                game_type: GameType::Custom,
                replay_id: "R1".to_string(),
                player_index: 0,
                usernames: vec!["a".to_string(), "b".to_string()],
            }),
        )
        .await
        .unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.phase, GamePhase::Playing);
    assert_eq!(snapshot.game_type, GameType::Custom);
    assert_eq!(snapshot.replay_id.as_deref(), Some("R1"));
    assert_eq!(snapshot.player_index, Some(0));
    assert_eq!(snapshot.turn, 0);
    assert_eq!(
        snapshot.usernames,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(snapshot.scores, None);
    assert_eq!(snapshot.won, None);

    let events = drain(&mut rx);
    let starts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::GameStart { .. }))
        .collect();
    assert_eq!(
        starts,
        vec![&GameEvent::GameStart {
            replay_id: "R1".to_string()
        }]
    );
    assert!(events.contains(&GameEvent::Phase(GamePhase::Playing)));
}

#[tokio::test]
async fn game_start_resets_leftovers_from_a_previous_game() {
    let (router, bot, state) = setup(true).await;

    router
        .publish(
            &bot,
            ChannelKind::GameUpdate,
            &GameUpdate {
                turn: 17,
                scores: vec![PlayerScore {
                    total: 5,
                    tiles: 2,
                    i: 0,
                    dead: false,
                }],
            },
        )
        .await
        .unwrap();
    router
        .publish(&bot, ChannelKind::State, &StateMessage::GameWon {})
        .await
        .unwrap();
    assert_eq!(state.snapshot().won, Some(true));

    router
        .publish(
            &bot,
            ChannelKind::State,
            &StateMessage::GameStart(GameStart {
                game_type: GameType::Duel,
                replay_id: "R2".to_string(),
                player_index: 1,
                usernames: vec!["a".to_string(), "b".to_string()],
            }),
        )
        .await
        .unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.turn, 0);
    assert_eq!(snapshot.scores, None);
    assert_eq!(snapshot.won, None);
    assert_eq!(snapshot.replay_id.as_deref(), Some("R2"));
}

#[tokio::test]
async fn game_lost_sets_won_false_and_fires_one_ended() {
    let (router, bot, state) = setup(false).await;
    let mut rx = state.events();

    router
        .publish(&bot, ChannelKind::State, &StateMessage::GameLost {})
        .await
        .unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.won, Some(false));
    assert_eq!(snapshot.phase, GamePhase::Connected);

    let events = drain(&mut rx);
    let ended: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, GameEvent::Ended { .. }))
        .collect();
    assert_eq!(ended, vec![&GameEvent::Ended { won: false }]);
}

#[tokio::test]
async fn lifecycle_messages_move_the_phase() {
    let (router, bot, state) = setup(false).await;

    for (msg, phase) in [
        (StateMessage::Connected {}, GamePhase::Connected),
        (StateMessage::Joined {}, GamePhase::JoinedLobby),
        (StateMessage::Left {}, GamePhase::Connected),
        (StateMessage::Playing {}, GamePhase::Playing),
        (StateMessage::Disconnected {}, GamePhase::Initializing),
    ] {
        router.publish(&bot, ChannelKind::State, &msg).await.unwrap();
        assert_eq!(state.snapshot().phase, phase, "after {msg:?}");
    }
}

#[tokio::test]
async fn turn_updates_fold_into_the_snapshot_when_enabled() {
    let (router, bot, state) = setup(true).await;
    let mut rx = state.events();

    let update = GameUpdate {
        turn: 3,
        scores: vec![
            PlayerScore {
                total: 10,
                tiles: 4,
                i: 0,
                dead: false,
            },
            PlayerScore {
                total: 8,
                tiles: 3,
                i: 1,
                dead: false,
            },
        ],
    };
    router
        .publish(&bot, ChannelKind::GameUpdate, &update)
        .await
        .unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.turn, 3);
    assert_eq!(snapshot.scores, Some(update.scores.clone()));

    // A game update is a snapshot change only, no lifecycle events.
    let events = drain(&mut rx);
    assert_eq!(events, vec![GameEvent::Update(snapshot)]);
}

#[tokio::test]
async fn turn_updates_are_ignored_when_disabled() {
    let (router, bot, state) = setup(false).await;

    let receivers = router
        .publish(
            &bot,
            ChannelKind::GameUpdate,
            &GameUpdate {
                turn: 3,
                scores: Vec::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(receivers, 0, "nobody should be subscribed");
    assert_eq!(state.snapshot().turn, 0);
}
