use std::sync::Arc;
use std::time::Duration;

use arena_battle::{Combatant, Move, MoveEffect};
use arena_protocol::{BallKind, BattleMode, ClientCommand, EndReason, Intent, Seat, ServerEvent};
use futures_util::future::join_all;
use uuid::Uuid;

use super::*;

fn tackle() -> Move {
    Move::new("tackle", 40, 100, 35)
}

fn splash() -> Move {
    Move::status("splash", MoveEffect::None, 100, 40)
}

fn open_server() -> (ArenaServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.set_roster(
        "ash",
        vec![Combatant::new("pikachu", 35, 12).with_moves(vec![tackle()])],
    );
    store.set_roster(
        "gary",
        vec![Combatant::new("eevee", 55, 12).with_moves(vec![tackle()])],
    );
    store.set_roster(
        "misty",
        vec![Combatant::new("staryu", 30, 12).with_moves(vec![tackle()])],
    );

    let config = ServerConfig {
        rng_seed: Some(1),
        ..ServerConfig::default()
    };
    let server = ArenaServer::open(config, store.clone(), store.clone());
    (server, store)
}

async fn next_event(rx: &mut EventReceiver) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(600), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("link closed")
}

fn drain(rx: &mut EventReceiver) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Challenge, accept, and return the new session id with both receivers drained
async fn start_pvp(
    server: &ArenaServer,
    ash: LinkId,
    ash_rx: &mut EventReceiver,
    gary: LinkId,
    gary_rx: &mut EventReceiver,
) -> Uuid {
    server
        .execute(
            ash,
            ClientCommand::IssueChallenge {
                to_identity: "gary".to_string(),
            },
        )
        .await
        .unwrap();
    let ServerEvent::ChallengeSent { challenge_id } = next_event(ash_rx).await else {
        panic!("expected challenge.sent");
    };
    assert!(matches!(
        next_event(gary_rx).await,
        ServerEvent::ChallengeIncoming { .. }
    ));

    server
        .execute(
            gary,
            ClientCommand::RespondChallenge {
                challenge_id,
                accept: true,
            },
        )
        .await
        .unwrap();

    let ServerEvent::BattleStart { session_id, .. } = next_event(ash_rx).await else {
        panic!("expected battle.start");
    };
    assert!(matches!(
        next_event(gary_rx).await,
        ServerEvent::BattleStart { .. }
    ));
    session_id
}

fn intent(session_id: Uuid, intent: Intent) -> ClientCommand {
    ClientCommand::Intent { session_id, intent }
}

#[tokio::test(start_paused = true)]
async fn test_challenge_accept_and_first_turn() {
    let (server, store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();

    server
        .handle(
            ash,
            ClientCommand::IssueChallenge {
                to_identity: "gary".to_string(),
            },
        )
        .await;
    let ServerEvent::ChallengeSent { challenge_id } = next_event(&mut ash_rx).await else {
        panic!("expected challenge.sent");
    };
    assert_eq!(
        next_event(&mut gary_rx).await,
        ServerEvent::ChallengeIncoming {
            challenge_id,
            from_identity: "ash".to_string(),
            from_display_name: "Ash".to_string(),
        }
    );

    server
        .handle(
            gary,
            ClientCommand::RespondChallenge {
                challenge_id,
                accept: true,
            },
        )
        .await;
    assert_eq!(server.challenge_status(challenge_id), Some(ChallengeStatus::Accepted));

    let ServerEvent::BattleStart {
        session_id,
        mode,
        seat,
        seat_a,
        seat_b,
    } = next_event(&mut ash_rx).await
    else {
        panic!("expected battle.start");
    };
    assert_eq!(mode, BattleMode::Pvp);
    assert_eq!(seat, Seat::A);
    assert_eq!(seat_a.creature_kind, "pikachu");
    assert_eq!(seat_b.creature_kind, "eevee");

    let ServerEvent::BattleStart { seat, .. } = next_event(&mut gary_rx).await else {
        panic!("expected battle.start");
    };
    assert_eq!(seat, Seat::B);
    assert_eq!(server.session_of("ash"), Some(session_id));

    server.handle(ash, intent(session_id, Intent::Move { slot: 0 })).await;
    assert_eq!(drain(&mut ash_rx), vec![ServerEvent::IntentAck { session_id }]);

    server.handle(gary, intent(session_id, Intent::Move { slot: 0 })).await;
    assert_eq!(next_event(&mut gary_rx).await, ServerEvent::IntentAck { session_id });

    let resolved_for_ash = next_event(&mut ash_rx).await;
    let resolved_for_gary = next_event(&mut gary_rx).await;
    assert_eq!(resolved_for_ash, resolved_for_gary);

    let ServerEvent::TurnResolved {
        turn_number,
        seat_a,
        log,
        ..
    } = resolved_for_ash
    else {
        panic!("expected battle.turn.resolved");
    };
    assert_eq!(turn_number, 1);
    assert!(log.iter().any(|l| l == "Ash's pikachu used tackle!"));

    // HP was checkpointed to the roster store
    assert_eq!(store.roster("ash")[0].current_hp, seat_a.current_hp);
}

#[tokio::test(start_paused = true)]
async fn test_pvp_disconnect_forfeit_after_grace() {
    let (server, store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.disconnect(ash);

    assert_eq!(
        next_event(&mut gary_rx).await,
        ServerEvent::OpponentDisconnected {
            display_name: "Ash".to_string(),
            grace_ms: 45_000,
        }
    );

    let started = tokio::time::Instant::now();
    let end = next_event(&mut gary_rx).await;
    assert!(started.elapsed() >= Duration::from_secs(45));
    assert_eq!(
        end,
        ServerEvent::BattleEnd {
            session_id,
            winner_identity: Some("gary".to_string()),
            end_reason: EndReason::Disconnect,
            turn_number: 0,
            captured: false,
        }
    );

    let outcomes = store.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].session_id, session_id);
    assert_eq!(outcomes[0].end_reason, EndReason::Disconnect);
    assert_eq!(server.session_of("gary"), None);
    assert_eq!(server.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_resumes() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.disconnect(ash);
    assert!(matches!(
        next_event(&mut gary_rx).await,
        ServerEvent::OpponentDisconnected { .. }
    ));

    tokio::time::sleep(Duration::from_secs(20)).await;
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();

    let ServerEvent::BattleStart {
        session_id: resumed,
        seat,
        ..
    } = next_event(&mut ash_rx).await
    else {
        panic!("expected battle.start resync");
    };
    assert_eq!(resumed, session_id);
    assert_eq!(seat, Seat::A);
    assert_eq!(
        next_event(&mut gary_rx).await,
        ServerEvent::OpponentReconnected {
            display_name: "Ash".to_string(),
        }
    );

    // Past the original grace deadline, inside the fresh turn window
    tokio::time::sleep(Duration::from_secs(26)).await;
    assert!(drain(&mut gary_rx).is_empty());
    assert_eq!(server.session_of("ash"), Some(session_id));

    server.handle(ash, intent(session_id, Intent::Move { slot: 0 })).await;
    assert_eq!(drain(&mut ash_rx), vec![ServerEvent::IntentAck { session_id }]);
}

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_forfeits_idle_seat() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.handle(ash, intent(session_id, Intent::Move { slot: 0 })).await;
    assert_eq!(next_event(&mut ash_rx).await, ServerEvent::IntentAck { session_id });

    let ServerEvent::BattleEnd {
        winner_identity,
        end_reason,
        ..
    } = next_event(&mut ash_rx).await
    else {
        panic!("expected battle.end");
    };
    assert_eq!(end_reason, EndReason::Timeout);
    assert_eq!(winner_identity.as_deref(), Some("ash"));
    assert!(matches!(
        next_event(&mut gary_rx).await,
        ServerEvent::BattleEnd { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_forfeit_ends_for_both_and_further_intents_fail() {
    let (server, store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.handle(ash, intent(session_id, Intent::Forfeit)).await;

    assert_eq!(next_event(&mut ash_rx).await, ServerEvent::IntentAck { session_id });
    for rx in [&mut ash_rx, &mut gary_rx] {
        let ServerEvent::BattleEnd {
            winner_identity,
            end_reason,
            ..
        } = next_event(rx).await
        else {
            panic!("expected battle.end");
        };
        assert_eq!(end_reason, EndReason::Forfeit);
        assert_eq!(winner_identity.as_deref(), Some("gary"));
    }

    let err = server
        .execute(gary, intent(session_id, Intent::Forfeit))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::SessionNotFound(session_id));
    assert!(!err.retryable());
    assert_eq!(store.outcomes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_errors() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, _gary_rx) = server.connect("gary", "Gary").unwrap();
    let issue = |to: &str| ClientCommand::IssueChallenge {
        to_identity: to.to_string(),
    };

    assert_eq!(
        server.execute(ash, issue("ash")).await.unwrap_err(),
        EngineError::SelfChallenge
    );
    assert_eq!(
        server.execute(ash, issue("misty")).await.unwrap_err(),
        EngineError::PlayerOffline("misty".to_string())
    );

    server.execute(ash, issue("gary")).await.unwrap();
    let ServerEvent::ChallengeSent { challenge_id } = next_event(&mut ash_rx).await else {
        panic!("expected challenge.sent");
    };
    assert_eq!(
        server.execute(ash, issue("gary")).await.unwrap_err(),
        EngineError::AlreadyChallenging("gary".to_string())
    );

    let respond = |challenge_id| ClientCommand::RespondChallenge {
        challenge_id,
        accept: true,
    };
    assert_eq!(
        server.execute(ash, respond(challenge_id)).await.unwrap_err(),
        EngineError::NotAddressee
    );
    let unknown = Uuid::new_v4();
    assert_eq!(
        server.execute(gary, respond(unknown)).await.unwrap_err(),
        EngineError::ChallengeNotFound(unknown)
    );

    assert_eq!(
        server.execute(9_999, issue("gary")).await.unwrap_err(),
        EngineError::NotAuthenticated
    );

    // handle() reports the failure to the link
    server.handle(ash, issue("ash")).await;
    assert_eq!(
        next_event(&mut ash_rx).await,
        ServerEvent::Error {
            message: "You cannot challenge yourself".to_string(),
            retryable: false,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_decline_notifies_challenger() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, _gary_rx) = server.connect("gary", "Gary").unwrap();

    server
        .execute(
            ash,
            ClientCommand::IssueChallenge {
                to_identity: "gary".to_string(),
            },
        )
        .await
        .unwrap();
    let ServerEvent::ChallengeSent { challenge_id } = next_event(&mut ash_rx).await else {
        panic!("expected challenge.sent");
    };

    server
        .execute(
            gary,
            ClientCommand::RespondChallenge {
                challenge_id,
                accept: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut ash_rx).await,
        ServerEvent::ChallengeDeclined {
            challenge_id,
            by_display_name: "Gary".to_string(),
            expired: false,
        }
    );
    assert_eq!(server.challenge_status(challenge_id), Some(ChallengeStatus::Declined));
    assert_eq!(server.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_expires() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (_gary, _gary_rx) = server.connect("gary", "Gary").unwrap();

    server
        .execute(
            ash,
            ClientCommand::IssueChallenge {
                to_identity: "gary".to_string(),
            },
        )
        .await
        .unwrap();
    let ServerEvent::ChallengeSent { challenge_id } = next_event(&mut ash_rx).await else {
        panic!("expected challenge.sent");
    };

    let started = tokio::time::Instant::now();
    assert_eq!(
        next_event(&mut ash_rx).await,
        ServerEvent::ChallengeDeclined {
            challenge_id,
            by_display_name: "Gary".to_string(),
            expired: true,
        }
    );
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(server.challenge_status(challenge_id), Some(ChallengeStatus::Expired));
}

#[tokio::test(start_paused = true)]
async fn test_accept_while_in_battle_declines() {
    let (server, _store) = open_server();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let (misty, mut misty_rx) = server.connect("misty", "Misty").unwrap();

    server
        .spawn_wild_battle("gary", Combatant::new("rattata", 30, 3))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut gary_rx).await,
        ServerEvent::BattleStart { .. }
    ));

    server
        .execute(
            misty,
            ClientCommand::IssueChallenge {
                to_identity: "gary".to_string(),
            },
        )
        .await
        .unwrap();
    let ServerEvent::ChallengeSent { challenge_id } = next_event(&mut misty_rx).await else {
        panic!("expected challenge.sent");
    };

    let err = server
        .execute(
            gary,
            ClientCommand::RespondChallenge {
                challenge_id,
                accept: true,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::AlreadyInBattle("gary".to_string()));
    assert_eq!(
        next_event(&mut misty_rx).await,
        ServerEvent::ChallengeDeclined {
            challenge_id,
            by_display_name: "Gary".to_string(),
            expired: false,
        }
    );
    assert_eq!(server.challenge_status(challenge_id), Some(ChallengeStatus::Declined));
    assert_eq!(server.active_sessions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_one_battle_per_identity() {
    let (server, _store) = open_server();
    let (_ash, _ash_rx) = server.connect("ash", "Ash").unwrap();

    let trainer = TrainerParty {
        name: "Brock".to_string(),
        party: vec![Combatant::new("onix", 35, 14).with_moves(vec![tackle()])],
    };
    server.spawn_trainer_battle("ash", trainer.clone()).await.unwrap();

    assert_eq!(
        server.spawn_wild_battle("ash", Combatant::new("pidgey", 40, 3)).await.unwrap_err(),
        EngineError::AlreadyInBattle("ash".to_string())
    );
    assert_eq!(
        server.spawn_trainer_battle("ash", trainer).await.unwrap_err(),
        EngineError::AlreadyInBattle("ash".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_party_without_usable_combatant() {
    let (server, store) = open_server();
    store.set_roster("ash", vec![Combatant::new("pikachu", 35, 12).with_hp(0)]);

    assert_eq!(
        server
            .spawn_wild_battle("ash", Combatant::new("pidgey", 40, 3))
            .await
            .unwrap_err(),
        EngineError::NoUsableCombatant("ash".to_string())
    );
    assert_eq!(server.active_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wild_capture_spends_a_ball() {
    let (server, store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let session_id = server
        .spawn_wild_battle("ash", Combatant::new("pidgey", 40, 5).with_hp(1))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut ash_rx).await,
        ServerEvent::BattleStart {
            mode: BattleMode::Wild,
            ..
        }
    ));

    let err = server
        .execute(ash, intent(session_id, Intent::Capture { ball: BallKind::Ultra }))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientItem("Ultra Ball".to_string()));
    assert!(err.retryable());
    assert!(drain(&mut ash_rx).is_empty());

    store.give_items("ash", "ultra_ball", 2);
    server
        .execute(ash, intent(session_id, Intent::Capture { ball: BallKind::Ultra }))
        .await
        .unwrap();

    assert_eq!(next_event(&mut ash_rx).await, ServerEvent::IntentAck { session_id });
    let ServerEvent::TurnResolved { log, .. } = next_event(&mut ash_rx).await else {
        panic!("expected battle.turn.resolved");
    };
    assert!(log.iter().any(|l| l == "Gotcha! pidgey was caught!"));
    assert_eq!(
        next_event(&mut ash_rx).await,
        ServerEvent::BattleEnd {
            session_id,
            winner_identity: Some("ash".to_string()),
            end_reason: EndReason::Capture,
            turn_number: 1,
            captured: true,
        }
    );

    assert_eq!(store.item_count("ash", "ultra_ball"), 1);
    assert_eq!(store.roster("ash").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_trainer_sweep_reports_once() {
    let (server, store) = open_server();
    store.set_roster(
        "ash",
        vec![Combatant::new("charmander", 100, 10).with_moves(vec![tackle()])],
    );
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();

    let trainer = TrainerParty {
        name: "Youngster Joey".to_string(),
        party: (0..3)
            .map(|i| {
                Combatant::new(format!("rattata-{}", i), 10, 2)
                    .with_moves(vec![tackle()])
                    .with_hp(1)
            })
            .collect(),
    };
    let session_id = server.spawn_trainer_battle("ash", trainer).await.unwrap();
    drain(&mut ash_rx);

    for _ in 0..3 {
        server
            .execute(ash, intent(session_id, Intent::Move { slot: 0 }))
            .await
            .unwrap();
    }

    let events = drain(&mut ash_rx);
    let turns: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::TurnResolved {
                turn_number,
                awaiting_switch,
                ..
            } => {
                assert!(awaiting_switch.is_empty());
                Some(*turn_number)
            }
            _ => None,
        })
        .collect();
    assert_eq!(turns, vec![1, 2, 3]);
    assert!(matches!(
        events.last(),
        Some(ServerEvent::BattleEnd {
            end_reason: EndReason::Whiteout,
            winner_identity: Some(winner),
            ..
        }) if winner == "ash"
    ));

    assert_eq!(store.outcomes().len(), 1);
    assert_eq!(
        server
            .execute(ash, intent(session_id, Intent::Move { slot: 0 }))
            .await
            .unwrap_err(),
        EngineError::SessionNotFound(session_id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_intents_resolve_one_turn_at_a_time() {
    let (server, store) = open_server();
    store.set_roster(
        "ash",
        vec![Combatant::new("pikachu", 100, 10).with_moves(vec![splash()])],
    );
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let trainer = TrainerParty {
        name: "Bugsy".to_string(),
        party: vec![Combatant::new("shuckle", 255, 100).with_moves(vec![splash()])],
    };
    let session_id = server.spawn_trainer_battle("ash", trainer).await.unwrap();
    drain(&mut ash_rx);

    let results = join_all(
        (0..5).map(|_| server.execute(ash, intent(session_id, Intent::Move { slot: 0 }))),
    )
    .await;
    assert!(results.iter().all(Result::is_ok));

    let turns: Vec<u32> = drain(&mut ash_rx)
        .into_iter()
        .filter_map(|e| match e {
            ServerEvent::TurnResolved { turn_number, .. } => Some(turn_number),
            _ => None,
        })
        .collect();
    assert_eq!(turns, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_pvp_intents_from_one_seat() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    let results = join_all(
        (0..2).map(|_| server.execute(ash, intent(session_id, Intent::Move { slot: 0 }))),
    )
    .await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(EngineError::NotYourTurn(_)))));
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_everything() {
    let (server, store) = open_server();
    let (_ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    server
        .spawn_wild_battle("ash", Combatant::new("pidgey", 40, 3))
        .await
        .unwrap();
    drain(&mut ash_rx);

    server.close();

    assert!(ash_rx.recv().await.is_none());
    assert_eq!(server.connect("ash", "Ash").unwrap_err(), EngineError::Closed);
    assert_eq!(server.active_sessions(), 0);
    assert!(store.outcomes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_cycles_do_not_refill_turn_clock() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.handle(ash, intent(session_id, Intent::Move { slot: 0 })).await;
    let started = tokio::time::Instant::now();

    // Gary never chooses; 10s online then 5s offline, over and over
    let (mut gary, mut _gary_rx) = (gary, gary_rx);
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_secs(10)).await;
        if server.session_of("ash").is_none() {
            break;
        }
        server.disconnect(gary);
        tokio::time::sleep(Duration::from_secs(5)).await;
        (gary, _gary_rx) = server.connect("gary", "Gary").unwrap();
    }

    assert_eq!(server.session_of("ash"), None);
    // 30s of online time plus the offline pauses, checked every 15s
    assert!(started.elapsed() <= Duration::from_secs(60));

    let end = drain(&mut ash_rx)
        .into_iter()
        .find(|e| matches!(e, ServerEvent::BattleEnd { .. }));
    let Some(ServerEvent::BattleEnd {
        winner_identity,
        end_reason,
        ..
    }) = end
    else {
        panic!("expected battle.end");
    };
    assert_eq!(end_reason, EndReason::Timeout);
    assert_eq!(winner_identity.as_deref(), Some("ash"));
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_spares_online_identity() {
    let (server, store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    // A grace timer registered after ash had already come back
    server
        .shared
        .presence
        .start_grace("ash", session_id, tokio::spawn(async {}));
    server.shared.expire_grace("ash");
    tokio::task::yield_now().await;

    assert_eq!(server.session_of("ash"), Some(session_id));
    assert!(drain(&mut gary_rx).is_empty());
    assert!(store.outcomes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_disconnect_notice_keeps_turn_clock() {
    let (server, _store) = open_server();
    let (ash, mut ash_rx) = server.connect("ash", "Ash").unwrap();
    let (gary, mut gary_rx) = server.connect("gary", "Gary").unwrap();
    let session_id = start_pvp(&server, ash, &mut ash_rx, gary, &mut gary_rx).await;

    server.handle(ash, intent(session_id, Intent::Move { slot: 0 })).await;
    assert_eq!(next_event(&mut ash_rx).await, ServerEvent::IntentAck { session_id });

    // Arrives after gary's new link attached
    let handle = server.shared.sessions.get(session_id).unwrap();
    assert!(handle.send(SessionCommand::SeatDisconnected { seat: Seat::B }));

    let started = tokio::time::Instant::now();
    let ServerEvent::BattleEnd {
        winner_identity,
        end_reason,
        ..
    } = next_event(&mut ash_rx).await
    else {
        panic!("expected battle.end without a disconnect notice");
    };
    assert_eq!(end_reason, EndReason::Timeout);
    assert_eq!(winner_identity.as_deref(), Some("ash"));
    assert!(started.elapsed() <= Duration::from_secs(30));
}
