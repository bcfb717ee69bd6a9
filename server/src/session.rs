//! Per-session actor.
//!
//! Each live battle is owned by one task reading commands from its inbox,
//! so intents, timeouts and disconnect forfeits for a session are applied
//! one at a time and in arrival order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arena_battle::{BattleSession, HpCheckpoint, SubmitOutcome};
use arena_protocol::{BattleMode, EndReason, Intent, Seat, ServerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Shared;
use crate::error::EngineError;
use crate::store::Consumed;

pub(crate) enum SessionCommand {
    Intent {
        seat: Seat,
        intent: Intent,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    SeatDisconnected {
        seat: Seat,
    },
    /// The seat's identity attached a new link; resend the battle state
    SeatReconnected {
        seat: Seat,
    },
    ForceEnd {
        loser: Option<Seat>,
        reason: EndReason,
    },
}

/// Cloneable address of a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    identities: [Option<String>; 2],
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: Uuid,
        identities: [Option<String>; 2],
        tx: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self { id, identities, tx }
    }

    /// Human identities, in seat order
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.identities.iter().flatten().map(String::as_str)
    }

    pub fn seat_of(&self, identity: &str) -> Option<Seat> {
        [Seat::A, Seat::B]
            .into_iter()
            .find(|seat| self.identities[seat.index()].as_deref() == Some(identity))
    }

    /// False once the actor has stopped
    pub(crate) fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Queue an intent and wait for the actor's verdict
    pub(crate) async fn submit(&self, seat: Seat, intent: Intent) -> Result<(), EngineError> {
        let (reply, verdict) = oneshot::channel();
        if !self.send(SessionCommand::Intent {
            seat,
            intent,
            reply,
        }) {
            return Err(EngineError::SessionNotFound(self.id));
        }

        // A dropped reply means the session ended before reaching this intent
        verdict
            .await
            .unwrap_or(Err(EngineError::SessionNotFound(self.id)))
    }
}

/// `battle.start` as seen from one seat
pub(crate) fn start_event(battle: &BattleSession, seat: Seat) -> ServerEvent {
    ServerEvent::BattleStart {
        session_id: battle.id(),
        mode: battle.mode(),
        seat,
        seat_a: battle.view(Seat::A),
        seat_b: battle.view(Seat::B),
    }
}

pub(crate) struct SessionActor {
    battle: BattleSession,
    shared: Arc<Shared>,
    inbox: mpsc::UnboundedReceiver<SessionCommand>,
    disconnected: [bool; 2],
    turn_deadline: Option<Instant>,
    /// Time left on the turn clock while a seat is in grace
    turn_paused: Option<Duration>,
    concluded: bool,
    /// Last HP written to the roster store per (identity, slot)
    flushed: HashMap<(String, usize), u32>,
}

impl SessionActor {
    pub(crate) fn new(
        battle: BattleSession,
        shared: Arc<Shared>,
        inbox: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        let flushed = battle
            .checkpoints()
            .into_iter()
            .map(|c| ((c.identity, c.slot), c.current_hp))
            .collect();

        Self {
            battle,
            shared,
            inbox,
            disconnected: [false, false],
            turn_deadline: None,
            turn_paused: None,
            concluded: false,
            flushed,
        }
    }

    pub(crate) async fn run(mut self) {
        let session_id = self.battle.id();
        info!(%session_id, mode = %self.battle.mode(), "Session started");
        self.reset_turn_clock();

        while !self.battle.is_ended() {
            let deadline = self.turn_deadline;

            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(command) => self.dispatch(command).await,
                    None => {
                        debug!(%session_id, "Session inbox closed");
                        return;
                    }
                },
                _ = wait_until(deadline) => self.on_turn_timeout(),
            }
        }

        self.conclude().await;
    }

    async fn dispatch(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Intent {
                seat,
                intent,
                reply,
            } => {
                let verdict = self.on_intent(seat, intent).await;
                if let Err(e) = &verdict {
                    debug!(session_id = %self.battle.id(), %seat, error = %e, "Intent rejected");
                }
                // The sender sees battle.end before its call returns
                if self.battle.is_ended() {
                    self.conclude().await;
                }
                let _ = reply.send(verdict);
            }
            SessionCommand::SeatDisconnected { seat } => self.on_disconnected(seat),
            SessionCommand::SeatReconnected { seat } => self.on_reconnected(seat),
            SessionCommand::ForceEnd { loser, reason } => {
                if self.battle.force_end(loser, reason) {
                    info!(
                        session_id = %self.battle.id(),
                        loser = ?loser,
                        %reason,
                        "Session forced to end"
                    );
                }
            }
        }
    }

    async fn on_intent(&mut self, seat: Seat, intent: Intent) -> Result<(), EngineError> {
        let session_id = self.battle.id();
        self.battle
            .check_intent(seat, &intent)
            .map_err(|e| EngineError::from_intent(session_id, e))?;

        // The ball is spent before the throw; a refused purchase leaves the turn untouched
        if let Intent::Capture { ball } = intent {
            let identity = self.identity(seat).unwrap_or_default();
            match self
                .shared
                .inventory
                .consume_item(&identity, ball.item_kind())
                .await?
            {
                Consumed::Ok => {}
                Consumed::Insufficient => {
                    return Err(EngineError::InsufficientItem(
                        ball.display_name().to_string(),
                    ));
                }
            }
        }

        let outcome = self
            .battle
            .submit(seat, intent)
            .map_err(|e| EngineError::from_intent(session_id, e))?;
        self.send_to_seat(seat, ServerEvent::IntentAck { session_id });

        match outcome {
            SubmitOutcome::Waiting => {
                debug!(%session_id, %seat, "Intent buffered");
            }
            SubmitOutcome::Resolved(report) => {
                debug!(%session_id, turn = report.turn_number, "Turn resolved");
                self.broadcast(ServerEvent::TurnResolved {
                    session_id,
                    log: report.log,
                    seat_a: report.seat_a,
                    seat_b: report.seat_b,
                    turn_number: report.turn_number,
                    awaiting_switch: report.awaiting_switch,
                });
                self.flush(report.checkpoints).await;
                self.reset_turn_clock();
            }
            SubmitOutcome::Switched(report) => {
                self.broadcast(ServerEvent::Switched {
                    session_id,
                    seat: report.seat,
                    log: report.log,
                    seat_a: report.seat_a,
                    seat_b: report.seat_b,
                });
                self.flush(report.checkpoints).await;
                if report.resumed {
                    self.reset_turn_clock();
                }
            }
            SubmitOutcome::Ended => {}
        }
        Ok(())
    }

    fn on_disconnected(&mut self, seat: Seat) {
        // Stale notice: the identity attached a new link before this arrived
        if let Some(identity) = self.battle.seat(seat).identity()
            && self.shared.presence.is_online(identity)
        {
            debug!(session_id = %self.battle.id(), %seat, "Seat already back online");
            return;
        }

        self.disconnected[seat.index()] = true;
        self.pause_turn_clock();
        info!(session_id = %self.battle.id(), %seat, "Seat disconnected, grace started");

        let event = ServerEvent::OpponentDisconnected {
            display_name: self.battle.seat(seat).owner_label(),
            grace_ms: self.shared.config.grace_period.as_millis() as u64,
        };
        self.send_to_seat(seat.other(), event);
    }

    fn on_reconnected(&mut self, seat: Seat) {
        let was_disconnected = std::mem::replace(&mut self.disconnected[seat.index()], false);

        self.send_to_seat(seat, start_event(&self.battle, seat));
        if was_disconnected {
            info!(session_id = %self.battle.id(), %seat, "Seat reconnected");
            let event = ServerEvent::OpponentReconnected {
                display_name: self.battle.seat(seat).owner_label(),
            };
            self.send_to_seat(seat.other(), event);
        }

        self.resume_turn_clock();
    }

    /// The seats still owing a choice forfeit; if both owe one, nobody wins
    fn on_turn_timeout(&mut self) {
        self.turn_deadline = None;
        self.turn_paused = None;
        let waiting = self.battle.waiting_on();
        let loser = match waiting.as_slice() {
            [] => return,
            [seat] => Some(*seat),
            _ => None,
        };

        warn!(
            session_id = %self.battle.id(),
            turn = self.battle.turn_number(),
            loser = ?loser,
            "Turn timed out"
        );
        self.battle.force_end(loser, EndReason::Timeout);
    }

    /// Flush, report, release, then tell both seats
    async fn conclude(&mut self) {
        if std::mem::replace(&mut self.concluded, true) {
            return;
        }
        let session_id = self.battle.id();
        let checkpoints = self.battle.checkpoints();
        self.flush(checkpoints).await;

        let outcome = self.battle.take_outcome();
        if let Some(outcome) = &outcome {
            self.shared.reporter.report(outcome).await;
        }

        self.shared.sessions.release(session_id);
        for identity in self.battle.participants() {
            self.shared.presence.cancel_grace(&identity);
        }

        if let Some(outcome) = outcome {
            self.broadcast(ServerEvent::BattleEnd {
                session_id,
                winner_identity: outcome.winner_identity,
                end_reason: outcome.end_reason,
                turn_number: outcome.turn_number,
                captured: outcome.captured,
            });
        }
    }

    async fn flush(&mut self, checkpoints: Vec<HpCheckpoint>) {
        for checkpoint in checkpoints {
            let key = (checkpoint.identity.clone(), checkpoint.slot);
            if self.flushed.get(&key) == Some(&checkpoint.current_hp) {
                continue;
            }

            let written = self
                .shared
                .roster
                .set_active_hp(&checkpoint.identity, checkpoint.slot, checkpoint.current_hp)
                .await;
            match written {
                Ok(()) => {
                    self.flushed.insert(key, checkpoint.current_hp);
                }
                Err(e) => warn!(
                    session_id = %self.battle.id(),
                    identity = %checkpoint.identity,
                    slot = checkpoint.slot,
                    error = %e,
                    "Failed to write HP checkpoint"
                ),
            }
        }
    }

    fn any_disconnected(&self) -> bool {
        self.disconnected.iter().any(|d| *d)
    }

    /// Start a full turn window, held paused if a seat is in grace
    fn reset_turn_clock(&mut self) {
        self.turn_deadline = None;
        self.turn_paused = None;
        if self.battle.mode() != BattleMode::Pvp || self.battle.is_ended() {
            return;
        }

        let window = self.shared.config.turn_timeout;
        if self.any_disconnected() {
            self.turn_paused = Some(window);
        } else {
            self.turn_deadline = Some(Instant::now() + window);
        }
    }

    /// The turn clock does not run while a seat is in its grace period
    fn pause_turn_clock(&mut self) {
        if let Some(deadline) = self.turn_deadline.take() {
            self.turn_paused = Some(deadline.saturating_duration_since(Instant::now()));
        }
    }

    /// Continue with the time that was left, once every seat is back
    fn resume_turn_clock(&mut self) {
        if self.any_disconnected() {
            return;
        }
        if let Some(left) = self.turn_paused.take() {
            self.turn_deadline = Some(Instant::now() + left);
        }
    }

    fn identity(&self, seat: Seat) -> Option<String> {
        self.battle.seat(seat).identity().map(str::to_string)
    }

    fn send_to_seat(&self, seat: Seat, event: ServerEvent) {
        if let Some(identity) = self.battle.seat(seat).identity() {
            self.shared.presence.send_to(identity, event);
        }
    }

    /// Both seats get the same event in the same order
    fn broadcast(&self, event: ServerEvent) {
        for seat in [Seat::A, Seat::B] {
            self.send_to_seat(seat, event.clone());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
