//! BattleSession - the unit of adjudication

use std::time::SystemTime;

use arena_protocol::{BattleMode, CombatantView, EndReason, Intent, PartialCombatantView, Seat};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::error::{IntentError, SetupError};
use crate::outcome::BattleOutcome;
use crate::types::{Combatant, HpCheckpoint, PartyRoster};

/// Who controls a seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatOwner {
    /// A connected player; the only owner that submits intents
    Human {
        identity: String,
        display_name: String,
    },
    /// Scripted trainer whose actions are generated by the engine
    Trainer { name: String },
    /// A lone wild creature
    Wild,
}

/// One side of the battle
#[derive(Debug, Clone)]
pub struct SeatState {
    pub owner: SeatOwner,
    pub roster: PartyRoster,
}

impl SeatState {
    pub fn human(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        roster: PartyRoster,
    ) -> Self {
        Self {
            owner: SeatOwner::Human {
                identity: identity.into(),
                display_name: display_name.into(),
            },
            roster,
        }
    }

    pub fn trainer(name: impl Into<String>, roster: PartyRoster) -> Self {
        Self {
            owner: SeatOwner::Trainer { name: name.into() },
            roster,
        }
    }

    pub fn wild(combatant: Combatant) -> Result<Self, SetupError> {
        Ok(Self {
            owner: SeatOwner::Wild,
            roster: PartyRoster::single(combatant)?,
        })
    }

    pub fn is_human(&self) -> bool {
        matches!(self.owner, SeatOwner::Human { .. })
    }

    /// Identity of the controlling player, if any
    pub fn identity(&self) -> Option<&str> {
        match &self.owner {
            SeatOwner::Human { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Name of whoever controls the seat
    pub fn owner_label(&self) -> String {
        match &self.owner {
            SeatOwner::Human { display_name, .. } => display_name.clone(),
            SeatOwner::Trainer { name } => name.clone(),
            SeatOwner::Wild => format!("Wild {}", self.roster.active().name()),
        }
    }

    /// Name of the active combatant as it appears in the battle log
    pub fn combatant_label(&self) -> String {
        match &self.owner {
            SeatOwner::Wild => format!("Wild {}", self.roster.active().name()),
            _ => format!("{}'s {}", self.owner_label(), self.roster.active().name()),
        }
    }

    pub fn active(&self) -> &Combatant {
        self.roster.active()
    }
}

/// Lifecycle of a session.
///
/// `Selecting`, `Resolving` and `FaintedPendingSwitch` are the sub-states of
/// an active battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Selecting,
    Resolving,
    FaintedPendingSwitch,
    Ended(EndReason),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Selecting | SessionState::Resolving | SessionState::FaintedPendingSwitch
        )
    }
}

/// Everything both seats need to see after a resolved turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub turn_number: u32,
    pub log: Vec<String>,
    pub seat_a: PartialCombatantView,
    pub seat_b: PartialCombatantView,
    pub awaiting_switch: Vec<Seat>,
    pub end_reason: Option<EndReason>,
    pub checkpoints: Vec<HpCheckpoint>,
}

/// Result of a replacement switch out of the pending-switch state
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchReport {
    pub seat: Seat,
    pub log: Vec<String>,
    pub seat_a: PartialCombatantView,
    pub seat_b: PartialCombatantView,
    /// Whether the battle is back to selecting actions
    pub resumed: bool,
    pub checkpoints: Vec<HpCheckpoint>,
}

/// What an accepted intent did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Buffered until the other seat chooses
    Waiting,
    Resolved(TurnReport),
    Switched(SwitchReport),
    /// Forfeit; the session is over
    Ended,
}

/// One battle from creation to its terminal state.
///
/// All mutation goes through `submit` and `force_end`; each validates fully
/// before touching state, so a rejected call leaves the session unchanged.
#[derive(Debug, Clone)]
pub struct BattleSession {
    pub(crate) id: Uuid,
    pub(crate) mode: BattleMode,
    pub(crate) seats: [SeatState; 2],
    pub(crate) state: SessionState,
    pub(crate) turn_number: u32,
    pub(crate) pending: [Option<Intent>; 2],
    pub(crate) awaiting_switch: [bool; 2],
    pub(crate) log: Vec<String>,
    pub(crate) created_at: SystemTime,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) captured: Option<Combatant>,
    pub(crate) outcome: Option<BattleOutcome>,
}

impl BattleSession {
    /// Create a session in the `Created` state.
    ///
    /// The seat layout must fit the mode: PvP seats two different players,
    /// trainer and wild battles put the player in seat A.
    pub fn new(
        id: Uuid,
        mode: BattleMode,
        seat_a: SeatState,
        seat_b: SeatState,
        seed: u64,
    ) -> Result<Self, SetupError> {
        check_layout(mode, &seat_a, &seat_b)?;

        Ok(Self {
            id,
            mode,
            seats: [seat_a, seat_b],
            state: SessionState::Created,
            turn_number: 0,
            pending: [None, None],
            awaiting_switch: [false, false],
            log: Vec::new(),
            created_at: SystemTime::now(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            captured: None,
            outcome: None,
        })
    }

    /// Move from `Created` to selecting the first turn's actions
    pub fn start(&mut self) -> Vec<String> {
        if self.state != SessionState::Created {
            return Vec::new();
        }

        let mut lines = Vec::new();
        for seat in [Seat::A, Seat::B] {
            let side = &self.seats[seat.index()];
            let line = match side.owner {
                SeatOwner::Wild => format!("A wild {} appeared!", side.active().name()),
                _ => format!("{} sent out {}!", side.owner_label(), side.active().name()),
            };
            lines.push(line);
        }

        self.log.extend(lines.iter().cloned());
        self.state = SessionState::Selecting;
        lines
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> BattleMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Append-only battle log
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn seat(&self, seat: Seat) -> &SeatState {
        &self.seats[seat.index()]
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, SessionState::Ended(_))
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self.state {
            SessionState::Ended(reason) => Some(reason),
            _ => None,
        }
    }

    /// Seat controlled by the given identity
    pub fn seat_of(&self, identity: &str) -> Option<Seat> {
        [Seat::A, Seat::B]
            .into_iter()
            .find(|s| self.seats[s.index()].identity() == Some(identity))
    }

    /// Identities of the human seats, in seat order
    pub fn participants(&self) -> Vec<String> {
        self.seats
            .iter()
            .filter_map(|s| s.identity().map(str::to_string))
            .collect()
    }

    /// Seats that must still submit a replacement switch
    pub fn awaiting_switch(&self) -> Vec<Seat> {
        [Seat::A, Seat::B]
            .into_iter()
            .filter(|s| self.awaiting_switch[s.index()])
            .collect()
    }

    /// Human seats the session is currently waiting on
    pub fn waiting_on(&self) -> Vec<Seat> {
        match self.state {
            SessionState::Selecting => [Seat::A, Seat::B]
                .into_iter()
                .filter(|s| self.seats[s.index()].is_human() && self.pending[s.index()].is_none())
                .collect(),
            SessionState::FaintedPendingSwitch => self.awaiting_switch(),
            _ => Vec::new(),
        }
    }

    pub fn view(&self, seat: Seat) -> CombatantView {
        self.seats[seat.index()].active().to_view()
    }

    pub fn partial_view(&self, seat: Seat) -> PartialCombatantView {
        self.seats[seat.index()].active().to_partial_view()
    }

    /// HP of every human-owned roster member
    pub fn checkpoints(&self) -> Vec<HpCheckpoint> {
        self.seats
            .iter()
            .filter_map(|s| s.identity().map(|id| s.roster.checkpoints(id)))
            .flatten()
            .collect()
    }

    /// The terminal record, until it is taken
    pub fn outcome(&self) -> Option<&BattleOutcome> {
        self.outcome.as_ref()
    }

    /// Hand out the terminal record. Returns it exactly once.
    pub fn take_outcome(&mut self) -> Option<BattleOutcome> {
        self.outcome.take()
    }

    /// Check an intent against the current state without mutating anything
    pub fn check_intent(&self, seat: Seat, intent: &Intent) -> Result<(), IntentError> {
        match self.state {
            SessionState::Ended(_) => return Err(IntentError::SessionEnded),
            SessionState::Created | SessionState::Resolving => {
                return Err(IntentError::NotYourTurn(
                    "battle is not accepting actions".to_string(),
                ));
            }
            _ => {}
        }

        let side = &self.seats[seat.index()];
        if !side.is_human() {
            return Err(IntentError::NotYourTurn(
                "seat is not controlled by a player".to_string(),
            ));
        }

        if *intent == Intent::Forfeit {
            return Ok(());
        }

        if self.state == SessionState::FaintedPendingSwitch {
            if !self.awaiting_switch[seat.index()] {
                return Err(IntentError::NotYourTurn(
                    "waiting for the opponent to send out a replacement".to_string(),
                ));
            }
            return match intent {
                Intent::Switch { slot } => side
                    .roster
                    .check_switch(*slot)
                    .map_err(IntentError::InvalidIntent),
                _ => Err(IntentError::InvalidIntent(
                    "a replacement must be sent out first".to_string(),
                )),
            };
        }

        if self.pending[seat.index()].is_some() {
            return Err(IntentError::NotYourTurn(
                "an action was already chosen this turn".to_string(),
            ));
        }

        self.check_action(side, intent)
    }

    fn check_action(&self, side: &SeatState, intent: &Intent) -> Result<(), IntentError> {
        let active = side.active();
        match intent {
            Intent::Move { slot } => {
                // With every slot drained the combatant struggles regardless of slot
                if !active.has_usable_move() {
                    return Ok(());
                }
                let Some(chosen) = active.moves.get(*slot) else {
                    return Err(IntentError::InvalidIntent(format!(
                        "Unknown move slot {}",
                        slot
                    )));
                };
                if !chosen.has_pp() {
                    return Err(IntentError::InvalidIntent(format!(
                        "{} has no PP left",
                        chosen.id
                    )));
                }
                Ok(())
            }
            Intent::Switch { slot } => side
                .roster
                .check_switch(*slot)
                .map_err(IntentError::InvalidIntent),
            Intent::Capture { .. } if self.mode != BattleMode::Wild => Err(
                IntentError::InvalidIntent("There is no wild creature to capture".to_string()),
            ),
            Intent::Flee if self.mode != BattleMode::Wild => Err(IntentError::InvalidIntent(
                "You can't run from this battle".to_string(),
            )),
            Intent::Capture { .. } | Intent::Flee | Intent::Forfeit => Ok(()),
        }
    }

    /// Terminate from outside the intent flow (turn timeout, disconnect).
    ///
    /// `loser` of None ends without a winner. Returns false if the session
    /// had already ended.
    pub fn force_end(&mut self, loser: Option<Seat>, reason: EndReason) -> bool {
        if self.is_ended() {
            return false;
        }

        let line = match (loser, reason) {
            (Some(seat), EndReason::Disconnect) => {
                format!("{} disconnected.", self.seats[seat.index()].owner_label())
            }
            (Some(seat), EndReason::Timeout) => {
                format!("{} ran out of time.", self.seats[seat.index()].owner_label())
            }
            (Some(seat), _) => format!("{} lost the battle.", self.seats[seat.index()].owner_label()),
            (None, _) => "The battle ended without a winner.".to_string(),
        };
        self.log.push(line);

        self.finish(loser.map(|s| s.other()), reason);
        true
    }

    /// Enter the terminal state and build the outcome record
    pub(crate) fn finish(&mut self, winner: Option<Seat>, reason: EndReason) {
        if self.is_ended() {
            return;
        }

        self.state = SessionState::Ended(reason);
        self.pending = [None, None];
        self.awaiting_switch = [false, false];

        let winner_identity = winner
            .and_then(|s| self.seats[s.index()].identity())
            .map(str::to_string);

        self.outcome = Some(BattleOutcome {
            session_id: self.id,
            mode: self.mode,
            winner_identity,
            participants: self.participants(),
            end_reason: reason,
            turn_number: self.turn_number,
            captured: self.captured.is_some(),
            captured_combatant: self.captured.clone(),
        });
    }
}

fn check_layout(mode: BattleMode, a: &SeatState, b: &SeatState) -> Result<(), SetupError> {
    let mismatch = |why: &str| -> Result<(), SetupError> {
        Err(SetupError::ModeMismatch(mode, why.to_string()))
    };

    if !a.is_human() {
        return mismatch("seat A must be a player");
    }

    match (mode, &b.owner) {
        (BattleMode::Pvp, SeatOwner::Human { identity, .. }) => {
            if a.identity() == Some(identity.as_str()) {
                return mismatch("a player cannot battle themselves");
            }
            Ok(())
        }
        (BattleMode::Trainer, SeatOwner::Trainer { .. }) => Ok(()),
        (BattleMode::Wild, SeatOwner::Wild) => {
            if b.roster.len() != 1 {
                return mismatch("a wild encounter has exactly one creature");
            }
            Ok(())
        }
        _ => mismatch("seat B owner does not match the mode"),
    }
}
