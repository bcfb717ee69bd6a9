//! Real-time battle session server.
//!
//! [`ArenaServer`] is the engine behind the websocket listener: it owns the
//! presence table, the challenge handshake, the live session directory and
//! the outcome reporter. Each battle runs in its own task (see
//! [`session`]), so sessions never share mutable state.
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use arena_server::{ArenaServer, MemoryStore, ServerConfig};
//! use arena_protocol::ClientCommand;
//!
//! let store = Arc::new(MemoryStore::new());
//! let server = ArenaServer::open(ServerConfig::default(), store.clone(), store);
//!
//! let (link, mut events) = server.connect("ash", "Ash")?;
//! server
//!     .handle(link, ClientCommand::IssueChallenge { to_identity: "gary".into() })
//!     .await;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_wire_format());
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod matchmaking;
pub mod presence;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arena_battle::{BattleSession, Combatant, PartyRoster, SeatState};
use arena_protocol::{BattleMode, ClientCommand, EndReason, Intent, Seat, ServerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use config::ServerConfig;
pub use error::EngineError;
pub use matchmaking::ChallengeStatus;
pub use presence::{EventReceiver, LinkId};
pub use reporter::OutcomeReporter;
pub use session::SessionHandle;
pub use store::{Consumed, HttpStore, InventoryStore, MemoryStore, RewardReceipt, RosterStore};

use matchmaking::{Challenge, Matchmaking};
use presence::Presence;
use registry::SessionRegistry;
use session::{SessionActor, SessionCommand};

/// A scripted trainer and its party
#[derive(Debug, Clone)]
pub struct TrainerParty {
    pub name: String,
    pub party: Vec<Combatant>,
}

/// State shared by the server front, session actors and timers
pub(crate) struct Shared {
    pub(crate) config: ServerConfig,
    pub(crate) roster: Arc<dyn RosterStore>,
    pub(crate) inventory: Arc<dyn InventoryStore>,
    pub(crate) presence: Presence,
    pub(crate) challenges: Matchmaking,
    pub(crate) sessions: SessionRegistry,
    pub(crate) reporter: OutcomeReporter,
    seeds: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    /// Seed for the next session; sequential from `rng_seed` when configured
    fn next_seed(&self) -> u64 {
        match self.config.rng_seed {
            Some(base) => base.wrapping_add(self.seeds.fetch_add(1, Ordering::Relaxed)),
            None => rand::random(),
        }
    }

    fn sweep_challenges(&self) {
        for challenge in self.challenges.sweep(Instant::now()) {
            info!(
                challenge_id = %challenge.id,
                from = %challenge.from_identity,
                to = %challenge.to_identity,
                "Challenge expired"
            );
            self.notify_declined(&challenge, true);
        }
    }

    fn notify_declined(&self, challenge: &Challenge, expired: bool) {
        let by_display_name = self
            .presence
            .display_name(&challenge.to_identity)
            .unwrap_or_else(|| challenge.to_identity.clone());

        self.presence.send_to(
            &challenge.from_identity,
            ServerEvent::ChallengeDeclined {
                challenge_id: challenge.id,
                by_display_name,
                expired,
            },
        );
    }

    /// Forfeit a seat whose grace period ran out, unless it reconnected first
    fn expire_grace(&self, identity: &str) {
        let Some(session_id) = self.presence.claim_expired_grace(identity) else {
            return;
        };
        if self.presence.is_online(identity) {
            debug!(%session_id, identity, "Grace expired after reconnect, ignored");
            return;
        }
        let Some(handle) = self.sessions.get(session_id) else {
            return;
        };
        let Some(seat) = handle.seat_of(identity) else {
            return;
        };

        warn!(%session_id, identity, %seat, "Grace period expired");
        handle.send(SessionCommand::ForceEnd {
            loser: Some(seat),
            reason: EndReason::Disconnect,
        });
    }
}

/// The battle engine: one instance per deployment, opened and closed explicitly
pub struct ArenaServer {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ArenaServer {
    /// Start the engine and its challenge expiry sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        config: ServerConfig,
        roster: Arc<dyn RosterStore>,
        inventory: Arc<dyn InventoryStore>,
    ) -> Self {
        let shared = Arc::new(Shared {
            challenges: Matchmaking::new(config.challenge_timeout),
            reporter: OutcomeReporter::new(Arc::clone(&roster)),
            presence: Presence::new(),
            sessions: SessionRegistry::new(),
            seeds: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            config,
            roster,
            inventory,
        });

        let sweeper = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(shared.config.sweep_interval);
                loop {
                    ticker.tick().await;
                    shared.sweep_challenges();
                }
            })
        };

        info!(bind_addr = %shared.config.bind_addr, "Arena server opened");
        Self {
            shared,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Stop timers, drop every link and stop every live session.
    ///
    /// Sessions stopped this way produce no outcome.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(task) = sweeper.take()
        {
            task.abort();
        }
        self.shared.presence.clear();
        self.shared.sessions.clear();
        info!("Arena server closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn challenge_status(&self, challenge_id: Uuid) -> Option<ChallengeStatus> {
        self.shared.challenges.status(challenge_id)
    }

    /// Live session an identity is bound to
    pub fn session_of(&self, identity: &str) -> Option<Uuid> {
        self.shared.sessions.session_of(identity).map(|h| h.id)
    }

    pub fn active_sessions(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Attach an authenticated link.
    ///
    /// If the identity is seated in a live battle, the seat is rebound to
    /// this link (cancelling any grace timer) and the battle state is resent.
    pub fn connect(
        &self,
        identity: &str,
        display_name: &str,
    ) -> Result<(LinkId, EventReceiver), EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        if identity.is_empty() {
            return Err(EngineError::NotAuthenticated);
        }

        let (link, events) = self.shared.presence.attach(identity, display_name);
        info!(link, identity, "Link authenticated");

        self.shared.presence.cancel_grace(identity);
        if let Some(handle) = self.shared.sessions.session_of(identity)
            && let Some(seat) = handle.seat_of(identity)
        {
            handle.send(SessionCommand::SeatReconnected { seat });
        }

        Ok((link, events))
    }

    /// Detach a link; a seated identity enters its grace period
    pub fn disconnect(&self, link: LinkId) {
        let Some(identity) = self.shared.presence.detach(link) else {
            return;
        };
        info!(link, identity = %identity, "Link closed");

        let Some(handle) = self.shared.sessions.session_of(&identity) else {
            return;
        };
        let Some(seat) = handle.seat_of(&identity) else {
            return;
        };
        handle.send(SessionCommand::SeatDisconnected { seat });

        let grace = self.shared.config.grace_period;
        let timer = {
            let shared = Arc::clone(&self.shared);
            let identity = identity.clone();
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                shared.expire_grace(&identity);
            })
        };
        self.shared.presence.start_grace(&identity, handle.id, timer);

        // A connect that slipped in after detach found no timer to cancel
        if self.shared.presence.is_online(&identity) {
            self.shared.presence.cancel_grace(&identity);
        }
    }

    /// Apply a client command; failures are pushed to the link as `battle.error`
    pub async fn handle(&self, link: LinkId, command: ClientCommand) {
        if let Err(e) = self.execute(link, command).await {
            debug!(link, error = %e, "Command rejected");
            self.shared.presence.send_to_link(link, e.to_event());
        }
    }

    /// Apply a client command and return the failure instead of pushing it
    pub async fn execute(&self, link: LinkId, command: ClientCommand) -> Result<(), EngineError> {
        let (identity, display_name) = self
            .shared
            .presence
            .identity_of(link)
            .ok_or(EngineError::NotAuthenticated)?;

        match command {
            ClientCommand::Auth { .. } => Err(EngineError::AlreadyAuthenticated),
            ClientCommand::IssueChallenge { to_identity } => {
                self.issue_challenge(&identity, &display_name, &to_identity)
            }
            ClientCommand::RespondChallenge {
                challenge_id,
                accept,
            } => {
                self.respond_challenge(&identity, &display_name, challenge_id, accept)
                    .await
            }
            ClientCommand::Intent { session_id, intent } => {
                self.submit_intent(&identity, session_id, intent).await
            }
        }
    }

    fn issue_challenge(
        &self,
        identity: &str,
        display_name: &str,
        to_identity: &str,
    ) -> Result<(), EngineError> {
        if identity != to_identity && !self.shared.presence.is_online(to_identity) {
            return Err(EngineError::PlayerOffline(to_identity.to_string()));
        }

        let challenge = self
            .shared
            .challenges
            .issue(identity, display_name, to_identity)?;
        info!(challenge_id = %challenge.id, from = identity, to = to_identity, "Challenge issued");

        self.shared.presence.send_to(
            identity,
            ServerEvent::ChallengeSent {
                challenge_id: challenge.id,
            },
        );
        self.shared.presence.send_to(
            to_identity,
            ServerEvent::ChallengeIncoming {
                challenge_id: challenge.id,
                from_identity: challenge.from_identity.clone(),
                from_display_name: challenge.from_display_name.clone(),
            },
        );
        Ok(())
    }

    async fn respond_challenge(
        &self,
        identity: &str,
        display_name: &str,
        challenge_id: Uuid,
        accept: bool,
    ) -> Result<(), EngineError> {
        let challenge = self
            .shared
            .challenges
            .respond(challenge_id, identity, accept)?;

        if !accept {
            info!(%challenge_id, by = identity, "Challenge declined");
            self.shared.notify_declined(&challenge, false);
            return Ok(());
        }

        match self.start_pvp(&challenge, display_name).await {
            Ok(session_id) => {
                info!(%challenge_id, %session_id, "Challenge accepted");
                Ok(())
            }
            Err(e) => {
                // Accepting into an impossible battle declines the challenge
                self.shared.challenges.revoke(challenge_id);
                self.shared.notify_declined(&challenge, false);
                Err(e)
            }
        }
    }

    async fn start_pvp(&self, challenge: &Challenge, to_display_name: &str) -> Result<Uuid, EngineError> {
        for identity in [&challenge.from_identity, &challenge.to_identity] {
            if self.shared.sessions.is_engaged(identity) {
                return Err(EngineError::AlreadyInBattle(identity.clone()));
            }
        }

        let seat_a = self.load_party(&challenge.from_identity).await?;
        let seat_b = self.load_party(&challenge.to_identity).await?;

        let battle = BattleSession::new(
            Uuid::new_v4(),
            BattleMode::Pvp,
            SeatState::human(&challenge.from_identity, &challenge.from_display_name, seat_a),
            SeatState::human(&challenge.to_identity, to_display_name, seat_b),
            self.shared.next_seed(),
        )
        .map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

        self.launch(battle)
    }

    async fn submit_intent(
        &self,
        identity: &str,
        session_id: Uuid,
        intent: Intent,
    ) -> Result<(), EngineError> {
        let handle = self
            .shared
            .sessions
            .get(session_id)
            .ok_or(EngineError::SessionNotFound(session_id))?;
        let seat = handle
            .seat_of(identity)
            .ok_or(EngineError::SessionNotFound(session_id))?;

        handle.submit(seat, intent).await
    }

    /// Start a battle against a scripted trainer
    pub async fn spawn_trainer_battle(
        &self,
        identity: &str,
        trainer: TrainerParty,
    ) -> Result<Uuid, EngineError> {
        let player = self.pve_seat(identity).await?;
        let opponent =
            PartyRoster::new(trainer.party).map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

        let battle = BattleSession::new(
            Uuid::new_v4(),
            BattleMode::Trainer,
            player,
            SeatState::trainer(trainer.name, opponent),
            self.shared.next_seed(),
        )
        .map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

        self.launch(battle)
    }

    /// Start an encounter with a wild creature
    pub async fn spawn_wild_battle(
        &self,
        identity: &str,
        wild: Combatant,
    ) -> Result<Uuid, EngineError> {
        let player = self.pve_seat(identity).await?;
        let opponent = SeatState::wild(wild).map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

        let battle = BattleSession::new(
            Uuid::new_v4(),
            BattleMode::Wild,
            player,
            opponent,
            self.shared.next_seed(),
        )
        .map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

        self.launch(battle)
    }

    async fn pve_seat(&self, identity: &str) -> Result<SeatState, EngineError> {
        if self.shared.sessions.is_engaged(identity) {
            return Err(EngineError::AlreadyInBattle(identity.to_string()));
        }

        let display_name = self
            .shared
            .presence
            .display_name(identity)
            .unwrap_or_else(|| identity.to_string());
        let party = self.load_party(identity).await?;
        Ok(SeatState::human(identity, display_name, party))
    }

    async fn load_party(&self, identity: &str) -> Result<PartyRoster, EngineError> {
        let mut members = self.shared.roster.get_roster(identity).await?;
        for member in &mut members {
            member.normalize();
        }
        PartyRoster::new(members).map_err(|e| EngineError::from_setup(identity, e))
    }

    /// Register, announce and spawn the actor for a new session.
    ///
    /// Registration re-checks every participant under the registry lock, so
    /// two racing accepts cannot seat one identity twice.
    fn launch(&self, mut battle: BattleSession) -> Result<Uuid, EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }

        let session_id = battle.id();
        let identities = [Seat::A, Seat::B].map(|seat| battle.seat(seat).identity().map(str::to_string));
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .sessions
            .reserve(SessionHandle::new(session_id, identities, tx))?;

        battle.start();
        for seat in [Seat::A, Seat::B] {
            if let Some(identity) = battle.seat(seat).identity() {
                self.shared
                    .presence
                    .send_to(identity, session::start_event(&battle, seat));
            }
        }

        let actor = SessionActor::new(battle, Arc::clone(&self.shared), rx);
        tokio::spawn(actor.run());
        Ok(session_id)
    }
}

impl Drop for ArenaServer {
    fn drop(&mut self) {
        self.close();
    }
}
