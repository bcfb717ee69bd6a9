//! Intent intake and turn resolution

use arena_protocol::{BallKind, EndReason, Intent, Seat};
use rand::Rng;

use super::battle::{BattleSession, SessionState, SubmitOutcome, SwitchReport, TurnReport};
use super::policy;
use crate::error::IntentError;
use crate::math;
use crate::types::Move;

impl BattleSession {
    /// Submit an intent for a seat.
    ///
    /// A forfeit ends the session at once. In trainer and wild battles the
    /// scripted side chooses the instant the player does, so every accepted
    /// action resolves a turn; in PvP the turn resolves when both seats
    /// have chosen.
    pub fn submit(&mut self, seat: Seat, intent: Intent) -> Result<SubmitOutcome, IntentError> {
        self.check_intent(seat, &intent)?;

        if intent == Intent::Forfeit {
            let line = format!(
                "{} forfeited the battle.",
                self.seats[seat.index()].owner_label()
            );
            self.log.push(line);
            self.finish(Some(seat.other()), EndReason::Forfeit);
            return Ok(SubmitOutcome::Ended);
        }

        if self.state == SessionState::FaintedPendingSwitch {
            return self.replace_fainted(seat, intent).map(SubmitOutcome::Switched);
        }

        self.pending[seat.index()] = Some(intent);

        for other in [Seat::A, Seat::B] {
            let side = &self.seats[other.index()];
            if !side.is_human() && self.pending[other.index()].is_none() {
                let scripted = policy::scripted_intent(side.active(), &mut self.rng);
                self.pending[other.index()] = Some(scripted);
            }
        }

        if self.pending.iter().all(Option::is_some) {
            Ok(SubmitOutcome::Resolved(self.resolve_turn()))
        } else {
            Ok(SubmitOutcome::Waiting)
        }
    }

    fn replace_fainted(&mut self, seat: Seat, intent: Intent) -> Result<SwitchReport, IntentError> {
        let Intent::Switch { slot } = intent else {
            return Err(IntentError::InvalidIntent(
                "a replacement must be sent out first".to_string(),
            ));
        };

        let side = &mut self.seats[seat.index()];
        side.roster.switch_to(slot);
        let line = format!("{} sent out {}!", side.owner_label(), side.active().name());

        self.awaiting_switch[seat.index()] = false;
        if !self.awaiting_switch.iter().any(|waiting| *waiting) {
            self.state = SessionState::Selecting;
        }
        self.log.push(line.clone());

        Ok(SwitchReport {
            seat,
            log: vec![line],
            seat_a: self.partial_view(Seat::A),
            seat_b: self.partial_view(Seat::B),
            resumed: self.state == SessionState::Selecting,
            checkpoints: self.checkpoints(),
        })
    }

    fn resolve_turn(&mut self) -> TurnReport {
        self.state = SessionState::Resolving;
        self.turn_number += 1;

        let intents = [self.pending[0].take(), self.pending[1].take()];
        let order = policy::acting_order(self.mode, &intents, &self.seats);
        let mut log = Vec::new();

        for actor in order {
            if self.is_ended() {
                break;
            }
            // An actor knocked out earlier this turn loses its action
            if self.seats[actor.index()].active().is_fainted() {
                continue;
            }
            if let Some(intent) = intents[actor.index()] {
                self.execute(actor, intent, &mut log);
            }
        }

        if !self.is_ended() {
            self.end_of_turn(&mut log);
        }

        self.log.extend(log.iter().cloned());

        TurnReport {
            turn_number: self.turn_number,
            log,
            seat_a: self.partial_view(Seat::A),
            seat_b: self.partial_view(Seat::B),
            awaiting_switch: self.awaiting_switch(),
            end_reason: self.end_reason(),
            checkpoints: self.checkpoints(),
        }
    }

    fn execute(&mut self, actor: Seat, intent: Intent, log: &mut Vec<String>) {
        match intent {
            Intent::Move { slot } => self.use_move(actor, slot, log),
            Intent::Switch { slot } => self.voluntary_switch(actor, slot, log),
            Intent::Capture { ball } => self.throw_ball(actor, ball, log),
            Intent::Flee => self.try_flee(actor, log),
            // Handled before buffering
            Intent::Forfeit => {}
        }
    }

    fn use_move(&mut self, actor: Seat, slot: usize, log: &mut Vec<String>) {
        let attacker_label = self.seats[actor.index()].combatant_label();
        let target_seat = actor.other();

        let skip_chance = self.seats[actor.index()]
            .active()
            .status
            .map_or(0.0, |s| s.skip_chance());
        if skip_chance > 0.0 && math::roll_succeeds(skip_chance, self.rng.gen_range(0.0..1.0)) {
            log.push(format!("{} is paralyzed! It can't move!", attacker_label));
            return;
        }

        let attacker = self.seats[actor.index()].roster.active_mut();
        let level = attacker.level;
        let chosen = if attacker.has_usable_move() {
            match attacker.moves.get_mut(slot) {
                Some(m) if m.has_pp() => {
                    m.pp_remaining -= 1;
                    m.clone()
                }
                _ => {
                    log.push(format!("{} hesitated.", attacker_label));
                    return;
                }
            }
        } else {
            log.push(format!("{} has no moves left!", attacker_label));
            Move::struggle()
        };

        log.push(format!("{} used {}!", attacker_label, chosen.id));

        if self.rng.gen_range(0..100) >= chosen.accuracy {
            log.push(format!("{}'s attack missed!", attacker_label));
            return;
        }

        let target_label = self.seats[target_seat.index()].combatant_label();

        if !chosen.is_damaging() {
            let target = self.seats[target_seat.index()].roster.active_mut();
            log.push(chosen.effect.apply(target));
            return;
        }

        let roll = self.rng.gen_range(0.0..1.0);
        let dealt = math::damage(level, chosen.power, roll);
        let target = self.seats[target_seat.index()].roster.active_mut();
        let fainted = target.apply_damage(dealt);

        log.push(format!("{} took {} damage.", target_label, dealt));
        if fainted {
            log.push(format!("{} fainted!", target_label));
        }
    }

    fn voluntary_switch(&mut self, actor: Seat, slot: usize, log: &mut Vec<String>) {
        let side = &mut self.seats[actor.index()];
        if side.roster.check_switch(slot).is_err() {
            log.push(format!("{} tried to switch, but it failed!", side.owner_label()));
            return;
        }

        let outgoing = side.active().name().to_string();
        side.roster.switch_to(slot);
        log.push(format!(
            "{} withdrew {} and sent out {}!",
            side.owner_label(),
            outgoing,
            side.active().name()
        ));
    }

    fn throw_ball(&mut self, actor: Seat, ball: BallKind, log: &mut Vec<String>) {
        let thrower = &self.seats[actor.index()];
        let wild = &self.seats[actor.other().index()];
        let target = wild.active();

        let chance = math::capture_chance(
            target.hp_fraction(),
            math::ball_bonus(ball),
            math::level_gap_penalty_applies(target.level, thrower.active().level),
            target.legendary,
        );
        let target_label = wild.combatant_label();
        log.push(format!(
            "{} threw a {}!",
            thrower.owner_label(),
            ball.display_name()
        ));

        let roll = self.rng.gen_range(0.0..1.0);
        if math::roll_succeeds(chance, roll) {
            let mut caught = self.seats[actor.other().index()].active().clone();
            caught.on_switch_out();
            log.push(format!("Gotcha! {} was caught!", caught.name()));
            self.captured = Some(caught);
            self.finish(Some(actor), EndReason::Capture);
        } else {
            log.push(format!("Oh no! {} broke free!", target_label));
        }
    }

    fn try_flee(&mut self, actor: Seat, log: &mut Vec<String>) {
        let chance = math::flee_chance(
            self.seats[actor.index()].active().level,
            self.seats[actor.other().index()].active().level,
        );
        let roll = self.rng.gen_range(0.0..1.0);

        if math::roll_succeeds(chance, roll) {
            log.push("Got away safely!".to_string());
            self.finish(None, EndReason::Flee);
        } else {
            log.push("Can't escape!".to_string());
        }
    }

    /// Residual damage, then replacements, then terminal checks
    fn end_of_turn(&mut self, log: &mut Vec<String>) {
        for seat in [Seat::A, Seat::B] {
            let label = self.seats[seat.index()].combatant_label();
            let active = self.seats[seat.index()].roster.active_mut();
            let Some(status) = active.status else {
                continue;
            };
            if active.is_fainted() {
                continue;
            }

            let residual = status.residual_damage(active.max_hp);
            if residual > 0 {
                let fainted = active.apply_damage(residual);
                log.push(format!("{} is hurt by its burn!", label));
                if fainted {
                    log.push(format!("{} fainted!", label));
                }
            }
        }

        let mut whiteouts = Vec::new();
        for seat in [Seat::A, Seat::B] {
            let side = &mut self.seats[seat.index()];
            if side.active().is_alive() {
                continue;
            }

            if side.roster.is_whiteout() {
                whiteouts.push(seat);
            } else if side.is_human() {
                self.awaiting_switch[seat.index()] = true;
            } else if let Some(next) = side.roster.next_alive(true) {
                side.roster.switch_to(next);
                log.push(format!(
                    "{} sent out {}!",
                    side.owner_label(),
                    side.active().name()
                ));
            }
        }

        match whiteouts.as_slice() {
            [] => {}
            [loser] => {
                log.push(format!(
                    "{} has no creatures left to fight!",
                    self.seats[loser.index()].owner_label()
                ));
                self.finish(Some(loser.other()), EndReason::Whiteout);
                return;
            }
            _ => {
                log.push("Both sides are out of creatures!".to_string());
                self.finish(None, EndReason::Whiteout);
                return;
            }
        }

        self.state = if self.awaiting_switch.iter().any(|waiting| *waiting) {
            SessionState::FaintedPendingSwitch
        } else {
            SessionState::Selecting
        };
    }
}
