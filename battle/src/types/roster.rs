//! Party roster (one side's creatures)

use super::combatant::Combatant;
use crate::error::SetupError;

/// Largest party a side may bring
pub const MAX_PARTY_SIZE: usize = 6;

/// HP of one roster member, to be written back to the roster store
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HpCheckpoint {
    pub identity: String,
    pub slot: usize,
    pub current_hp: u32,
}

/// Ordered party with exactly one active member
#[derive(Debug, Clone)]
pub struct PartyRoster {
    members: Vec<Combatant>,
    active: usize,
}

impl PartyRoster {
    /// Build a roster and pick its first active member.
    ///
    /// The party lead is sent out if it can battle, otherwise the first
    /// member that has not fainted.
    pub fn new(members: Vec<Combatant>) -> Result<Self, SetupError> {
        if members.is_empty() {
            return Err(SetupError::EmptyParty);
        }
        if members.len() > MAX_PARTY_SIZE {
            return Err(SetupError::PartyTooLarge(members.len()));
        }

        let active = members
            .iter()
            .position(|c| c.lead && c.is_alive())
            .or_else(|| members.iter().position(Combatant::is_alive))
            .ok_or(SetupError::NoUsableCombatant)?;

        Ok(Self { members, active })
    }

    /// Roster for a side that cannot switch (a wild creature)
    pub fn single(combatant: Combatant) -> Result<Self, SetupError> {
        Self::new(vec![combatant])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Combatant] {
        &self.members
    }

    pub fn get(&self, slot: usize) -> Option<&Combatant> {
        self.members.get(slot)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Combatant {
        &self.members[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Combatant {
        &mut self.members[self.active]
    }

    /// Count members that have not fainted
    pub fn alive_count(&self) -> usize {
        self.members.iter().filter(|c| c.is_alive()).count()
    }

    /// Every member has fainted
    pub fn is_whiteout(&self) -> bool {
        self.alive_count() == 0
    }

    /// First living member in party order, optionally skipping the active one
    pub fn next_alive(&self, excluding_active: bool) -> Option<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(idx, _)| !(excluding_active && *idx == self.active))
            .find(|(_, c)| c.is_alive())
            .map(|(idx, _)| idx)
    }

    /// Check that `slot` names a member that can be brought in
    pub fn check_switch(&self, slot: usize) -> Result<(), String> {
        let Some(member) = self.members.get(slot) else {
            return Err(format!("Unknown roster slot {}", slot));
        };
        if slot == self.active {
            return Err(format!("{} is already in battle", member.name()));
        }
        if member.is_fainted() {
            return Err(format!("{} has fainted and cannot battle", member.name()));
        }
        Ok(())
    }

    /// Bring in the member at `slot`; callers validate with `check_switch`
    pub fn switch_to(&mut self, slot: usize) {
        debug_assert!(self.check_switch(slot).is_ok());
        self.members[self.active].on_switch_out();
        self.active = slot;
    }

    /// Current HP of every member, tagged with the owning identity
    pub fn checkpoints(&self, identity: &str) -> Vec<HpCheckpoint> {
        self.members
            .iter()
            .enumerate()
            .map(|(slot, c)| HpCheckpoint {
                identity: identity.to_string(),
                slot,
                current_hp: c.current_hp,
            })
            .collect()
    }
}
