//! Capacity-limited sign-up bookkeeping for a single event poll.
//!
//! A participant holds at most one category at a time. Voting for the held
//! category releases it; voting for another category moves the participant,
//! but only when the target still has room, so a rejected move leaves the
//! previous assignment untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::category::{Category, CategoryTable};
use crate::domain::ids::{EventId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    capacity: u32,
    occupants: Vec<UserId>,
}

impl Slot {
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn occupants(&self) -> &[UserId] {
        &self.occupants
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Joined { category: Category, moved_from: Option<Category> },
    Removed { category: Category },
}

impl VoteOutcome {
    pub fn category(&self) -> Category {
        match self {
            Self::Joined { category, .. } | Self::Removed { category } => *category,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    Open,
    Complete,
}

/// Render instructions for one category control as seen by a given viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub category: Category,
    pub label: String,
    pub occupied: usize,
    pub capacity: u32,
    pub locked: bool,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignupLedger {
    id: EventId,
    slots: CategoryTable<Slot>,
    assignment: HashMap<UserId, Category>,
}

impl SignupLedger {
    pub fn new(id: EventId, capacities: CategoryTable<u32>) -> Self {
        let slots =
            capacities.map(|_, capacity| Slot { capacity: *capacity, occupants: Vec::new() });
        Self { id, slots, assignment: HashMap::new() }
    }

    /// Rebuilds a ledger from a persisted roster. Duplicate participants and
    /// occupants beyond a category's capacity are dropped so the rebuilt
    /// ledger always satisfies its invariants.
    pub fn restore(
        id: EventId,
        capacities: CategoryTable<u32>,
        roster: &CategoryTable<Vec<UserId>>,
    ) -> Self {
        let mut ledger = Self::new(id, capacities);
        for (category, occupants) in roster.iter() {
            for participant in occupants {
                if ledger.assignment.contains_key(participant) {
                    continue;
                }
                let slot = &mut ledger.slots[category];
                if slot.is_full() {
                    break;
                }
                slot.occupants.push(*participant);
                ledger.assignment.insert(*participant, category);
            }
        }
        ledger
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn slot(&self, category: Category) -> &Slot {
        &self.slots[category]
    }

    pub fn assignment_of(&self, participant: UserId) -> Option<Category> {
        self.assignment.get(&participant).copied()
    }

    pub fn registered(&self) -> usize {
        self.assignment.len()
    }

    pub fn total_capacity(&self) -> u32 {
        self.slots.iter().fold(0, |total, (_, slot)| total.saturating_add(slot.capacity))
    }

    pub fn toggle_vote(
        &mut self,
        participant: UserId,
        category: Category,
    ) -> Result<VoteOutcome, DomainError> {
        let previous = self.assignment_of(participant);

        if previous == Some(category) {
            self.release(participant, category);
            return Ok(VoteOutcome::Removed { category });
        }

        let target = &self.slots[category];
        if target.is_full() {
            return Err(DomainError::CategoryFull { category, capacity: target.capacity });
        }

        if let Some(old) = previous {
            self.release(participant, old);
        }
        self.slots[category].occupants.push(participant);
        self.assignment.insert(participant, category);

        Ok(VoteOutcome::Joined { category, moved_from: previous })
    }

    fn release(&mut self, participant: UserId, category: Category) {
        self.slots[category].occupants.retain(|occupant| *occupant != participant);
        self.assignment.remove(&participant);
    }

    pub fn is_complete(&self) -> bool {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.capacity > 0)
            .all(|(_, slot)| slot.occupants.len() == slot.capacity as usize)
    }

    pub fn state(&self) -> PollState {
        if self.is_complete() {
            PollState::Complete
        } else {
            PollState::Open
        }
    }

    pub fn roster(&self) -> CategoryTable<Vec<UserId>> {
        self.slots.map(|_, slot| slot.occupants.clone())
    }

    pub fn capacities(&self) -> CategoryTable<u32> {
        self.slots.map(|_, slot| slot.capacity)
    }

    /// Controls in display order. Categories without capacity get no control.
    pub fn control_states(&self, viewer: Option<UserId>) -> Vec<ControlState> {
        let complete = self.is_complete();
        let viewer_category = viewer.and_then(|participant| self.assignment_of(participant));

        self.slots
            .iter()
            .filter(|(_, slot)| slot.capacity > 0)
            .map(|(category, slot)| {
                let selected = viewer_category == Some(category);
                ControlState {
                    category,
                    label: format!(
                        "{} ({}/{})",
                        category.label(),
                        slot.occupants.len(),
                        slot.capacity
                    ),
                    occupied: slot.occupants.len(),
                    capacity: slot.capacity,
                    locked: complete || (slot.is_full() && !selected),
                    selected,
                }
            })
            .collect()
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let occupied: usize = self.slots.iter().map(|(_, slot)| slot.occupants.len()).sum();
        assert_eq!(occupied, self.assignment.len(), "occupants and assignment diverged");
        for (category, slot) in self.slots.iter() {
            assert!(slot.occupants.len() <= slot.capacity as usize, "{category} over capacity");
            for participant in &slot.occupants {
                assert_eq!(self.assignment.get(participant), Some(&category));
            }
        }
    }
}
