//! Habit definitions and slot eligibility.
//!
//! Habits are owned by the habit-management surface; the sequence core
//! treats them as read-only input. The one rule the core enforces is slot
//! eligibility: a habit may only be acted on from a sequence matching its
//! timing affinity, and `Anytime` is eligible in both slots.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// When during the day a habit is meant to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingAffinity {
    Morning,
    Evening,
    Anytime,
}

impl TimingAffinity {
    pub fn as_str(self) -> &'static str {
        match self {
            TimingAffinity::Morning => "morning",
            TimingAffinity::Evening => "evening",
            TimingAffinity::Anytime => "anytime",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(TimingAffinity::Morning),
            "evening" => Some(TimingAffinity::Evening),
            "anytime" => Some(TimingAffinity::Anytime),
            _ => None,
        }
    }
}

/// The two habit slots on a day record: Startup works the Morning slot,
/// Shutdown works the EveningOrAnytime slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    EveningOrAnytime,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::EveningOrAnytime => "evening_or_anytime",
        }
    }
}

impl TimingAffinity {
    /// Anytime habits are evaluated per-sequence, so they qualify in both
    /// slots; Morning and Evening habits only in their own.
    pub fn eligible_in(self, slot: Slot) -> bool {
        match (self, slot) {
            (TimingAffinity::Anytime, _) => true,
            (TimingAffinity::Morning, Slot::Morning) => true,
            (TimingAffinity::Evening, Slot::EveningOrAnytime) => true,
            _ => false,
        }
    }
}

/// A user-defined habit. Identity is immutable; name, affinity and order
/// are edited through the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub affinity: TimingAffinity,
    pub sort_order: i64,
}

/// Source of habit definitions for a user (external collaborator seam).
pub trait HabitCatalog {
    /// All habits for the user, in sort order.
    fn habits(&self, user_id: &str) -> Result<Vec<Habit>, StoreError>;
}

/// Habits eligible for one slot, preserving sort order.
pub fn habits_for_slot(habits: &[Habit], slot: Slot) -> Vec<&Habit> {
    habits.iter().filter(|h| h.affinity.eligible_in(slot)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_habit(id: &str, affinity: TimingAffinity, order: i64) -> Habit {
        Habit {
            id: id.to_string(),
            name: id.to_string(),
            affinity,
            sort_order: order,
        }
    }

    #[test]
    fn anytime_is_eligible_in_both_slots() {
        assert!(TimingAffinity::Anytime.eligible_in(Slot::Morning));
        assert!(TimingAffinity::Anytime.eligible_in(Slot::EveningOrAnytime));
    }

    #[test]
    fn morning_and_evening_are_exclusive() {
        assert!(TimingAffinity::Morning.eligible_in(Slot::Morning));
        assert!(!TimingAffinity::Morning.eligible_in(Slot::EveningOrAnytime));
        assert!(TimingAffinity::Evening.eligible_in(Slot::EveningOrAnytime));
        assert!(!TimingAffinity::Evening.eligible_in(Slot::Morning));
    }

    #[test]
    fn habits_for_slot_filters_by_affinity() {
        let habits = vec![
            make_habit("stretch", TimingAffinity::Morning, 0),
            make_habit("journal", TimingAffinity::Anytime, 1),
            make_habit("read", TimingAffinity::Evening, 2),
        ];
        let morning: Vec<_> = habits_for_slot(&habits, Slot::Morning)
            .iter()
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(morning, vec!["stretch", "journal"]);
        let evening: Vec<_> = habits_for_slot(&habits, Slot::EveningOrAnytime)
            .iter()
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(evening, vec!["journal", "read"]);
    }
}
