//! Day records: one per (user, local date).
//!
//! A record carries the answers from both sequences plus the four habit
//! sets. Invariant: for a given slot, a habit id is never in the completed
//! set and the deferred set at the same time. The store's mutation
//! primitives keep that true; this module only holds the data shape.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::Slot;

/// The four 1-5 ratings collected across the two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingKind {
    /// "How was yesterday evening?" -- first Startup question.
    PrevEvening,
    Sleep,
    Morning,
    DayOverall,
}

impl RatingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingKind::PrevEvening => "prev_evening",
            RatingKind::Sleep => "sleep",
            RatingKind::Morning => "morning",
            RatingKind::DayOverall => "day_overall",
        }
    }
}

/// The free-text answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    /// "How are you feeling this morning?"
    Feeling,
    Accomplishment,
    Improvement,
}

impl TextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TextKind::Feeling => "feeling",
            TextKind::Accomplishment => "accomplishment",
            TextKind::Improvement => "improvement",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    #[serde(default)]
    pub prev_evening: Option<u8>,
    #[serde(default)]
    pub sleep: Option<u8>,
    #[serde(default)]
    pub morning: Option<u8>,
    #[serde(default)]
    pub day_overall: Option<u8>,
}

impl Ratings {
    pub fn set(&mut self, kind: RatingKind, value: u8) {
        match kind {
            RatingKind::PrevEvening => self.prev_evening = Some(value),
            RatingKind::Sleep => self.sleep = Some(value),
            RatingKind::Morning => self.morning = Some(value),
            RatingKind::DayOverall => self.day_overall = Some(value),
        }
    }

    pub fn get(&self, kind: RatingKind) -> Option<u8> {
        match kind {
            RatingKind::PrevEvening => self.prev_evening,
            RatingKind::Sleep => self.sleep,
            RatingKind::Morning => self.morning,
            RatingKind::DayOverall => self.day_overall,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texts {
    #[serde(default)]
    pub feeling: Option<String>,
    #[serde(default)]
    pub accomplishment: Option<String>,
    #[serde(default)]
    pub improvement: Option<String>,
}

impl Texts {
    pub fn set(&mut self, kind: TextKind, value: String) {
        match kind {
            TextKind::Feeling => self.feeling = Some(value),
            TextKind::Accomplishment => self.accomplishment = Some(value),
            TextKind::Improvement => self.improvement = Some(value),
        }
    }
}

/// Everything recorded for one (user, local date).
///
/// Created lazily on first write; never deleted; fully superseded by the
/// final upsert of a sequence and partially mutated by individual habit
/// actions before that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub text: Texts,
    /// Habit ids marked done during this day's Startup.
    #[serde(default)]
    pub completed_morning_habits: BTreeSet<String>,
    /// Habit ids marked done during this day's Shutdown.
    #[serde(default)]
    pub completed_evening_habits: BTreeSet<String>,
    /// Postponed during this day's Startup; pending confirmation in this
    /// day's Shutdown.
    #[serde(default)]
    pub deferred_from_morning: BTreeSet<String>,
    /// Postponed during this day's Shutdown; pending confirmation in the
    /// *next* day's Startup (drained from yesterday's record).
    #[serde(default)]
    pub deferred_from_evening: BTreeSet<String>,
    /// Set only on final submission of the Startup sequence.
    #[serde(default)]
    pub startup_completed_at: Option<DateTime<Utc>>,
    /// Set only on final submission of the Shutdown sequence.
    #[serde(default)]
    pub shutdown_completed_at: Option<DateTime<Utc>>,
}

impl DayRecord {
    pub fn completed(&self, slot: Slot) -> &BTreeSet<String> {
        match slot {
            Slot::Morning => &self.completed_morning_habits,
            Slot::EveningOrAnytime => &self.completed_evening_habits,
        }
    }

    pub fn completed_mut(&mut self, slot: Slot) -> &mut BTreeSet<String> {
        match slot {
            Slot::Morning => &mut self.completed_morning_habits,
            Slot::EveningOrAnytime => &mut self.completed_evening_habits,
        }
    }

    /// The deferred set a deferral from `slot` lands in.
    pub fn deferred_mut(&mut self, slot: Slot) -> &mut BTreeSet<String> {
        match slot {
            Slot::Morning => &mut self.deferred_from_morning,
            Slot::EveningOrAnytime => &mut self.deferred_from_evening,
        }
    }

    pub fn deferred(&self, slot: Slot) -> &BTreeSet<String> {
        match slot {
            Slot::Morning => &self.deferred_from_morning,
            Slot::EveningOrAnytime => &self.deferred_from_evening,
        }
    }

    /// Check the completed/deferred exclusivity invariant for both slots.
    pub fn sets_are_disjoint(&self) -> bool {
        self.completed_morning_habits
            .is_disjoint(&self.deferred_from_morning)
            && self
                .completed_evening_habits
                .is_disjoint(&self.deferred_from_evening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty_and_consistent() {
        let record = DayRecord::default();
        assert!(record.ratings.prev_evening.is_none());
        assert!(record.completed_morning_habits.is_empty());
        assert!(record.sets_are_disjoint());
        assert!(record.startup_completed_at.is_none());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut record = DayRecord::default();
        record.ratings.set(RatingKind::Sleep, 4);
        record.text.set(TextKind::Feeling, "rested".to_string());
        record.completed_morning_habits.insert("stretch".to_string());
        record.deferred_from_evening.insert("journal".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let back: DayRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn disjoint_check_catches_dual_membership() {
        let mut record = DayRecord::default();
        record.completed_morning_habits.insert("stretch".to_string());
        record.deferred_from_morning.insert("stretch".to_string());
        assert!(!record.sets_are_disjoint());
    }
}
