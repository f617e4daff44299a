//! # Bookend Core Library
//!
//! This library provides the core business logic for Bookend, a daily
//! habit and journal tracker built around two sequences per local day:
//! a morning **Startup** routine and an evening **Shutdown** routine.
//! All operations are available via a standalone CLI binary; any GUI is
//! a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Daily record store**: a two-slot in-memory cache (today and
//!   yesterday in the user's timezone) with optimistic mutation and
//!   fire-and-forget persistence
//! - **Deferral reconciliation**: "Do Later" marks made in one sequence
//!   must be confirmed in the paired sequence, possibly across a local
//!   midnight boundary
//! - **Sequence runner**: a wizard state machine over a step plan frozen
//!   at run start
//! - **Storage**: SQLite-based habit catalog and day records, TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`DailyRecordStore`]: the two-slot record cache
//! - [`SequenceRunner`]: drives one Startup or Shutdown run
//! - [`SequencePlan`]: the frozen step order for a run
//! - [`ConfirmationSheet`]: the all-or-nothing deferral confirmation gate
//! - [`RecordDb`]: habit and day-record persistence

pub mod error;
pub mod events;
pub mod habit;
pub mod localdate;
pub mod planner;
pub mod reconciler;
pub mod record;
pub mod runner;
pub mod storage;
pub mod store;

pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use habit::{Habit, HabitCatalog, Slot, TimingAffinity};
pub use localdate::LocalDay;
pub use planner::{SequencePlan, SequenceType, StepId};
pub use reconciler::{defer_habit, mark_habit_done, ConfirmationSheet};
pub use record::{DayRecord, RatingKind, Ratings, TextKind, Texts};
pub use runner::{DayRecordDraft, SequenceRunner, StepFragment, Transition};
pub use storage::{Config, RecordDb};
pub use store::{DailyRecordStore, DayRecordRepository};
