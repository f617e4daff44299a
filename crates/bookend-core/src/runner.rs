//! The sequence wizard state machine.
//!
//! A runner walks a frozen [`SequencePlan`] one step at a time, merging
//! each step's answer into a draft. Habit actions hit the store directly
//! (durable on click); ratings and free text live only in the draft until
//! the final submit, which performs the single blocking full-record
//! upsert. Backing out of the first step abandons the run: whatever habit
//! actions already persisted stay, the draft is discarded.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{CoreError, ValidationError};
use crate::events::Event;
use crate::planner::{SequencePlan, SequenceType, StepId};
use crate::reconciler::ConfirmationSheet;
use crate::record::{DayRecord, RatingKind, Ratings, TextKind, Texts};
use crate::store::{DailyRecordStore, DayRecordRepository};

/// One step's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFragment {
    Rating { rating: RatingKind, value: u8 },
    Text { text: TextKind, value: String },
    /// Habits steps and resolved confirmation steps carry no payload;
    /// their effects already went through the store.
    Acknowledged,
    /// The user moved on without answering (ratings and text are
    /// optional).
    Skipped,
}

/// Ratings and text collected so far; retained across back/forward
/// navigation within one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayRecordDraft {
    pub ratings: Ratings,
    pub text: Texts,
}

/// Outcome of a navigation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advanced(StepId),
    SteppedBack(StepId),
    /// Back on the first step: run abandoned, no submit.
    Exited,
    /// Final step answered: the day record was upserted.
    Submitted(NaiveDate),
}

/// Drives one Startup or Shutdown run.
pub struct SequenceRunner {
    sequence: SequenceType,
    plan: SequencePlan,
    index: usize,
    draft: DayRecordDraft,
    confirmations: Option<ConfirmationSheet>,
    events: UnboundedSender<Event>,
}

impl SequenceRunner {
    /// Plan and begin a run. The plan and the confirmation snapshot are
    /// both frozen here; nothing recomputes them mid-run.
    pub fn start<R: DayRecordRepository>(
        sequence: SequenceType,
        store: &DailyRecordStore<R>,
        events: UnboundedSender<Event>,
    ) -> Result<Self, CoreError> {
        let plan = SequencePlan::compute(sequence, store)?;
        let confirmations = match plan.step_at(0) {
            Some(step) if step.is_confirmation() => {
                Some(ConfirmationSheet::for_sequence(sequence, store)?)
            }
            _ => None,
        };
        let _ = events.send(Event::SequenceStarted {
            sequence,
            local_date: store.today_date()?,
            step_count: plan.len(),
            at: Utc::now(),
        });
        Ok(Self {
            sequence,
            plan,
            index: 0,
            draft: DayRecordDraft::default(),
            confirmations,
            events,
        })
    }

    pub fn sequence(&self) -> SequenceType {
        self.sequence
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    pub fn current_step(&self) -> Option<StepId> {
        self.plan.step_at(self.index)
    }

    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn draft(&self) -> &DayRecordDraft {
        &self.draft
    }

    /// The confirmation sheet, when this run planned a confirmation step.
    pub fn confirmations_mut(&mut self) -> Option<&mut ConfirmationSheet> {
        self.confirmations.as_mut()
    }

    pub fn confirmations(&self) -> Option<&ConfirmationSheet> {
        self.confirmations.as_ref()
    }

    /// Merge the step's answer and advance. On the last step this instead
    /// assembles the final record and performs the blocking upsert; a
    /// failure there keeps the runner on the last step so the user can
    /// retry (it is the only durability path for ratings and text).
    pub async fn on_next<R: DayRecordRepository>(
        &mut self,
        store: &mut DailyRecordStore<R>,
        fragment: StepFragment,
    ) -> Result<Transition, CoreError> {
        let step = self
            .current_step()
            .ok_or_else(|| CoreError::Custom("sequence already finished".to_string()))?;

        if step.is_confirmation() {
            if let Some(sheet) = &self.confirmations {
                sheet.ensure_complete()?;
            }
        }
        self.merge(step, fragment)?;

        if self.index + 1 < self.plan.len() {
            self.index += 1;
            let next = self.plan.step_at(self.index).unwrap_or(step);
            let _ = self.events.send(Event::StepAdvanced {
                sequence: self.sequence,
                step: next,
                step_index: self.index,
                at: Utc::now(),
            });
            Ok(Transition::Advanced(next))
        } else {
            let date = self.submit(store).await?;
            Ok(Transition::Submitted(date))
        }
    }

    /// Step back one step, or exit the run from the first step. Fragments
    /// already merged are kept, so a re-entered step shows the prior
    /// answer.
    pub fn on_back(&mut self) -> Transition {
        if self.index == 0 {
            let _ = self.events.send(Event::SequenceExited {
                sequence: self.sequence,
                at: Utc::now(),
            });
            Transition::Exited
        } else {
            self.index -= 1;
            let step = self.plan.step_at(self.index).expect("index within plan");
            let _ = self.events.send(Event::SteppedBack {
                sequence: self.sequence,
                step,
                step_index: self.index,
                at: Utc::now(),
            });
            Transition::SteppedBack(step)
        }
    }

    fn merge(&mut self, step: StepId, fragment: StepFragment) -> Result<(), ValidationError> {
        match (step, fragment) {
            (_, StepFragment::Skipped) => Ok(()),
            (step, StepFragment::Rating { rating, value }) => {
                if expected_rating(step) != Some(rating) {
                    return Err(ValidationError::FragmentMismatch {
                        step: format!("{step:?}"),
                        fragment: format!("rating:{}", rating.as_str()),
                    });
                }
                if !(1..=5).contains(&value) {
                    return Err(ValidationError::RatingOutOfRange {
                        field: rating.as_str().to_string(),
                        value,
                    });
                }
                self.draft.ratings.set(rating, value);
                Ok(())
            }
            (step, StepFragment::Text { text, value }) => {
                if expected_text(step) != Some(text) {
                    return Err(ValidationError::FragmentMismatch {
                        step: format!("{step:?}"),
                        fragment: format!("text:{}", text.as_str()),
                    });
                }
                self.draft.text.set(text, value);
                Ok(())
            }
            (
                StepId::MorningHabits
                | StepId::EveningHabits
                | StepId::ConfirmDeferredEvening
                | StepId::ConfirmDeferredMorning,
                StepFragment::Acknowledged,
            ) => Ok(()),
            (step, StepFragment::Acknowledged) => Err(ValidationError::FragmentMismatch {
                step: format!("{step:?}"),
                fragment: "acknowledged".to_string(),
            }),
        }
    }

    /// Assemble the final payload: today's record (which already carries
    /// every incremental habit mutation) overlaid with the drafted
    /// ratings/text, stamped with the sequence completion time.
    async fn submit<R: DayRecordRepository>(
        &mut self,
        store: &mut DailyRecordStore<R>,
    ) -> Result<NaiveDate, CoreError> {
        let mut record = store.today()?.clone();
        overlay_ratings(&mut record, &self.draft.ratings);
        overlay_text(&mut record, &self.draft.text);
        match self.sequence {
            SequenceType::Startup => record.startup_completed_at = Some(Utc::now()),
            SequenceType::Shutdown => record.shutdown_completed_at = Some(Utc::now()),
        }

        let date = store.submit_today(record).await?;
        let _ = self.events.send(Event::SequenceSubmitted {
            sequence: self.sequence,
            local_date: date,
            at: Utc::now(),
        });
        Ok(date)
    }
}

fn expected_rating(step: StepId) -> Option<RatingKind> {
    match step {
        StepId::PrevEveningRating => Some(RatingKind::PrevEvening),
        StepId::SleepRating => Some(RatingKind::Sleep),
        StepId::MorningRating => Some(RatingKind::Morning),
        StepId::DayRating => Some(RatingKind::DayOverall),
        _ => None,
    }
}

fn expected_text(step: StepId) -> Option<TextKind> {
    match step {
        StepId::Feeling => Some(TextKind::Feeling),
        StepId::Accomplishment => Some(TextKind::Accomplishment),
        StepId::Improvement => Some(TextKind::Improvement),
        _ => None,
    }
}

fn overlay_ratings(record: &mut DayRecord, draft: &Ratings) {
    for kind in [
        RatingKind::PrevEvening,
        RatingKind::Sleep,
        RatingKind::Morning,
        RatingKind::DayOverall,
    ] {
        if let Some(value) = draft.get(kind) {
            record.ratings.set(kind, value);
        }
    }
}

fn overlay_text(record: &mut DayRecord, draft: &Texts) {
    if let Some(v) = &draft.feeling {
        record.text.feeling = Some(v.clone());
    }
    if let Some(v) = &draft.accomplishment {
        record.text.accomplishment = Some(v.clone());
    }
    if let Some(v) = &draft.improvement {
        record.text.improvement = Some(v.clone());
    }
}
