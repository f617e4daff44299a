//! Full wizard runs: planning, navigation, submission, durability.

use std::sync::Arc;

use bookend_core::store::memory::MemoryRepo;
use bookend_core::{
    DailyRecordStore, RatingKind, SequenceRunner, SequenceType, Slot, StepFragment, StepId,
    TextKind, Transition,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tokio::sync::mpsc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

async fn store_with(repo: Arc<MemoryRepo>) -> DailyRecordStore<Arc<MemoryRepo>> {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut store = DailyRecordStore::new(repo, tx, "user-1");
    store.load_at(noon(), "UTC").await.unwrap();
    store
}

fn rating(kind: RatingKind, value: u8) -> StepFragment {
    StepFragment::Rating {
        rating: kind,
        value,
    }
}

fn text(kind: TextKind, value: &str) -> StepFragment {
    StepFragment::Text {
        text: kind,
        value: value.to_string(),
    }
}

async fn settle<F: Fn() -> bool>(done: F) {
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("persist tasks did not settle");
}

#[tokio::test]
async fn startup_submit_roundtrips_through_reload() {
    let repo = Arc::new(MemoryRepo::new());
    let mut store = store_with(repo.clone()).await;
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut run = SequenceRunner::start(SequenceType::Startup, &store, tx).unwrap();

    run.on_next(&mut store, rating(RatingKind::PrevEvening, 4)).await.unwrap();
    run.on_next(&mut store, rating(RatingKind::Sleep, 5)).await.unwrap();
    run.on_next(&mut store, rating(RatingKind::Morning, 3)).await.unwrap();
    run.on_next(&mut store, text(TextKind::Feeling, "slow start")).await.unwrap();
    store.mark_done("stretch", Slot::Morning).unwrap();
    store.mark_done("water", Slot::Morning).unwrap();
    let t = run.on_next(&mut store, StepFragment::Acknowledged).await.unwrap();
    assert_eq!(t, Transition::Submitted(date(2025, 6, 10)));

    let submitted = store.today().unwrap().clone();

    // Re-load for the same user/day: the stored record equals what was
    // submitted (idempotent upsert).
    let reloaded = store_with(repo.clone()).await;
    assert_eq!(reloaded.today().unwrap(), &submitted);
    assert_eq!(reloaded.today().unwrap().ratings.sleep, Some(5));
    assert_eq!(
        reloaded.today().unwrap().text.feeling.as_deref(),
        Some("slow start")
    );
}

#[tokio::test]
async fn shutdown_with_confirmation_gate_end_to_end() {
    let repo = Arc::new(MemoryRepo::new());
    let mut store = store_with(repo.clone()).await;
    store.mark_deferred("stretch", Slot::Morning).unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let mut run = SequenceRunner::start(SequenceType::Shutdown, &store, tx).unwrap();
    assert_eq!(run.plan().len(), 5);
    assert_eq!(run.current_step(), Some(StepId::ConfirmDeferredMorning));

    // Cannot advance past an unresolved confirmation.
    assert!(run
        .on_next(&mut store, StepFragment::Acknowledged)
        .await
        .is_err());

    run.confirmations_mut()
        .unwrap()
        .resolve(&mut store, "stretch", true)
        .unwrap();
    run.on_next(&mut store, StepFragment::Acknowledged).await.unwrap();
    run.on_next(&mut store, rating(RatingKind::DayOverall, 4)).await.unwrap();
    run.on_next(&mut store, text(TextKind::Accomplishment, "inbox zero")).await.unwrap();
    run.on_next(&mut store, text(TextKind::Improvement, "fewer tabs")).await.unwrap();
    let t = run.on_next(&mut store, StepFragment::Acknowledged).await.unwrap();
    assert!(matches!(t, Transition::Submitted(_)));

    let today = store.today().unwrap();
    assert!(today.completed_morning_habits.contains("stretch"));
    assert!(today.deferred_from_morning.is_empty());
    assert!(today.shutdown_completed_at.is_some());
    assert_eq!(today.ratings.day_overall, Some(4));
}

#[tokio::test]
async fn plan_without_deferrals_has_no_confirmation_step() {
    let repo = Arc::new(MemoryRepo::new());
    let store = store_with(repo).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let startup = SequenceRunner::start(SequenceType::Startup, &store, tx.clone()).unwrap();
    assert_eq!(startup.plan().len(), 5);
    assert!(startup.confirmations().is_none());

    let shutdown = SequenceRunner::start(SequenceType::Shutdown, &store, tx).unwrap();
    assert_eq!(shutdown.plan().len(), 4);
    assert!(shutdown.confirmations().is_none());
}

#[tokio::test]
async fn abandoning_a_run_keeps_habit_marks_but_not_answers() {
    let repo = Arc::new(MemoryRepo::new());
    let mut store = store_with(repo.clone()).await;
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut run = SequenceRunner::start(SequenceType::Startup, &store, tx).unwrap();

    run.on_next(&mut store, rating(RatingKind::PrevEvening, 2)).await.unwrap();
    store.mark_done("water", Slot::Morning).unwrap();
    settle(|| {
        repo.get("user-1", date(2025, 6, 10))
            .map(|r| r.completed_morning_habits.contains("water"))
            .unwrap_or(false)
    })
    .await;

    // Back out to the dashboard from the first step.
    assert_eq!(run.on_back(), Transition::SteppedBack(StepId::PrevEveningRating));
    assert_eq!(run.on_back(), Transition::Exited);

    // The habit mark was durable on click; the rating dies with the draft.
    let reloaded = store_with(repo.clone()).await;
    let today = reloaded.today().unwrap();
    assert!(today.completed_morning_habits.contains("water"));
    assert!(today.ratings.prev_evening.is_none());
    assert!(today.startup_completed_at.is_none());
}

#[tokio::test]
async fn resubmitting_a_sequence_overwrites_prior_answers() {
    let repo = Arc::new(MemoryRepo::new());

    for value in [2u8, 5u8] {
        let mut store = store_with(repo.clone()).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut run = SequenceRunner::start(SequenceType::Startup, &store, tx).unwrap();
        run.on_next(&mut store, rating(RatingKind::PrevEvening, value)).await.unwrap();
        run.on_next(&mut store, StepFragment::Skipped).await.unwrap();
        run.on_next(&mut store, StepFragment::Skipped).await.unwrap();
        run.on_next(&mut store, StepFragment::Skipped).await.unwrap();
        run.on_next(&mut store, StepFragment::Acknowledged).await.unwrap();
    }

    // Last write wins: the second run's answer is what is stored.
    let reloaded = store_with(repo).await;
    assert_eq!(reloaded.today().unwrap().ratings.prev_evening, Some(5));
}
