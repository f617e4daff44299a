//! Interactive Startup/Shutdown wizard.
//!
//! The prompts are a thin surface over the core `SequenceRunner`; every
//! habit action and answer goes through the same code paths a GUI would
//! use. `b` steps back (exiting the run from the first step), an empty
//! answer skips an optional question.

use std::io::{self, Write};

use bookend_core::storage::{Config, RecordDb};
use bookend_core::{
    defer_habit, habit, mark_habit_done, DailyRecordStore, Event, Habit, HabitCatalog,
    RatingKind, SequenceRunner, SequenceType, Slot, StepFragment, StepId, TextKind, Transition,
};
use tokio::sync::mpsc;

pub fn run(sequence: SequenceType) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_wizard(sequence, config))
}

async fn run_wizard(
    sequence: SequenceType,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = config.profile.user_id.clone();
    let timezone = config.profile.timezone.clone();

    // Two connections to the same file: one moves into the store as the
    // repository, one stays out for catalog reads.
    let catalog = RecordDb::open()?;
    let habits = catalog.habits(&user_id)?;
    let repo = RecordDb::open()?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut store = DailyRecordStore::new(repo, events_tx.clone(), user_id);
    store.load(&timezone).await?;

    let mut runner = SequenceRunner::start(sequence, &store, events_tx)?;
    println!(
        "── {} for {} ({} steps) ──",
        title(sequence),
        store.today_date()?,
        runner.plan().len()
    );

    loop {
        let step = match runner.current_step() {
            Some(step) => step,
            None => break,
        };
        let fragment = match prompt_step(step, &habits, &mut runner, &mut store)? {
            StepInput::Fragment(fragment) => fragment,
            StepInput::Back => {
                if runner.on_back() == Transition::Exited {
                    println!("Left the sequence. Habit marks already made are kept.");
                    drain_warnings(&mut events_rx);
                    return Ok(());
                }
                continue;
            }
        };

        match runner.on_next(&mut store, fragment).await {
            Ok(Transition::Submitted(date)) => {
                println!("✓ {} recorded for {date}", title(sequence));
                break;
            }
            Ok(_) => {}
            Err(err) => {
                // Validation problems (and a failed final submit) keep the
                // wizard on the current step for another attempt.
                eprintln!("  ! {err}");
            }
        }
    }

    drain_warnings(&mut events_rx);
    Ok(())
}

enum StepInput {
    Fragment(StepFragment),
    Back,
}

fn prompt_step<R: bookend_core::DayRecordRepository>(
    step: StepId,
    habits: &[Habit],
    runner: &mut SequenceRunner,
    store: &mut DailyRecordStore<R>,
) -> Result<StepInput, Box<dyn std::error::Error>> {
    match step {
        StepId::PrevEveningRating => rating_prompt("How was yesterday evening?", RatingKind::PrevEvening),
        StepId::SleepRating => rating_prompt("How did you sleep?", RatingKind::Sleep),
        StepId::MorningRating => rating_prompt("How do you feel this morning?", RatingKind::Morning),
        StepId::DayRating => rating_prompt("How was your day overall?", RatingKind::DayOverall),
        StepId::Feeling => text_prompt("What's on your mind this morning?", TextKind::Feeling),
        StepId::Accomplishment => text_prompt("What did you accomplish today?", TextKind::Accomplishment),
        StepId::Improvement => text_prompt("What could have gone better?", TextKind::Improvement),
        StepId::MorningHabits => habits_prompt(habits, Slot::Morning, store),
        StepId::EveningHabits => habits_prompt(habits, Slot::EveningOrAnytime, store),
        StepId::ConfirmDeferredEvening | StepId::ConfirmDeferredMorning => {
            confirm_prompt(habits, runner, store)
        }
    }
}

fn rating_prompt(question: &str, kind: RatingKind) -> Result<StepInput, Box<dyn std::error::Error>> {
    loop {
        let answer = ask(&format!("{question} [1-5, enter to skip, b=back] "))?;
        match answer.as_str() {
            "" => return Ok(StepInput::Fragment(StepFragment::Skipped)),
            "b" => return Ok(StepInput::Back),
            raw => match raw.parse::<u8>() {
                Ok(value @ 1..=5) => {
                    return Ok(StepInput::Fragment(StepFragment::Rating {
                        rating: kind,
                        value,
                    }))
                }
                _ => println!("  Please answer 1-5."),
            },
        }
    }
}

fn text_prompt(question: &str, kind: TextKind) -> Result<StepInput, Box<dyn std::error::Error>> {
    let answer = ask(&format!("{question} [enter to skip, b=back] "))?;
    Ok(match answer.as_str() {
        "" => StepInput::Fragment(StepFragment::Skipped),
        "b" => StepInput::Back,
        value => StepInput::Fragment(StepFragment::Text {
            text: kind,
            value: value.to_string(),
        }),
    })
}

fn habits_prompt<R: bookend_core::DayRecordRepository>(
    habits: &[Habit],
    slot: Slot,
    store: &mut DailyRecordStore<R>,
) -> Result<StepInput, Box<dyn std::error::Error>> {
    let eligible = habit::habits_for_slot(habits, slot);
    if eligible.is_empty() {
        return Ok(StepInput::Fragment(StepFragment::Acknowledged));
    }
    println!("Habits:");
    for habit in eligible {
        loop {
            let answer = ask(&format!(
                "  {} [d=done, l=later, enter=skip, b=back] ",
                habit.name
            ))?;
            match answer.as_str() {
                "d" => {
                    mark_habit_done(store, habit, slot)?;
                    break;
                }
                "l" => {
                    defer_habit(store, habit, slot)?;
                    break;
                }
                "" => break,
                "b" => return Ok(StepInput::Back),
                _ => println!("  Please answer d, l, or leave empty."),
            }
        }
    }
    Ok(StepInput::Fragment(StepFragment::Acknowledged))
}

fn confirm_prompt<R: bookend_core::DayRecordRepository>(
    habits: &[Habit],
    runner: &mut SequenceRunner,
    store: &mut DailyRecordStore<R>,
) -> Result<StepInput, Box<dyn std::error::Error>> {
    let listed: Vec<String> = match runner.confirmations() {
        Some(sheet) => sheet.listed().map(str::to_string).collect(),
        None => return Ok(StepInput::Fragment(StepFragment::Acknowledged)),
    };
    println!("You postponed these -- did they happen?");
    for habit_id in listed {
        let name = habits
            .iter()
            .find(|h| h.id == habit_id)
            .map(|h| h.name.as_str())
            .unwrap_or(habit_id.as_str());
        loop {
            let answer = ask(&format!("  {name} [y/n, b=back] "))?;
            match answer.as_str() {
                "y" | "n" => {
                    if let Some(sheet) = runner.confirmations_mut() {
                        sheet.resolve(store, &habit_id, answer == "y")?;
                    }
                    break;
                }
                "b" => return Ok(StepInput::Back),
                _ => println!("  Every postponed habit needs a yes or no."),
            }
        }
    }
    Ok(StepInput::Fragment(StepFragment::Acknowledged))
}

fn ask(prompt: &str) -> Result<String, Box<dyn std::error::Error>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn title(sequence: SequenceType) -> &'static str {
    match sequence {
        SequenceType::Startup => "Startup",
        SequenceType::Shutdown => "Shutdown",
    }
}

fn drain_warnings(events_rx: &mut mpsc::UnboundedReceiver<Event>) {
    while let Ok(event) = events_rx.try_recv() {
        if event.is_warning() {
            match &event {
                Event::PersistFailed { message, .. } => {
                    eprintln!("warning: a save failed ({message}); your local answers are intact")
                }
                Event::TimezoneFallback { requested, .. } => {
                    eprintln!("warning: unknown timezone '{requested}', using UTC")
                }
                Event::ConfirmIgnored { habit_id, .. } => {
                    eprintln!("warning: ignored confirmation for unknown deferral '{habit_id}'")
                }
                _ => {}
            }
        }
    }
}
