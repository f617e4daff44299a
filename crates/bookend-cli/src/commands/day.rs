//! Day record inspection commands.

use clap::Subcommand;

use bookend_core::storage::{Config, RecordDb};
use bookend_core::{DayRecord, DayRecordRepository, LocalDay};
use chrono::NaiveDate;

#[derive(Subcommand)]
pub enum DayAction {
    /// Show a day's record (defaults to today in your timezone)
    Show {
        /// Specific date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Show yesterday instead of today
        #[arg(long)]
        yesterday: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: DayAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = RecordDb::open()?;

    match action {
        DayAction::Show {
            date,
            yesterday,
            json,
        } => {
            let local_date = match date {
                Some(raw) => raw.parse::<NaiveDate>()?,
                None => {
                    let offset = if yesterday { -1 } else { 0 };
                    let day = LocalDay::resolve(&config.profile.timezone, offset);
                    if day.fallback {
                        eprintln!(
                            "warning: unknown timezone '{}', using UTC",
                            config.profile.timezone
                        );
                    }
                    day.date
                }
            };

            let record = db.fetch(&config.profile.user_id, local_date)?;
            match record {
                None => println!("No record for {local_date}."),
                Some(record) if json => {
                    println!("{}", serde_json::to_string_pretty(&record)?)
                }
                Some(record) => print_record(local_date, &record),
            }
        }
    }
    Ok(())
}

fn print_record(date: NaiveDate, record: &DayRecord) {
    println!("── {date} ──");
    let r = &record.ratings;
    println!(
        "ratings: prev-evening {}  sleep {}  morning {}  day {}",
        fmt_rating(r.prev_evening),
        fmt_rating(r.sleep),
        fmt_rating(r.morning),
        fmt_rating(r.day_overall),
    );
    if let Some(feeling) = &record.text.feeling {
        println!("feeling: {feeling}");
    }
    if let Some(accomplishment) = &record.text.accomplishment {
        println!("accomplished: {accomplishment}");
    }
    if let Some(improvement) = &record.text.improvement {
        println!("improve: {improvement}");
    }
    print_set("done (morning)", &record.completed_morning_habits);
    print_set("done (evening)", &record.completed_evening_habits);
    print_set("postponed from morning", &record.deferred_from_morning);
    print_set("postponed from evening", &record.deferred_from_evening);
    if let Some(at) = record.startup_completed_at {
        println!("startup finished: {at}");
    }
    if let Some(at) = record.shutdown_completed_at {
        println!("shutdown finished: {at}");
    }
}

fn fmt_rating(value: Option<u8>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_set(label: &str, set: &std::collections::BTreeSet<String>) {
    if !set.is_empty() {
        let items: Vec<&str> = set.iter().map(String::as_str).collect();
        println!("{label}: {}", items.join(", "));
    }
}
