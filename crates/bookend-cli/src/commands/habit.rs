//! Habit management commands for CLI.

use clap::Subcommand;

use bookend_core::storage::{Config, RecordDb};
use bookend_core::{HabitCatalog, TimingAffinity};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit name
        name: String,
        /// Timing affinity: morning, evening, or anytime (default: anytime)
        #[arg(long, default_value = "anytime")]
        affinity: String,
    },
    /// List habits in sort order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a habit
    Rename {
        /// Habit ID
        id: String,
        /// New name
        name: String,
    },
    /// Change a habit's timing affinity
    Affinity {
        /// Habit ID
        id: String,
        /// New affinity: morning, evening, or anytime
        affinity: String,
    },
    /// Move a habit to a new position (0-based)
    Move {
        /// Habit ID
        id: String,
        /// Target position
        index: usize,
    },
    /// Delete a habit
    Delete {
        /// Habit ID
        id: String,
    },
}

fn parse_affinity(raw: &str) -> Result<TimingAffinity, Box<dyn std::error::Error>> {
    TimingAffinity::parse(raw)
        .ok_or_else(|| format!("unknown affinity '{raw}' (morning|evening|anytime)").into())
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user_id = config.profile.user_id.as_str();
    let db = RecordDb::open()?;

    match action {
        HabitAction::Add { name, affinity } => {
            let habit = db.add_habit(user_id, &name, parse_affinity(&affinity)?)?;
            println!("Created habit '{}' ({})", habit.name, habit.id);
        }
        HabitAction::List { json } => {
            let habits = db.habits(user_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&habits)?);
            } else if habits.is_empty() {
                println!("No habits yet. Add one with `bookend habit add`.");
            } else {
                for habit in habits {
                    println!(
                        "{:>3}  {:<30} {:<8} {}",
                        habit.sort_order,
                        habit.name,
                        habit.affinity.as_str(),
                        habit.id
                    );
                }
            }
        }
        HabitAction::Rename { id, name } => {
            db.rename_habit(&id, &name)?;
            println!("Renamed habit {id}");
        }
        HabitAction::Affinity { id, affinity } => {
            db.set_habit_affinity(&id, parse_affinity(&affinity)?)?;
            println!("Updated affinity for {id}");
        }
        HabitAction::Move { id, index } => {
            db.move_habit(user_id, &id, index)?;
            println!("Moved habit {id} to position {index}");
        }
        HabitAction::Delete { id } => {
            db.delete_habit(&id)?;
            println!("Deleted habit {id}");
        }
    }
    Ok(())
}
