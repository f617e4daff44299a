use clap::{Parser, Subcommand};

use bookend_core::SequenceType;

mod commands;

#[derive(Parser)]
#[command(name = "bookend", version, about = "Bookend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Run the morning Startup sequence
    Startup,
    /// Run the evening Shutdown sequence
    Shutdown,
    /// Inspect day records
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Startup => commands::sequence::run(SequenceType::Startup),
        Commands::Shutdown => commands::sequence::run(SequenceType::Shutdown),
        Commands::Day { action } => commands::day::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
