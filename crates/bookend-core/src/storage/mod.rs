mod config;
pub mod record_db;

pub use config::{Config, ProfileConfig};
pub use record_db::RecordDb;

use std::path::PathBuf;

/// Returns `~/.config/bookend[-dev]/` based on BOOKEND_ENV.
///
/// Set BOOKEND_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("BOOKEND_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("bookend-dev")
    } else {
        base_dir.join("bookend")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
