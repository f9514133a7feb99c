//! # Bot Configuration Module
//!
//! Runtime settings read from environment variables, with defaults matching
//! the deployment the bot was written for.

use std::env;
use std::path::PathBuf;

// Constants for runtime defaults
pub const DEFAULT_STATE_FILE: &str = "state.json";
pub const DEFAULT_LOG_FILE: &str = "coffee.log";

/// Affirmation phrases sent back when a coffee is logged.
pub const COFFEE_PHRASES: &[&str] = &["KAAAFFFEEEE", "Enjoy :)"];
/// Affirmation phrases sent back when a tea is logged.
pub const TEA_PHRASES: &[&str] = &["Splendid!", "Enjoy :)"];

/// Display names are capped to keep leaderboards and keyboards readable.
pub const MAX_NAME_LEN: usize = 15;

/// Runtime settings for the bot process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the persisted ledger snapshot.
    pub state_file: PathBuf,
    /// Path of the log file (also served via the `get log` command).
    pub log_file: PathBuf,
    /// Telegram id of the admin seeded when no prior state exists.
    pub default_admin_id: Option<String>,
    /// Display name of the seeded admin.
    pub default_admin_name: String,
}

impl Settings {
    /// Build settings from the environment. Only the default admin is
    /// optional; it is required the first time the bot starts with no
    /// snapshot on disk.
    pub fn from_env() -> Self {
        Settings {
            state_file: env::var("STATE_FILE")
                .unwrap_or_else(|_| DEFAULT_STATE_FILE.to_string())
                .into(),
            log_file: env::var("LOG_FILE")
                .unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string())
                .into(),
            default_admin_id: env::var("DEFAULT_ADMIN_ID").ok(),
            default_admin_name: env::var("DEFAULT_ADMIN_NAME")
                .unwrap_or_else(|_| "Admin".to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            state_file: DEFAULT_STATE_FILE.into(),
            log_file: DEFAULT_LOG_FILE.into(),
            default_admin_id: None,
            default_admin_name: "Admin".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.state_file, PathBuf::from("state.json"));
        assert_eq!(settings.log_file, PathBuf::from("coffee.log"));
        assert!(settings.default_admin_id.is_none());
    }

    #[test]
    fn test_phrase_tables_non_empty() {
        assert!(!COFFEE_PHRASES.is_empty());
        assert!(!TEA_PHRASES.is_empty());
    }
}
