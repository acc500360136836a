use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typecode";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// State directory for analytics, `$HOME/.local/state/typecode` when HOME is set
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn analytics_json_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("analytics.json"))
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sessions.db"))
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typecode_config.json"))
    }
}
