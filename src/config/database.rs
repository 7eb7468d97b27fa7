use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Database settings managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    /// TOML: `database.url`. Default: `sqlite://social_auth.db`.
    #[serde(default = "default_url")]
    pub url: String,

    /// Upper bound on pooled connections.
    /// TOML: `database.max_connections`. Default: `5`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds a statement waits on a locked database before failing.
    /// TOML: `database.busy_timeout_secs`. Default: `5`.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Create the database file when it does not exist yet.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Run the social-auth DDL right after connecting.
    #[serde(default = "default_true")]
    pub apply_schema: bool,

    /// Also create the bundled `users` table. Disable when the application
    /// brings its own user model and table.
    #[serde(default = "default_true")]
    pub default_user_table: bool,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            create_if_missing: true,
            apply_schema: true,
            default_user_table: true,
        }
    }
}

fn default_url() -> String {
    "sqlite://social_auth.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}
