use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Alimenta";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session cookie lifetime: 7 days.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Default bind address when ALIMENTA_ADDR is unset.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database path (ALIMENTA_DB, default under the home data dir).
    pub database_path: PathBuf,
    /// Key for session and cursor signatures (ALIMENTA_SECRET, required).
    pub signing_secret: String,
    /// Consultation notification endpoint (ALIMENTA_WEBHOOK_URL, optional).
    pub webhook_url: Option<String>,
    /// HTTP bind address (ALIMENTA_ADDR).
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Empty values count as unset so `ALIMENTA_WEBHOOK_URL=""` behaves
    /// the same as not exporting the variable at all.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_path = match env_nonempty("ALIMENTA_DB") {
            Some(path) => PathBuf::from(path),
            None => default_database_path(),
        };

        let signing_secret = env_nonempty("ALIMENTA_SECRET")
            .ok_or(ConfigError::MissingVar("ALIMENTA_SECRET"))?;

        let webhook_url = env_nonempty("ALIMENTA_WEBHOOK_URL");

        let addr_raw = env_nonempty("ALIMENTA_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidVar {
                var: "ALIMENTA_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            database_path,
            signing_secret,
            webhook_url,
            bind_addr,
        })
    }
}

fn env_nonempty(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get the application data directory
/// ~/Alimenta/ on all platforms (user-visible, single-practice tool)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Alimenta")
}

/// Default database location inside the data directory.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("alimenta.db")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Alimenta"));
    }

    #[test]
    fn default_database_under_app_data() {
        let db = default_database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("alimenta.db"));
    }

    #[test]
    fn default_addr_parses() {
        let addr: SocketAddr = DEFAULT_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn default_filter_names_crate() {
        assert!(default_log_filter().contains("alimenta"));
    }

    #[test]
    fn session_ttl_is_seven_days() {
        assert_eq!(SESSION_TTL_SECS, 604_800);
    }
}
