//! Settings of the application, read from the environment.
//!
//! A `.env` file in the working directory is loaded first, variables
//! already set in the environment take precedence.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::Level;

pub const DEFAULT_MONGODB_PORT: u16 = 27017;
pub const DEFAULT_DB_NAME: &str = "lisogo";
pub const DEFAULT_SQLITE_URL: &str = "sqlite://lisogo.db?mode=rwc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub debug: bool,
    pub session_cookie_name: String,
    pub log_file: PathBuf,
    pub log_level: Level,
    pub database_url: Option<String>,
    pub mongodb_host: Option<String>,
    pub mongodb_port: u16,
    pub mongodb_db_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            debug: false,
            session_cookie_name: "lisogo_session".to_string(),
            log_file: PathBuf::from("lisogo.log"),
            log_level: Level::WARN,
            database_url: None,
            mongodb_host: None,
            mongodb_port: DEFAULT_MONGODB_PORT,
            mongodb_db_name: DEFAULT_DB_NAME.to_string(),
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

/// Accepts the tracing level names, plus the `WARNING` and `CRITICAL` aliases.
fn parse_level(key: &'static str, value: &str) -> Result<Level, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        _ => Err(invalid(key, value, "expected a log level")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the settings from `lookup`, which returns the value of a
    /// variable when it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(secret_key) = lookup("SECRET_KEY") {
            settings.secret_key = secret_key;
        }
        if let Some(debug) = lookup("DEBUG") {
            settings.debug = parse_bool("DEBUG", &debug)?;
        }
        if let Some(name) = non_empty(lookup("SESSION_COOKIE_NAME")) {
            settings.session_cookie_name = name;
        }
        if let Some(log_file) = non_empty(lookup("LOG_FILE")) {
            settings.log_file = PathBuf::from(log_file);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            settings.log_level = parse_level("LOG_LEVEL", &level)?;
        }

        settings.database_url = non_empty(lookup("DATABASE_URL"));
        settings.mongodb_host = non_empty(lookup("MONGODB_HOST"));

        if let Some(port) = non_empty(lookup("MONGODB_PORT")) {
            settings.mongodb_port = port
                .trim()
                .parse()
                .map_err(|_| invalid("MONGODB_PORT", &port, "expected a port number"))?;
        }
        if let Some(name) = non_empty(lookup("MONGODB_DB_NAME")) {
            settings.mongodb_db_name = name;
        }

        Ok(settings)
    }

    /// `DATABASE_URL` when set, else the mongodb server when a host is
    /// configured, else a local sqlite file.
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        match &self.mongodb_host {
            Some(host) => format!("mongodb://{}:{}", host, self.mongodb_port),
            None => DEFAULT_SQLITE_URL.to_string(),
        }
    }
}
