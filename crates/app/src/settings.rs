//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and `FINTRACK__*` environment variables, the
//! latter winning (`FINTRACK__AUTH__JWT_SECRET`, `FINTRACK__SERVER__PORT`).
//!
//! See `settings.toml` for an example configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
    Url(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    pub auth: Auth,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_token_ttl() -> i64 {
    60 * 24 * 7
}

fn default_refresh_token_ttl() -> i64 {
    30
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("settings")
    }

    fn from_path(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", default_level())?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("FINTRACK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
            Database::Url(url) => url.clone(),
        }
    }
}
