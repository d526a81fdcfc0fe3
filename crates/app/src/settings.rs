//! Application settings, read from `settings.toml`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! database = { sqlite = "./centavo.db" }
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 3000
//!
//! [scheduler]
//! interval_secs = 3600
//! ```

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub server: Option<Server>,
    pub scheduler: Option<Scheduler>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
