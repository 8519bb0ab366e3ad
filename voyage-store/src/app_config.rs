use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Without a database the API runs on the in-memory store.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// JSON seed for the in-memory store.
    pub seed_path: Option<String>,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            suggestion_limit: default_suggestion_limit(),
            horizon_days: default_horizon_days(),
            seed_path: None,
        }
    }
}

fn default_suggestion_limit() -> usize { 3 }

fn default_horizon_days() -> u32 { 365 }

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_topic() -> String {
    voyage_shared::models::TOPIC_BOOKINGS.to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, uncommitted overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `VOYAGE_BOOKING__SUGGESTION_LIMIT=5` sets `booking.suggestion_limit`
            .add_source(config::Environment::with_prefix("VOYAGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
