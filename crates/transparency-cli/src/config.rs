use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use transparency_core::EngineConfig;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// environment, later sources overriding earlier ones.
    ///
    /// Without an explicit path, `config.toml` in the working directory is
    /// used when present. Environment variables carry the `TRANSPARENCY_`
    /// prefix and use double underscores for nesting:
    /// - TRANSPARENCY_DATABASE__URL=sqlite://scores.db?mode=rwc
    /// - TRANSPARENCY_ENGINE__MAX_RETRIES=5
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();
        let builder = Config::builder()
            .set_default("database.url", "sqlite://transparency.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("engine.max_retries", defaults.max_retries)?
            .set_default(
                "engine.default_evidence_deadline_days",
                defaults.default_evidence_deadline_days,
            )?
            .set_default(
                "engine.event_channel_capacity",
                defaults.event_channel_capacity as u64,
            )?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None if Path::new("config.toml").exists() => {
                builder.add_source(File::with_name("config"))
            }
            None => builder,
        };

        let builder = builder.add_source(
            Environment::with_prefix("TRANSPARENCY")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
