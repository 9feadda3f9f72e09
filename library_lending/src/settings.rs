use serde::Deserialize;

use crate::postgres_connection::PostgresConfig;

/// Process settings read from the environment
/// (`USE_IN_MEMORY_DB`, `DB_HOST`, `DB_USERNAME`, `DB_PASSWORD`, `PORT`)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("use_in_memory_db", false)?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("port", 8080)?
            .add_source(environment.try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            hostname: self.db_host.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}
