use airops_shared::Masked;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub allocation: AllocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: Masked<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AllocationConfig {
    /// Upper bound on waiting for a flight instance's row lock.
    pub lock_timeout_ms: u64,
}

impl AllocationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            // Shared settings; optional so the binary also runs from outside the workspace
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, `development` unless RUN_MODE says otherwise
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AIROPS__DATABASE__PASSWORD=secret`
            .add_source(config::Environment::with_prefix("AIROPS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse a TOML document layered over the built-in defaults.
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        Self::defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Positional `<dbname> <port> <user>` arguments win over every other source.
    pub fn override_connection(&mut self, name: String, port: u16, user: String) {
        self.database.name = name;
        self.database.port = port;
        self.database.user = user;
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432_i64)?
            .set_default("database.name", "airline")?
            .set_default("database.user", "postgres")?
            .set_default("database.password", "")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("database.acquire_timeout_secs", 3_i64)?
            .set_default("allocation.lock_timeout_ms", 2000_i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_files() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.allocation.lock_timeout(), Duration::from_secs(2));
        assert_eq!(config.database.password.expose(), "");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = Config::from_toml(
            r#"
            [database]
            host = "db.internal"
            password = "s3cret"

            [allocation]
            lock_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.name, "airline");
        assert_eq!(config.allocation.lock_timeout(), Duration::from_millis(250));
        assert_eq!(config.database.password.expose(), "s3cret");
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_cli_arguments_override_connection() {
        let mut config = Config::from_toml("").unwrap();
        config.override_connection("ops_db".into(), 6543, "ops".into());

        assert_eq!(config.database.name, "ops_db");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.user, "ops");
        assert_eq!(config.database.host, "localhost");
    }
}
