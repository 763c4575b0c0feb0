use crate::env::{self, EnvVarError};
use admin::AdminClientOptions;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Variable consulted when neither the config file nor `SBADMIN__CONNECTION_STRING`
/// provide a connection string.
pub const CONNECTION_STRING_VAR: &str = "SERVICEBUS_CONNECTION_STRING";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(
        "Configuration loading failed: {0}. Please check config.toml and the SBADMIN__* environment variables."
    )]
    Load(#[from] config::ConfigError),

    #[error(
        "No connection string configured: set connection_string in the config file or SERVICEBUS_CONNECTION_STRING. ({0})"
    )]
    MissingConnectionString(#[source] EnvVarError),

    #[error("Invalid client options: {0}")]
    InvalidOptions(#[from] admin::AdminError),
}

/// Settings for one `sbadmin` run.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CliConfig {
    connection_string: Option<String>,
    #[serde(default)]
    client: AdminClientOptions,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("warn")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}

impl CliConfig {
    /// Loads `path` (optional unless given explicitly), then `SBADMIN__*`
    /// environment overrides, after reading a `.env` file if present.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigLoadError> {
        dotenv::dotenv().ok();

        let file_source = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let env_source = Environment::with_prefix("SBADMIN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true);

        let config = Config::builder()
            .add_source(file_source)
            .add_source(env_source)
            .build()?;
        let cli_config: CliConfig = config.try_deserialize()?;
        cli_config.client.validate()?;
        Ok(cli_config)
    }

    /// Connection string from the configuration, else from
    /// [`CONNECTION_STRING_VAR`].
    pub fn connection_string(&self) -> Result<String, ConfigLoadError> {
        match self
            .connection_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(connection_string) => Ok(connection_string.to_string()),
            None => env::get_validated_var(CONNECTION_STRING_VAR)
                .map_err(ConfigLoadError::MissingConnectionString),
        }
    }

    pub fn client_options(&self) -> &AdminClientOptions {
        &self.client
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        if let Some(page_size) = page_size {
            self.client.page_size = page_size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok_eq;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let config = CliConfig::default();
        assert_eq!(config.logging().level(), "warn");
        assert_eq!(config.logging().file(), None);
        assert_eq!(config.client_options(), &AdminClientOptions::default());
    }

    #[test]
    fn configured_connection_string_wins() {
        let config = CliConfig {
            connection_string: Some(
                "  Endpoint=sb://ns/;SharedAccessKeyName=k;SharedAccessKey=v ".to_string(),
            ),
            ..Default::default()
        };
        assert_ok_eq!(
            config.connection_string(),
            "Endpoint=sb://ns/;SharedAccessKeyName=k;SharedAccessKey=v".to_string()
        );
    }

    #[test]
    fn page_size_override() {
        let config = CliConfig::default().with_page_size(Some(7));
        assert_eq!(config.client_options().page_size, 7);
        let config = config.with_page_size(None);
        assert_eq!(config.client_options().page_size, 7);
    }
}
