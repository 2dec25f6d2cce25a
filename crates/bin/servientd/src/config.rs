//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `servient.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use servient_app::description::FormGenerator;
use servient_app::exposed_thing::ThingOptions;
use servient_domain::thing::ThingDescription;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Exposed Thing settings.
    pub thing: ThingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Public URI prefix used in generated forms; relative forms when unset.
    pub base_uri: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Which Things to expose and how.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThingConfig {
    /// Thing Description (JSON) to expose without handlers.
    pub description: Option<PathBuf>,
    /// Buffered values per event channel.
    pub event_capacity: usize,
    /// Buffered descriptions on the change stream.
    pub change_capacity: usize,
    /// Expose the built-in counter Thing.
    pub demo: bool,
}

impl Config {
    /// Load configuration from `servient.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("servient.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SERVIENT_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("SERVIENT_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("SERVIENT_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("SERVIENT_BASE_URI") {
            self.server.base_uri = Some(val);
        }
        if let Some(val) = var("SERVIENT_THING") {
            self.thing.description = Some(PathBuf::from(val));
        }
        if let Some(val) = var("SERVIENT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        self.thing_options()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn thing_options(&self) -> ThingOptions {
        ThingOptions {
            event_capacity: self.thing.event_capacity,
            change_capacity: self.thing.change_capacity,
        }
    }

    /// Form generator honouring the configured base URI.
    #[must_use]
    pub fn generator(&self) -> FormGenerator {
        match &self.server.base_uri {
            Some(base_uri) => FormGenerator::with_base_uri(base_uri.as_str()),
            None => FormGenerator::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_uri: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "servientd=info,servient_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ThingConfig {
    fn default() -> Self {
        let options = ThingOptions::default();
        Self {
            description: None,
            event_capacity: options.event_capacity,
            change_capacity: options.change_capacity,
            demo: true,
        }
    }
}

/// Read a Thing Description from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid description.
pub fn load_description(path: &Path) -> Result<ThingDescription, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Description {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// The configured Thing Description is malformed.
    #[error("invalid thing description in `{}`", .path.display())]
    Description {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
