use crate::utils::error::{BridgeError, Result};
use crate::utils::validation;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tally: TallyConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            timeout_seconds: 10,
        }
    }
}

impl TallyConfig {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// postgres:// connection URL. Usually set via `${DATABASE_URL}`.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: crate::llm::DEFAULT_ENDPOINT.to_string(),
            model: crate::llm::DEFAULT_MODEL.to_string(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl ServerConfig {
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.tls_cert.as_deref(), self.tls_key.as_deref()) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_seconds: u64,
    /// Keep syncing on the interval by default; `sync --watch` also turns
    /// this on for a single invocation.
    pub watch: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            watch: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    /// so one-off commands work without any setup.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| BridgeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("tally.endpoint", &self.tally.endpoint())?;
        validation::validate_positive_number("tally.timeout_seconds", self.tally.timeout_seconds, 1)?;
        validation::validate_positive_number("sync.interval_seconds", self.sync.interval_seconds, 1)?;

        if !self.database.url.is_empty() {
            validation::validate_db_url("database.url", &self.database.url)?;
        }

        if self.llm.enabled {
            validation::validate_url("llm.endpoint", &self.llm.endpoint)?;
            validation::validate_non_empty_string("llm.model", &self.llm.model)?;
        }

        match (&self.server.tls_cert, &self.server.tls_key) {
            (Some(_), None) => {
                return Err(BridgeError::MissingConfigError {
                    field: "server.tls_key".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(BridgeError::MissingConfigError {
                    field: "server.tls_cert".to_string(),
                })
            }
            _ => {}
        }

        Ok(())
    }

    /// The database URL, or a configuration error when it was never set.
    pub fn require_database_url(&self) -> Result<&str> {
        if self.database.url.is_empty() {
            Err(BridgeError::MissingConfigError {
                field: "database.url".to_string(),
            })
        } else {
            Ok(&self.database.url)
        }
    }
}

impl validation::Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

/// Replace `${VAR}` references with environment values so credentials can
/// stay out of the config file. Unknown variables are left as-is, which the
/// URL validation will then reject with a readable message.
fn substitute_env_vars(content: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}
