use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Tally request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("XML processing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Tally XML service is not enabled")]
    TallyXmlDisabled,

    #[error("Cannot connect to Tally at {endpoint}")]
    TallyUnavailable { endpoint: String },

    #[error("Tally returned HTTP {status}: {body}")]
    TallyHttpError { status: u16, body: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for `{field}`: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Language model error: {message}")]
    LlmError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Database,
    Parsing,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BridgeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::ApiError(_)
            | BridgeError::TallyXmlDisabled
            | BridgeError::TallyUnavailable { .. }
            | BridgeError::TallyHttpError { .. }
            | BridgeError::LlmError { .. } => ErrorCategory::Network,
            BridgeError::DbError(_) => ErrorCategory::Database,
            BridgeError::XmlError(_) | BridgeError::SerializationError(_) => ErrorCategory::Parsing,
            BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BridgeError::IoError(_) | BridgeError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BridgeError::LlmError { .. } => ErrorSeverity::Low,
            BridgeError::ApiError(_)
            | BridgeError::TallyUnavailable { .. }
            | BridgeError::TallyHttpError { .. } => ErrorSeverity::Medium,
            BridgeError::TallyXmlDisabled
            | BridgeError::XmlError(_)
            | BridgeError::SerializationError(_)
            | BridgeError::ProcessingError { .. } => ErrorSeverity::High,
            BridgeError::DbError(_)
            | BridgeError::IoError(_)
            | BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BridgeError::TallyXmlDisabled => "Enable XML in Tally: open Tally, press F12 > \
                 Configure, go to Advanced Configuration, set 'Enable XML' to Yes, restart Tally"
                .to_string(),
            BridgeError::TallyUnavailable { endpoint } => format!(
                "Make sure Tally is running, XML services are enabled (F12 > Configure > \
                 Advanced Config) and the endpoint {} is correct (default: localhost:9000)",
                endpoint
            ),
            BridgeError::TallyHttpError { .. } | BridgeError::ApiError(_) => {
                "Check the Tally host/port configuration and that the service is reachable"
                    .to_string()
            }
            BridgeError::DbError(_) => {
                "Verify the PostgreSQL connection URL, that the server is running and the \
                 configured user can create tables"
                    .to_string()
            }
            BridgeError::XmlError(_) => {
                "The Tally response was not parseable XML; retry, and check the Tally version"
                    .to_string()
            }
            BridgeError::LlmError { .. } => {
                "Check that the Ollama service is running and the configured model is pulled"
                    .to_string()
            }
            BridgeError::ConfigError { .. }
            | BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. } => {
                "Fix the configuration file and run again (see tallybridge.example.toml)"
                    .to_string()
            }
            _ => "Check the logs for details and retry".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BridgeError::TallyXmlDisabled => "Tally XML service is not enabled!".to_string(),
            BridgeError::TallyUnavailable { .. } => "Cannot connect to Tally.".to_string(),
            BridgeError::DbError(e) => format!("Database problem: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_config_errors_highest() {
        let config = BridgeError::MissingConfigError {
            field: "database.url".to_string(),
        };
        let llm = BridgeError::LlmError {
            message: "model not found".to_string(),
        };
        assert_eq!(config.severity(), ErrorSeverity::Critical);
        assert_eq!(llm.severity(), ErrorSeverity::Low);
        assert!(llm.severity() < config.severity());
    }

    #[test]
    fn tally_disabled_suggestion_mentions_f12() {
        let err = BridgeError::TallyXmlDisabled;
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.recovery_suggestion().contains("F12"));
    }
}
