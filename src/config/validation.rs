use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::{
    config::models::{HttpConfig, LoggingConfig, RoutesConfig, ServerConfig},
    core::openapi::ApiInfo,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at once
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }
        errors.extend(Self::validate_routes(&config.routes));
        errors.extend(Self::validate_docs(&config.docs));
        if let Err(e) = Self::validate_logging(&config.logging) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_http(&config.http) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_routes(routes: &RoutesConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if routes.structure_path.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes.structure_path".to_string(),
            });
        }

        if !Self::is_valid_namespace(&routes.namespace) {
            errors.push(ValidationError::InvalidField {
                field: "routes.namespace".to_string(),
                message: format!(
                    "'{}' must be one or more identifiers joined by '::' (e.g. 'Controllers')",
                    routes.namespace
                ),
            });
        }

        errors
    }

    /// `Ident(::Ident)*` where an identifier starts with a letter or underscore.
    fn is_valid_namespace(namespace: &str) -> bool {
        namespace.split("::").all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
    }

    fn validate_docs(docs: &ApiInfo) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if docs.title.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "docs.title".to_string(),
            });
        }
        if docs.version.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "docs.version".to_string(),
            });
        }
        errors
    }

    fn validate_logging(logging: &LoggingConfig) -> ValidationResult<()> {
        EnvFilter::try_new(&logging.level)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: e.to_string(),
            })
    }

    fn validate_http(http: &HttpConfig) -> ValidationResult<()> {
        if http.max_body_bytes == 0 {
            return Err(ValidationError::InvalidField {
                field: "http.max_body_bytes".to_string(),
                message: "Body limit must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_defaults() {
        assert!(ServerConfigValidator::validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_listen_address() {
        let config = ServerConfig {
            listen_addr: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(ServerConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn validate_checks_namespace_syntax() {
        assert!(ServerConfigValidator::is_valid_namespace("Controllers"));
        assert!(ServerConfigValidator::is_valid_namespace("App::V2::_Internal"));
        assert!(!ServerConfigValidator::is_valid_namespace(""));
        assert!(!ServerConfigValidator::is_valid_namespace("App::"));
        assert!(!ServerConfigValidator::is_valid_namespace("2App"));
        assert!(!ServerConfigValidator::is_valid_namespace("App\\Controllers"));
    }

    #[test]
    fn validate_rejects_zero_body_limit() {
        let mut config = ServerConfig::default();
        config.http.max_body_bytes = 0;
        assert!(ServerConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn validate_reports_all_errors() {
        let mut config = ServerConfig::default();
        config.listen_addr = "nope".to_string();
        config.routes.structure_path = String::new();
        config.docs.title = String::new();

        let Err(ValidationError::ValidationFailed { message }) =
            ServerConfigValidator::validate(&config)
        else {
            panic!("expected aggregated failure");
        };
        assert!(message.starts_with("Found 3 validation errors"));
        assert!(message.contains("routes.structure_path"));
        assert!(message.contains("docs.title"));
    }
}
