//! Environment-driven configuration for the control plane.
//!
//! Every tunable — server bind address, database pool, the provisioning
//! deadlines and scheduler cadences — loads through one `FromEnv` trait,
//! so the binary's whole configuration surface is the set of `from_env`
//! implementations and nothing reads `std::env` ad hoc.

pub mod provisioning;
pub mod server;
pub mod tracing;

use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Deployment flavor. Development is a laptop or kind cluster talking to
/// a local Docker socket; production is the real cluster with HTTPS
/// termination in front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Reads `APP_ENV`; anything other than "production" (case
    /// insensitive) is development.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    // Whether HTTPS features should be enabled
    pub fn use_https(&self) -> bool {
        self.is_production()
    }
}

/// A configuration struct that knows how to load itself from environment
/// variables.
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// The variable's value, or `default` when unset.
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// The variable's value, or `MissingEnvVar` — for settings with no sane
/// default, like `DATABASE_URL`.
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_app_env_means_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(!env.use_https());
        });
    }

    #[test]
    fn production_is_case_insensitive() {
        for spelling in ["production", "PRODUCTION", "Production"] {
            temp_env::with_var("APP_ENV", Some(spelling), || {
                assert!(Environment::from_env().is_production());
            });
        }
    }

    #[test]
    fn unknown_app_env_falls_back_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn env_or_default_prefers_the_set_value() {
        temp_env::with_var("BASE_DOMAIN", Some("mockfactory.test"), || {
            assert_eq!(env_or_default("BASE_DOMAIN", "mockfactory.dev"), "mockfactory.test");
        });
        temp_env::with_var_unset("BASE_DOMAIN", || {
            assert_eq!(env_or_default("BASE_DOMAIN", "mockfactory.dev"), "mockfactory.dev");
        });
    }

    #[test]
    fn env_required_reports_the_missing_key() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = env_required("DATABASE_URL").unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
            assert!(err.to_string().contains("required"));
        });
        temp_env::with_var("DATABASE_URL", Some("postgresql://localhost/mockfactory"), || {
            assert_eq!(env_required("DATABASE_URL").unwrap(), "postgresql://localhost/mockfactory");
        });
    }
}
