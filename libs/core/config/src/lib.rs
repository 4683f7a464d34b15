pub mod tracing;

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Failed to read config file '{path}': {details}")]
    ReadError { path: String, details: String },

    #[error("Failed to parse config file '{path}': {details}")]
    InvalidFile { path: String, details: String },
}

/// Runtime mode of the service.
///
/// `Debug` and `Test` talk to vendor sandbox endpoints and log in a
/// human-readable format; `Release` talks to production endpoints and logs
/// JSON for aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Debug,
    Test,
    Release,
}

impl Mode {
    /// Resolve the mode from `PUSH_MODE` (unknown values fall back to debug).
    pub fn from_env() -> Self {
        match env::var("PUSH_MODE") {
            Ok(v) if v.eq_ignore_ascii_case("release") => Mode::Release,
            Ok(v) if v.eq_ignore_ascii_case("test") => Mode::Test,
            _ => Mode::Debug,
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self, Mode::Release)
    }

    /// Sandbox modes exercise vendor development endpoints.
    pub fn is_sandbox(&self) -> bool {
        !self.is_release()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Debug => "debug",
            Mode::Test => "test",
            Mode::Release => "release",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load an environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load an environment variable or return an error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Helper to parse an environment variable, falling back to a default when unset
pub fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("invalid value '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_debug() {
        temp_env::with_var_unset("PUSH_MODE", || {
            let mode = Mode::from_env();
            assert_eq!(mode, Mode::Debug);
            assert!(mode.is_sandbox());
            assert!(!mode.is_release());
        });
    }

    #[test]
    fn test_mode_release() {
        temp_env::with_var("PUSH_MODE", Some("release"), || {
            let mode = Mode::from_env();
            assert_eq!(mode, Mode::Release);
            assert!(mode.is_release());
            assert!(!mode.is_sandbox());
        });
    }

    #[test]
    fn test_mode_case_insensitive() {
        temp_env::with_var("PUSH_MODE", Some("RELEASE"), || {
            assert_eq!(Mode::from_env(), Mode::Release);
        });

        temp_env::with_var("PUSH_MODE", Some("Test"), || {
            assert_eq!(Mode::from_env(), Mode::Test);
        });
    }

    #[test]
    fn test_mode_unknown_falls_back_to_debug() {
        temp_env::with_var("PUSH_MODE", Some("staging"), || {
            assert_eq!(Mode::from_env(), Mode::Debug);
        });
    }

    #[test]
    fn test_mode_serde_round_trip() {
        let json = serde_json::to_string(&Mode::Release).unwrap();
        assert_eq!(json, "\"release\"");
        let mode: Mode = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(mode, Mode::Test);
    }

    #[test]
    fn test_env_or_default_with_value() {
        temp_env::with_var("TEST_VAR", Some("test_value"), || {
            assert_eq!(env_or_default("TEST_VAR", "default"), "test_value");
        });
    }

    #[test]
    fn test_env_or_default_without_value() {
        temp_env::with_var_unset("MISSING_VAR", || {
            assert_eq!(env_or_default("MISSING_VAR", "default_value"), "default_value");
        });
    }

    #[test]
    fn test_env_required_success() {
        temp_env::with_var("REQUIRED_VAR", Some("required_value"), || {
            assert_eq!(env_required("REQUIRED_VAR").unwrap(), "required_value");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("MISSING_REQUIRED", || {
            let err = env_required("MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_or() {
        temp_env::with_var("PORT_VAR", Some("8081"), || {
            let port: u16 = env_parse_or("PORT_VAR", 8080).unwrap();
            assert_eq!(port, 8081);
        });

        temp_env::with_var_unset("PORT_VAR", || {
            let port: u16 = env_parse_or("PORT_VAR", 8080).unwrap();
            assert_eq!(port, 8080);
        });

        temp_env::with_var("PORT_VAR", Some("not-a-port"), || {
            let result: Result<u16, _> = env_parse_or("PORT_VAR", 8080);
            assert!(result.is_err());
        });
    }
}
