//! # Configuration Module
//!
//! Immutable key/value settings consumed by the dispatch engine.
//!
//! ## Overview
//!
//! A [`Config`] is read-only after construction. Three keys are recognized by
//! the engine itself:
//!
//! - `environment` - `development` or `production`; controls how much detail
//!   error payloads expose (default: `production`)
//! - `base_path` - URL prefix propagated into transport-bound requests
//! - `client_secret` - opaque secret used for request access validation
//!
//! Every key is optional: absence means "feature disabled", never an error.
//! Arbitrary additional keys are kept verbatim and exposed through the
//! try-get accessors, so hosts can hang their own settings off the same
//! object they hand to [`Application`](crate::Application).
//!
//! ## Example
//!
//! ```
//! use dais::config::{Config, Environment};
//!
//! let config = Config::from_yaml_str(
//!     "environment: development\nbase_path: /api\ngreeting: hello\n",
//! )
//! .unwrap();
//!
//! assert_eq!(config.environment(), Environment::Development);
//! assert_eq!(config.base_path(), Some("/api"));
//! assert!(config.has("greeting"));
//! assert!(!config.has("client_secret"));
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Runtime environment tag.
///
/// Defaults to [`Environment::Production`], the safe choice: production
/// error payloads carry no source locations, traces, or request snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// True when debug detail may be included in error payloads.
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            other => Err(Error::config(format!(
                "unknown environment `{other}` (expected `development` or `production`)"
            ))),
        }
    }
}

/// Immutable engine configuration.
///
/// Construct with [`Config::builder`], [`Config::from_yaml_str`],
/// [`Config::from_file`] or [`Config::from_value`]; read with the typed
/// accessors or the generic [`get`](Config::get) / [`has`](Config::has)
/// pair. There is deliberately no mutation surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    environment: Environment,
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(flatten, default)]
    extra: HashMap<String, Value>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a YAML document into a `Config`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid config: {e}")))
    }

    /// Read and parse a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Build a `Config` from an in-memory JSON value.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::config(format!("invalid config: {e}")))
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Presence check covering the typed keys and the extras uniformly.
    pub fn has(&self, key: &str) -> bool {
        match key {
            "environment" => true,
            "base_path" => self.base_path.is_some(),
            "client_secret" => self.client_secret.is_some(),
            other => self.extra.contains_key(other),
        }
    }

    /// Fetch a key as a JSON value. Typed keys are synthesized; extras are
    /// cloned out of the backing map. Returns `None` for absent keys rather
    /// than any kind of falsy placeholder.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "environment" => Some(Value::String(self.environment.to_string())),
            "base_path" => self.base_path.clone().map(Value::String),
            "client_secret" => self.client_secret.clone().map(Value::String),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// Builder for programmatic [`Config`] construction (hosts and tests).
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    environment: Environment,
    base_path: Option<String>,
    client_secret: Option<String>,
    extra: HashMap<String, Value>,
}

impl ConfigBuilder {
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Attach an arbitrary extra key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Config {
        Config {
            environment: self.environment,
            base_path: self.base_path,
            client_secret: self.client_secret,
            extra: self.extra,
        }
    }
}
