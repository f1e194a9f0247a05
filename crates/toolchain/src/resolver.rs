//! Layered Configuration Resolver
//!
//! Resolves configuration values as explicit override > environment value
//! > default. A missing required value is reported as an error naming the
//! key and how to supply it; the resolver never terminates the process.

use std::collections::HashMap;

use tracing::debug;

/// A required configuration value is absent.
#[derive(Debug, Clone, thiserror::Error)]
#[error("please set {key}: add it to the build configuration or export {key}=path")]
pub struct ConfigurationError {
    pub key: String,
}

impl ConfigurationError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Layered key/value lookup over explicit overrides and an environment
/// snapshot. The snapshot is injected so builds are reproducible and tests
/// run hermetically.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationResolver {
    overrides: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl ConfigurationResolver {
    /// Create a resolver over a snapshot of the process environment.
    pub fn from_env() -> Self {
        Self {
            overrides: HashMap::new(),
            env: std::env::vars().collect(),
        }
    }

    /// Create a resolver over explicit maps (test entry point).
    pub fn new(overrides: HashMap<String, String>, env: HashMap<String, String>) -> Self {
        Self { overrides, env }
    }

    /// Add or replace an explicit override.
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.overrides.insert(key.into(), value.into());
    }

    /// Look a key up through the layers. Empty values count as unset, so an
    /// empty override can disable an optional feature such as signing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.env.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look a key up, falling back to a default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Look a required key up.
    pub fn require(&self, key: &str) -> Result<String, ConfigurationError> {
        match self.get(key) {
            Some(v) => {
                debug!(key, value = v, "resolved configuration value");
                Ok(v.to_string())
            }
            None => Err(ConfigurationError::missing(key)),
        }
    }
}
