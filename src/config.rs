//! Container configuration.
//!
//! Configuration is always passed explicitly to the container; there is no
//! process-wide mode flag. [`ContainerConfig::from_env`] is a convenience
//! for deployments that configure through the environment.

use std::env;
use std::str::FromStr;

#[cfg(feature = "snapshot")]
use serde::{Deserialize, Serialize};

use crate::adapter::DEFAULT_MAX_DEPTH;
use crate::behaviors::ScopeIsolation;
use crate::error::{DiError, DiResult};

/// Environment variable selecting the scope isolation mode.
pub const ENV_SCOPE_ISOLATION: &str = "FERROUS_ADAPTERS_SCOPE_ISOLATION";
/// Environment variable overriding the maximum resolution depth.
pub const ENV_MAX_DEPTH: &str = "FERROUS_ADAPTERS_MAX_DEPTH";

/// Settings a [`Container`](crate::Container) is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(default))]
pub struct ContainerConfig {
    /// Isolation mode used when the container builds its default factory
    pub scope_isolation: ScopeIsolation,
    /// Maximum nesting of one resolution before it fails
    pub max_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            scope_isolation: ScopeIsolation::AlwaysIsolate,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerConfig {
    /// Defaults overridden by the environment.
    ///
    /// - `FERROUS_ADAPTERS_SCOPE_ISOLATION`: `always-isolate`, `scope-ensures-isolation`,
    ///   `true` or `false` (default: `always-isolate`)
    /// - `FERROUS_ADAPTERS_MAX_DEPTH`: positive integer (default: 1024)
    pub fn from_env() -> DiResult<Self> {
        Self::default().with_env_override()
    }

    /// Applies environment overrides on top of `self`.
    pub fn with_env_override(mut self) -> DiResult<Self> {
        if let Ok(value) = env::var(ENV_SCOPE_ISOLATION) {
            self.scope_isolation = value.parse()?;
        }

        if let Ok(value) = env::var(ENV_MAX_DEPTH) {
            self.max_depth = match value.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => depth,
                _ => {
                    return Err(DiError::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        ENV_MAX_DEPTH, value
                    )))
                }
            };
        }

        Ok(self)
    }

    pub fn with_scope_isolation(mut self, isolation: impl Into<ScopeIsolation>) -> Self {
        self.scope_isolation = isolation.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl FromStr for ScopeIsolation {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always-isolate" | "true" => Ok(ScopeIsolation::AlwaysIsolate),
            "scope-ensures-isolation" | "false" => Ok(ScopeIsolation::ScopeEnsuresIsolation),
            other => Err(DiError::Config(format!(
                "unknown scope isolation mode '{}'",
                other
            ))),
        }
    }
}
