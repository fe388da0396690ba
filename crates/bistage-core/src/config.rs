use std::collections::HashMap;
use std::env;

use bistage_domain::RuntimeFamily;

/// Environment variable naming the legacy interpreter versions to stage,
/// bypassing host discovery. Whitespace separated; set-but-empty forces
/// the family to stage nothing.
pub const LEGACY_VERSIONS_ENV: &str = "BISTAGE_PY2_VERSIONS";

/// Same as [`LEGACY_VERSIONS_ENV`], for the modern family.
pub const MODERN_VERSIONS_ENV: &str = "BISTAGE_PY3_VERSIONS";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Default)]
pub struct Config {
    pub(crate) discovery: DiscoveryConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            discovery: DiscoveryConfig {
                legacy_override: parse_override(snapshot.var(LEGACY_VERSIONS_ENV)),
                modern_override: parse_override(snapshot.var(MODERN_VERSIONS_ENV)),
            },
        }
    }

    pub(crate) fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }
}

#[derive(Debug, Default)]
pub(crate) struct DiscoveryConfig {
    legacy_override: Option<Vec<String>>,
    modern_override: Option<Vec<String>>,
}

impl DiscoveryConfig {
    /// Version tokens configured for a family, or `None` when the host
    /// should be asked. An empty slice means the operator pinned the
    /// family to nothing.
    pub(crate) fn override_for(&self, family: RuntimeFamily) -> Option<&[String]> {
        let tokens = match family {
            RuntimeFamily::Legacy => self.legacy_override.as_ref(),
            RuntimeFamily::Modern => self.modern_override.as_ref(),
        };
        tokens.map(Vec::as_slice)
    }
}

fn parse_override(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|value| value.split_whitespace().map(ToString::to_string).collect())
}
