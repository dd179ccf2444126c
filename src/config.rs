use std::net::SocketAddr;
use thiserror::Error;

use crate::component::{ComponentId, DEFAULT_LISTENER_HISTORY};
use crate::global::DEFAULT_MAX_LISTENERS;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings for the demo server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// Entries each global listener keeps
    pub listener_history: usize,
    /// Listeners the HTTP API keeps open at once
    pub max_listeners: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            listener_history: DEFAULT_LISTENER_HISTORY,
            max_listeners: DEFAULT_MAX_LISTENERS,
        }
    }
}

impl AppConfig {
    /// Reads `BIND_ADDR`, `LISTENER_HISTORY` and `MAX_LISTENERS`, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                name: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let listener_history = bounded(
            &lookup,
            "LISTENER_HISTORY",
            DEFAULT_LISTENER_HISTORY,
            usize::MAX,
        )?;
        let max_listeners = bounded(
            &lookup,
            "MAX_LISTENERS",
            DEFAULT_MAX_LISTENERS,
            ComponentId::MAX as usize,
        )?;

        Ok(Self {
            bind_addr,
            listener_history,
            max_listeners,
        })
    }
}

/// Parses a count in `1..=max`, or returns `default` when unset
fn bounded<F>(
    lookup: &F,
    name: &'static str,
    default: usize,
    max: usize,
) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        Ok(_) => Err(ConfigError::InvalidValue {
            name,
            reason: format!("must be between 1 and {}", max),
            value: raw,
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.listener_history, 10);
        assert_eq!(config.max_listeners, 100);
    }

    #[test]
    fn test_reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("LISTENER_HISTORY", "25"),
            ("MAX_LISTENERS", "9999"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.listener_history, 25);
        assert_eq!(config.max_listeners, 9999);
    }

    #[rstest]
    #[case("BIND_ADDR", "not-an-address")]
    #[case("LISTENER_HISTORY", "0")]
    #[case("LISTENER_HISTORY", "ten")]
    #[case("MAX_LISTENERS", "0")]
    #[case("MAX_LISTENERS", "10000")]
    fn test_rejects_invalid_values(#[case] name: &str, #[case] value: &str) {
        let result = AppConfig::from_lookup(lookup_from(&[(name, value)]));

        match result {
            Err(ConfigError::InvalidValue { name: field, .. }) => assert_eq!(field, name),
            other => panic!("expected invalid value error, got {:?}", other),
        }
    }
}
