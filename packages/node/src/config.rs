//! Node configuration, populated from environment variables.

use std::net::SocketAddr;

use yads_api::{DEFAULT_LIMIT, MAX_LIMIT};

/// Runtime configuration for a YADS node.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a node can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `YADS_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `YADS_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `YADS_SEED` | `false` | Load the reference fixtures into an empty store at startup |
/// | `YADS_PAGE_LIMIT` | `50` | Page size when a list request gives no `limit` |
/// | `YADS_MAX_PAGE_LIMIT` | `500` | Upper bound on `limit` |
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    /// Seed the reference document types, graph types, roles and rules when
    /// the store has no document types yet.
    pub seed: bool,

    pub page_limit: u32,
    pub max_page_limit: u32,
}

/// A configuration variable that is set but cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{name} has invalid value {value:?}: expected {expected}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            seed: false,
            page_limit: DEFAULT_LIMIT,
            max_page_limit: MAX_LIMIT,
        }
    }
}

impl NodeConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Populate config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = match lookup("YADS_BIND") {
            Some(v) => v.parse::<SocketAddr>().map_err(|_| ConfigError {
                name: "YADS_BIND",
                value: v.clone(),
                expected: "a socket address such as 0.0.0.0:3000",
            })?,
            None => defaults.bind_addr,
        };

        let seed = match lookup("YADS_SEED") {
            Some(v) => parse_bool(&v).ok_or(ConfigError {
                name: "YADS_SEED",
                value: v,
                expected: "true or false",
            })?,
            None => defaults.seed,
        };

        let page_limit = parse_limit(&lookup, "YADS_PAGE_LIMIT", defaults.page_limit)?;
        let max_page_limit = parse_limit(&lookup, "YADS_MAX_PAGE_LIMIT", defaults.max_page_limit)?;

        Ok(Self {
            bind_addr,
            db_path: lookup("YADS_DB").filter(|p| !p.is_empty()),
            seed,
            page_limit: page_limit.min(max_page_limit),
            max_page_limit,
        })
    }
}

// --- helpers -----------------------------------------------------------------

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_limit(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(name) {
        Some(v) => match v.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError {
                name,
                value: v,
                expected: "a positive integer",
            }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let c = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(c.bind_addr.port(), 3000);
        assert!(c.db_path.is_none());
        assert!(!c.seed);
        assert_eq!(c.page_limit, 50);
        assert_eq!(c.max_page_limit, 500);
    }

    #[test]
    fn reads_variables() {
        let c = NodeConfig::from_lookup(lookup(&[
            ("YADS_BIND", "127.0.0.1:8080"),
            ("YADS_DB", "/tmp/yads.db"),
            ("YADS_SEED", "yes"),
            ("YADS_PAGE_LIMIT", "20"),
        ]))
        .unwrap();
        assert_eq!(c.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(c.db_path.as_deref(), Some("/tmp/yads.db"));
        assert!(c.seed);
        assert_eq!(c.page_limit, 20);
    }

    #[test]
    fn page_limit_never_exceeds_max() {
        let c = NodeConfig::from_lookup(lookup(&[
            ("YADS_PAGE_LIMIT", "200"),
            ("YADS_MAX_PAGE_LIMIT", "100"),
        ]))
        .unwrap();
        assert_eq!(c.page_limit, 100);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = NodeConfig::from_lookup(lookup(&[("YADS_BIND", "nowhere")])).unwrap_err();
        assert_eq!(err.name, "YADS_BIND");
        assert!(NodeConfig::from_lookup(lookup(&[("YADS_SEED", "maybe")])).is_err());
        assert!(NodeConfig::from_lookup(lookup(&[("YADS_PAGE_LIMIT", "0")])).is_err());
    }
}
