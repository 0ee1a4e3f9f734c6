//! Load config from process environment (optionally seeded from `.env`).

use crate::config::types::*;
use crate::config::validate_db;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

impl DbConfig {
    /// Read `DB_HOST`, `DB_REPLSET`, `DB_USER`, `DB_PWD`, `DB_NAME`, `DB_TIMEOUT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hosts: Vec<String> = lookup("DB_HOST")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_HOST.into())
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        let timeout_ms = match lookup("DB_TIMEOUT").filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "DB_TIMEOUT",
                value: raw,
            })?,
            None => DEFAULT_DB_TIMEOUT_MS,
        };
        let config = DbConfig {
            hosts,
            replica_set: lookup("DB_REPLSET").filter(|s| !s.is_empty()),
            user: lookup("DB_USER").unwrap_or_default(),
            password: lookup("DB_PWD").unwrap_or_default(),
            name: lookup("DB_NAME")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_DB_NAME.into()),
            timeout: Duration::from_millis(timeout_ms),
        };
        validate_db(&config)?;
        Ok(config)
    }
}

impl ServerConfig {
    /// Read `DEBUG_MODE`, `LISTEN_PORT`, `UNIX_SOCKET`, `STATIC_PATH`, `MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen = match lookup("UNIX_SOCKET").filter(|s| !s.is_empty()) {
            Some(path) => Listen::UnixSocket(PathBuf::from(path)),
            None => {
                let port = match lookup("LISTEN_PORT").filter(|s| !s.is_empty()) {
                    Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                        key: "LISTEN_PORT",
                        value: raw,
                    })?,
                    None => DEFAULT_LISTEN_PORT,
                };
                Listen::Port(port)
            }
        };
        let max_body_bytes = match lookup("MAX_BODY_BYTES").filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                key: "MAX_BODY_BYTES",
                value: raw,
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(ServerConfig {
            debug: lookup("DEBUG_MODE").map(|v| is_truthy(&v)).unwrap_or(false),
            listen,
            static_path: lookup("STATIC_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_PATH)),
            max_body_bytes,
        })
    }
}

/// Any non-empty value enables a flag, except explicit `0`/`false`/`no`/`off`.
fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty()
        && !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn db_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DbConfig::default());
    }

    #[test]
    fn db_hosts_split_on_comma() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DB_HOST", "a:27017, b:27017"),
            ("DB_REPLSET", "rs0"),
            ("DB_USER", "admin"),
            ("DB_PWD", "secret"),
            ("DB_NAME", "App"),
            ("DB_TIMEOUT", "500"),
        ]))
        .unwrap();
        assert_eq!(config.hosts, vec!["a:27017", "b:27017"]);
        assert_eq!(config.replica_set.as_deref(), Some("rs0"));
        assert_eq!(config.user, "admin");
        assert_eq!(config.name, "App");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn multiple_hosts_need_replica_set() {
        let err = DbConfig::from_lookup(lookup(&[("DB_HOST", "a:1,b:2")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReplicaSet(_)));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = DbConfig::from_lookup(lookup(&[("DB_TIMEOUT", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "DB_TIMEOUT", .. }));
    }

    #[test]
    fn server_defaults_to_port() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.listen, Listen::Port(DEFAULT_LISTEN_PORT));
        assert!(!config.debug);
    }

    #[test]
    fn unix_socket_wins_over_port() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("UNIX_SOCKET", "/tmp/app.sock"),
            ("LISTEN_PORT", "9000"),
            ("DEBUG_MODE", "1"),
        ]))
        .unwrap();
        assert_eq!(config.listen, Listen::UnixSocket(PathBuf::from("/tmp/app.sock")));
        assert!(config.debug);
    }

    #[test]
    fn debug_flag_values() {
        assert!(is_truthy("yes"));
        assert!(is_truthy("True"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("LISTEN_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "LISTEN_PORT", .. }));
    }
}
