//! Process configuration read at startup.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_HOST: &str = "localhost:27017";
pub const DEFAULT_DB_NAME: &str = "TestDB";
/// Server selection timeout of the client, in milliseconds.
pub const DEFAULT_DB_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_LISTEN_PORT: u16 = 8000;
pub const DEFAULT_STATIC_PATH: &str = "public";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Database connection settings (`DB_*` env).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbConfig {
    pub hosts: Vec<String>,
    pub replica_set: Option<String>,
    /// Empty means connect without authentication.
    pub user: String,
    pub password: String,
    pub name: String,
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            hosts: vec![DEFAULT_DB_HOST.to_string()],
            replica_set: None,
            user: String::new(),
            password: String::new(),
            name: DEFAULT_DB_NAME.to_string(),
            timeout: Duration::from_millis(DEFAULT_DB_TIMEOUT_MS),
        }
    }
}

/// Where the server accepts connections. Exactly one is used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Listen {
    /// TCP on all interfaces. Forwarded-for headers are honored.
    Port(u16),
    /// Local Unix domain socket at this path.
    UnixSocket(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub debug: bool,
    pub listen: Listen,
    /// Directory served under `/static`.
    pub static_path: PathBuf,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            debug: false,
            listen: Listen::Port(DEFAULT_LISTEN_PORT),
            static_path: PathBuf::from(DEFAULT_STATIC_PATH),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
