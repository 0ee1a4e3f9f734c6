//! Config validation: reject setups the driver would silently misread.

use crate::config::DbConfig;
use crate::error::ConfigError;

/// Several hosts without a replica set name are ambiguous.
pub fn validate_db(config: &DbConfig) -> Result<(), ConfigError> {
    if config.replica_set.is_none() && config.hosts.len() > 1 {
        tracing::error!("DB: Missing Replica set.");
        return Err(ConfigError::MissingReplicaSet(config.hosts.clone()));
    }
    if config.hosts.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "DB_HOST",
            value: String::new(),
        });
    }
    Ok(())
}
