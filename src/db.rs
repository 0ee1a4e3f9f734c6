//! Database connection from [`DbConfig`]. Call once at startup and share the handle.

use crate::config::{validate_db, DbConfig};
use crate::error::ConfigError;
use bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Database};

/// Connect, authenticate and return the configured database.
///
/// A multi-host setup without replica set and an authentication failure are both
/// errors; the caller should not proceed without a database.
pub async fn connect(config: &DbConfig) -> Result<Database, ConfigError> {
    tracing::info!("DB: Connect to DB: {}/{}", config.hosts.join(","), config.name);
    if let Some(replica_set) = &config.replica_set {
        tracing::info!("DB: Replica Set: {}", replica_set);
    }
    if config.user.is_empty() {
        tracing::info!("DB: Login without user.");
    } else {
        tracing::info!("DB: Login with user: {}", config.user);
    }
    validate_db(config)?;

    let options = client_options(config)?;
    let client = Client::with_options(options).map_err(ConfigError::Connect)?;
    let database = client.database(&config.name);

    // The driver authenticates lazily; force the handshake so bad credentials fail here.
    if let Err(e) = database.run_command(doc! { "ping": 1 }, None).await {
        if matches!(e.kind.as_ref(), ErrorKind::Authentication { .. }) {
            tracing::error!("DB: Database auth failed.");
            return Err(ConfigError::AuthFailed(config.user.clone()));
        }
        return Err(ConfigError::Connect(e));
    }
    Ok(database)
}

/// Driver options for `config`. Credentials authenticate against the configured database.
pub fn client_options(config: &DbConfig) -> Result<ClientOptions, ConfigError> {
    let hosts = config
        .hosts
        .iter()
        .map(|h| {
            ServerAddress::parse(h).map_err(|_| ConfigError::InvalidValue {
                key: "DB_HOST",
                value: h.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut options = ClientOptions::default();
    options.hosts = hosts;
    options.repl_set_name = config.replica_set.clone();
    options.server_selection_timeout = Some(config.timeout);
    options.connect_timeout = Some(config.timeout);
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    if !config.user.is_empty() {
        let mut credential = Credential::default();
        credential.username = Some(config.user.clone());
        credential.password = Some(config.password.clone());
        credential.source = Some(config.name.clone());
        options.credential = Some(credential);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn options_carry_hosts_and_timeout() {
        let config = DbConfig {
            hosts: vec!["db1:27017".into(), "db2:27018".into()],
            replica_set: Some("rs0".into()),
            timeout: Duration::from_millis(750),
            ..DbConfig::default()
        };
        let options = client_options(&config).unwrap();
        assert_eq!(options.hosts.len(), 2);
        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_millis(750)));
        assert!(options.credential.is_none());
    }

    #[test]
    fn credentials_use_database_as_source() {
        let config = DbConfig {
            user: "bob".into(),
            password: "pw".into(),
            name: "App".into(),
            ..DbConfig::default()
        };
        let options = client_options(&config).unwrap();
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("bob"));
        assert_eq!(credential.source.as_deref(), Some("App"));
    }

    #[tokio::test]
    async fn missing_replica_set_fails_before_connecting() {
        let config = DbConfig {
            hosts: vec!["a:1".into(), "b:2".into()],
            ..DbConfig::default()
        };
        assert!(matches!(
            connect(&config).await,
            Err(ConfigError::MissingReplicaSet(_))
        ));
    }
}
