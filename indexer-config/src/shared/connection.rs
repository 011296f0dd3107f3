use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::SerializableSecretString;

/// Postgres options applied to every connection for consistent behavior
/// across installations.
const COMMON_OPTIONS: &[(&str, &str)] = &[
    ("datestyle", "ISO"),
    ("client_encoding", "UTF8"),
    ("timezone", "UTC"),
];

/// Application name reported to Postgres by indexer connections.
const APP_NAME: &str = "ledger_indexer";

/// Configuration for connecting to the Postgres database holding the
/// materialized view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgConnectionConfig {
    /// Hostname or IP address of the Postgres server.
    pub host: String,
    /// Port number on which the Postgres server is listening.
    pub port: u16,
    /// Name of the Postgres database to connect to.
    pub name: String,
    /// Username for authenticating with the Postgres server.
    pub username: String,
    /// Password for the specified user. Redacted in debug output.
    pub password: Option<SerializableSecretString>,
    /// Whether the connection must use TLS.
    #[serde(default)]
    pub require_ssl: bool,
}

impl PgConnectionConfig {
    /// Builds sqlx connect options for the configured database.
    pub fn with_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.username)
            .ssl_mode(ssl_mode)
            .application_name(APP_NAME)
            .options(COMMON_OPTIONS.iter().copied());

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PgConnectionConfig {
        PgConnectionConfig {
            host: "localhost".to_owned(),
            port: 5432,
            name: "indexer".to_owned(),
            username: "postgres".to_owned(),
            password: Some("secret".to_owned().into()),
            require_ssl: false,
        }
    }

    #[test]
    fn builds_connect_options_with_database() {
        let options = config().with_db();

        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("indexer"));
        assert_eq!(options.get_username(), "postgres");
    }

    #[test]
    fn password_is_redacted_in_debug_output() {
        let rendered = format!("{:?}", config());

        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
