//! PostgreSQL connection settings.
//!
//! A [`PgConfig`] is parsed from a `postgres://` or `postgresql://` URL. Query
//! parameters are handed to `tokio-postgres` as connection options, so every
//! parameter it understands (`application_name`, `connect_timeout`,
//! `options`, `sslmode`, `keepalives`, ...) takes effect and anything else is
//! rejected.

use std::str::FromStr;
use std::time::Duration;

use tokio_postgres::config::SslMode;
use url::Url;

use crate::error::{PgError, PgResult};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_USER: &str = "postgres";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a PostgreSQL server.
#[derive(Debug, Clone)]
pub struct PgConfig {
    inner: tokio_postgres::Config,
    redacted: String,
}

impl PgConfig {
    /// Parse a database URL.
    pub fn from_url(url: impl AsRef<str>) -> PgResult<Self> {
        let url = url.as_ref();
        let mut parsed =
            Url::parse(url).map_err(|e| PgError::config(format!("invalid database URL: {}", e)))?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            return Err(PgError::config(format!(
                "invalid scheme: expected 'postgresql' or 'postgres', got '{}'",
                parsed.scheme()
            )));
        }

        let mut inner = tokio_postgres::Config::from_str(url)
            .map_err(|e| PgError::config(format!("invalid connection option: {}", e)))?;

        if inner.get_dbname().is_none_or(str::is_empty) {
            return Err(PgError::config("missing database name in URL"));
        }

        // Connections are opened without TLS
        if matches!(inner.get_ssl_mode(), SslMode::Require) {
            return Err(PgError::config(
                "sslmode=require is not supported: connections are opened without TLS",
            ));
        }

        if inner.get_hosts().is_empty() {
            inner.host(DEFAULT_HOST);
        }
        if inner.get_user().is_none() {
            inner.user(DEFAULT_USER);
        }
        if inner.get_connect_timeout().is_none() {
            inner.connect_timeout(DEFAULT_CONNECT_TIMEOUT);
        }

        if parsed.password().is_some() {
            let _ = parsed.set_password(Some("****"));
        }

        Ok(Self {
            inner,
            redacted: parsed.to_string(),
        })
    }

    /// Override the application name shown in `pg_stat_activity`.
    pub fn application_name(mut self, name: &str) -> Self {
        self.inner.application_name(name);
        self
    }

    /// Override the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.inner.connect_timeout(timeout);
        self
    }

    /// Database name.
    pub fn database(&self) -> &str {
        self.inner.get_dbname().unwrap_or_default()
    }

    /// User name.
    pub fn user(&self) -> &str {
        self.inner.get_user().unwrap_or(DEFAULT_USER)
    }

    /// The URL with any password masked, for logs.
    pub fn redacted_url(&self) -> &str {
        &self.redacted
    }

    /// The `tokio-postgres` configuration to connect with.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        self.inner.clone()
    }
}
