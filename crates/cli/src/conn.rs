use crate::error::CliError;
use async_trait::async_trait;
use connectors::sql::postgres::adapter::PgAdapter;
use std::str::FromStr;
use tracing::{error, info};

/// What kind of connection to check
#[derive(Debug)]
pub enum ConnectionKind {
    Postgres,
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(ConnectionKind::Postgres),
            other => Err(format!("Unknown connection kind: {other}")),
        }
    }
}

/// Trait for "pinging" a data source
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging Postgres");

        let adapter = PgAdapter::connect(&self.conn_str).await.map_err(|e| {
            error!(error = %e, "Postgres connection failed");
            e
        })?;
        adapter.ping().await.map_err(|e| {
            error!(error = %e, "Postgres ping query failed");
            e
        })?;

        info!("Postgres ping succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgres_aliases() {
        for alias in ["pg", "Postgres", "postgresql"] {
            assert!(matches!(
                ConnectionKind::from_str(alias),
                Ok(ConnectionKind::Postgres)
            ));
        }
        assert!(ConnectionKind::from_str("mysql").is_err());
    }
}
