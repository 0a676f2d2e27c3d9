//! PostgreSQL fixture store.

use async_trait::async_trait;
use dxdeploy_core::{FixtureStore, FixtureStoreFactory, FixtureTransaction, SeedError};
use sqlx_core::connection::Connection;
use sqlx_postgres::PgConnection;
use tracing::debug;

use crate::config::PostgresConfig;
use crate::connection;
use crate::error::PostgresError;
use crate::transaction::PgFixtureTransaction;

/// Opens one PostgreSQL connection per tests manifest.
#[derive(Debug, Clone)]
pub struct PgFixtureStoreFactory {
    config: PostgresConfig,
}

impl PgFixtureStoreFactory {
    #[must_use]
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }
}

#[async_trait]
impl FixtureStoreFactory for PgFixtureStoreFactory {
    async fn connect(&self) -> Result<Box<dyn FixtureStore>, SeedError> {
        let conn = connection::connect(&self.config).await?;
        Ok(Box::new(PgFixtureStore::new(conn)))
    }
}

/// A fixture store backed by a single PostgreSQL connection.
pub struct PgFixtureStore {
    conn: PgConnection,
}

impl PgFixtureStore {
    /// Wraps an open connection.
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl FixtureStore for PgFixtureStore {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn FixtureTransaction + 'a>, SeedError> {
        let tx = self.conn.begin().await.map_err(PostgresError::Query)?;
        Ok(Box::new(PgFixtureTransaction::new(tx)))
    }

    async fn close(self: Box<Self>) -> Result<(), SeedError> {
        self.conn.close().await.map_err(PostgresError::Query)?;
        debug!("PostgreSQL connection closed");
        Ok(())
    }
}
