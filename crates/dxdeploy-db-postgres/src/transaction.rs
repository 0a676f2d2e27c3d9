//! PostgreSQL fixture transaction.
//!
//! Wraps an sqlx transaction borrowed from a [`PgFixtureStore`] connection.
//! sqlx rolls the transaction back on drop if it was never committed.
//!
//! [`PgFixtureStore`]: crate::PgFixtureStore

use async_trait::async_trait;
use dxdeploy_core::fixtures::{PriceFixture, PurchaseFixture, TableObjectFixture};
use dxdeploy_core::{FixtureTransaction, SeedError, StoredProperty};
use sqlx_postgres::PgTransaction;
use tracing::debug;
use uuid::Uuid;

use crate::error::PostgresError;
use crate::queries::{collections, purchases, table_objects};

/// A fixture transaction on a PostgreSQL connection.
pub struct PgFixtureTransaction<'c> {
    tx: PgTransaction<'c>,
}

impl<'c> PgFixtureTransaction<'c> {
    /// Wraps an open sqlx transaction.
    pub fn new(tx: PgTransaction<'c>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl<'c> FixtureTransaction for PgFixtureTransaction<'c> {
    async fn find_table_object(&mut self, uuid: Uuid) -> Result<Option<i64>, SeedError> {
        Ok(table_objects::find_by_uuid(&mut self.tx, uuid).await?)
    }

    async fn insert_table_object(
        &mut self,
        object: &TableObjectFixture,
    ) -> Result<i64, SeedError> {
        Ok(table_objects::insert(&mut self.tx, object).await?)
    }

    async fn table_object_properties(
        &mut self,
        table_object_id: i64,
    ) -> Result<Vec<StoredProperty>, SeedError> {
        Ok(table_objects::properties(&mut self.tx, table_object_id).await?)
    }

    async fn insert_property(
        &mut self,
        table_object_id: i64,
        name: &str,
        value: &str,
    ) -> Result<(), SeedError> {
        Ok(table_objects::insert_property(&mut self.tx, table_object_id, name, value).await?)
    }

    async fn update_property(&mut self, property_id: i64, value: &str) -> Result<(), SeedError> {
        Ok(table_objects::update_property(&mut self.tx, property_id, value).await?)
    }

    async fn delete_property(&mut self, property_id: i64) -> Result<(), SeedError> {
        Ok(table_objects::delete_property(&mut self.tx, property_id).await?)
    }

    async fn insert_price(
        &mut self,
        table_object_id: i64,
        price: &PriceFixture,
    ) -> Result<(), SeedError> {
        Ok(table_objects::insert_price(&mut self.tx, table_object_id, price).await?)
    }

    async fn find_collection(
        &mut self,
        table_id: i64,
        name: &str,
    ) -> Result<Option<i64>, SeedError> {
        Ok(collections::find(&mut self.tx, table_id, name).await?)
    }

    async fn insert_collection(&mut self, table_id: i64, name: &str) -> Result<i64, SeedError> {
        Ok(collections::insert(&mut self.tx, table_id, name).await?)
    }

    async fn clear_collection(&mut self, collection_id: i64) -> Result<u64, SeedError> {
        Ok(collections::clear(&mut self.tx, collection_id).await?)
    }

    async fn add_collection_member(
        &mut self,
        collection_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError> {
        Ok(collections::add_member(&mut self.tx, collection_id, table_object_id).await?)
    }

    async fn purchase_exists(&mut self, purchase_id: i64) -> Result<bool, SeedError> {
        Ok(purchases::exists(&mut self.tx, purchase_id).await?)
    }

    async fn insert_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError> {
        Ok(purchases::insert(&mut self.tx, purchase).await?)
    }

    async fn update_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError> {
        Ok(purchases::update(&mut self.tx, purchase).await?)
    }

    async fn clear_purchase(&mut self, purchase_id: i64) -> Result<u64, SeedError> {
        Ok(purchases::clear(&mut self.tx, purchase_id).await?)
    }

    async fn add_purchase_item(
        &mut self,
        purchase_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError> {
        Ok(purchases::add_item(&mut self.tx, purchase_id, table_object_id).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), SeedError> {
        self.tx.commit().await.map_err(PostgresError::Query)?;
        debug!("Fixture transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SeedError> {
        self.tx.rollback().await.map_err(PostgresError::Query)?;
        debug!("Fixture transaction rolled back");
        Ok(())
    }
}
