//! Storage traits the fixture seeder runs against.
//!
//! A [`FixtureStoreFactory`] opens one [`FixtureStore`] per tests manifest.
//! The store owns a single connection and hands out one
//! [`FixtureTransaction`] at a time; every table object, collection and
//! purchase is reconciled inside its own transaction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SeedError;
use crate::fixtures::data::{PriceFixture, PurchaseFixture, TableObjectFixture};
use crate::reconcile::StoredProperty;

/// Opens fixture store connections.
#[async_trait]
pub trait FixtureStoreFactory: Send + Sync {
    /// Opens a new connection to the fixture database.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Connection` if the database cannot be reached.
    async fn connect(&self) -> Result<Box<dyn FixtureStore>, SeedError>;
}

/// A scoped connection to the fixture database.
#[async_trait]
pub trait FixtureStore: Send {
    /// Starts a transaction on this connection.
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn FixtureTransaction + 'a>, SeedError>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<(), SeedError>;
}

/// Row-level operations on the fixture graph, scoped to one transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its changes.
#[async_trait]
pub trait FixtureTransaction: Send {
    // ==================== Table objects ====================

    /// Returns the id of the table object with the given uuid.
    async fn find_table_object(&mut self, uuid: Uuid) -> Result<Option<i64>, SeedError>;

    /// Inserts a table object row and returns its id.
    async fn insert_table_object(&mut self, object: &TableObjectFixture)
    -> Result<i64, SeedError>;

    /// Lists the stored properties of a table object.
    async fn table_object_properties(
        &mut self,
        table_object_id: i64,
    ) -> Result<Vec<StoredProperty>, SeedError>;

    async fn insert_property(
        &mut self,
        table_object_id: i64,
        name: &str,
        value: &str,
    ) -> Result<(), SeedError>;

    async fn update_property(&mut self, property_id: i64, value: &str) -> Result<(), SeedError>;

    async fn delete_property(&mut self, property_id: i64) -> Result<(), SeedError>;

    async fn insert_price(
        &mut self,
        table_object_id: i64,
        price: &PriceFixture,
    ) -> Result<(), SeedError>;

    // ==================== Collections ====================

    /// Returns the id of the collection with the given table and name.
    async fn find_collection(&mut self, table_id: i64, name: &str)
    -> Result<Option<i64>, SeedError>;

    /// Inserts a collection row and returns its id.
    async fn insert_collection(&mut self, table_id: i64, name: &str) -> Result<i64, SeedError>;

    /// Removes every member of a collection, returning how many were removed.
    async fn clear_collection(&mut self, collection_id: i64) -> Result<u64, SeedError>;

    async fn add_collection_member(
        &mut self,
        collection_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError>;

    // ==================== Purchases ====================

    async fn purchase_exists(&mut self, purchase_id: i64) -> Result<bool, SeedError>;

    async fn insert_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError>;

    /// Overwrites the mutable columns of an existing purchase.
    async fn update_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError>;

    /// Removes every item of a purchase, returning how many were removed.
    async fn clear_purchase(&mut self, purchase_id: i64) -> Result<u64, SeedError>;

    async fn add_purchase_item(
        &mut self,
        purchase_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError>;

    // ==================== Completion ====================

    async fn commit(self: Box<Self>) -> Result<(), SeedError>;

    async fn rollback(self: Box<Self>) -> Result<(), SeedError>;
}
