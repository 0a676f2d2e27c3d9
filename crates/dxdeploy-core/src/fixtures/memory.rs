//! In-memory fixture store.
//!
//! Mirrors the relational schema closely enough to exercise the seeder
//! without a database: each transaction works on a copy of the tables and
//! publishes it on commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::SeedError;
use crate::fixtures::data::{PriceFixture, PurchaseFixture, TableObjectFixture};
use crate::fixtures::store::{FixtureStore, FixtureStoreFactory, FixtureTransaction};
use crate::reconcile::StoredProperty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableObjectRow {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: i64,
    pub table_id: i64,
    pub file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub id: i64,
    pub table_object_id: i64,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRow {
    pub table_object_id: i64,
    pub price: i32,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRow {
    pub id: i64,
    pub table_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRow {
    pub id: i64,
    pub user_id: i64,
    pub uuid: Uuid,
    pub price: i32,
    pub currency: String,
    pub completed: bool,
}

/// Committed contents of an in-memory fixture database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureTables {
    pub table_objects: Vec<TableObjectRow>,
    pub properties: Vec<PropertyRow>,
    pub prices: Vec<PriceRow>,
    pub collections: Vec<CollectionRow>,
    /// `(table_object_id, collection_id)` join rows.
    pub collection_members: Vec<(i64, i64)>,
    pub purchases: Vec<PurchaseRow>,
    /// `(table_object_id, purchase_id)` join rows.
    pub purchase_items: Vec<(i64, i64)>,
    next_id: i64,
}

impl FixtureTables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Stored properties of the table object with the given uuid, by name.
    #[must_use]
    pub fn properties_of(&self, uuid: Uuid) -> Vec<(String, String)> {
        let Some(object) = self.table_objects.iter().find(|o| o.uuid == uuid) else {
            return Vec::new();
        };
        let mut properties: Vec<_> = self
            .properties
            .iter()
            .filter(|p| p.table_object_id == object.id)
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        properties.sort();
        properties
    }

    /// Uuids of the members of a collection, sorted.
    #[must_use]
    pub fn collection_uuids(&self, table_id: i64, name: &str) -> Vec<Uuid> {
        let Some(collection) = self
            .collections
            .iter()
            .find(|c| c.table_id == table_id && c.name == name)
        else {
            return Vec::new();
        };
        self.uuids_of(
            self.collection_members
                .iter()
                .filter(|(_, c)| *c == collection.id)
                .map(|(o, _)| *o),
        )
    }

    /// Uuids of the items of a purchase, sorted.
    #[must_use]
    pub fn purchase_uuids(&self, purchase_id: i64) -> Vec<Uuid> {
        self.uuids_of(
            self.purchase_items
                .iter()
                .filter(|(_, p)| *p == purchase_id)
                .map(|(o, _)| *o),
        )
    }

    fn uuids_of(&self, ids: impl Iterator<Item = i64>) -> Vec<Uuid> {
        let mut uuids: Vec<Uuid> = ids
            .filter_map(|id| self.table_objects.iter().find(|o| o.id == id))
            .map(|o| o.uuid)
            .collect();
        uuids.sort();
        uuids
    }
}

/// Factory handing out connections to one shared in-memory database.
#[derive(Debug, Clone, Default)]
pub struct MemoryFixtureStoreFactory {
    tables: Arc<Mutex<FixtureTables>>,
    open_connections: Arc<AtomicUsize>,
    total_connections: Arc<AtomicUsize>,
}

impl MemoryFixtureStoreFactory {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a database with pre-existing rows.
    #[must_use]
    pub fn with_tables(tables: FixtureTables) -> Self {
        Self {
            tables: Arc::new(Mutex::new(tables)),
            ..Self::default()
        }
    }

    /// Snapshot of the committed rows.
    pub async fn tables(&self) -> FixtureTables {
        self.tables.lock().await.clone()
    }

    /// Number of connections currently open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn total_connections(&self) -> usize {
        self.total_connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FixtureStoreFactory for MemoryFixtureStoreFactory {
    async fn connect(&self) -> Result<Box<dyn FixtureStore>, SeedError> {
        self.open_connections.fetch_add(1, Ordering::SeqCst);
        self.total_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryFixtureStore {
            tables: Arc::clone(&self.tables),
            open_connections: Arc::clone(&self.open_connections),
        }))
    }
}

/// A connection to a [`MemoryFixtureStoreFactory`] database.
#[derive(Debug)]
pub struct MemoryFixtureStore {
    tables: Arc<Mutex<FixtureTables>>,
    open_connections: Arc<AtomicUsize>,
}

#[async_trait]
impl FixtureStore for MemoryFixtureStore {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn FixtureTransaction + 'a>, SeedError> {
        let working = self.tables.lock().await.clone();
        Ok(Box::new(MemoryTransaction {
            tables: Arc::clone(&self.tables),
            working,
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), SeedError> {
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryTransaction {
    tables: Arc<Mutex<FixtureTables>>,
    working: FixtureTables,
}

#[async_trait]
impl FixtureTransaction for MemoryTransaction {
    async fn find_table_object(&mut self, uuid: Uuid) -> Result<Option<i64>, SeedError> {
        Ok(self
            .working
            .table_objects
            .iter()
            .find(|o| o.uuid == uuid)
            .map(|o| o.id))
    }

    async fn insert_table_object(
        &mut self,
        object: &TableObjectFixture,
    ) -> Result<i64, SeedError> {
        if self.working.table_objects.iter().any(|o| o.uuid == object.uuid) {
            return Err(SeedError::database(format!(
                "duplicate key value violates unique constraint on table_objects.uuid ({})",
                object.uuid
            )));
        }
        let id = self.working.next_id();
        self.working.table_objects.push(TableObjectRow {
            id,
            uuid: object.uuid,
            user_id: object.user_id,
            table_id: object.table_id,
            file: object.file,
        });
        Ok(id)
    }

    async fn table_object_properties(
        &mut self,
        table_object_id: i64,
    ) -> Result<Vec<StoredProperty>, SeedError> {
        Ok(self
            .working
            .properties
            .iter()
            .filter(|p| p.table_object_id == table_object_id)
            .map(|p| StoredProperty {
                id: p.id,
                name: p.name.clone(),
                value: p.value.clone(),
            })
            .collect())
    }

    async fn insert_property(
        &mut self,
        table_object_id: i64,
        name: &str,
        value: &str,
    ) -> Result<(), SeedError> {
        let id = self.working.next_id();
        self.working.properties.push(PropertyRow {
            id,
            table_object_id,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn update_property(&mut self, property_id: i64, value: &str) -> Result<(), SeedError> {
        let property = self
            .working
            .properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or_else(|| SeedError::database(format!("property {property_id} does not exist")))?;
        property.value = value.to_string();
        Ok(())
    }

    async fn delete_property(&mut self, property_id: i64) -> Result<(), SeedError> {
        self.working.properties.retain(|p| p.id != property_id);
        Ok(())
    }

    async fn insert_price(
        &mut self,
        table_object_id: i64,
        price: &PriceFixture,
    ) -> Result<(), SeedError> {
        self.working.prices.push(PriceRow {
            table_object_id,
            price: price.price,
            currency: price.currency.clone(),
        });
        Ok(())
    }

    async fn find_collection(
        &mut self,
        table_id: i64,
        name: &str,
    ) -> Result<Option<i64>, SeedError> {
        Ok(self
            .working
            .collections
            .iter()
            .find(|c| c.table_id == table_id && c.name == name)
            .map(|c| c.id))
    }

    async fn insert_collection(&mut self, table_id: i64, name: &str) -> Result<i64, SeedError> {
        let id = self.working.next_id();
        self.working.collections.push(CollectionRow {
            id,
            table_id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn clear_collection(&mut self, collection_id: i64) -> Result<u64, SeedError> {
        let before = self.working.collection_members.len();
        self.working
            .collection_members
            .retain(|(_, c)| *c != collection_id);
        Ok((before - self.working.collection_members.len()) as u64)
    }

    async fn add_collection_member(
        &mut self,
        collection_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError> {
        self.working
            .collection_members
            .push((table_object_id, collection_id));
        Ok(())
    }

    async fn purchase_exists(&mut self, purchase_id: i64) -> Result<bool, SeedError> {
        Ok(self.working.purchases.iter().any(|p| p.id == purchase_id))
    }

    async fn insert_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError> {
        self.working.purchases.push(PurchaseRow {
            id: purchase.id,
            user_id: purchase.user_id,
            uuid: purchase.uuid,
            price: purchase.price,
            currency: purchase.currency.clone(),
            completed: purchase.completed,
        });
        Ok(())
    }

    async fn update_purchase(&mut self, purchase: &PurchaseFixture) -> Result<(), SeedError> {
        let row = self
            .working
            .purchases
            .iter_mut()
            .find(|p| p.id == purchase.id)
            .ok_or_else(|| SeedError::database(format!("purchase {} does not exist", purchase.id)))?;
        row.user_id = purchase.user_id;
        row.uuid = purchase.uuid;
        row.price = purchase.price;
        row.currency = purchase.currency.clone();
        row.completed = purchase.completed;
        Ok(())
    }

    async fn clear_purchase(&mut self, purchase_id: i64) -> Result<u64, SeedError> {
        let before = self.working.purchase_items.len();
        self.working.purchase_items.retain(|(_, p)| *p != purchase_id);
        Ok((before - self.working.purchase_items.len()) as u64)
    }

    async fn add_purchase_item(
        &mut self,
        purchase_id: i64,
        table_object_id: i64,
    ) -> Result<(), SeedError> {
        self.working.purchase_items.push((table_object_id, purchase_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), SeedError> {
        let Self { tables, working } = *self;
        *tables.lock().await = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), SeedError> {
        Ok(())
    }
}
