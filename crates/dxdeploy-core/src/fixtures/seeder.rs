//! Fixture graph reconciliation.
//!
//! Entities are reconciled in dependency order: table objects first, then
//! collections, then purchases. Each entity runs in its own transaction; the
//! first failure rolls that entity back and ends the run, leaving entities
//! reconciled before it committed.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SeedError;
use crate::fixtures::data::{CollectionFixture, FixtureData, PurchaseFixture, TableObjectFixture};
use crate::fixtures::store::{FixtureStore, FixtureTransaction};
use crate::reconcile::reconcile_properties;

/// Counts of the changes applied by a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub table_objects_created: usize,
    pub table_objects_reconciled: usize,
    pub properties_created: usize,
    pub properties_updated: usize,
    pub properties_deleted: usize,
    pub collections_created: usize,
    pub collections_reconciled: usize,
    pub purchases_created: usize,
    pub purchases_updated: usize,
    /// Join rows written for collections and purchases.
    pub join_rows: usize,
}

/// Reconciles the whole fixture graph against `store`.
///
/// # Errors
///
/// Returns the first `SeedError` raised; the failing entity is rolled back and
/// no later entity is touched.
pub async fn seed_fixtures(
    store: &mut dyn FixtureStore,
    data: &FixtureData,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for object in &data.table_objects {
        let mut tx = store.begin().await?;
        let result = reconcile_table_object(tx.as_mut(), object, &mut report).await;
        finish(tx, result).await?;
    }

    for collection in &data.collections {
        let mut tx = store.begin().await?;
        let result = reconcile_collection(tx.as_mut(), collection, &mut report).await;
        finish(tx, result).await?;
    }

    for purchase in &data.purchases {
        let mut tx = store.begin().await?;
        let result = reconcile_purchase(tx.as_mut(), purchase, &mut report).await;
        finish(tx, result).await?;
    }

    info!(
        table_objects_created = report.table_objects_created,
        table_objects_reconciled = report.table_objects_reconciled,
        properties_created = report.properties_created,
        properties_updated = report.properties_updated,
        properties_deleted = report.properties_deleted,
        collections = data.collections.len(),
        purchases = data.purchases.len(),
        join_rows = report.join_rows,
        "Fixtures seeded"
    );

    Ok(report)
}

/// Commits on success, rolls back and returns the original error otherwise.
async fn finish(
    tx: Box<dyn FixtureTransaction + '_>,
    result: Result<(), SeedError>,
) -> Result<(), SeedError> {
    match result {
        Ok(()) => tx.commit().await,
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Failed to roll back fixture transaction");
            }
            Err(err)
        }
    }
}

async fn reconcile_table_object(
    tx: &mut (dyn FixtureTransaction + '_),
    object: &TableObjectFixture,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    let declared = object.declared_properties();

    let (table_object_id, existing) = match tx.find_table_object(object.uuid).await? {
        Some(id) => {
            let existing = tx.table_object_properties(id).await?;
            report.table_objects_reconciled += 1;
            (id, existing)
        }
        None => {
            let id = tx.insert_table_object(object).await?;
            if let Some(price) = &object.price {
                tx.insert_price(id, price).await?;
            }
            report.table_objects_created += 1;
            debug!(uuid = %object.uuid, id, "Created table object");
            (id, Vec::new())
        }
    };

    let plan = reconcile_properties(&declared, &existing);
    for (name, value) in &plan.create {
        tx.insert_property(table_object_id, name, value).await?;
    }
    for update in &plan.update {
        tx.update_property(update.id, &update.value).await?;
    }
    for stale in &plan.delete {
        tx.delete_property(stale.id).await?;
    }

    report.properties_created += plan.create.len();
    report.properties_updated += plan.update.len();
    report.properties_deleted += plan.delete.len();
    Ok(())
}

async fn reconcile_collection(
    tx: &mut (dyn FixtureTransaction + '_),
    collection: &CollectionFixture,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    let collection_id = match tx
        .find_collection(collection.table_id, &collection.name)
        .await?
    {
        Some(id) => {
            report.collections_reconciled += 1;
            id
        }
        None => {
            report.collections_created += 1;
            tx.insert_collection(collection.table_id, &collection.name)
                .await?
        }
    };

    let removed = tx.clear_collection(collection_id).await?;
    let label = collection.label();
    for uuid in &collection.table_objects {
        let table_object_id = resolve(tx, &label, *uuid).await?;
        tx.add_collection_member(collection_id, table_object_id)
            .await?;
    }

    report.join_rows += collection.table_objects.len();
    debug!(
        collection = %label,
        removed,
        members = collection.table_objects.len(),
        "Replaced collection members"
    );
    Ok(())
}

async fn reconcile_purchase(
    tx: &mut (dyn FixtureTransaction + '_),
    purchase: &PurchaseFixture,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    if tx.purchase_exists(purchase.id).await? {
        tx.update_purchase(purchase).await?;
        report.purchases_updated += 1;
    } else {
        tx.insert_purchase(purchase).await?;
        report.purchases_created += 1;
    }

    let removed = tx.clear_purchase(purchase.id).await?;
    let label = purchase.label();
    for uuid in &purchase.table_objects {
        let table_object_id = resolve(tx, &label, *uuid).await?;
        tx.add_purchase_item(purchase.id, table_object_id).await?;
    }

    report.join_rows += purchase.table_objects.len();
    debug!(
        purchase = %label,
        removed,
        items = purchase.table_objects.len(),
        "Replaced purchase items"
    );
    Ok(())
}

async fn resolve(
    tx: &mut (dyn FixtureTransaction + '_),
    entity: &str,
    uuid: Uuid,
) -> Result<i64, SeedError> {
    tx.find_table_object(uuid)
        .await?
        .ok_or_else(|| SeedError::unknown_table_object(entity, uuid))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fixtures::memory::MemoryFixtureStoreFactory;
    use crate::fixtures::store::FixtureStoreFactory;

    const BOOK: &str = "0a3f5e59-5b0c-4a8e-8f4e-6a7c4d0b9f11";
    const COVER: &str = "7c1e2d3f-4a5b-4c6d-8e9f-0a1b2c3d4e5f";

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    fn data(value: serde_json::Value) -> FixtureData {
        serde_json::from_value(value).unwrap()
    }

    async fn seed(
        factory: &MemoryFixtureStoreFactory,
        data: &FixtureData,
    ) -> Result<SeedReport, SeedError> {
        let mut store = factory.connect().await.unwrap();
        let result = seed_fixtures(store.as_mut(), data).await;
        store.close().await.unwrap();
        result
    }

    fn book(properties: serde_json::Value) -> FixtureData {
        data(json!({
            "tableObjects": [{
                "uuid": BOOK,
                "userId": 1,
                "tableId": 4,
                "properties": properties,
                "price": {"price": 1000, "currency": "eur"}
            }]
        }))
    }

    #[tokio::test]
    async fn test_create_stores_only_non_empty_properties() {
        let factory = MemoryFixtureStoreFactory::new();
        let report = seed(&factory, &book(json!({"a": "1", "b": ""})))
            .await
            .unwrap();

        let tables = factory.tables().await;
        assert_eq!(tables.table_objects.len(), 1);
        assert_eq!(
            tables.properties_of(uuid(BOOK)),
            vec![("a".to_string(), "1".to_string())]
        );
        assert_eq!(tables.prices.len(), 1);
        assert_eq!(report.table_objects_created, 1);
        assert_eq!(report.properties_created, 1);
    }

    #[tokio::test]
    async fn test_existing_object_is_diffed() {
        let factory = MemoryFixtureStoreFactory::new();
        seed(&factory, &book(json!({"title": "Old", "draft": "true"})))
            .await
            .unwrap();

        let report = seed(
            &factory,
            &book(json!({"title": "New", "draft": "", "page": 3})),
        )
        .await
        .unwrap();

        let tables = factory.tables().await;
        assert_eq!(tables.table_objects.len(), 1);
        assert_eq!(
            tables.properties_of(uuid(BOOK)),
            vec![
                ("page".to_string(), "3".to_string()),
                ("title".to_string(), "New".to_string()),
            ]
        );
        // Price is only written on creation.
        assert_eq!(tables.prices.len(), 1);
        assert_eq!(report.table_objects_reconciled, 1);
        assert_eq!(report.properties_created, 1);
        assert_eq!(report.properties_updated, 1);
        assert_eq!(report.properties_deleted, 1);
    }

    #[tokio::test]
    async fn test_deleting_property_twice_is_noop() {
        let factory = MemoryFixtureStoreFactory::new();
        seed(&factory, &book(json!({"draft": "true"}))).await.unwrap();
        seed(&factory, &book(json!({"draft": ""}))).await.unwrap();
        let before = factory.tables().await;

        let report = seed(&factory, &book(json!({"draft": ""}))).await.unwrap();
        assert_eq!(report.properties_deleted, 0);
        assert_eq!(factory.tables().await, before);
    }

    #[tokio::test]
    async fn test_collection_membership_is_replaced() {
        let factory = MemoryFixtureStoreFactory::new();
        let objects = json!([
            {"uuid": BOOK, "userId": 1, "tableId": 4},
            {"uuid": COVER, "userId": 1, "tableId": 4}
        ]);

        seed(
            &factory,
            &data(json!({
                "tableObjects": objects,
                "collections": [{"tableId": 4, "name": "latest", "tableObjects": [BOOK, COVER]}]
            })),
        )
        .await
        .unwrap();

        let report = seed(
            &factory,
            &data(json!({
                "tableObjects": objects,
                "collections": [{"tableId": 4, "name": "latest", "tableObjects": [COVER]}]
            })),
        )
        .await
        .unwrap();

        let tables = factory.tables().await;
        assert_eq!(tables.collections.len(), 1);
        assert_eq!(tables.collection_uuids(4, "latest"), vec![uuid(COVER)]);
        assert_eq!(report.collections_reconciled, 1);
        assert_eq!(report.join_rows, 1);
    }

    #[tokio::test]
    async fn test_purchase_is_updated_in_place() {
        let factory = MemoryFixtureStoreFactory::new();
        let purchase = |completed: bool| {
            data(json!({
                "tableObjects": [{"uuid": BOOK, "userId": 1, "tableId": 4}],
                "purchases": [{
                    "id": 9,
                    "userId": 1,
                    "uuid": COVER,
                    "price": 1000,
                    "currency": "eur",
                    "completed": completed,
                    "tableObjects": [BOOK]
                }]
            }))
        };

        seed(&factory, &purchase(false)).await.unwrap();
        let report = seed(&factory, &purchase(true)).await.unwrap();

        let tables = factory.tables().await;
        assert_eq!(tables.purchases.len(), 1);
        assert!(tables.purchases[0].completed);
        assert_eq!(tables.purchase_uuids(9), vec![uuid(BOOK)]);
        assert_eq!(report.purchases_updated, 1);
        assert_eq!(report.purchases_created, 0);
    }

    #[tokio::test]
    async fn test_unknown_reference_rolls_back_entity() {
        let factory = MemoryFixtureStoreFactory::new();
        seed(
            &factory,
            &data(json!({
                "tableObjects": [{"uuid": BOOK, "userId": 1, "tableId": 4}],
                "collections": [{"tableId": 4, "name": "latest", "tableObjects": [BOOK]}]
            })),
        )
        .await
        .unwrap();

        let err = seed(
            &factory,
            &data(json!({
                "collections": [{"tableId": 4, "name": "latest", "tableObjects": [COVER]}],
                "purchases": [{
                    "id": 1, "userId": 1, "uuid": BOOK, "price": 1, "currency": "eur"
                }]
            })),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SeedError::UnknownTableObject { uuid, .. } if uuid == self::uuid(COVER)));
        let tables = factory.tables().await;
        // Previous membership survives and later entities were not touched.
        assert_eq!(tables.collection_uuids(4, "latest"), vec![uuid(BOOK)]);
        assert!(tables.purchases.is_empty());
    }

    #[tokio::test]
    async fn test_references_resolve_objects_from_same_run() {
        let factory = MemoryFixtureStoreFactory::new();
        seed(
            &factory,
            &data(json!({
                "tableObjects": [{"uuid": BOOK, "userId": 1, "tableId": 4}],
                "collections": [{"tableId": 4, "name": "all", "tableObjects": [BOOK]}]
            })),
        )
        .await
        .unwrap();

        assert_eq!(
            factory.tables().await.collection_uuids(4, "all"),
            vec![uuid(BOOK)]
        );
    }
}
