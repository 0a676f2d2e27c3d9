//! Table object, property and price queries.

use dxdeploy_core::StoredProperty;
use dxdeploy_core::fixtures::{PriceFixture, TableObjectFixture};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgTransaction;
use uuid::Uuid;

use crate::error::Result;

/// Returns the id of the table object with the given uuid.
pub async fn find_by_uuid(tx: &mut PgTransaction<'_>, uuid: Uuid) -> Result<Option<i64>> {
    let id = query_scalar("SELECT id FROM table_objects WHERE uuid = $1")
        .bind(uuid)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(id)
}

/// Inserts a table object and returns its id.
pub async fn insert(tx: &mut PgTransaction<'_>, object: &TableObjectFixture) -> Result<i64> {
    let id = query_scalar(
        r#"
        INSERT INTO table_objects (uuid, user_id, table_id, file, created_at, updated_at)
        VALUES ($1, $2, $3, $4, now(), now())
        RETURNING id
        "#,
    )
    .bind(object.uuid)
    .bind(object.user_id)
    .bind(object.table_id)
    .bind(object.file)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Lists the stored properties of a table object, oldest first.
pub async fn properties(
    tx: &mut PgTransaction<'_>,
    table_object_id: i64,
) -> Result<Vec<StoredProperty>> {
    let rows: Vec<(i64, String, String)> = query_as(
        "SELECT id, name, value FROM table_object_properties WHERE table_object_id = $1 ORDER BY id",
    )
    .bind(table_object_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, value)| StoredProperty { id, name, value })
        .collect())
}

pub async fn insert_property(
    tx: &mut PgTransaction<'_>,
    table_object_id: i64,
    name: &str,
    value: &str,
) -> Result<()> {
    query("INSERT INTO table_object_properties (table_object_id, name, value) VALUES ($1, $2, $3)")
        .bind(table_object_id)
        .bind(name)
        .bind(value)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn update_property(
    tx: &mut PgTransaction<'_>,
    property_id: i64,
    value: &str,
) -> Result<()> {
    query("UPDATE table_object_properties SET value = $2 WHERE id = $1")
        .bind(property_id)
        .bind(value)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete_property(tx: &mut PgTransaction<'_>, property_id: i64) -> Result<()> {
    query("DELETE FROM table_object_properties WHERE id = $1")
        .bind(property_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_price(
    tx: &mut PgTransaction<'_>,
    table_object_id: i64,
    price: &PriceFixture,
) -> Result<()> {
    query("INSERT INTO table_object_prices (table_object_id, price, currency) VALUES ($1, $2, $3)")
        .bind(table_object_id)
        .bind(price.price)
        .bind(&price.currency)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
