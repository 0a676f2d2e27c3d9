//! Purchase and purchase item queries.

use dxdeploy_core::fixtures::PurchaseFixture;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgTransaction;

use crate::error::Result;

pub async fn exists(tx: &mut PgTransaction<'_>, purchase_id: i64) -> Result<bool> {
    let exists = query_scalar("SELECT EXISTS (SELECT 1 FROM purchases WHERE id = $1)")
        .bind(purchase_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

/// Inserts a purchase under its declared id.
pub async fn insert(tx: &mut PgTransaction<'_>, purchase: &PurchaseFixture) -> Result<()> {
    query(
        r#"
        INSERT INTO purchases (id, user_id, uuid, price, currency, completed, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        "#,
    )
    .bind(purchase.id)
    .bind(purchase.user_id)
    .bind(purchase.uuid)
    .bind(purchase.price)
    .bind(&purchase.currency)
    .bind(purchase.completed)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update(tx: &mut PgTransaction<'_>, purchase: &PurchaseFixture) -> Result<()> {
    query(
        r#"
        UPDATE purchases
        SET user_id = $2, uuid = $3, price = $4, currency = $5, completed = $6, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(purchase.id)
    .bind(purchase.user_id)
    .bind(purchase.uuid)
    .bind(purchase.price)
    .bind(&purchase.currency)
    .bind(purchase.completed)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Deletes every item row of a purchase.
pub async fn clear(tx: &mut PgTransaction<'_>, purchase_id: i64) -> Result<u64> {
    let result = query("DELETE FROM table_object_purchases WHERE purchase_id = $1")
        .bind(purchase_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

pub async fn add_item(
    tx: &mut PgTransaction<'_>,
    purchase_id: i64,
    table_object_id: i64,
) -> Result<()> {
    query(
        r#"
        INSERT INTO table_object_purchases (table_object_id, purchase_id, created_at)
        VALUES ($1, $2, now())
        "#,
    )
    .bind(table_object_id)
    .bind(purchase_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
