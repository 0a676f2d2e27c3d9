//! Collection and membership queries.

use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgTransaction;

use crate::error::Result;

/// Returns the id of the collection named `name` in table `table_id`.
pub async fn find(tx: &mut PgTransaction<'_>, table_id: i64, name: &str) -> Result<Option<i64>> {
    let id = query_scalar("SELECT id FROM collections WHERE table_id = $1 AND name = $2")
        .bind(table_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(id)
}

/// Inserts a collection and returns its id.
pub async fn insert(tx: &mut PgTransaction<'_>, table_id: i64, name: &str) -> Result<i64> {
    let id = query_scalar(
        r#"
        INSERT INTO collections (table_id, name, created_at, updated_at)
        VALUES ($1, $2, now(), now())
        RETURNING id
        "#,
    )
    .bind(table_id)
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Deletes every membership row of a collection.
pub async fn clear(tx: &mut PgTransaction<'_>, collection_id: i64) -> Result<u64> {
    let result = query("DELETE FROM table_object_collections WHERE collection_id = $1")
        .bind(collection_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

pub async fn add_member(
    tx: &mut PgTransaction<'_>,
    collection_id: i64,
    table_object_id: i64,
) -> Result<()> {
    query(
        r#"
        INSERT INTO table_object_collections (table_object_id, collection_id, created_at)
        VALUES ($1, $2, now())
        "#,
    )
    .bind(table_object_id)
    .bind(collection_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
