use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::AuditLogEntry, sqlite::SqliteDatabaseError};

pub const ORDER_ENTITY: &str = "order";

pub async fn insert_audit_entry(
    entity: &str,
    entity_id: i64,
    action: &str,
    old_value: Option<String>,
    new_value: Option<String>,
    actor: &str,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "INSERT INTO audit_log (entity, entity_id, action, old_value, new_value, actor) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entity)
    .bind(entity_id)
    .bind(action)
    .bind(old_value)
    .bind(new_value)
    .bind(actor)
    .execute(conn)
    .await?;
    trace!("🗃️ Audit: {actor} {action} {entity} #{entity_id}");
    Ok(())
}

pub async fn fetch_audit_log(
    entity: &str,
    entity_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditLogEntry>, SqliteDatabaseError> {
    let entries = sqlx::query_as(
        "SELECT * FROM audit_log WHERE entity = $1 AND entity_id = $2 ORDER BY created_at ASC, id ASC",
    )
    .bind(entity)
    .bind(entity_id)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
