//! Append-only change log and per-block snapshots.

use super::{decode_json, encode_json, to_i64, to_u32, to_u64};
use crate::domain::{EntityId, PositionChange, PositionChangeAction, PositionSnapshot, TxHash};
use crate::error::LedgerError;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

fn change_from_row(row: &SqliteRow) -> Result<PositionChange, LedgerError> {
    let action: String = row.get("action");
    Ok(PositionChange {
        id: EntityId::from_hex(row.get::<String, _>("id")),
        position_id: EntityId::from_hex(row.get::<String, _>("position_id")),
        action: action
            .parse::<PositionChangeAction>()
            .map_err(LedgerError::Decode)?,
        block_number: to_u64(row.get("block_number"))?,
        block_timestamp: to_u64(row.get("block_timestamp"))?,
        tx_hash: TxHash::new(row.get::<String, _>("tx_hash")),
        log_index: to_u32(row.get("log_index"))?,
        d_amounts: decode_json(&row.get::<String, _>("d_amounts"))?,
        after_amounts: decode_json(&row.get::<String, _>("after_amounts"))?,
    })
}

/// Insert a change; a second insert with the same id is ignored.
pub(super) async fn insert_change(
    conn: &mut SqliteConnection,
    change: &PositionChange,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO position_changes
        (id, position_id, action, block_number, block_timestamp, tx_hash, log_index,
         d_amounts, after_amounts)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(change.id.as_str())
    .bind(change.position_id.as_str())
    .bind(change.action.as_str())
    .bind(to_i64(change.block_number)?)
    .bind(to_i64(change.block_timestamp)?)
    .bind(change.tx_hash.as_str())
    .bind(i64::from(change.log_index))
    .bind(encode_json(&change.d_amounts)?)
    .bind(encode_json(&change.after_amounts)?)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn fetch_change(
    conn: &mut SqliteConnection,
    id: &EntityId,
) -> Result<Option<PositionChange>, LedgerError> {
    let row = sqlx::query("SELECT * FROM position_changes WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(change_from_row).transpose()
}

pub(super) async fn list_changes(
    conn: &mut SqliteConnection,
    position_id: &EntityId,
) -> Result<Vec<PositionChange>, LedgerError> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM position_changes
        WHERE position_id = ?
        ORDER BY block_number ASC, log_index ASC
        "#,
    )
    .bind(position_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(change_from_row).collect()
}

fn snapshot_from_row(row: &SqliteRow) -> Result<PositionSnapshot, LedgerError> {
    Ok(PositionSnapshot {
        id: EntityId::from_hex(row.get::<String, _>("id")),
        position_id: EntityId::from_hex(row.get::<String, _>("position_id")),
        amounts: decode_json(&row.get::<String, _>("amounts"))?,
        block_number: to_u64(row.get("block_number"))?,
        block_timestamp: to_u64(row.get("block_timestamp"))?,
    })
}

/// Write a snapshot; the same (position, block) overwrites the earlier row.
pub(super) async fn upsert_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &PositionSnapshot,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO position_snapshots (id, position_id, amounts, block_number, block_timestamp)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            amounts = excluded.amounts,
            block_timestamp = excluded.block_timestamp
        "#,
    )
    .bind(snapshot.id.as_str())
    .bind(snapshot.position_id.as_str())
    .bind(encode_json(&snapshot.amounts)?)
    .bind(to_i64(snapshot.block_number)?)
    .bind(to_i64(snapshot.block_timestamp)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn list_snapshots(
    conn: &mut SqliteConnection,
    position_id: &EntityId,
) -> Result<Vec<PositionSnapshot>, LedgerError> {
    let rows = sqlx::query(
        "SELECT * FROM position_snapshots WHERE position_id = ? ORDER BY block_number ASC",
    )
    .bind(position_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(snapshot_from_row).collect()
}
