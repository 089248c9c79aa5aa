//! Protocol, investment, position and holder rows.

use super::{decode_address, decode_json, encode_json, to_i64, to_u32, to_u64};
use crate::domain::{Address, Amount, EntityId, Holder, Investment, Position, PositionKind, Protocol};
use crate::error::LedgerError;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

fn protocol_from_row(row: &SqliteRow) -> Result<Protocol, LedgerError> {
    Ok(Protocol {
        id: EntityId::from_hex(row.get::<String, _>("id")),
        name: row.get("name"),
        chain: row.get("chain"),
        meta: decode_json(&row.get::<String, _>("meta"))?,
        batch_cursor: to_u32(row.get("batch_cursor"))?,
        block_number: to_u64(row.get("block_number"))?,
    })
}

pub(super) async fn fetch_protocol(
    conn: &mut SqliteConnection,
    id: &EntityId,
) -> Result<Option<Protocol>, LedgerError> {
    let row = sqlx::query("SELECT * FROM protocols WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(protocol_from_row).transpose()
}

pub(super) async fn insert_protocol(
    conn: &mut SqliteConnection,
    protocol: &Protocol,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO protocols (id, name, chain, meta, batch_cursor, block_number)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(protocol.id.as_str())
    .bind(&protocol.name)
    .bind(&protocol.chain)
    .bind(encode_json(&protocol.meta)?)
    .bind(i64::from(protocol.batch_cursor))
    .bind(to_i64(protocol.block_number)?)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn set_batch_cursor(
    conn: &mut SqliteConnection,
    id: &EntityId,
    cursor: u32,
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE protocols SET batch_cursor = ? WHERE id = ?")
        .bind(i64::from(cursor))
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound(format!("protocol {}", id)));
    }
    Ok(())
}

fn investment_from_row(row: &SqliteRow) -> Result<Investment, LedgerError> {
    Ok(Investment {
        id: EntityId::from_hex(row.get::<String, _>("id")),
        protocol_id: EntityId::from_hex(row.get::<String, _>("protocol_id")),
        address: decode_address(&row.get::<String, _>("address"))?,
        tag: row.get("tag"),
        input_tokens: decode_json(&row.get::<String, _>("input_tokens"))?,
        reward_tokens: decode_json(&row.get::<String, _>("reward_tokens"))?,
        meta: decode_json(&row.get::<String, _>("meta"))?,
        block_number: to_u64(row.get("block_number"))?,
        block_timestamp: to_u64(row.get("block_timestamp"))?,
    })
}

pub(super) async fn fetch_investment(
    conn: &mut SqliteConnection,
    id: &EntityId,
) -> Result<Option<Investment>, LedgerError> {
    let row = sqlx::query("SELECT * FROM investments WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(investment_from_row).transpose()
}

pub(super) async fn insert_investment(
    conn: &mut SqliteConnection,
    investment: &Investment,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO investments
        (id, protocol_id, address, tag, input_tokens, reward_tokens, meta, block_number, block_timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(investment.id.as_str())
    .bind(investment.protocol_id.as_str())
    .bind(investment.address.to_string())
    .bind(&investment.tag)
    .bind(encode_json(&investment.input_tokens)?)
    .bind(encode_json(&investment.reward_tokens)?)
    .bind(encode_json(&investment.meta)?)
    .bind(to_i64(investment.block_number)?)
    .bind(to_i64(investment.block_timestamp)?)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn update_investment_meta(
    conn: &mut SqliteConnection,
    id: &EntityId,
    meta: &[String],
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE investments SET meta = ? WHERE id = ?")
        .bind(encode_json(&meta)?)
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::NotFound(format!("investment {}", id)));
    }
    Ok(())
}

fn position_from_row(row: &SqliteRow) -> Result<Position, LedgerError> {
    let kind: String = row.get("kind");
    let liquidity: String = row.get("liquidity");
    let input_count: i64 = row.get("input_count");
    Ok(Position {
        id: EntityId::from_hex(row.get::<String, _>("id")),
        investment_id: EntityId::from_hex(row.get::<String, _>("investment_id")),
        owner: decode_address(&row.get::<String, _>("owner"))?,
        tag: row.get("tag"),
        kind: kind.parse::<PositionKind>().map_err(LedgerError::Decode)?,
        amounts: decode_json(&row.get::<String, _>("amounts"))?,
        initial_amounts: decode_json(&row.get::<String, _>("initial_amounts"))?,
        input_count: usize::try_from(input_count)
            .map_err(|_| LedgerError::Decode(format!("input_count {}", input_count)))?,
        liquidity: Amount::from_str_canonical(&liquidity)
            .map_err(|e| LedgerError::Decode(format!("liquidity {}: {}", liquidity, e)))?,
        closed: row.get::<i64, _>("closed") != 0,
        meta: decode_json(&row.get::<String, _>("meta"))?,
        block_number: to_u64(row.get("block_number"))?,
    })
}

pub(super) async fn fetch_position(
    conn: &mut SqliteConnection,
    id: &EntityId,
) -> Result<Option<Position>, LedgerError> {
    let row = sqlx::query("SELECT * FROM positions WHERE id = ?")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(position_from_row).transpose()
}

/// Insert or overwrite the mutable columns; identity columns and
/// `initial_amounts` are kept from the first insert.
pub(super) async fn upsert_position(
    conn: &mut SqliteConnection,
    position: &Position,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO positions
        (id, investment_id, owner, tag, kind, amounts, initial_amounts, input_count,
         liquidity, closed, meta, block_number)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            amounts = excluded.amounts,
            liquidity = excluded.liquidity,
            closed = excluded.closed,
            meta = excluded.meta
        "#,
    )
    .bind(position.id.as_str())
    .bind(position.investment_id.as_str())
    .bind(position.owner.to_string())
    .bind(&position.tag)
    .bind(position.kind.as_str())
    .bind(encode_json(&position.amounts)?)
    .bind(encode_json(&position.initial_amounts)?)
    .bind(position.input_count as i64)
    .bind(position.liquidity.to_canonical_string())
    .bind(i64::from(position.closed))
    .bind(encode_json(&position.meta)?)
    .bind(to_i64(position.block_number)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Open positions across every investment of a protocol, in id order.
pub(super) async fn list_open_positions(
    conn: &mut SqliteConnection,
    protocol_id: &EntityId,
) -> Result<Vec<Position>, LedgerError> {
    let rows = sqlx::query(
        r#"
        SELECT p.* FROM positions p
        JOIN investments i ON p.investment_id = i.id
        WHERE i.protocol_id = ? AND p.closed = 0
        ORDER BY p.id ASC
        "#,
    )
    .bind(protocol_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(position_from_row).collect()
}

pub(super) async fn list_positions_for_investment(
    conn: &mut SqliteConnection,
    investment_id: &EntityId,
) -> Result<Vec<Position>, LedgerError> {
    let rows = sqlx::query("SELECT * FROM positions WHERE investment_id = ? ORDER BY id ASC")
        .bind(investment_id.as_str())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(position_from_row).collect()
}

pub(super) async fn insert_holder(
    conn: &mut SqliteConnection,
    investment_id: &EntityId,
    owner: &Address,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO holders (investment_id, owner)
        VALUES (?, ?)
        ON CONFLICT(investment_id, owner) DO NOTHING
        "#,
    )
    .bind(investment_id.as_str())
    .bind(owner.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn list_holders(
    conn: &mut SqliteConnection,
    investment_id: &EntityId,
) -> Result<Vec<Holder>, LedgerError> {
    let rows = sqlx::query("SELECT owner FROM holders WHERE investment_id = ? ORDER BY owner ASC")
        .bind(investment_id.as_str())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter()
        .map(|row| {
            Ok(Holder {
                investment_id: investment_id.clone(),
                owner: decode_address(&row.get::<String, _>("owner"))?,
            })
        })
        .collect()
}
