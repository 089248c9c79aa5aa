//! Repository layer for the position ledger.
//!
//! SQL lives in free functions over a `SqliteConnection`, organized by table:
//! - `entities.rs` - protocols, investments, positions, holders
//! - `history.rs` - position changes and snapshots
//!
//! `Repository` runs them against pooled connections for reads;
//! `LedgerTx` runs them inside one transaction so a callback's writes land
//! together or not at all.

mod entities;
mod history;

use crate::domain::{
    Address, EntityId, Holder, Investment, Position, PositionChange, PositionSnapshot, Protocol,
};
use crate::error::LedgerError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(value)?)
}

fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, LedgerError> {
    Ok(serde_json::from_str(text)?)
}

fn decode_address(text: &str) -> Result<Address, LedgerError> {
    Address::parse(text).map_err(|e| LedgerError::Decode(format!("address {}: {}", text, e)))
}

// SQLite integers are signed 64-bit.
fn to_i64(value: u64) -> Result<i64, LedgerError> {
    i64::try_from(value).map_err(|_| LedgerError::InvalidInput(format!("{} exceeds i64", value)))
}

fn to_u64(value: i64) -> Result<u64, LedgerError> {
    u64::try_from(value).map_err(|_| LedgerError::Decode(format!("negative integer {}", value)))
}

fn to_u32(value: i64) -> Result<u32, LedgerError> {
    u32::try_from(value).map_err(|_| LedgerError::Decode(format!("integer {} out of u32 range", value)))
}

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a write transaction.
    ///
    /// # Errors
    /// Returns an error if no connection can be acquired.
    pub async fn begin(&self) -> Result<LedgerTx, LedgerError> {
        Ok(LedgerTx {
            tx: self.pool.begin().await?,
        })
    }

    pub async fn get_protocol(&self, id: &EntityId) -> Result<Option<Protocol>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::fetch_protocol(&mut conn, id).await
    }

    pub async fn get_investment(&self, id: &EntityId) -> Result<Option<Investment>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::fetch_investment(&mut conn, id).await
    }

    pub async fn get_position(&self, id: &EntityId) -> Result<Option<Position>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::fetch_position(&mut conn, id).await
    }

    /// Open positions of every investment under `protocol_id`, in id order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn list_open_positions(
        &self,
        protocol_id: &EntityId,
    ) -> Result<Vec<Position>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::list_open_positions(&mut conn, protocol_id).await
    }

    pub async fn list_positions(&self, investment_id: &EntityId) -> Result<Vec<Position>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::list_positions_for_investment(&mut conn, investment_id).await
    }

    pub async fn list_holders(&self, investment_id: &EntityId) -> Result<Vec<Holder>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        entities::list_holders(&mut conn, investment_id).await
    }

    pub async fn get_change(&self, id: &EntityId) -> Result<Option<PositionChange>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        history::fetch_change(&mut conn, id).await
    }

    /// Changes of one position ordered by (block, log index).
    pub async fn list_changes(&self, position_id: &EntityId) -> Result<Vec<PositionChange>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        history::list_changes(&mut conn, position_id).await
    }

    pub async fn list_snapshots(
        &self,
        position_id: &EntityId,
    ) -> Result<Vec<PositionSnapshot>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        history::list_snapshots(&mut conn, position_id).await
    }
}

/// An open write transaction. Dropped without `commit` it rolls back.
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    pub async fn commit(self) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn get_protocol(&mut self, id: &EntityId) -> Result<Option<Protocol>, LedgerError> {
        entities::fetch_protocol(&mut self.tx, id).await
    }

    /// Insert a protocol unless it exists; returns whether a row was added.
    pub async fn insert_protocol(&mut self, protocol: &Protocol) -> Result<bool, LedgerError> {
        entities::insert_protocol(&mut self.tx, protocol).await
    }

    pub async fn set_batch_cursor(&mut self, protocol_id: &EntityId, cursor: u32) -> Result<(), LedgerError> {
        entities::set_batch_cursor(&mut self.tx, protocol_id, cursor).await
    }

    pub async fn get_investment(&mut self, id: &EntityId) -> Result<Option<Investment>, LedgerError> {
        entities::fetch_investment(&mut self.tx, id).await
    }

    pub async fn insert_investment(&mut self, investment: &Investment) -> Result<bool, LedgerError> {
        entities::insert_investment(&mut self.tx, investment).await
    }

    pub async fn update_investment_meta(
        &mut self,
        investment_id: &EntityId,
        meta: &[String],
    ) -> Result<(), LedgerError> {
        entities::update_investment_meta(&mut self.tx, investment_id, meta).await
    }

    pub async fn get_position(&mut self, id: &EntityId) -> Result<Option<Position>, LedgerError> {
        entities::fetch_position(&mut self.tx, id).await
    }

    pub async fn upsert_position(&mut self, position: &Position) -> Result<(), LedgerError> {
        entities::upsert_position(&mut self.tx, position).await
    }

    pub async fn insert_holder(&mut self, investment_id: &EntityId, owner: &Address) -> Result<bool, LedgerError> {
        entities::insert_holder(&mut self.tx, investment_id, owner).await
    }

    /// Insert a change record; `false` when that (tx, log index) already exists.
    pub async fn insert_change(&mut self, change: &PositionChange) -> Result<bool, LedgerError> {
        history::insert_change(&mut self.tx, change).await
    }

    pub async fn upsert_snapshot(&mut self, snapshot: &PositionSnapshot) -> Result<(), LedgerError> {
        history::upsert_snapshot(&mut self.tx, snapshot).await
    }
}
