//! Position ledger, change recorder and snapshot writer.
//!
//! Every callback runs read-then-write inside one `LedgerTx`, first-use
//! investment creation included, so a failure anywhere leaves the store
//! untouched.

use crate::db::{LedgerTx, Repository};
use crate::domain::ids::{change_id, position_id, snapshot_id};
use crate::domain::{
    concat_amounts, Address, Amount, BlockRef, EntityId, EventContext, Investment, Position,
    PositionChange, PositionChangeAction, PositionParams, PositionSnapshot, Protocol,
    MAX_META_SLOTS,
};
use crate::engine::{apply_upsert, check_deltas, ShardConfig};
use crate::error::LedgerError;
use crate::orchestration::helper::InvestmentHelper;
use std::sync::Arc;
use tracing::debug;

/// Why an event was accepted without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The owner belongs to another shard.
    OtherShard,
    /// Every delta was zero.
    NoOp,
}

/// Result of `Ledger::record_change`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Recorded {
        position: Position,
        change: PositionChange,
        /// `false` when the (tx, log index) was already recorded.
        inserted: bool,
    },
    Skipped(SkipReason),
}

/// Merge `params` into the stored position within `tx`; creates the holder
/// row on first sight of the owner.
pub(crate) async fn upsert_in_tx(
    tx: &mut LedgerTx,
    investment: &Investment,
    params: &PositionParams,
    block_number: u64,
) -> Result<Position, LedgerError> {
    let id = position_id(&investment.id, &params.owner, &params.tag);
    let existing = tx.get_position(&id).await?;
    let merged = apply_upsert(existing, investment, params, block_number)?;
    tx.upsert_position(&merged.position).await?;
    if merged.created {
        tx.insert_holder(&investment.id, &merged.position.owner).await?;
    }
    Ok(merged.position)
}

/// Write the position's current amounts as its snapshot for `block`.
pub(crate) async fn snapshot_in_tx(
    tx: &mut LedgerTx,
    position: &Position,
    block: BlockRef,
) -> Result<PositionSnapshot, LedgerError> {
    let snapshot = PositionSnapshot {
        id: snapshot_id(&position.id, block.number),
        position_id: position.id.clone(),
        amounts: position.amounts.clone(),
        block_number: block.number,
        block_timestamp: block.timestamp,
    };
    tx.upsert_snapshot(&snapshot).await?;
    Ok(snapshot)
}

#[derive(Debug, Clone)]
pub struct Ledger {
    repo: Arc<Repository>,
    chain: String,
    shard: ShardConfig,
}

impl Ledger {
    pub fn new(repo: Arc<Repository>, chain: impl Into<String>, shard: ShardConfig) -> Self {
        Self {
            repo,
            chain: chain.into(),
            shard,
        }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Whether this deployment's shard covers `owner`.
    pub fn admits(&self, owner: &Address) -> bool {
        self.shard.admits(owner)
    }

    /// Load the helper's investment, creating it (and its protocol) on first use.
    ///
    /// # Errors
    /// `Read` when the token lookup fails, `InvalidInput` for oversized meta.
    pub async fn get_or_create_investment(
        &self,
        helper: &dyn InvestmentHelper,
        block: BlockRef,
    ) -> Result<Investment, LedgerError> {
        let investment_id = helper.investment_id(&self.chain);
        if let Some(existing) = self.repo.get_investment(&investment_id).await? {
            return Ok(existing);
        }
        let mut tx = self.repo.begin().await?;
        let investment = self.investment_in_tx(&mut tx, helper, block).await?;
        tx.commit().await?;
        Ok(investment)
    }

    /// Load or stage the helper's investment within `tx`; nothing persists
    /// unless the caller commits.
    async fn investment_in_tx(
        &self,
        tx: &mut LedgerTx,
        helper: &dyn InvestmentHelper,
        block: BlockRef,
    ) -> Result<Investment, LedgerError> {
        let investment_id = helper.investment_id(&self.chain);
        if let Some(existing) = tx.get_investment(&investment_id).await? {
            return Ok(existing);
        }

        let tokens = helper.get_tokens().await?;
        let protocol_meta = helper.protocol_meta();
        for meta in [&tokens.meta, &protocol_meta] {
            if meta.len() > MAX_META_SLOTS {
                return Err(LedgerError::InvalidInput(format!(
                    "{} meta slots exceed the limit of {}",
                    meta.len(),
                    MAX_META_SLOTS
                )));
            }
        }

        let protocol_id = helper.protocol_id(&self.chain);
        let investment = Investment {
            id: investment_id,
            protocol_id: protocol_id.clone(),
            address: helper.investment_address(),
            tag: helper.investment_tag().to_string(),
            input_tokens: tokens.input_tokens,
            reward_tokens: tokens.reward_tokens,
            meta: tokens.meta,
            block_number: block.number,
            block_timestamp: block.timestamp,
        };

        if tx.get_protocol(&protocol_id).await?.is_none() {
            tx.insert_protocol(&Protocol {
                id: protocol_id,
                name: helper.protocol_name().to_string(),
                chain: self.chain.clone(),
                meta: protocol_meta,
                batch_cursor: 0,
                block_number: block.number,
            })
            .await?;
        }
        tx.insert_investment(&investment).await?;

        debug!(
            investment = %investment.id,
            address = %investment.address,
            protocol = helper.protocol_name(),
            "investment created"
        );
        Ok(investment)
    }

    /// Replace the investment's metadata slots.
    pub async fn update_investment_meta(
        &self,
        investment_id: &EntityId,
        meta: Vec<String>,
    ) -> Result<(), LedgerError> {
        if meta.len() > MAX_META_SLOTS {
            return Err(LedgerError::InvalidInput(format!(
                "{} meta slots exceed the limit of {}",
                meta.len(),
                MAX_META_SLOTS
            )));
        }
        let mut tx = self.repo.begin().await?;
        tx.update_investment_meta(investment_id, &meta).await?;
        tx.commit().await
    }

    /// Create or update the position keyed by (investment, owner, tag).
    ///
    /// # Errors
    /// `NotFound` when the investment does not exist; nothing is written.
    pub async fn upsert_position(
        &self,
        investment_id: &EntityId,
        params: &PositionParams,
        block: BlockRef,
    ) -> Result<Position, LedgerError> {
        let mut tx = self.repo.begin().await?;
        let investment = tx
            .get_investment(investment_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("investment {}", investment_id)))?;
        let position = upsert_in_tx(&mut tx, &investment, params, block.number).await?;
        tx.commit().await?;
        Ok(position)
    }

    pub async fn find_position(
        &self,
        investment_id: &EntityId,
        owner: &Address,
        tag: &str,
    ) -> Result<Option<Position>, LedgerError> {
        self.repo
            .get_position(&position_id(investment_id, owner, tag))
            .await
    }

    /// Like `find_position`, but absence is an error.
    pub async fn require_position(
        &self,
        investment_id: &EntityId,
        owner: &Address,
        tag: &str,
    ) -> Result<Position, LedgerError> {
        self.find_position(investment_id, owner, tag)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "position of {} in investment {} (tag {:?})",
                    owner, investment_id, tag
                ))
            })
    }

    /// Apply one mutating event: upsert the position, snapshot it at the
    /// event's block, and append the change keyed by (tx hash, log index).
    ///
    /// Owners outside this shard and all-zero deltas are skipped before any
    /// read or write.
    pub async fn record_change(
        &self,
        ctx: &EventContext,
        action: PositionChangeAction,
        helper: &dyn InvestmentHelper,
        params: &PositionParams,
        input_deltas: &[Amount],
        reward_deltas: &[Amount],
    ) -> Result<ChangeOutcome, LedgerError> {
        if !self.admits(&params.owner) {
            debug!(owner = %params.owner, tx = %ctx.tx_hash, "owner outside shard, skipping change");
            return Ok(ChangeOutcome::Skipped(SkipReason::OtherShard));
        }
        let d_amounts = concat_amounts(input_deltas, reward_deltas);
        if d_amounts.iter().all(Amount::is_zero) {
            debug!(owner = %params.owner, tx = %ctx.tx_hash, action = %action, "zero deltas, skipping change");
            return Ok(ChangeOutcome::Skipped(SkipReason::NoOp));
        }

        let mut tx = self.repo.begin().await?;
        let investment = self.investment_in_tx(&mut tx, helper, ctx.block).await?;
        let id = position_id(&investment.id, &params.owner, &params.tag);
        let existing = tx.get_position(&id).await?;
        let merged = apply_upsert(existing, &investment, params, ctx.block.number)?;
        check_deltas(&merged.position, &d_amounts)?;

        tx.upsert_position(&merged.position).await?;
        if merged.created {
            tx.insert_holder(&investment.id, &merged.position.owner).await?;
        }
        snapshot_in_tx(&mut tx, &merged.position, ctx.block).await?;

        let change = PositionChange {
            id: change_id(&ctx.tx_hash, ctx.log_index),
            position_id: merged.position.id.clone(),
            action,
            block_number: ctx.block.number,
            block_timestamp: ctx.block.timestamp,
            tx_hash: ctx.tx_hash.clone(),
            log_index: ctx.log_index,
            d_amounts,
            after_amounts: merged.position.amounts.clone(),
        };
        let inserted = tx.insert_change(&change).await?;
        tx.commit().await?;

        if !inserted {
            debug!(change = %change.id, "change already recorded");
        }
        Ok(ChangeOutcome::Recorded {
            position: merged.position,
            change,
            inserted,
        })
    }

    /// Upsert the position and write its snapshot for `block`.
    ///
    /// Returns `None` when the owner belongs to another shard.
    pub async fn snapshot_position(
        &self,
        block: BlockRef,
        helper: &dyn InvestmentHelper,
        params: &PositionParams,
    ) -> Result<Option<Position>, LedgerError> {
        if !self.admits(&params.owner) {
            debug!(owner = %params.owner, block = block.number, "owner outside shard, skipping snapshot");
            return Ok(None);
        }
        let mut tx = self.repo.begin().await?;
        let investment = self.investment_in_tx(&mut tx, helper, block).await?;
        let position = upsert_in_tx(&mut tx, &investment, params, block.number).await?;
        snapshot_in_tx(&mut tx, &position, block).await?;
        tx.commit().await?;
        Ok(Some(position))
    }
}
