//! Block-budgeted reconciliation of open positions against chain state.

use crate::chain::PositionValuer;
use crate::db::Repository;
use crate::domain::{BlockRef, EntityId, Investment, PositionParams};
use crate::engine::{advance_cursor, normalize_cursor, select_batch, BatchPartition};
use crate::error::LedgerError;
use crate::orchestration::ledger::{snapshot_in_tx, upsert_in_tx};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Number of partitions; one is refreshed per block.
    pub batch_size: u32,
    /// Blocks below this are ignored.
    pub start_block: u64,
    pub partition: BatchPartition,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            start_block: 0,
            partition: BatchPartition::Owner,
        }
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub block_number: u64,
    pub cursor_before: u32,
    pub cursor_after: u32,
    pub selected: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Per-protocol reconciliation loop.
#[derive(Debug, Clone)]
pub struct Reconciler {
    repo: Arc<Repository>,
    protocol_id: EntityId,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(repo: Arc<Repository>, protocol_id: EntityId, config: ReconcileConfig) -> Self {
        Self {
            repo,
            protocol_id,
            config,
        }
    }

    pub fn protocol_id(&self) -> &EntityId {
        &self.protocol_id
    }

    /// Refresh the current partition of open positions and advance the cursor.
    ///
    /// Returns `None` before `start_block` or while the protocol does not
    /// exist yet. Failed reads are logged and the position is left as is;
    /// snapshots and the cursor advance commit together.
    pub async fn on_block(
        &self,
        block: BlockRef,
        valuer: &dyn PositionValuer,
    ) -> Result<Option<BatchReport>, LedgerError> {
        if block.number < self.config.start_block {
            return Ok(None);
        }
        let Some(protocol) = self.repo.get_protocol(&self.protocol_id).await? else {
            return Ok(None);
        };

        let batch_size = self.config.batch_size.max(1);
        let cursor = normalize_cursor(protocol.batch_cursor, batch_size);
        let open = self.repo.list_open_positions(&self.protocol_id).await?;
        let selected = select_batch(&open, cursor, batch_size, self.config.partition);

        let mut investments: HashMap<EntityId, Investment> = HashMap::new();
        let mut refreshed: Vec<(EntityId, PositionParams)> = Vec::with_capacity(selected.len());
        let mut failed = 0usize;

        for position in &selected {
            if !investments.contains_key(&position.investment_id) {
                let investment = self
                    .repo
                    .get_investment(&position.investment_id)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("investment {}", position.investment_id))
                    })?;
                investments.insert(position.investment_id.clone(), investment);
            }
            let Some(investment) = investments.get(&position.investment_id) else {
                continue;
            };

            match valuer.current_value(investment, position).await {
                Ok(mut params) => {
                    // identity comes from the stored position, not the read
                    params.owner = position.owner;
                    params.tag = position.tag.clone();
                    params.kind = position.kind;
                    refreshed.push((position.investment_id.clone(), params));
                }
                Err(e) => {
                    warn!(
                        position = %position.id,
                        owner = %position.owner,
                        block = block.number,
                        error = %e,
                        "position read failed, skipping"
                    );
                    failed += 1;
                }
            }
        }

        let mut tx = self.repo.begin().await?;
        let mut written = 0usize;
        for (investment_id, params) in &refreshed {
            let Some(investment) = investments.get(investment_id) else {
                continue;
            };
            match upsert_in_tx(&mut tx, investment, params, block.number).await {
                Ok(position) => {
                    snapshot_in_tx(&mut tx, &position, block).await?;
                    written += 1;
                }
                Err(e @ (LedgerError::ShapeMismatch(_) | LedgerError::InvalidInput(_))) => {
                    warn!(
                        owner = %params.owner,
                        block = block.number,
                        error = %e,
                        "refreshed value rejected, skipping"
                    );
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        let cursor_after = advance_cursor(cursor, batch_size);
        tx.set_batch_cursor(&self.protocol_id, cursor_after).await?;
        tx.commit().await?;

        let report = BatchReport {
            block_number: block.number,
            cursor_before: cursor,
            cursor_after,
            selected: selected.len(),
            refreshed: written,
            failed,
        };
        info!(
            protocol = %self.protocol_id,
            block = block.number,
            cursor = cursor,
            selected = report.selected,
            refreshed = report.refreshed,
            failed = report.failed,
            "reconciliation batch complete"
        );
        Ok(Some(report))
    }
}
