//! Replays newline-delimited ledger inputs through `Ledger` and `Reconciler`.

use crate::chain::{RecordedRead, RecordedValuer};
use crate::domain::ids::protocol_id;
use crate::domain::{Address, Amount, BlockRef, EntityId, EventContext, PositionChangeAction, PositionParams};
use crate::error::LedgerError;
use crate::orchestration::ledger::{ChangeOutcome, Ledger};
use crate::orchestration::reconcile::{ReconcileConfig, Reconciler};
use crate::protocols::FixedInvestment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Venue description carried inline by replayed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentDescriptor {
    pub protocol: String,
    pub address: Address,
    #[serde(default)]
    pub tag: String,
    pub input_tokens: Vec<Address>,
    #[serde(default)]
    pub reward_tokens: Vec<Address>,
    #[serde(default)]
    pub meta: Vec<String>,
}

impl InvestmentDescriptor {
    pub fn helper(&self) -> FixedInvestment {
        FixedInvestment::new(self.protocol.clone(), self.address, self.input_tokens.clone())
            .with_reward_tokens(self.reward_tokens.clone())
            .with_tag(self.tag.clone())
            .with_meta(self.meta.clone())
    }
}

/// One replayed host callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerInput {
    Change {
        ctx: EventContext,
        action: PositionChangeAction,
        investment: InvestmentDescriptor,
        params: PositionParams,
        #[serde(default)]
        input_deltas: Vec<Amount>,
        #[serde(default)]
        reward_deltas: Vec<Amount>,
    },
    Snapshot {
        block: BlockRef,
        investment: InvestmentDescriptor,
        params: PositionParams,
    },
    /// Block boundary for one protocol, with the reads its batch would make.
    Block {
        block: BlockRef,
        protocol: String,
        #[serde(default)]
        reads: Vec<RecordedRead>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub changes: usize,
    pub duplicate_changes: usize,
    pub skipped: usize,
    pub snapshots: usize,
    pub batches: usize,
    pub refreshed: usize,
    pub failed_reads: usize,
}

pub struct Replayer {
    ledger: Ledger,
    reconcile: ReconcileConfig,
    reconcilers: HashMap<EntityId, Reconciler>,
    summary: ReplaySummary,
}

impl Replayer {
    pub fn new(ledger: Ledger, reconcile: ReconcileConfig) -> Self {
        Self {
            ledger,
            reconcile,
            reconcilers: HashMap::new(),
            summary: ReplaySummary::default(),
        }
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    pub async fn apply(&mut self, input: LedgerInput) -> Result<(), LedgerError> {
        match input {
            LedgerInput::Change {
                ctx,
                action,
                investment,
                params,
                input_deltas,
                reward_deltas,
            } => {
                let helper = investment.helper();
                let outcome = self
                    .ledger
                    .record_change(&ctx, action, &helper, &params, &input_deltas, &reward_deltas)
                    .await?;
                match outcome {
                    ChangeOutcome::Recorded { inserted: true, .. } => self.summary.changes += 1,
                    ChangeOutcome::Recorded { inserted: false, .. } => {
                        self.summary.duplicate_changes += 1
                    }
                    ChangeOutcome::Skipped(_) => self.summary.skipped += 1,
                }
            }
            LedgerInput::Snapshot {
                block,
                investment,
                params,
            } => {
                let helper = investment.helper();
                match self.ledger.snapshot_position(block, &helper, &params).await? {
                    Some(_) => self.summary.snapshots += 1,
                    None => self.summary.skipped += 1,
                }
            }
            LedgerInput::Block {
                block,
                protocol,
                reads,
            } => {
                let id = protocol_id(&protocol, self.ledger.chain());
                let reconciler = self.reconcilers.entry(id.clone()).or_insert_with(|| {
                    Reconciler::new(self.ledger.repo().clone(), id, self.reconcile)
                });
                let valuer = RecordedValuer::from_reads(reads);
                if let Some(report) = reconciler.on_block(block, &valuer).await? {
                    self.summary.batches += 1;
                    self.summary.refreshed += report.refreshed;
                    self.summary.failed_reads += report.failed;
                }
            }
        }
        Ok(())
    }
}
