//! Ledger flows: event recording, snapshots and per-block reconciliation.

pub mod helper;
pub mod ledger;
pub mod reconcile;
pub mod replay;

pub use helper::InvestmentHelper;
pub use ledger::{ChangeOutcome, Ledger, SkipReason};
pub use reconcile::{BatchReport, ReconcileConfig, Reconciler};
pub use replay::{InvestmentDescriptor, LedgerInput, ReplaySummary, Replayer};
