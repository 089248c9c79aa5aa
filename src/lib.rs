pub mod chain;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod protocols;

pub use chain::{MockChain, PositionValuer, ReadError, RecordedValuer};
pub use config::Config;
pub use db::{init_db, LedgerTx, Repository};
pub use domain::{
    Address, Amount, BlockRef, EntityId, EventContext, Investment, Position, PositionChange,
    PositionChangeAction, PositionKind, PositionParams, PositionSnapshot, Protocol, TxHash,
};
pub use error::{LedgerError, MathError};
pub use orchestration::{InvestmentHelper, Ledger, Reconciler, Replayer};
