//! Domain types for the position ledger.
//!
//! This module provides:
//! - Lossless 256-bit amounts via the Amount wrapper
//! - Domain primitives: Address, TxHash, BlockRef, EventContext
//! - Ledger entities: Protocol, Investment, Position, PositionChange, PositionSnapshot, Holder
//! - Deterministic id derivation for every entity

pub mod action;
pub mod amount;
pub mod entities;
pub mod ids;
pub mod params;
pub mod primitives;

pub use action::{PositionChangeAction, PositionKind};
pub use amount::{concat_amounts, Amount};
pub use entities::{
    is_closed, Holder, Investment, Position, PositionChange, PositionSnapshot, Protocol,
    MAX_META_SLOTS,
};
pub use ids::EntityId;
pub use params::{InvestmentTokens, PositionParams};
pub use primitives::{Address, AddressParseError, BlockRef, EventContext, TxHash};
