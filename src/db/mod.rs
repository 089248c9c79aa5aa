//! SQLite persistence for the position ledger.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository reads and transactional writes

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{LedgerTx, Repository};
