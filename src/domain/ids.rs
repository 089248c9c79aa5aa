//! Deterministic entity keys.
//!
//! Every id is a SHA-256 digest over a domain label and length-prefixed
//! fields, so ids are reproducible from their inputs alone and no two
//! field splits can collide.

use crate::domain::{Address, TxHash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable byte-string key of a ledger entity, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an already-derived hex key (e.g. read back from the store).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        EntityId(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn derive(label: &str, parts: &[&[u8]]) -> EntityId {
    let mut hasher = Sha256::new();
    hasher.update((label.len() as u64).to_be_bytes());
    hasher.update(label.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    EntityId(hex::encode(hasher.finalize()))
}

/// One protocol per (name, chain).
pub fn protocol_id(name: &str, chain: &str) -> EntityId {
    derive("protocol", &[name.as_bytes(), chain.as_bytes()])
}

/// One investment per (protocol, venue, disambiguating tag).
pub fn investment_id(protocol_id: &EntityId, venue: &Address, tag: &str) -> EntityId {
    derive(
        "investment",
        &[protocol_id.as_str().as_bytes(), venue.as_bytes(), tag.as_bytes()],
    )
}

/// One position per (investment, owner, tag).
pub fn position_id(investment_id: &EntityId, owner: &Address, tag: &str) -> EntityId {
    derive(
        "position",
        &[investment_id.as_str().as_bytes(), owner.as_bytes(), tag.as_bytes()],
    )
}

/// One change per (transaction, log index).
pub fn change_id(tx_hash: &TxHash, log_index: u32) -> EntityId {
    derive(
        "change",
        &[tx_hash.as_str().as_bytes(), &log_index.to_be_bytes()],
    )
}

/// One snapshot per (position, block).
pub fn snapshot_id(position_id: &EntityId, block_number: u64) -> EntityId {
    derive(
        "snapshot",
        &[position_id.as_str().as_bytes(), &block_number.to_be_bytes()],
    )
}
