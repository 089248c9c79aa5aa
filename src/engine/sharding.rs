//! Address sharding: split owners across independent deployments.
//!
//! Pure functions of the address bytes and the configured integers; no
//! hidden state, so sibling deployments agree on every owner's shard.

use crate::domain::Address;
use serde::{Deserialize, Serialize};

/// How an address is reduced to a shard number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardScheme {
    /// Weighted modular reduction of the first 8 bytes.
    #[default]
    Prefix,
    /// Last byte modulo the shard count.
    Trailing,
}

/// `(r * 256 + b) mod m` over the first 8 address bytes.
///
/// Safe for any `m < 2^32`: the accumulator never exceeds `m * 256`.
pub fn weighted_prefix_mod(owner: &Address, m: u32) -> u32 {
    if m == 0 {
        return 0;
    }
    let m = u64::from(m);
    let mut r: u64 = 0;
    for b in &owner.as_bytes()[..8] {
        r = (r * 256 + u64::from(*b)) % m;
    }
    r as u32
}

/// Shard of `owner` in `[0, shard_count)`; 0 when `shard_count` is 0.
pub fn shard_of(owner: &Address, shard_count: u32, scheme: ShardScheme) -> u32 {
    if shard_count == 0 {
        return 0;
    }
    match scheme {
        ShardScheme::Prefix => weighted_prefix_mod(owner, shard_count),
        ShardScheme::Trailing => u32::from(owner.as_bytes()[19]) % shard_count,
    }
}

/// Whether this deployment should process `owner`.
///
/// A single-shard deployment with no shard id admits everyone. A multi-shard
/// deployment that forgot its shard id admits nobody, as does a shard id
/// without a shard count.
pub fn belongs_to_shard(
    owner: &Address,
    shard_id: Option<u32>,
    shard_count: u32,
    scheme: ShardScheme,
) -> bool {
    match shard_id {
        None => shard_count <= 1,
        Some(_) if shard_count == 0 => false,
        Some(id) => shard_of(owner, shard_count, scheme) == id,
    }
}

/// Shard settings of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    pub shard_id: Option<u32>,
    pub shard_count: u32,
    #[serde(default)]
    pub scheme: ShardScheme,
}

impl ShardConfig {
    /// Single deployment covering every address.
    pub fn single() -> Self {
        ShardConfig {
            shard_id: None,
            shard_count: 1,
            scheme: ShardScheme::Prefix,
        }
    }

    pub fn new(shard_id: u32, shard_count: u32) -> Self {
        ShardConfig {
            shard_id: Some(shard_id),
            shard_count,
            scheme: ShardScheme::Prefix,
        }
    }

    pub fn with_scheme(mut self, scheme: ShardScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn admits(&self, owner: &Address) -> bool {
        belongs_to_shard(owner, self.shard_id, self.shard_count, self.scheme)
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self::single()
    }
}
