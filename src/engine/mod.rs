//! Pure computation engine(s) for deterministic ledger logic.

pub mod batch;
pub mod liquidity;
pub mod position;
pub mod reward;
pub mod sharding;

pub use batch::{advance_cursor, normalize_cursor, owner_partition, select_batch, BatchPartition};
pub use position::{apply_upsert, check_deltas, validate_params, MergedPosition};
pub use reward::{accrue, rebase_reward, reward_delta, RewardAccrual, ShareRate};
pub use sharding::{belongs_to_shard, shard_of, weighted_prefix_mod, ShardConfig, ShardScheme};
