use crate::engine::{BatchPartition, ShardConfig, ShardScheme};
use crate::orchestration::ReconcileConfig;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub chain: String,
    pub shard: ShardConfig,
    pub reconcile: ReconcileConfig,
    /// JSONL input for the replay host; stdin when unset.
    pub replay_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_number<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("must be {}", expected)))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let chain = env_map
            .get("CHAIN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("CHAIN".to_string()))?;

        let shard_id = match env_map.get("SHARD_ID").map(|s| s.trim()) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue("SHARD_ID".to_string(), "must be a valid u32".to_string())
            })?),
        };

        let shard_count: u32 = parse_number(&env_map, "SHARD_COUNT", "1", "a valid u32")?;

        let scheme = match env_map
            .get("SHARD_SCHEME")
            .map(|s| s.as_str())
            .unwrap_or("prefix")
        {
            "prefix" => ShardScheme::Prefix,
            "trailing" => ShardScheme::Trailing,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SHARD_SCHEME".to_string(),
                    format!("must be prefix or trailing, got {}", other),
                ))
            }
        };

        if let Some(id) = shard_id {
            if shard_count > 0 && id >= shard_count {
                return Err(ConfigError::InvalidValue(
                    "SHARD_ID".to_string(),
                    format!("{} is not below SHARD_COUNT {}", id, shard_count),
                ));
            }
        }

        let batch_size: u32 = parse_number(&env_map, "SNAPSHOT_BATCH", "1", "a valid u32")?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "SNAPSHOT_BATCH".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let start_block: u64 =
            parse_number(&env_map, "START_SNAPSHOT_BLOCK", "0", "a valid u64")?;

        let partition = match env_map
            .get("BATCH_PARTITION")
            .map(|s| s.as_str())
            .unwrap_or("owner")
        {
            "owner" => BatchPartition::Owner,
            "ordinal" => BatchPartition::Ordinal,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BATCH_PARTITION".to_string(),
                    format!("must be owner or ordinal, got {}", other),
                ))
            }
        };

        let replay_path = env_map.get("REPLAY_PATH").cloned().filter(|s| !s.is_empty());

        Ok(Config {
            database_path,
            chain,
            shard: ShardConfig {
                shard_id,
                shard_count,
                scheme,
            },
            reconcile: ReconcileConfig {
                batch_size,
                start_block,
                partition,
            },
            replay_path,
        })
    }
}
