//! Valuer replaying reads captured ahead of time.

use super::{PositionValuer, ReadError};
use crate::domain::{EntityId, Investment, Position, PositionParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One captured valuation: the position's refreshed params or the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRead {
    pub position_id: EntityId,
    #[serde(flatten)]
    pub outcome: RecordedOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedOutcome {
    Value(PositionParams),
    Error(ReadError),
}

/// `PositionValuer` answering from a fixed set of recorded reads.
///
/// Positions without a recording fail with `Unavailable`.
#[derive(Debug, Clone, Default)]
pub struct RecordedValuer {
    reads: HashMap<EntityId, Result<PositionParams, ReadError>>,
}

impl RecordedValuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reads(reads: impl IntoIterator<Item = RecordedRead>) -> Self {
        let mut valuer = Self::new();
        for read in reads {
            valuer = match read.outcome {
                RecordedOutcome::Value(params) => valuer.with_value(read.position_id, params),
                RecordedOutcome::Error(err) => valuer.with_error(read.position_id, err),
            };
        }
        valuer
    }

    pub fn with_value(mut self, position_id: EntityId, params: PositionParams) -> Self {
        self.reads.insert(position_id, Ok(params));
        self
    }

    pub fn with_error(mut self, position_id: EntityId, err: ReadError) -> Self {
        self.reads.insert(position_id, Err(err));
        self
    }
}

#[async_trait]
impl PositionValuer for RecordedValuer {
    async fn current_value(
        &self,
        _investment: &Investment,
        position: &Position,
    ) -> Result<PositionParams, ReadError> {
        match self.reads.get(&position.id) {
            Some(outcome) => outcome.clone(),
            None => Err(ReadError::Unavailable(format!(
                "no recorded read for position {}",
                position.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_read_json() {
        let json = r#"{
            "position_id": "ab",
            "value": {
                "owner": "0x1111111111111111111111111111111111111111",
                "input_amounts": ["40"]
            }
        }"#;
        let read: RecordedRead = serde_json::from_str(json).unwrap();
        assert_eq!(read.position_id, EntityId::from_hex("ab"));
        match read.outcome {
            RecordedOutcome::Value(params) => {
                assert_eq!(params.input_amounts.len(), 1);
                assert!(params.tag.is_empty());
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let json = r#"{"position_id": "cd", "error": {"kind": "reverted", "reason": "balanceOf"}}"#;
        let read: RecordedRead = serde_json::from_str(json).unwrap();
        assert_eq!(
            read.outcome,
            RecordedOutcome::Error(ReadError::Reverted("balanceOf".to_string()))
        );
    }
}
