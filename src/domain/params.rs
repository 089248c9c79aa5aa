//! Inputs handed to the ledger by protocol-specific glue.

use crate::domain::{concat_amounts, Address, Amount, PositionKind};
use serde::{Deserialize, Serialize};

/// Pre-resolved state of one position as computed by protocol logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionParams {
    pub owner: Address,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub kind: PositionKind,
    pub input_amounts: Vec<Amount>,
    #[serde(default)]
    pub reward_amounts: Vec<Amount>,
    #[serde(default)]
    pub liquidity: Amount,
    #[serde(default)]
    pub meta: Vec<String>,
}

impl PositionParams {
    pub fn new(owner: Address, kind: PositionKind, input_amounts: Vec<Amount>) -> Self {
        PositionParams {
            owner,
            tag: String::new(),
            kind,
            input_amounts,
            reward_amounts: Vec::new(),
            liquidity: Amount::zero(),
            meta: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_rewards(mut self, reward_amounts: Vec<Amount>) -> Self {
        self.reward_amounts = reward_amounts;
        self
    }

    pub fn with_liquidity(mut self, liquidity: Amount) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_meta(mut self, meta: Vec<String>) -> Self {
        self.meta = meta;
        self
    }

    /// Input amounts followed by reward amounts.
    pub fn amounts(&self) -> Vec<Amount> {
        concat_amounts(&self.input_amounts, &self.reward_amounts)
    }
}

/// Token lists and metadata describing a venue at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvestmentTokens {
    pub input_tokens: Vec<Address>,
    #[serde(default)]
    pub reward_tokens: Vec<Address>,
    #[serde(default)]
    pub meta: Vec<String>,
}

impl InvestmentTokens {
    pub fn new(input_tokens: Vec<Address>, reward_tokens: Vec<Address>, meta: Vec<String>) -> Self {
        InvestmentTokens {
            input_tokens,
            reward_tokens,
            meta,
        }
    }
}
