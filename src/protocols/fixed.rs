//! Investment with statically known tokens.

use crate::chain::ReadError;
use crate::domain::{Address, InvestmentTokens};
use crate::orchestration::InvestmentHelper;
use async_trait::async_trait;

/// Helper for venues whose token layout is known up front (vaults, farms,
/// tests). No chain reads are needed to create the investment.
#[derive(Debug, Clone)]
pub struct FixedInvestment {
    protocol_name: String,
    address: Address,
    tag: String,
    tokens: InvestmentTokens,
    protocol_meta: Vec<String>,
}

impl FixedInvestment {
    pub fn new(protocol_name: impl Into<String>, address: Address, input_tokens: Vec<Address>) -> Self {
        Self {
            protocol_name: protocol_name.into(),
            address,
            tag: String::new(),
            tokens: InvestmentTokens::new(input_tokens, Vec::new(), Vec::new()),
            protocol_meta: Vec::new(),
        }
    }

    pub fn with_reward_tokens(mut self, reward_tokens: Vec<Address>) -> Self {
        self.tokens.reward_tokens = reward_tokens;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_meta(mut self, meta: Vec<String>) -> Self {
        self.tokens.meta = meta;
        self
    }

    pub fn with_protocol_meta(mut self, meta: Vec<String>) -> Self {
        self.protocol_meta = meta;
        self
    }
}

#[async_trait]
impl InvestmentHelper for FixedInvestment {
    fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    fn investment_address(&self) -> Address {
        self.address
    }

    fn investment_tag(&self) -> &str {
        &self.tag
    }

    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError> {
        Ok(self.tokens.clone())
    }

    fn protocol_meta(&self) -> Vec<String> {
        self.protocol_meta.clone()
    }
}
