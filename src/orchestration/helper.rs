//! Per-protocol capability consumed by the ledger.

use crate::chain::ReadError;
use crate::domain::ids::{investment_id, position_id, protocol_id};
use crate::domain::{Address, EntityId, InvestmentTokens};
use async_trait::async_trait;

/// Describes one venue of one protocol to the ledger.
///
/// Implementations hold whatever chain capability they need to answer
/// `get_tokens`; the ledger calls it only when the investment is first
/// created.
#[async_trait]
pub trait InvestmentHelper: Send + Sync {
    fn protocol_name(&self) -> &str;

    fn investment_address(&self) -> Address;

    /// Disambiguates several investments at one address.
    fn investment_tag(&self) -> &str {
        ""
    }

    /// Input/reward tokens and creation metadata of the investment.
    async fn get_tokens(&self) -> Result<InvestmentTokens, ReadError>;

    /// Metadata stored on the protocol row when it is first created.
    fn protocol_meta(&self) -> Vec<String> {
        Vec::new()
    }

    fn protocol_id(&self, chain: &str) -> EntityId {
        protocol_id(self.protocol_name(), chain)
    }

    fn investment_id(&self, chain: &str) -> EntityId {
        investment_id(
            &self.protocol_id(chain),
            &self.investment_address(),
            self.investment_tag(),
        )
    }

    fn position_id(&self, chain: &str, owner: &Address, tag: &str) -> EntityId {
        position_id(&self.investment_id(chain), owner, tag)
    }
}
