//! Position change actions and position kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an event did to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionChangeAction {
    Deposit,
    Withdraw,
    Harvest,
    Borrow,
    Repay,
    Liquidate,
    LiquidateReward,
    Send,
    Receive,
    Stake,
    Unstake,
    Compound,
}

impl PositionChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionChangeAction::Deposit => "deposit",
            PositionChangeAction::Withdraw => "withdraw",
            PositionChangeAction::Harvest => "harvest",
            PositionChangeAction::Borrow => "borrow",
            PositionChangeAction::Repay => "repay",
            PositionChangeAction::Liquidate => "liquidate",
            PositionChangeAction::LiquidateReward => "liquidate_reward",
            PositionChangeAction::Send => "send",
            PositionChangeAction::Receive => "receive",
            PositionChangeAction::Stake => "stake",
            PositionChangeAction::Unstake => "unstake",
            PositionChangeAction::Compound => "compound",
        }
    }
}

impl fmt::Display for PositionChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionChangeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "deposit" => PositionChangeAction::Deposit,
            "withdraw" => PositionChangeAction::Withdraw,
            "harvest" => PositionChangeAction::Harvest,
            "borrow" => PositionChangeAction::Borrow,
            "repay" => PositionChangeAction::Repay,
            "liquidate" => PositionChangeAction::Liquidate,
            "liquidate_reward" => PositionChangeAction::LiquidateReward,
            "send" => PositionChangeAction::Send,
            "receive" => PositionChangeAction::Receive,
            "stake" => PositionChangeAction::Stake,
            "unstake" => PositionChangeAction::Unstake,
            "compound" => PositionChangeAction::Compound,
            other => return Err(format!("unknown position change action: {}", other)),
        };
        Ok(action)
    }
}

/// Classification of a position, fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    /// Generic investment (LP share, staking balance).
    #[default]
    Invest,
    /// Lending-market supply.
    Supply,
    /// Lending-market debt.
    Borrow,
}

impl PositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKind::Invest => "invest",
            PositionKind::Supply => "supply",
            PositionKind::Borrow => "borrow",
        }
    }
}

impl fmt::Display for PositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invest" => Ok(PositionKind::Invest),
            "supply" => Ok(PositionKind::Supply),
            "borrow" => Ok(PositionKind::Borrow),
            other => Err(format!("unknown position kind: {}", other)),
        }
    }
}
