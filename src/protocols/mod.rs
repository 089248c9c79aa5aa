//! Protocol integrations: investment helpers and position valuers.

pub mod concentrated;
pub mod fixed;
pub mod lending;
pub mod pair;
pub mod staking;

pub use concentrated::{ConcentratedPool, ConcentratedValuer};
pub use fixed::FixedInvestment;
pub use lending::{LendingMarket, LendingValuer, BORROW_TAG, SUPPLY_TAG};
pub use pair::{PairPool, PairValuer};
pub use staking::{StakingToken, StakingValuer};
