//! Pure position merge: apply pre-resolved params to the stored position.

use crate::domain::ids::position_id;
use crate::domain::{is_closed, Amount, Investment, Position, PositionParams, MAX_META_SLOTS};
use crate::error::LedgerError;

/// Result of merging params into an optional existing position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPosition {
    pub position: Position,
    pub created: bool,
}

/// Check that `params` fits the investment's token layout.
pub fn validate_params(investment: &Investment, params: &PositionParams) -> Result<(), LedgerError> {
    if params.input_amounts.len() != investment.input_tokens.len() {
        return Err(LedgerError::ShapeMismatch(format!(
            "investment {} has {} input tokens, got {} input amounts",
            investment.id,
            investment.input_tokens.len(),
            params.input_amounts.len()
        )));
    }
    if params.reward_amounts.len() != investment.reward_tokens.len() {
        return Err(LedgerError::ShapeMismatch(format!(
            "investment {} has {} reward tokens, got {} reward amounts",
            investment.id,
            investment.reward_tokens.len(),
            params.reward_amounts.len()
        )));
    }
    if params.meta.len() > MAX_META_SLOTS {
        return Err(LedgerError::InvalidInput(format!(
            "{} meta slots exceed the limit of {}",
            params.meta.len(),
            MAX_META_SLOTS
        )));
    }
    Ok(())
}

/// Merge `params` into `existing` (or a fresh position).
///
/// Creation captures `initial_amounts` and `kind`; every call overwrites
/// amounts, liquidity and meta, then recomputes `closed`.
pub fn apply_upsert(
    existing: Option<Position>,
    investment: &Investment,
    params: &PositionParams,
    block_number: u64,
) -> Result<MergedPosition, LedgerError> {
    validate_params(investment, params)?;
    let amounts = params.amounts();

    let (mut position, created) = match existing {
        Some(position) => {
            if position.amounts.len() != amounts.len() {
                return Err(LedgerError::ShapeMismatch(format!(
                    "position {} holds {} amounts, got {}",
                    position.id,
                    position.amounts.len(),
                    amounts.len()
                )));
            }
            (position, false)
        }
        None => (
            Position {
                id: position_id(&investment.id, &params.owner, &params.tag),
                investment_id: investment.id.clone(),
                owner: params.owner,
                tag: params.tag.clone(),
                kind: params.kind,
                amounts: Vec::new(),
                initial_amounts: amounts.clone(),
                input_count: params.input_amounts.len(),
                liquidity: Amount::zero(),
                closed: false,
                meta: Vec::new(),
                block_number,
            },
            true,
        ),
    };

    position.closed = is_closed(&amounts);
    position.amounts = amounts;
    position.liquidity = params.liquidity;
    position.meta = params.meta.clone();

    Ok(MergedPosition { position, created })
}

/// Validate that a delta vector lines up with the position's amounts.
pub fn check_deltas(position: &Position, deltas: &[Amount]) -> Result<(), LedgerError> {
    if deltas.len() != position.amounts.len() {
        return Err(LedgerError::ShapeMismatch(format!(
            "position {} holds {} amounts, got {} deltas",
            position.id,
            position.amounts.len(),
            deltas.len()
        )));
    }
    Ok(())
}
