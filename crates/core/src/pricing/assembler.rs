use rust_decimal::Decimal;

use crate::config::PriceBounds;
use crate::domain::result::{AdjustmentBreakdown, PriceRange};
use crate::errors::ComputationError;
use crate::pricing::{checked_mul, round_money};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClampOutcome {
    Within,
    Floor,
    Ceiling,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledPrice {
    pub final_price: Decimal,
    pub clamp: ClampOutcome,
}

/// Folds each percentage onto the base as `price *= 1 + pct / 100`.
pub fn fold_adjustments(
    base_price: Decimal,
    adjustments: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ComputationError> {
    let hundred = Decimal::ONE_HUNDRED;
    adjustments.into_iter().try_fold(base_price, |price, pct| {
        checked_mul("adjusted_price", price, Decimal::ONE + pct / hundred)
    })
}

pub fn apply_adjustments(
    base_price: Decimal,
    breakdown: &AdjustmentBreakdown,
    bounds: &PriceBounds,
) -> Result<AssembledPrice, ComputationError> {
    let adjusted = fold_adjustments(base_price, breakdown.entries().map(|(_, pct)| pct))?;
    let (floor, ceiling) = price_limits(base_price, bounds)?;

    let (price, clamp) = if adjusted < floor {
        (floor, ClampOutcome::Floor)
    } else if adjusted > ceiling {
        (ceiling, ClampOutcome::Ceiling)
    } else {
        (adjusted, ClampOutcome::Within)
    };

    Ok(AssembledPrice { final_price: round_money(price), clamp })
}

/// Display band of `final ± spread`, re-clamped to the price limits. Near a
/// limit the band is narrower than the spread on that side.
pub fn price_range(
    final_price: Decimal,
    base_price: Decimal,
    bounds: &PriceBounds,
) -> Result<PriceRange, ComputationError> {
    let (floor, ceiling) = price_limits(base_price, bounds)?;
    let low = checked_mul("price_range", final_price, Decimal::ONE - bounds.range_spread)?;
    let high = checked_mul("price_range", final_price, Decimal::ONE + bounds.range_spread)?;

    Ok(PriceRange { min: round_money(low.max(floor)), max: round_money(high.min(ceiling)) })
}

pub fn price_limits(
    base_price: Decimal,
    bounds: &PriceBounds,
) -> Result<(Decimal, Decimal), ComputationError> {
    Ok((
        checked_mul("price_floor", base_price, bounds.floor_multiplier)?,
        checked_mul("price_ceiling", base_price, bounds.ceiling_multiplier)?,
    ))
}
