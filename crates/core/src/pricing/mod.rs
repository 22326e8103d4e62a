//! Pure pricing pipeline: base fare, adjustments, assembly, confidence,
//! explanation and alternative pickup times.
//!
//! Money and percentages are `Decimal`; raw signals arrive as `f64` and are
//! converted once, at the edge of each rule.

pub mod adjustments;
pub mod alternatives;
pub mod assembler;
pub mod base_fare;
pub mod confidence;
pub mod explanation;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::EngineConfig;
use crate::domain::factors::PricingFactors;
use crate::domain::request::PricingRequest;
use crate::domain::result::PricingResult;
use crate::errors::ComputationError;

pub use adjustments::calculate_adjustments;
pub use alternatives::generate_alternatives;
pub use assembler::{apply_adjustments, price_range, AssembledPrice, ClampOutcome};
pub use base_fare::{calculate_base_price, table_base_price};
pub use confidence::calculate_confidence;
pub use explanation::generate_explanation;

/// Two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn to_decimal(signal: &'static str, value: f64) -> Result<Decimal, ComputationError> {
    if !value.is_finite() {
        return Err(ComputationError::NonFiniteSignal { signal, value });
    }
    Decimal::from_f64(value).ok_or(ComputationError::Overflow { stage: signal })
}

/// Converts a percentage signal to a two-place decimal.
pub(crate) fn percent(signal: &'static str, value: f64) -> Result<Decimal, ComputationError> {
    to_decimal(signal, value).map(round_money)
}

pub(crate) fn checked_mul(
    stage: &'static str,
    lhs: Decimal,
    rhs: Decimal,
) -> Result<Decimal, ComputationError> {
    lhs.checked_mul(rhs).ok_or(ComputationError::Overflow { stage })
}

pub(crate) fn checked_add(
    stage: &'static str,
    lhs: Decimal,
    rhs: Decimal,
) -> Result<Decimal, ComputationError> {
    lhs.checked_add(rhs).ok_or(ComputationError::Overflow { stage })
}

pub(crate) fn format_percent(pct: Decimal) -> String {
    let pct = pct.normalize();
    if pct.is_sign_positive() && !pct.is_zero() {
        format!("+{pct}%")
    } else {
        format!("{pct}%")
    }
}

/// Runs the synchronous half of a quote against already-gathered factors.
pub fn quote_with_factors(
    request: &PricingRequest,
    factors: &PricingFactors,
    base_price: Decimal,
    config: &EngineConfig,
) -> Result<PricingResult, ComputationError> {
    let breakdown = calculate_adjustments(factors, request, &config.adjustments)?;
    let assembled = apply_adjustments(base_price, &breakdown, &config.bounds)?;
    let explanation = generate_explanation(
        &breakdown,
        factors,
        request,
        assembled.clamp,
        &config.adjustments,
    );
    let confidence = calculate_confidence(factors, &config.confidence);
    let price_range = price_range(assembled.final_price, base_price, &config.bounds)?;
    let suggested_alternatives =
        generate_alternatives(request, base_price, assembled.final_price, config)?;

    Ok(PricingResult {
        base_price,
        final_price: assembled.final_price,
        breakdown,
        explanation,
        confidence,
        price_range,
        suggested_alternatives,
        degraded: false,
    })
}
