use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike};
use rust_decimal::Decimal;

use crate::config::{EngineConfig, TimeOfDayConfig};
use crate::domain::request::PricingRequest;
use crate::domain::result::PriceAlternative;
use crate::errors::ComputationError;
use crate::pricing::adjustments::time_of_day_adjustment;
use crate::pricing::assembler::price_limits;
use crate::pricing::{checked_add, checked_mul, percent, round_money};

/// Nearby pickup times priced by re-evaluating only the time-of-day rule.
///
/// Every other factor is held fixed, so a suggestion costs a rule lookup
/// rather than a full quote and needs no factor data. Results are ordered by
/// savings, largest first.
pub fn generate_alternatives(
    request: &PricingRequest,
    base_price: Decimal,
    final_price: Decimal,
    config: &EngineConfig,
) -> Result<Vec<PriceAlternative>, ComputationError> {
    let time_config = &config.adjustments.time_of_day;
    let settings = &config.alternatives;
    let (floor, ceiling) = price_limits(base_price, &config.bounds)?;

    let current = time_of_day_percent(request.pickup_at, time_config)?;

    let mut alternatives = Vec::new();
    for &offset_minutes in &settings.offsets_minutes {
        let shift = Duration::minutes(offset_minutes);
        let Some(pickup_at) = request.pickup_at.checked_add_signed(shift) else {
            continue;
        };

        let shifted = time_of_day_percent(pickup_at, time_config)?;
        let delta = checked_mul(
            "alternative_delta",
            (shifted - current) / Decimal::ONE_HUNDRED,
            base_price,
        )?;

        if delta.abs() <= settings.min_delta {
            continue;
        }

        let estimated =
            checked_add("alternative_price", final_price, delta)?.max(floor).min(ceiling);
        let price_difference = round_money(-delta);

        alternatives.push(PriceAlternative {
            pickup_at,
            offset_minutes,
            price_difference,
            estimated_price: round_money(estimated),
            reason: describe_shift(offset_minutes, price_difference),
        });
    }

    alternatives.sort_by(|a, b| b.price_difference.cmp(&a.price_difference));
    alternatives.truncate(settings.max_suggestions);
    Ok(alternatives)
}

/// Both sides of a delta read the request's own clock, never the factors'.
fn time_of_day_percent(
    at: DateTime<FixedOffset>,
    config: &TimeOfDayConfig,
) -> Result<Decimal, ComputationError> {
    percent(
        "time_of_day",
        time_of_day_adjustment(at.hour(), at.weekday().num_days_from_sunday(), config),
    )
}

fn describe_shift(offset_minutes: i64, price_difference: Decimal) -> String {
    let direction = if offset_minutes < 0 { "earlier" } else { "later" };
    let minutes = offset_minutes.abs();
    if price_difference.is_sign_positive() {
        format!("Leave {minutes} minutes {direction} to save {price_difference}")
    } else {
        format!("Leaving {minutes} minutes {direction} costs {} more", price_difference.abs())
    }
}
