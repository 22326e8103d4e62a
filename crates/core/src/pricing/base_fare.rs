use rust_decimal::Decimal;

use crate::config::RateConfig;
use crate::domain::request::{PricingRequest, ServiceType, VehiclePreference};
use crate::errors::ComputationError;
use crate::geo::haversine_km;
use crate::pricing::{checked_add, checked_mul, round_money, to_decimal};

/// Deterministic pre-adjustment fare: table base, plus great-circle distance,
/// then group and vehicle multipliers.
pub fn calculate_base_price(
    request: &PricingRequest,
    rates: &RateConfig,
) -> Result<Decimal, ComputationError> {
    let mut base = table_base_price(request.service_type, rates);

    if let Some(dropoff) = &request.route.dropoff {
        let distance_km = to_decimal("distance", haversine_km(&request.route.pickup, dropoff))?;
        let per_km = rates.distance_rate.rate(request.service_type);
        let distance_charge = checked_mul("distance_charge", distance_km, per_km)?;
        base = checked_add("base_price", base, distance_charge)?;
    }

    if request.passenger_count > rates.group_passenger_threshold {
        base = checked_mul("group_surcharge", base, rates.group_multiplier)?;
    }

    match request.vehicle_preference {
        Some(VehiclePreference::Luxury) => {
            base = checked_mul("vehicle_multiplier", base, rates.luxury_vehicle_multiplier)?;
        }
        Some(VehiclePreference::Premium) => {
            base = checked_mul("vehicle_multiplier", base, rates.premium_vehicle_multiplier)?;
        }
        Some(VehiclePreference::Standard) | None => {}
    }

    Ok(round_money(base.max(Decimal::ZERO)))
}

pub fn table_base_price(service_type: ServiceType, rates: &RateConfig) -> Decimal {
    round_money(rates.base_price.rate(service_type))
}
