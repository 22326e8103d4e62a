use crate::config::ConfidenceConfig;
use crate::domain::factors::{PricingFactors, TrafficConditions};

/// How much live signal backed a price. Counts which sources answered, not
/// how well; not a probability.
pub fn calculate_confidence(factors: &PricingFactors, config: &ConfidenceConfig) -> f64 {
    let mut score = config.base;

    if factors.historical.booking_count >= config.min_history_bookings {
        score += config.history_bonus;
    }
    if factors.coverage.demand {
        score += config.demand_bonus;
    }
    if factors.traffic.current_conditions != TrafficConditions::Unknown {
        score += config.traffic_bonus;
    }

    ((score * 100.0).round() / 100.0).max(config.floor).min(config.cap)
}
