//! Each rule maps one factor to a percentage. Rules are independent of one
//! another and of the base fare.

use crate::config::{
    AdjustmentConfig, DemandWeights, EventWeights, TierDiscounts, TimeOfDayConfig, TrafficSteps,
    WeatherTable,
};
use crate::domain::factors::{
    is_weekend, DemandData, DemandTrend, EventData, PricingFactors, TrafficData, WeatherConditions,
};
use crate::domain::request::{Location, PricingRequest, UserTier};
use crate::domain::result::AdjustmentBreakdown;
use crate::errors::ComputationError;
use crate::geo::haversine_km;
use crate::pricing::percent;

pub fn calculate_adjustments(
    factors: &PricingFactors,
    request: &PricingRequest,
    config: &AdjustmentConfig,
) -> Result<AdjustmentBreakdown, ComputationError> {
    Ok(AdjustmentBreakdown {
        demand: percent("demand", demand_adjustment(&factors.demand, &config.demand))?,
        traffic: percent("traffic", traffic_adjustment(&factors.traffic, &config.traffic))?,
        time_of_day: percent(
            "time_of_day",
            time_of_day_adjustment(factors.time_of_day, factors.day_of_week, &config.time_of_day),
        )?,
        weather: percent(
            "weather",
            weather_adjustment(factors.weather.conditions, &config.weather),
        )?,
        events: percent(
            "events",
            event_adjustment(&factors.events, &request.route.pickup, &config.events),
        )?,
        user_tier: percent(
            "user_tier",
            user_tier_adjustment(factors.user_tier, &config.user_tier),
        )?,
        seasonal: percent("seasonal", seasonal_adjustment(factors.seasonal_multiplier))?,
    })
}

pub fn demand_adjustment(demand: &DemandData, weights: &DemandWeights) -> f64 {
    let trend_bonus = match demand.demand_trend {
        DemandTrend::Increasing => weights.increasing_bonus,
        DemandTrend::Decreasing => weights.decreasing_bonus,
        DemandTrend::Stable => 0.0,
    };

    let raw = (demand.current_demand - weights.neutral_level) * weights.level_weight
        + trend_bonus
        + demand.service_type_popularity * weights.popularity_weight;

    // `f64::clamp` panics on inverted or NaN bounds.
    raw.max(weights.min_pct).min(weights.max_pct)
}

/// Step function over the estimated/baseline duration ratio. Deliberately not
/// interpolated so riders see the same surcharge for the same congestion band.
pub fn traffic_adjustment(traffic: &TrafficData, steps: &TrafficSteps) -> f64 {
    let ratio = traffic.duration_ratio();
    steps
        .steps
        .iter()
        .filter(|step| ratio > step.ratio_above)
        .map(|step| step.pct)
        .fold(0.0, f64::max)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRule {
    WeekdayPeak,
    LateNight,
    WeekendNight,
    Weekend,
}

impl TimeRule {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WeekdayPeak => "weekday peak hours",
            Self::LateNight => "late night",
            Self::WeekendNight => "weekend night",
            Self::Weekend => "weekend",
        }
    }
}

/// Time rules matching a local hour and weekday (0 = Sunday), with their
/// percentages. The weekend-night rule replaces late night rather than
/// stacking with it.
pub fn applicable_time_rules(
    hour: u32,
    day_of_week: u32,
    config: &TimeOfDayConfig,
) -> Vec<(TimeRule, f64)> {
    let weekend = is_weekend(day_of_week);
    let mut rules = Vec::new();

    if !weekend && config.weekday_peak_windows.iter().any(|window| window.contains(hour)) {
        rules.push((TimeRule::WeekdayPeak, config.weekday_peak_pct));
    }

    if weekend && config.weekend_night_window.contains(hour) {
        rules.push((TimeRule::WeekendNight, config.weekend_night_pct));
    } else {
        if config.late_night_window.contains(hour) {
            rules.push((TimeRule::LateNight, config.late_night_pct));
        }
        if weekend {
            rules.push((TimeRule::Weekend, config.weekend_pct));
        }
    }

    rules
}

pub fn time_of_day_adjustment(hour: u32, day_of_week: u32, config: &TimeOfDayConfig) -> f64 {
    applicable_time_rules(hour, day_of_week, config).iter().map(|(_, pct)| pct).sum()
}

pub fn weather_adjustment(conditions: WeatherConditions, table: &WeatherTable) -> f64 {
    match conditions {
        WeatherConditions::Clear => table.clear,
        WeatherConditions::Rain => table.rain,
        WeatherConditions::Snow => table.snow,
        WeatherConditions::Storm => table.storm,
        WeatherConditions::Fog => table.fog,
    }
}

/// Impact of a single event on a pickup, before the cap. Zero outside the
/// event's radius.
pub fn event_impact(event: &EventData, pickup: &Location, weights: &EventWeights) -> f64 {
    if event.impact_radius_km <= 0.0 {
        return 0.0;
    }

    let distance = haversine_km(pickup, &event.location);
    let proximity = (1.0 - distance / event.impact_radius_km).max(0.0);
    let crowd = (f64::from(event.estimated_attendees) / weights.attendee_scale)
        .min(weights.attendee_factor_cap);

    proximity * crowd * weights.weight
}

/// The event with the largest impact on this pickup, if any has one.
pub fn strongest_event<'a>(
    events: &'a [EventData],
    pickup: &Location,
    weights: &EventWeights,
) -> Option<(&'a EventData, f64)> {
    events
        .iter()
        .map(|event| (event, event_impact(event, pickup, weights)))
        .filter(|(_, impact)| *impact > 0.0)
        .fold(None, |best, candidate| match best {
            Some((_, best_impact)) if best_impact >= candidate.1 => best,
            _ => Some(candidate),
        })
}

/// Co-located events draw on one demand pool, so the strongest event sets the
/// surcharge instead of the sum.
pub fn event_adjustment(events: &[EventData], pickup: &Location, weights: &EventWeights) -> f64 {
    strongest_event(events, pickup, weights)
        .map(|(_, impact)| impact.min(weights.max_pct))
        .unwrap_or(0.0)
}

pub fn user_tier_adjustment(tier: UserTier, discounts: &TierDiscounts) -> f64 {
    match tier {
        UserTier::Standard => discounts.standard,
        UserTier::Premium => discounts.premium,
        UserTier::Vip => discounts.vip,
    }
}

pub fn seasonal_adjustment(seasonal_multiplier: f64) -> f64 {
    (seasonal_multiplier - 1.0) * 100.0
}
