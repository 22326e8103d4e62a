use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{Location, PricingRequest, UserTier};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompetitorQuote {
    pub provider: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandData {
    /// Normalised demand level, 0.0 (idle) to 1.0 (saturated).
    pub current_demand: f64,
    pub peak_hours: Vec<u32>,
    pub demand_trend: DemandTrend,
    pub competitor_pricing: Vec<CompetitorQuote>,
    /// Share of requests in the area for this service type, 0.0 to 1.0.
    pub service_type_popularity: f64,
}

impl Default for DemandData {
    fn default() -> Self {
        Self {
            current_demand: 0.5,
            peak_hours: Vec::new(),
            demand_trend: DemandTrend::Stable,
            competitor_pricing: Vec::new(),
            service_type_popularity: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficConditions {
    Light,
    Moderate,
    Heavy,
    Severe,
    /// Sentinel for "no live traffic answer".
    #[default]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficData {
    pub current_conditions: TrafficConditions,
    pub estimated_duration_minutes: f64,
    pub baseline_duration_minutes: f64,
    pub traffic_multiplier: f64,
    pub alternative_routes: u32,
}

impl TrafficData {
    /// Estimated over baseline travel time. A missing baseline reads as free-flowing.
    pub fn duration_ratio(&self) -> f64 {
        if self.baseline_duration_minutes > 0.0 {
            self.estimated_duration_minutes / self.baseline_duration_minutes
        } else {
            1.0
        }
    }
}

impl Default for TrafficData {
    fn default() -> Self {
        Self {
            current_conditions: TrafficConditions::Unknown,
            estimated_duration_minutes: 0.0,
            baseline_duration_minutes: 0.0,
            traffic_multiplier: 1.0,
            alternative_routes: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherConditions {
    #[default]
    Clear,
    Rain,
    Snow,
    Storm,
    Fog,
}

impl WeatherConditions {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Storm => "storm",
            Self::Fog => "fog",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub conditions: WeatherConditions,
    pub temperature_celsius: f64,
    pub visibility_km: f64,
    pub wind_speed_kph: f64,
}

impl Default for WeatherData {
    fn default() -> Self {
        Self {
            conditions: WeatherConditions::Clear,
            temperature_celsius: 15.0,
            visibility_km: 10.0,
            wind_speed_kph: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Concert,
    Sports,
    Conference,
    Festival,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    pub event_type: EventType,
    pub location: Location,
    pub starts_at: DateTime<FixedOffset>,
    pub ends_at: DateTime<FixedOffset>,
    pub estimated_attendees: u32,
    pub impact_radius_km: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPricing {
    pub booking_count: u32,
    pub average_price: Option<Decimal>,
    pub average_adjustment_pct: Option<f64>,
}

/// Which factors came from a live provider answer rather than a default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorCoverage {
    pub demand: bool,
    pub traffic: bool,
    pub weather: bool,
    pub events: bool,
    pub historical: bool,
    pub availability: bool,
}

impl FactorCoverage {
    pub fn live_count(&self) -> usize {
        [self.demand, self.traffic, self.weather, self.events, self.historical, self.availability]
            .into_iter()
            .filter(|live| *live)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }
}

pub const DEFAULT_DRIVER_AVAILABILITY: f64 = 0.5;

/// Every signal the adjustment rules read, built fresh for a single quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingFactors {
    pub demand: DemandData,
    pub traffic: TrafficData,
    pub weather: WeatherData,
    pub events: Vec<EventData>,
    /// Local hour of the pickup, 0..=23.
    pub time_of_day: u32,
    /// Local weekday of the pickup, 0 = Sunday.
    pub day_of_week: u32,
    pub user_tier: UserTier,
    pub historical: HistoricalPricing,
    pub seasonal_multiplier: f64,
    pub driver_availability: f64,
    pub coverage: FactorCoverage,
}

impl PricingFactors {
    /// Factors with every provider-sourced signal at its documented default.
    pub fn defaults_for(request: &PricingRequest, seasonal_multiplier: f64) -> Self {
        Self {
            demand: DemandData::default(),
            traffic: TrafficData::default(),
            weather: WeatherData::default(),
            events: Vec::new(),
            time_of_day: request.pickup_at.hour(),
            day_of_week: request.pickup_at.weekday().num_days_from_sunday(),
            user_tier: request.user_tier,
            historical: HistoricalPricing::default(),
            seasonal_multiplier,
            driver_availability: DEFAULT_DRIVER_AVAILABILITY,
            coverage: FactorCoverage::default(),
        }
    }
}

pub fn is_weekend(day_of_week: u32) -> bool {
    day_of_week == 0 || day_of_week == 6
}
